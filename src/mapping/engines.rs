//! Built-in mapping engines.

use std::collections::HashMap;

use serde_json::Value;

use crate::mapping::{MapperError, MapperInput, PayloadMapper};
use crate::messaging::inbound::MessageBody;
use crate::messaging::protocol::Envelope;

/// Engine name for [`CanonicalJsonMapper`].
pub const CANONICAL_JSON: &str = "canonical-json";
/// Engine name for [`WrappedJsonMapper`].
pub const WRAPPED_JSON: &str = "wrapped-json";

/// Passes bodies through that already carry a canonical envelope as JSON,
/// for external content types that are canonical in all but name.
pub struct CanonicalJsonMapper;

impl CanonicalJsonMapper {
    pub fn construct(_options: &HashMap<String, String>) -> Result<Box<dyn PayloadMapper>, MapperError> {
        Ok(Box::new(Self))
    }
}

impl PayloadMapper for CanonicalJsonMapper {
    fn map_inbound(&self, input: &MapperInput<'_>) -> Result<Envelope, MapperError> {
        let text = input
            .body
            .as_utf8()
            .map_err(|_| MapperError::UnsupportedBody(input.content_type.to_string()))?;
        Envelope::from_json_str(&text).map_err(|err| MapperError::Payload(err.to_string()))
    }

    fn map_outbound(&self, envelope: &Envelope) -> Result<MessageBody, MapperError> {
        serde_json::to_string(envelope)
            .map(MessageBody::Text)
            .map_err(|err| MapperError::Payload(err.to_string()))
    }
}

/// Wraps an arbitrary JSON payload into a canonical envelope, with the
/// envelope topic and path taken from engine options.
pub struct WrappedJsonMapper {
    topic: String,
    path: String,
}

impl WrappedJsonMapper {
    pub fn construct(options: &HashMap<String, String>) -> Result<Box<dyn PayloadMapper>, MapperError> {
        let topic = require_option(options, "topic")?;
        let path = require_option(options, "path")?;
        Ok(Box::new(Self { topic, path }))
    }
}

fn require_option(options: &HashMap<String, String>, name: &str) -> Result<String, MapperError> {
    options
        .get(name)
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or_else(|| MapperError::InvalidOptions {
            option: name.to_string(),
            reason: "missing or empty".to_string(),
        })
}

impl PayloadMapper for WrappedJsonMapper {
    fn map_inbound(&self, input: &MapperInput<'_>) -> Result<Envelope, MapperError> {
        let text = input
            .body
            .as_utf8()
            .map_err(|_| MapperError::UnsupportedBody(input.content_type.to_string()))?;
        let payload: Value =
            serde_json::from_str(&text).map_err(|err| MapperError::Payload(err.to_string()))?;
        Ok(Envelope {
            topic: self.topic.clone(),
            path: self.path.clone(),
            headers: HashMap::new(),
            value: payload,
        })
    }

    fn map_outbound(&self, envelope: &Envelope) -> Result<MessageBody, MapperError> {
        serde_json::to_string(&envelope.value)
            .map(MessageBody::Text)
            .map_err(|err| MapperError::Payload(err.to_string()))
    }
}
