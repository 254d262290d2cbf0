//! Canonical protocol envelope and the domain command/response shapes.
//!
//! The canonical envelope is the platform's content-type-independent
//! representation. External payloads are mapped into it (or already carry it
//! under [`CANONICAL_CONTENT_TYPE`]) and domain commands are parsed from it.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::bridge::id::ConnectionId;
use crate::mapping::MapperError;

/// Content-type under which bodies are already canonical envelopes.
pub const CANONICAL_CONTENT_TYPE: &str = "application/vnd.bifrost+json";

pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_CORRELATION_ID: &str = "correlation-id";
pub const HEADER_AUTHORIZATION_SUBJECT: &str = "authorization-subject";

/// Faults local to translating one inbound message. Recovered by dropping the
/// message after the transport ack; never fatal to the processor.
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("binary body of {0} bytes exceeds the 32-bit payload bound")]
    OversizeBody(u64),
    #[error("payload is not valid UTF-8")]
    NonUtf8Body,
    #[error("invalid canonical envelope: {0}")]
    InvalidEnvelope(String),
    #[error("mapper for content-type '{content_type}' failed: {source}")]
    Mapper {
        content_type: String,
        source: MapperError,
    },
}

/// The platform's canonical protocol envelope.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Envelope {
    pub topic: String,
    pub path: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub value: Value,
}

impl Envelope {
    pub fn from_json_str(raw: &str) -> Result<Self, TranslationError> {
        serde_json::from_str(raw).map_err(|err| TranslationError::InvalidEnvelope(err.to_string()))
    }
}

/// A concrete domain command parsed from a canonical envelope, carrying the
/// request-scoped headers of the inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainCommand {
    /// Routing type derived from the envelope, e.g. `things/commands:modify`.
    pub command_type: String,
    pub topic: String,
    pub path: String,
    pub payload: Value,
    pub headers: HashMap<String, String>,
}

impl DomainCommand {
    /// Build a command from an envelope, attaching `request_headers` on top of
    /// any envelope-internal headers (inbound wins on conflict) and stamping
    /// the configured authorization subject when not already present.
    pub fn from_envelope(
        envelope: Envelope,
        request_headers: &HashMap<String, String>,
        authorization_subject: Option<&str>,
    ) -> Self {
        let mut headers = envelope.headers;
        for (name, value) in request_headers {
            headers.insert(name.clone(), value.clone());
        }
        if let Some(subject) = authorization_subject {
            headers
                .entry(HEADER_AUTHORIZATION_SUBJECT.to_string())
                .or_insert_with(|| subject.to_string());
        }
        Self {
            command_type: format!("{}:{}", envelope.topic, envelope.path),
            topic: envelope.topic,
            path: envelope.path,
            payload: envelope.value,
            headers,
        }
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.headers.get(HEADER_CORRELATION_ID).map(String::as_str)
    }
}

/// Response to a dispatched command, delivered back through the internal bus.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CommandResponse {
    pub topic: String,
    pub path: String,
    pub status: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub payload: Value,
}

impl CommandResponse {
    pub fn correlation_id(&self) -> Option<&str> {
        self.headers.get(HEADER_CORRELATION_ID).map(String::as_str)
    }

    /// Client/server errors select log verbosity only; there is no behavioral
    /// branching on status beyond that.
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

/// Platform domain error as emitted by downstream services or by the bridge
/// itself (e.g. the fail-fast downtime answer of a supervisor).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DomainError {
    pub code: String,
    pub status: u16,
    pub message: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl DomainError {
    /// Fail-fast answer produced while a connection's worker is down. Carries
    /// forward the request-scoped headers of the undeliverable message.
    pub fn connection_unavailable(
        connection_id: &ConnectionId,
        headers: HashMap<String, String>,
    ) -> Self {
        Self {
            code: "connectivity:connection.unavailable".to_string(),
            status: 503,
            message: format!("connection '{connection_id}' is not available"),
            headers,
        }
    }

    /// Convert into the generic error-response shape; domain errors are then
    /// handled exactly like ordinary responses.
    pub fn to_error_response(&self) -> CommandResponse {
        CommandResponse {
            topic: "_errors".to_string(),
            path: "/".to_string(),
            status: self.status,
            headers: self.headers.clone(),
            payload: serde_json::json!({
                "code": self.code,
                "status": self.status,
                "message": self.message,
            }),
        }
    }
}
