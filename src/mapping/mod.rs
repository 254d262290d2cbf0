//! Pluggable payload mapping from external content types to the canonical
//! protocol envelope, and back.
//!
//! A mapper registry is built once at startup from the ordered mapping
//! contexts in configuration. Engine resolution goes through an explicit
//! catalog: built-in symbolic names first, then dynamically registered
//! constructors keyed by fully-qualified name. Unknown names yield a typed
//! error, which skips the entry without aborting startup.

pub mod engines;
pub mod registry;

use std::collections::HashMap;

use thiserror::Error;

use crate::messaging::inbound::MessageBody;
use crate::messaging::protocol::Envelope;

pub use registry::{EngineCatalog, EngineConstructor, MapperRegistry};

/// One configured mapping: a content-type, the engine that translates it, and
/// opaque engine options.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct MappingContext {
    pub content_type: String,
    pub mapping_engine: String,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapperError {
    #[error("unknown mapping engine '{0}'")]
    UnknownEngine(String),
    #[error("invalid mapper option '{option}': {reason}")]
    InvalidOptions { option: String, reason: String },
    #[error("unsupported body for content-type '{0}'")]
    UnsupportedBody(String),
    #[error("payload mapping failed: {0}")]
    Payload(String),
}

/// Input handed to a mapper: the declared content-type, exactly one populated
/// body kind, and the request-scoped headers of the inbound message.
#[derive(Debug)]
pub struct MapperInput<'a> {
    pub content_type: &'a str,
    pub body: &'a MessageBody,
    pub headers: &'a HashMap<String, String>,
}

/// A translator between one external payload format and the canonical
/// envelope. Implementations are stateless after construction and shared
/// read-only across processors.
pub trait PayloadMapper: Send + Sync {
    fn map_inbound(&self, input: &MapperInput<'_>) -> Result<Envelope, MapperError>;
    fn map_outbound(&self, envelope: &Envelope) -> Result<MessageBody, MapperError>;
}
