//! Message shapes and correlation machinery shared across the bridge.

pub mod correlation;
pub mod inbound;
pub mod protocol;

pub use correlation::{CorrelationCache, Trace, DEFAULT_TRACE_TTL};
pub use inbound::{ExternalMessage, MessageBody, MAX_BINARY_BODY_BYTES};
pub use protocol::{
    CommandResponse, DomainCommand, DomainError, Envelope, TranslationError,
    CANONICAL_CONTENT_TYPE, HEADER_AUTHORIZATION_SUBJECT, HEADER_CONTENT_TYPE,
    HEADER_CORRELATION_ID,
};
