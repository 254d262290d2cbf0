//! Connection identity: the addressable name of one supervised connection.

use std::fmt;

use thiserror::Error;

/// Opaque connection identity with a mandatory `type:id` prefix.
///
/// The type prefix selects the worker implementation for the connection; an
/// identity without the delimiter cannot be routed and is rejected at
/// construction time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId {
    raw: String,
    delimiter: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionIdError {
    #[error("connection id '{0}' must contain a type prefix")]
    MissingTypePrefix(String),
}

impl ConnectionId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, ConnectionIdError> {
        let raw = raw.into();
        match raw.find(':') {
            Some(idx) if idx > 0 => Ok(Self { raw, delimiter: idx }),
            _ => Err(ConnectionIdError::MissingTypePrefix(raw)),
        }
    }

    /// The worker-selecting type prefix, e.g. `amqp` in `amqp:edge-7`.
    pub fn connection_type(&self) -> &str {
        &self.raw[..self.delimiter]
    }

    pub fn id(&self) -> &str {
        &self.raw[self.delimiter + 1..]
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
