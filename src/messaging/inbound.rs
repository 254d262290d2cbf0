//! Inbound transport message shapes handed to the command processor.

use std::borrow::Cow;
use std::collections::HashMap;

use bytes::Bytes;

use crate::messaging::protocol::{TranslationError, HEADER_CONTENT_TYPE, HEADER_CORRELATION_ID};

/// Largest binary payload the bridge accepts; the wire length field is 32 bits.
pub const MAX_BINARY_BODY_BYTES: u64 = u32::MAX as u64;

/// Body of an inbound message: textual or raw binary, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Text(String),
    /// Raw binary payload. `declared_len` mirrors the wire-level length field
    /// and is validated against the 32-bit bound before the data is touched.
    Binary { data: Bytes, declared_len: u64 },
}

impl MessageBody {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text(body.into())
    }

    pub fn binary(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self::Binary {
            declared_len: data.len() as u64,
            data,
        }
    }

    /// Reject bodies whose declared length exceeds the 32-bit bound. Oversize
    /// is a rejection, never a silent truncation.
    pub fn check_bound(&self) -> Result<(), TranslationError> {
        match self {
            Self::Text(_) => Ok(()),
            Self::Binary { declared_len, .. } if *declared_len > MAX_BINARY_BODY_BYTES => {
                Err(TranslationError::OversizeBody(*declared_len))
            }
            Self::Binary { .. } => Ok(()),
        }
    }

    pub fn as_utf8(&self) -> Result<Cow<'_, str>, TranslationError> {
        match self {
            Self::Text(text) => Ok(Cow::Borrowed(text)),
            Self::Binary { data, .. } => std::str::from_utf8(data)
                .map(Cow::Borrowed)
                .map_err(|_| TranslationError::NonUtf8Body),
        }
    }
}

/// One message delivered by the external transport driver.
#[derive(Debug, Clone)]
pub struct ExternalMessage {
    pub headers: HashMap<String, String>,
    pub body: MessageBody,
}

impl ExternalMessage {
    pub fn new(headers: HashMap<String, String>, body: MessageBody) -> Self {
        Self { headers, body }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(HEADER_CONTENT_TYPE).map(String::as_str)
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.headers.get(HEADER_CORRELATION_ID).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_constructor_records_length() {
        let body = MessageBody::binary(vec![1u8, 2, 3]);
        match &body {
            MessageBody::Binary { declared_len, data } => {
                assert_eq!(*declared_len, 3);
                assert_eq!(data.as_ref(), &[1, 2, 3]);
            }
            MessageBody::Text(_) => panic!("expected binary body"),
        }
        assert!(body.check_bound().is_ok());
    }

    #[test]
    fn oversize_declared_length_is_rejected() {
        let body = MessageBody::Binary {
            data: Bytes::from_static(b"tiny"),
            declared_len: MAX_BINARY_BODY_BYTES + 1,
        };
        assert!(matches!(
            body.check_bound(),
            Err(TranslationError::OversizeBody(_))
        ));
    }

    #[test]
    fn binary_utf8_round_trip() {
        let body = MessageBody::binary(&b"{\"a\":1}"[..]);
        assert_eq!(body.as_utf8().unwrap(), "{\"a\":1}");
        let broken = MessageBody::binary(vec![0xff, 0xfe]);
        assert!(matches!(
            broken.as_utf8(),
            Err(TranslationError::NonUtf8Body)
        ));
    }
}
