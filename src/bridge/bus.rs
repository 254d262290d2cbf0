//! Seams to the internal pub/sub fabric and the transport acknowledgment path.
//!
//! The fabric itself (cluster membership, delivery) lives outside this crate;
//! the bridge only needs an addressed fire-and-forget send and a reply handle
//! that reaches the original caller directly.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::messaging::protocol::{CommandResponse, DomainCommand};

/// Receipt returned to the transport-level sender once a message is consumed,
/// regardless of translation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Receipt;

/// A unit of traffic addressed to a connection; carries request-scoped
/// headers alongside an opaque payload.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub headers: HashMap<String, String>,
    pub payload: Value,
}

/// Where replies to bridged traffic are delivered. Cloned into workers so the
/// worker answers the original caller directly, without passing back through
/// the supervisor.
pub type ReplyHandle = mpsc::UnboundedSender<CommandResponse>;

/// One send into the internal pub/sub fabric.
#[derive(Debug, Clone)]
pub struct BusSend {
    pub target: String,
    pub command: DomainCommand,
    /// Request at-least-once delivery acknowledgment from the bus layer.
    pub at_least_once: bool,
}

#[derive(Debug, Error)]
#[error("internal bus is closed")]
pub struct BusClosed;

/// Dispatch handle into the fabric. Channel-backed so the hosting process (or
/// a test) decides what consumes the sends.
#[derive(Clone)]
pub struct CommandBus {
    tx: mpsc::UnboundedSender<BusSend>,
}

impl CommandBus {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BusSend>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(
        &self,
        target: &str,
        command: DomainCommand,
        at_least_once: bool,
    ) -> Result<(), BusClosed> {
        self.tx
            .send(BusSend {
                target: target.to_string(),
                command,
                at_least_once,
            })
            .map_err(|_| BusClosed)
    }
}
