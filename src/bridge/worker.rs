//! Worker-side seams. A supervisor owns exactly one worker per connection:
//! it creates the worker through a factory, forwards traffic to it, and
//! watches its task for termination.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bridge::bus::{BusMessage, ReplyHandle};
use crate::bridge::id::ConnectionId;
use thiserror::Error;

/// Traffic forwarded verbatim to the worker with the original reply handle
/// preserved, so the worker's answer reaches the true caller directly.
#[derive(Debug)]
pub struct WorkerTraffic {
    pub message: BusMessage,
    pub reply: ReplyHandle,
}

/// Broad categories of worker execution faults, fed to the supervisor's
/// classification. Kinds mirror the fault surface of a protocol driver:
/// transient runtime faults, missing internal state, checked driver and
/// naming/lookup failures, explicit kills, and everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerFaultKind {
    TransientDriver,
    MissingState,
    Driver,
    Naming,
    Killed,
    Unclassified,
}

/// Generic fault description: kind plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFault {
    pub kind: WorkerFaultKind,
    pub message: String,
}

impl WorkerFault {
    pub fn new(kind: WorkerFaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for WorkerFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Lifecycle signals a running worker sends to its supervisor.
#[derive(Debug)]
pub enum WorkerEvent {
    /// Sent once after the worker has confirmed healthy operation; zeroes the
    /// supervisor's restart counting.
    ManualReset,
    /// A fault raised during execution while the worker task is still alive.
    Fault(WorkerFault),
}

/// How the worker task ended. `Ok` is a clean stop; either way the supervisor
/// treats an unrequested exit as abnormal termination.
pub type WorkerExit = Result<(), WorkerFault>;

/// Handle to a spawned worker: its traffic inbox plus the join handle the
/// supervisor watches for termination.
#[derive(Debug)]
pub struct WorkerHandle {
    pub traffic: mpsc::UnboundedSender<WorkerTraffic>,
    pub join: JoinHandle<WorkerExit>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("could not create worker for connection '{connection_id}': {reason}")]
pub struct WorkerSpawnError {
    pub connection_id: String,
    pub reason: String,
}

/// Produces the per-connection protocol worker. The factory decides the
/// worker implementation from the identity's type prefix.
pub trait WorkerFactory: Send + Sync + 'static {
    /// Cheap validation hook run at supervisor construction; reject
    /// identities the factory cannot produce workers for.
    fn validate(&self, _id: &ConnectionId) -> Result<(), WorkerSpawnError> {
        Ok(())
    }

    /// Spawn the worker. `events` is the worker-to-supervisor lifecycle
    /// channel (manual reset, fault reports).
    fn spawn_worker(
        &self,
        id: &ConnectionId,
        events: mpsc::UnboundedSender<WorkerEvent>,
    ) -> Result<WorkerHandle, WorkerSpawnError>;
}
