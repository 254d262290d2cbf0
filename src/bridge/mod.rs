//! The bridge core: connection supervision and command processing.

pub mod backoff;
pub mod bus;
pub mod fault;
pub mod id;
pub mod processor;
pub mod supervisor;
pub mod worker;

pub use backoff::{BackoffConfigError, JitterSource, RestartBackoff, ThreadRngJitter};
pub use bus::{BusMessage, BusSend, CommandBus, Receipt, ReplyHandle};
pub use fault::{classify, FaultKind};
pub use id::{ConnectionId, ConnectionIdError};
pub use processor::{CommandProcessor, ProcessorHandle, ProcessorMsg};
pub use supervisor::{ConnectionSupervisor, Deliver, SupervisorError, SupervisorHandle};
pub use worker::{
    WorkerEvent, WorkerExit, WorkerFactory, WorkerFault, WorkerFaultKind, WorkerHandle,
    WorkerSpawnError, WorkerTraffic,
};
