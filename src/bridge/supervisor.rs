//! Supervision of one connection worker: create, watch, restart with
//! exponential backoff, and fail fast while the worker is down.
//!
//! The supervisor is a sequential actor: one task, one inbox, no internal
//! parallelism. Worker starts happen only at supervisor startup or from the
//! serialized scheduled-restart timer, so no restart races are possible.
//! While the worker is down, traffic is answered immediately with a
//! `connection unavailable` error instead of being queued.

use std::pin::Pin;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Sleep;

use crate::bridge::backoff::{JitterSource, RestartBackoff, ThreadRngJitter};
use crate::bridge::bus::{BusMessage, ReplyHandle};
use crate::bridge::fault::{classify, FaultKind};
use crate::bridge::id::{ConnectionId, ConnectionIdError};
use crate::bridge::worker::{
    WorkerEvent, WorkerExit, WorkerFactory, WorkerFault, WorkerFaultKind, WorkerHandle,
    WorkerSpawnError, WorkerTraffic,
};
use crate::core::time::Clock;
use thiserror::Error;

/// Traffic addressed to the supervised connection. `from_worker` marks
/// messages originating from the worker itself, which are surfaced as
/// unhandled instead of being echoed back to it.
#[derive(Debug)]
pub struct Deliver {
    pub message: BusMessage,
    pub reply: ReplyHandle,
    pub from_worker: bool,
}

impl Deliver {
    pub fn new(message: BusMessage, reply: ReplyHandle) -> Self {
        Self {
            message,
            reply,
            from_worker: false,
        }
    }

    /// Traffic the worker sent back to its own supervisor; surfaced as
    /// unhandled instead of being forwarded to the worker again.
    pub fn from_worker(message: BusMessage, reply: ReplyHandle) -> Self {
        Self {
            message,
            reply,
            from_worker: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Id(#[from] ConnectionIdError),
    #[error(transparent)]
    Worker(#[from] WorkerSpawnError),
}

/// Running supervisor handle: the traffic inbox plus the join handle that
/// resolves with an escalated fault, if one ever occurs.
pub struct SupervisorHandle {
    pub traffic: mpsc::UnboundedSender<Deliver>,
    pub join: JoinHandle<Result<(), WorkerFault>>,
}

/// Owns and restarts exactly one worker for one connection identity.
pub struct ConnectionSupervisor<F: WorkerFactory, C: Clock> {
    connection_id: ConnectionId,
    backoff: RestartBackoff,
    factory: F,
    clock: C,
    jitter: Box<dyn JitterSource>,
    child_traffic: Option<mpsc::UnboundedSender<WorkerTraffic>>,
    restart_count: u32,
}

impl<F: WorkerFactory, C: Clock> ConnectionSupervisor<F, C> {
    /// Construction fails fast on a malformed identity or an identity the
    /// factory cannot produce workers for.
    pub fn new(
        connection_id: &str,
        backoff: RestartBackoff,
        factory: F,
        clock: C,
    ) -> Result<Self, SupervisorError> {
        let connection_id = ConnectionId::parse(connection_id)?;
        factory.validate(&connection_id)?;
        Ok(Self {
            connection_id,
            backoff,
            factory,
            clock,
            jitter: Box::new(ThreadRngJitter),
            child_traffic: None,
            restart_count: 0,
        })
    }

    /// Replace the jitter source; used by tests that need deterministic
    /// restart delays.
    pub fn with_jitter(mut self, jitter: impl JitterSource + 'static) -> Self {
        self.jitter = Box::new(jitter);
        self
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    pub fn spawn(self) -> SupervisorHandle {
        let (traffic, inbox) = mpsc::unbounded_channel();
        let join = tokio::spawn(self.run(inbox));
        SupervisorHandle { traffic, join }
    }

    /// Drive the supervisor until its owner drops the inbox or an
    /// unclassified worker fault escalates.
    pub async fn run(
        mut self,
        mut inbox: mpsc::UnboundedReceiver<Deliver>,
    ) -> Result<(), WorkerFault> {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let mut child_join: Option<JoinHandle<WorkerExit>> = None;
        let mut pending_restart: Option<Pin<Box<Sleep>>> = None;
        if !self.start_child(&events_tx, &mut child_join) {
            self.on_child_terminated(&mut pending_restart);
        }

        loop {
            tokio::select! {
                maybe_deliver = inbox.recv() => match maybe_deliver {
                    Some(deliver) => self.handle_traffic(deliver),
                    // Owner dropped the inbox; shut down quietly.
                    None => {
                        self.abort_child(&mut child_join);
                        return Ok(());
                    }
                },
                Some(event) = events_rx.recv() => {
                    if let Some(fault) = self.handle_worker_event(
                        event,
                        &events_tx,
                        &mut child_join,
                        &mut pending_restart,
                    ) {
                        return Err(fault);
                    }
                },
                exit = Self::child_exit(child_join.as_mut()), if child_join.is_some() => {
                    child_join = None;
                    self.child_traffic = None;
                    if let Err(fault) = &exit {
                        if classify(fault) == FaultKind::Escalate {
                            tracing::error!(
                                "worker for connection '{}' failed with unclassified fault, escalating: {}",
                                self.connection_id,
                                fault
                            );
                            return Err(fault.clone());
                        }
                        tracing::info!(
                            "worker for connection '{}' terminated with fault: {}",
                            self.connection_id,
                            fault
                        );
                    }
                    self.on_child_terminated(&mut pending_restart);
                },
                () = Self::restart_due(pending_restart.as_mut()), if pending_restart.is_some() => {
                    pending_restart = None;
                    if !self.start_child(&events_tx, &mut child_join) {
                        self.on_child_terminated(&mut pending_restart);
                    }
                },
            }
        }
    }

    async fn child_exit(join: Option<&mut JoinHandle<WorkerExit>>) -> WorkerExit {
        match join {
            Some(handle) => match handle.await {
                Ok(exit) => exit,
                Err(join_err) => Err(WorkerFault::new(
                    WorkerFaultKind::Killed,
                    format!("worker task ended abnormally: {join_err}"),
                )),
            },
            None => std::future::pending().await,
        }
    }

    async fn restart_due(sleep: Option<&mut Pin<Box<Sleep>>>) {
        match sleep {
            Some(sleep) => sleep.as_mut().await,
            None => std::future::pending().await,
        }
    }

    /// Idempotent: a no-op when a worker already exists. Returns whether a
    /// worker is present afterwards; spawn failures count as abnormal
    /// terminations and the caller schedules the backoff retry.
    fn start_child(
        &mut self,
        events: &mpsc::UnboundedSender<WorkerEvent>,
        join_slot: &mut Option<JoinHandle<WorkerExit>>,
    ) -> bool {
        if self.child_traffic.is_some() {
            return true;
        }
        tracing::debug!("starting worker for connection '{}'", self.connection_id);
        match self.factory.spawn_worker(&self.connection_id, events.clone()) {
            Ok(WorkerHandle { traffic, join }) => {
                self.child_traffic = Some(traffic);
                *join_slot = Some(join);
                true
            }
            Err(err) => {
                tracing::error!(
                    "could not start worker for connection '{}': {}",
                    self.connection_id,
                    err
                );
                false
            }
        }
    }

    fn abort_child(&mut self, join_slot: &mut Option<JoinHandle<WorkerExit>>) {
        self.child_traffic = None;
        if let Some(join) = join_slot.take() {
            join.abort();
        }
    }

    fn on_child_terminated(&mut self, pending_restart: &mut Option<Pin<Box<Sleep>>>) {
        tracing::info!(
            "worker for connection '{}' terminated abnormally",
            self.connection_id
        );
        let delay = self.backoff.delay(self.restart_count, self.jitter.as_mut());
        tracing::debug!(
            "scheduling worker restart for connection '{}' in {:?} (restart {})",
            self.connection_id,
            delay,
            self.restart_count
        );
        *pending_restart = Some(Box::pin(self.clock.sleep(delay)));
        self.restart_count += 1;
    }

    fn handle_worker_event(
        &mut self,
        event: WorkerEvent,
        events_tx: &mpsc::UnboundedSender<WorkerEvent>,
        child_join: &mut Option<JoinHandle<WorkerExit>>,
        pending_restart: &mut Option<Pin<Box<Sleep>>>,
    ) -> Option<WorkerFault> {
        match event {
            WorkerEvent::ManualReset => {
                tracing::debug!(
                    "worker for connection '{}' reported healthy, resetting restart count",
                    self.connection_id
                );
                self.restart_count = 0;
                None
            }
            WorkerEvent::Fault(fault) => match classify(&fault) {
                FaultKind::Resume => {
                    tracing::info!(
                        "resuming worker for connection '{}' after transient fault: {}",
                        self.connection_id,
                        fault
                    );
                    None
                }
                FaultKind::Restart => {
                    tracing::info!(
                        "restarting worker for connection '{}' in place: {}",
                        self.connection_id,
                        fault
                    );
                    self.abort_child(child_join);
                    if !self.start_child(events_tx, child_join) {
                        self.on_child_terminated(pending_restart);
                    }
                    None
                }
                FaultKind::Stop => {
                    tracing::info!(
                        "stopping worker for connection '{}': {}",
                        self.connection_id,
                        fault
                    );
                    self.abort_child(child_join);
                    self.on_child_terminated(pending_restart);
                    None
                }
                FaultKind::Escalate => {
                    tracing::error!(
                        "escalating unclassified worker fault for connection '{}': {}",
                        self.connection_id,
                        fault
                    );
                    self.abort_child(child_join);
                    Some(fault)
                }
            },
        }
    }

    fn handle_traffic(&mut self, deliver: Deliver) {
        match &self.child_traffic {
            Some(traffic) => {
                if deliver.from_worker {
                    tracing::warn!(
                        "received unhandled message from worker for connection '{}'",
                        self.connection_id
                    );
                    return;
                }
                if let Err(rejected) = traffic.send(WorkerTraffic {
                    message: deliver.message,
                    reply: deliver.reply,
                }) {
                    // The worker task is gone but its exit has not been
                    // observed yet; answer as if down rather than dropping.
                    let WorkerTraffic { message, reply } = rejected.0;
                    self.answer_unavailable(message, &reply);
                }
            }
            None => {
                tracing::warn!(
                    "message for connection '{}' received during worker downtime",
                    self.connection_id
                );
                self.answer_unavailable(deliver.message, &deliver.reply);
            }
        }
    }

    fn answer_unavailable(&self, message: BusMessage, reply: &ReplyHandle) {
        let error = crate::messaging::protocol::DomainError::connection_unavailable(
            &self.connection_id,
            message.headers,
        );
        let _ = reply.send(error.to_error_response());
    }
}
