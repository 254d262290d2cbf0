//! Closed classification of worker execution faults.

use crate::bridge::worker::{WorkerFault, WorkerFaultKind};

/// Supervisor reaction to a worker fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Absorb the fault; the worker keeps running.
    Resume,
    /// Replace the worker in place, without backoff or restart counting.
    Restart,
    /// Terminate the worker and enter the backoff restart path.
    Stop,
    /// Propagate to the supervisor's own owner; not absorbed.
    Escalate,
}

/// Pure classification from a generic fault description. Transient driver
/// runtime faults are absorbed; missing-state faults restart the worker in
/// place; checked driver faults, naming/lookup faults, and explicit kills
/// stop it; everything unclassified escalates.
pub fn classify(fault: &WorkerFault) -> FaultKind {
    match fault.kind {
        WorkerFaultKind::TransientDriver => FaultKind::Resume,
        WorkerFaultKind::MissingState => FaultKind::Restart,
        WorkerFaultKind::Driver | WorkerFaultKind::Naming | WorkerFaultKind::Killed => {
            FaultKind::Stop
        }
        WorkerFaultKind::Unclassified => FaultKind::Escalate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_table() {
        let cases = [
            (WorkerFaultKind::TransientDriver, FaultKind::Resume),
            (WorkerFaultKind::MissingState, FaultKind::Restart),
            (WorkerFaultKind::Driver, FaultKind::Stop),
            (WorkerFaultKind::Naming, FaultKind::Stop),
            (WorkerFaultKind::Killed, FaultKind::Stop),
            (WorkerFaultKind::Unclassified, FaultKind::Escalate),
        ];
        for (kind, expected) in cases {
            let fault = WorkerFault::new(kind, "boom");
            assert_eq!(classify(&fault), expected, "{kind:?}");
        }
    }
}
