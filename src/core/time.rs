use std::time::{Duration, Instant};

/// Clock abstraction so trace lifetimes and restart timers stay testable.
///
/// `now` feeds correlation TTL bookkeeping; `sleep` backs the scheduled
/// restart delay of a supervisor and must be a tokio timer so it is driven
/// inside `select!` loops and respects paused test time.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration) -> tokio::time::Sleep;
}

/// System-backed clock used everywhere outside of tests.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> tokio::time::Sleep {
        tokio::time::sleep(duration)
    }
}
