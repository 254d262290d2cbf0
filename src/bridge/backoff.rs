//! Restart delay computation for supervised connection workers.

use std::time::Duration;

use rand::Rng;
use thiserror::Error;

/// Restart counts at or beyond this threshold skip the exponential term and
/// return the maximum directly; larger exponents overflow Duration math.
const OVERFLOW_GUARD: u32 = 30;

/// Uniform draw in [0, 1) feeding the backoff jitter multiplier.
///
/// Production draws from the thread-local RNG; tests inject a fixed source to
/// make delays reproducible.
pub trait JitterSource: Send {
    fn draw(&mut self) -> f64;
}

/// Thread-local-RNG-backed jitter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngJitter;

impl JitterSource for ThreadRngJitter {
    fn draw(&mut self) -> f64 {
        rand::rng().random::<f64>()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BackoffConfigError {
    #[error("max_backoff {max:?} must not be below min_backoff {min:?}")]
    MaxBelowMin { min: Duration, max: Duration },
    #[error("random_factor {0} must lie within [0, 1]")]
    RandomFactorOutOfRange(f64),
}

/// Exponential restart backoff with multiplicative jitter.
///
/// `delay(n) = min(max_backoff, min_backoff * 2^n * (1 + draw * random_factor))`,
/// saturating at `max_backoff` once the restart count reaches the overflow
/// guard. The jitter multiplier is at least 1, so the result never drops
/// below `min_backoff`.
#[derive(Debug, Clone)]
pub struct RestartBackoff {
    min_backoff: Duration,
    max_backoff: Duration,
    random_factor: f64,
}

impl RestartBackoff {
    pub fn new(
        min_backoff: Duration,
        max_backoff: Duration,
        random_factor: f64,
    ) -> Result<Self, BackoffConfigError> {
        if max_backoff < min_backoff {
            return Err(BackoffConfigError::MaxBelowMin {
                min: min_backoff,
                max: max_backoff,
            });
        }
        if !(0.0..=1.0).contains(&random_factor) {
            return Err(BackoffConfigError::RandomFactorOutOfRange(random_factor));
        }
        Ok(Self {
            min_backoff,
            max_backoff,
            random_factor,
        })
    }

    pub fn min_backoff(&self) -> Duration {
        self.min_backoff
    }

    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    /// Delay to impose before restart attempt `restart_count`.
    pub fn delay(&self, restart_count: u32, jitter: &mut dyn JitterSource) -> Duration {
        if restart_count >= OVERFLOW_GUARD {
            return self.max_backoff;
        }
        let rnd = 1.0 + jitter.draw() * self.random_factor;
        let nanos = self.min_backoff.as_nanos() as f64 * 2f64.powi(restart_count as i32) * rnd;
        let capped = nanos.min(self.max_backoff.as_nanos() as f64);
        Duration::from_nanos(capped as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedJitter(f64);

    impl JitterSource for FixedJitter {
        fn draw(&mut self) -> f64 {
            self.0
        }
    }

    fn backoff(min_ms: u64, max_ms: u64, factor: f64) -> RestartBackoff {
        RestartBackoff::new(
            Duration::from_millis(min_ms),
            Duration::from_millis(max_ms),
            factor,
        )
        .unwrap()
    }

    #[test]
    fn delay_stays_within_bounds_for_all_counts() {
        let policy = backoff(100, 10_000, 0.5);
        let mut jitter = ThreadRngJitter;
        for n in 0..64 {
            let delay = policy.delay(n, &mut jitter);
            assert!(delay >= policy.min_backoff(), "n={n} delay={delay:?}");
            assert!(delay <= policy.max_backoff(), "n={n} delay={delay:?}");
        }
    }

    #[test]
    fn delay_doubles_without_jitter() {
        let policy = backoff(100, 100_000, 0.0);
        let mut jitter = FixedJitter(0.0);
        assert_eq!(policy.delay(0, &mut jitter), Duration::from_millis(100));
        assert_eq!(policy.delay(1, &mut jitter), Duration::from_millis(200));
        assert_eq!(policy.delay(2, &mut jitter), Duration::from_millis(400));
        assert_eq!(policy.delay(5, &mut jitter), Duration::from_millis(3_200));
    }

    #[test]
    fn delay_saturates_at_max() {
        let policy = backoff(100, 1_000, 0.0);
        let mut jitter = FixedJitter(0.0);
        // 100ms * 2^4 = 1600ms > max
        assert_eq!(policy.delay(4, &mut jitter), Duration::from_millis(1_000));
        assert_eq!(policy.delay(20, &mut jitter), Duration::from_millis(1_000));
    }

    #[test]
    fn overflow_guard_short_circuits_to_max() {
        let policy = backoff(1, 3_600_000, 1.0);
        let mut jitter = FixedJitter(0.999);
        assert_eq!(policy.delay(30, &mut jitter), policy.max_backoff());
        assert_eq!(policy.delay(u32::MAX, &mut jitter), policy.max_backoff());
    }

    #[test]
    fn jitter_raises_delay_by_at_most_factor() {
        let policy = backoff(100, 100_000, 0.2);
        let mut low = FixedJitter(0.0);
        let mut high = FixedJitter(1.0);
        let base = policy.delay(3, &mut low);
        let jittered = policy.delay(3, &mut high);
        assert_eq!(base, Duration::from_millis(800));
        assert_eq!(jittered, Duration::from_millis(960));
    }

    #[test]
    fn reset_count_computes_initial_delay_again() {
        let policy = backoff(250, 60_000, 0.0);
        let mut jitter = FixedJitter(0.0);
        let after_history = policy.delay(7, &mut jitter);
        assert!(after_history > policy.min_backoff());
        // After a manual reset the supervisor computes with n = 0 again.
        assert_eq!(policy.delay(0, &mut jitter), Duration::from_millis(250));
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(RestartBackoff::new(
            Duration::from_secs(10),
            Duration::from_secs(1),
            0.0
        )
        .is_err());
        assert!(RestartBackoff::new(
            Duration::from_secs(1),
            Duration::from_secs(10),
            1.5
        )
        .is_err());
        assert!(RestartBackoff::new(
            Duration::from_secs(1),
            Duration::from_secs(10),
            f64::NAN
        )
        .is_err());
    }
}
