use chrono::{DateTime, Duration, Utc};

/// Backoff parameters for [`CircuitBreaker`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakerPolicy {
    /// Ceiling for the consecutive failure counter.
    pub max_failures: u32,
    /// Cool-down after the first failure; doubles with each further one.
    pub base_backoff: Duration,
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self {
            max_failures: 5,
            base_backoff: Duration::minutes(1),
        }
    }
}

impl BreakerPolicy {
    /// Cool-down after `failures` consecutive failures:
    /// `base * 2^(failures - 1)`, so 1, 2, 4, 8, 16 minutes with the defaults.
    /// Saturates at `Duration::MAX` instead of overflowing.
    pub fn backoff(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::zero();
        }
        let factor = 1i32 << (failures - 1).min(30);
        self.base_backoff.checked_mul(factor).unwrap_or(Duration::MAX)
    }
}

/// Gate in front of the network tier.
///
/// Holds only counters; the caller supplies `now` so the breaker never
/// touches a clock or performs I/O.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    policy: BreakerPolicy,
    consecutive_failures: u32,
    reset_at: DateTime<Utc>,
}

impl CircuitBreaker {
    pub fn new(policy: BreakerPolicy) -> Self {
        Self {
            policy,
            consecutive_failures: 0,
            reset_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    /// `false` while failures are recorded and the cool-down has not elapsed.
    /// Once it has, the counter is cleared and a fresh attempt is allowed.
    pub fn allow_attempt(&mut self, now: DateTime<Utc>) -> bool {
        if self.consecutive_failures == 0 {
            return true;
        }
        if now < self.reset_at {
            return false;
        }
        self.consecutive_failures = 0;
        true
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.consecutive_failures = (self.consecutive_failures + 1).min(self.policy.max_failures);
        self.reset_at = now
            .checked_add_signed(self.policy.backoff(self.consecutive_failures))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn reset_at(&self) -> DateTime<Utc> {
        self.reset_at
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.consecutive_failures > 0 && now < self.reset_at
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerPolicy::default())
    }
}
