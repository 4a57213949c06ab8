use std::time::Duration;

use backon::ExponentialBuilder;

/// Default number of attempts, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default delay before the first retry.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1_000;
/// Default cap on the delay between attempts.
pub const DEFAULT_MAX_DELAY_MS: u64 = 60_000;
/// Default delay multiplier.
pub const DEFAULT_FACTOR: f32 = 2.0;

/// Retry schedule for one unit of work.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Attempts never exceed this, the first one included.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each wait.
    pub factor: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            factor: DEFAULT_FACTOR,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with custom values.
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration, factor: f32) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            factor,
        }
    }

    /// Build the delay schedule, without jitter.
    ///
    /// The builder yields up to `max_attempts` delays: `initial_delay`, then
    /// each previous delay times `factor`, capped at `max_delay`. The manager
    /// stops on the attempt count, so the last delay is only used by work
    /// that waits before its first attempt.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.factor.max(1.0))
            .with_max_times(self.max_attempts as usize)
    }
}
