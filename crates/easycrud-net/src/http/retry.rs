//! Retry timing shared by the watchdog and transport retry policies.

use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier applied to the delay after each retry. `1.0` is a fixed delay.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(1))
    }
}

impl RetryConfig {
    /// Same delay before every retry.
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        Self {
            max_retries,
            initial_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
            backoff_multiplier: 1.0,
        }
    }

    /// Exponential backoff starting at `initial`, capped at `max`.
    pub fn exponential(max_retries: u32, initial: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            max_retries,
            initial_delay_ms: u64::try_from(initial.as_millis()).unwrap_or(u64::MAX),
            max_delay_ms: u64::try_from(max.as_millis()).unwrap_or(u64::MAX),
            backoff_multiplier: multiplier,
        }
    }

    /// Delay before the first retry.
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Delay following `current`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let next = current.mul_f64(self.backoff_multiplier);
        next.min(Duration::from_millis(self.max_delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay_never_grows() {
        let config = RetryConfig::fixed(3, Duration::from_millis(250));
        let first = config.initial_delay();
        assert_eq!(first, Duration::from_millis(250));
        assert_eq!(config.next_delay(first), first);
    }

    #[test]
    fn test_exponential_is_capped() {
        let config = RetryConfig::exponential(
            5,
            Duration::from_millis(100),
            Duration::from_millis(300),
            2.0,
        );
        let d1 = config.next_delay(config.initial_delay());
        assert_eq!(d1, Duration::from_millis(200));
        assert_eq!(config.next_delay(d1), Duration::from_millis(300));
    }
}
