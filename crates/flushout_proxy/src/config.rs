//! Configuration for sync clients.

use rand::Rng;
use std::time::Duration;

/// Configuration for a [`SyncClient`](crate::SyncClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Retry configuration for backend calls.
    pub retry: RetryConfig,
    /// Whether to rebuild the proxy from a fresh snapshot when a flush
    /// reports remapped ids or an error.
    pub auto_resync: bool,
}

impl ClientConfig {
    /// Creates a client configuration with default retries.
    pub fn new() -> Self {
        Self {
            retry: RetryConfig::default(),
            auto_resync: true,
        }
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Enables or disables automatic resynchronization.
    pub fn with_auto_resync(mut self, enabled: bool) -> Self {
        self.auto_resync = enabled;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// How a [`SyncClient`](crate::SyncClient) retries backend calls that
/// fail with a retryable transport error.
///
/// Covers both snapshot fetches and flush deliveries. A flush that runs
/// out of attempts stays in flight and is resent by the next
/// [`flush`](crate::SyncClient::flush), so `max_attempts` bounds a single
/// call, not the life of a batch.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Calls made per operation, the first one included. `1` disables retries.
    pub max_attempts: u32,
    /// Pause before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any pause, before jitter.
    pub max_delay: Duration,
    /// Factor applied to the pause after every failed retry.
    pub backoff_multiplier: f64,
    /// Spread pauses by up to a quarter so clients sharing a master do
    /// not retry in lockstep.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Allows `max_attempts` calls with doubling pauses from 100ms up to 30s.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// A single call; transport errors surface immediately.
    pub fn no_retry() -> Self {
        Self::new(1).with_jitter(false)
    }

    /// Sets the pause before the first retry.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Caps every pause at `delay`.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the growth factor between pauses.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Turns jitter on or off.
    pub fn with_jitter(mut self, enabled: bool) -> Self {
        self.add_jitter = enabled;
        self
    }

    /// Pause before call number `attempt`, counting from 0.
    ///
    /// The first call never waits.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let Some(retry) = attempt.checked_sub(1) else {
            return Duration::ZERO;
        };

        // Cap before building the Duration; late attempts overflow it otherwise
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let secs = (self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent))
            .min(self.max_delay.as_secs_f64());

        let spread = if self.add_jitter {
            1.0 + rand::thread_rng().gen_range(0.0..=0.25)
        } else {
            1.0
        };
        Duration::from_secs_f64(secs * spread)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_config_builder() {
        let config = ClientConfig::new()
            .with_retry(RetryConfig::no_retry())
            .with_auto_resync(false);

        assert_eq!(config.retry.max_attempts, 1);
        assert_eq!(config.retry.delay_for_attempt(0), Duration::ZERO);
        assert!(!config.auto_resync);
        assert!(ClientConfig::default().auto_resync);
    }

    #[test]
    fn retry_delay_calculation() {
        let config = RetryConfig::new(5)
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0);

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);

        let delay1 = config.delay_for_attempt(1);
        assert!(delay1 >= Duration::from_millis(100));
        assert!(delay1 <= Duration::from_millis(125));

        let delay2 = config.delay_for_attempt(2);
        assert!(delay2 >= Duration::from_millis(200));
    }

    #[test]
    fn retry_delay_without_jitter_is_exact() {
        let config = RetryConfig::new(4)
            .with_initial_delay(Duration::from_millis(10))
            .with_jitter(false);

        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(10));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(40));
    }

    #[test]
    fn retry_delay_respects_max() {
        let config = RetryConfig::new(10)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
            .with_backoff_multiplier(10.0);

        let delay = config.delay_for_attempt(5);
        assert!(delay <= Duration::from_millis(6250));
    }

    #[test]
    fn late_attempts_wait_max_delay() {
        let config = RetryConfig::new(u32::MAX).with_jitter(false);
        assert_eq!(config.delay_for_attempt(500), Duration::from_secs(30));
    }
}
