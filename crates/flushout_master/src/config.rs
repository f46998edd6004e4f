//! Master configuration.

/// How the master treats a batch built against an outdated command count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StaleBatchPolicy {
    /// Apply the batch anyway; later commands win per entry.
    #[default]
    Ignore,
    /// Reject the batch unless its base count equals the master's count.
    Reject,
}

/// Configuration for a [`Master`](crate::Master).
#[derive(Debug, Clone)]
pub struct MasterConfig {
    /// Maximum number of commands accepted in one batch.
    pub max_batch_commands: usize,
    /// Handling of batches with an outdated base command count.
    pub stale_batch_policy: StaleBatchPolicy,
}

impl MasterConfig {
    /// Creates a configuration with default limits.
    pub fn new() -> Self {
        Self {
            max_batch_commands: 10_000,
            stale_batch_policy: StaleBatchPolicy::Ignore,
        }
    }

    /// Sets the maximum batch size.
    pub fn with_max_batch_commands(mut self, max: usize) -> Self {
        self.max_batch_commands = max;
        self
    }

    /// Sets the stale batch policy.
    pub fn with_stale_batch_policy(mut self, policy: StaleBatchPolicy) -> Self {
        self.stale_batch_policy = policy;
        self
    }
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = MasterConfig::default();
        assert_eq!(config.max_batch_commands, 10_000);
        assert_eq!(config.stale_batch_policy, StaleBatchPolicy::Ignore);
    }

    #[test]
    fn config_builder() {
        let config = MasterConfig::new()
            .with_max_batch_commands(2)
            .with_stale_batch_policy(StaleBatchPolicy::Reject);

        assert_eq!(config.max_batch_commands, 2);
        assert_eq!(config.stale_batch_policy, StaleBatchPolicy::Reject);
    }
}
