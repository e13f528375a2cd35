//! Configuration options for attribute-store operations.

use std::time::Duration;

/// Configuration for constructing a [`Domain`](crate::Domain) or
/// [`Partitions`](crate::Partitions).
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Retry and backoff policy applied to every remote call.
    pub retry: RetryConfig,
}

/// Retry and exponential backoff policy for transient service failures.
///
/// Only transient failures ("service temporarily unavailable") are retried;
/// permanent rejections propagate immediately.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts for one logical request, including the
    /// first. Must be at least 1.
    pub max_attempts: u32,

    /// Delay before the first retry. Doubles after each retry.
    pub base_delay: Duration,

    /// Upper bound on the computed delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(20),
        }
    }
}
