use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// When disabled, each export runs to completion on the caller's task.
    pub enabled: bool,
    pub num_consumers: usize,
    pub queue_size: usize,
    /// Producers await the terminal outcome instead of returning after enqueue.
    pub wait_for_result: bool,
    #[serde(with = "super::serde_helpers")]
    pub shutdown_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            num_consumers: 10,
            queue_size: 5000,
            wait_for_result: false,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub enabled: bool,
    #[serde(with = "super::serde_helpers")]
    pub initial_interval: Duration,
    pub randomization_factor: f64,
    pub multiplier: f64,
    #[serde(with = "super::serde_helpers")]
    pub max_interval: Duration,
    /// Zero means no time limit.
    #[serde(with = "super::serde_helpers")]
    pub max_elapsed_time: Duration,
    pub max_attempts: Option<u32>,
    /// Used for 429/503 responses without a usable `Retry-After`.
    #[serde(with = "super::serde_helpers")]
    pub default_throttle_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_interval: Duration::from_secs(5),
            randomization_factor: 0.5,
            multiplier: 1.5,
            max_interval: Duration::from_secs(30),
            max_elapsed_time: Duration::from_secs(300),
            max_attempts: None,
            default_throttle_delay: Duration::ZERO,
        }
    }
}
