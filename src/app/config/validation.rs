use super::{Config, ConfigError};

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidConfig(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if self.signals.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "At least one signal must be enabled".to_string(),
            ));
        }

        if self.queue.enabled {
            if self.queue.num_consumers == 0 {
                return Err(ConfigError::InvalidConfig(
                    "Queue consumers must be greater than 0".to_string(),
                ));
            }
            if self.queue.queue_size == 0 {
                return Err(ConfigError::InvalidConfig(
                    "Queue size must be greater than 0".to_string(),
                ));
            }
        }

        let retry = &self.retry;
        if retry.enabled {
            if retry.initial_interval.is_zero() {
                return Err(ConfigError::InvalidConfig(
                    "Retry initial interval must be greater than 0".to_string(),
                ));
            }
            if retry.max_interval < retry.initial_interval {
                return Err(ConfigError::InvalidConfig(format!(
                    "Retry max interval ({:?}) must be at least the initial interval ({:?})",
                    retry.max_interval, retry.initial_interval
                )));
            }
            if retry.multiplier.is_nan() || retry.multiplier < 1.0 {
                return Err(ConfigError::InvalidConfig(format!(
                    "Retry multiplier must be at least 1.0, got {}",
                    retry.multiplier
                )));
            }
            if !(0.0..=1.0).contains(&retry.randomization_factor) {
                return Err(ConfigError::InvalidConfig(format!(
                    "Retry randomization factor must be within [0, 1], got {}",
                    retry.randomization_factor
                )));
            }
            if retry.max_attempts == Some(0) {
                return Err(ConfigError::InvalidConfig(
                    "Retry max attempts must be greater than 0".to_string(),
                ));
            }
        }

        self.endpoints()?;
        Ok(())
    }
}
