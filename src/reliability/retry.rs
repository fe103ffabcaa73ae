use crate::app::config::RetryConfig;
use crate::domain::{ClassifiedError, ExportError};
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Exponentially growing retry interval with optional jitter.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    current_interval: Duration,
    max_interval: Duration,
    multiplier: f64,
    randomization_factor: f64,
}

impl ExponentialBackoff {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            initial_interval: config.initial_interval,
            current_interval: config.initial_interval,
            max_interval: config.max_interval,
            multiplier: config.multiplier.max(1.0),
            randomization_factor: config.randomization_factor.clamp(0.0, 1.0),
        }
    }

    /// Returns the next delay and grows the interval, capped at `max_interval`.
    pub fn next_interval(&mut self) -> Duration {
        let interval = self.current_interval.min(self.max_interval);

        self.current_interval =
            Duration::try_from_secs_f64(interval.as_secs_f64() * self.multiplier)
                .unwrap_or(self.max_interval)
                .min(self.max_interval);

        self.apply_jitter(interval)
    }

    pub fn reset(&mut self) {
        self.current_interval = self.initial_interval;
    }

    fn apply_jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 || interval.is_zero() {
            return interval;
        }
        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;
        let jittered = rand::rng().random_range((secs - delta)..=(secs + delta));
        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Drives one export request through repeated attempts until it reaches a
/// terminal state: success, permanent failure, cancellation or exhaustion.
#[derive(Debug, Clone)]
pub struct RetryController {
    config: RetryConfig,
    retries: Arc<AtomicU64>,
}

impl RetryController {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            retries: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Total number of re-attempts scheduled across all requests.
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    pub async fn run<F, Fut>(
        &self,
        request_id: &str,
        cancel: &CancellationToken,
        mut attempt: F,
    ) -> Result<(), ExportError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), ClassifiedError>>,
    {
        if cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        let started = Instant::now();
        let mut backoff = ExponentialBackoff::new(&self.config);
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ExportError::Cancelled),
                outcome = attempt() => outcome,
            };

            let err = match outcome {
                Ok(()) => {
                    if attempts > 1 {
                        info!(request_id, attempts, "Export succeeded after retries");
                    }
                    return Ok(());
                }
                Err(err) => err,
            };

            if err.is_permanent() || !self.config.enabled {
                return Err(ExportError::Rejected(err));
            }

            if let Some(max_attempts) = self.config.max_attempts
                && attempts >= max_attempts
            {
                warn!(request_id, attempts, error = %err, "Retry attempt budget spent");
                return Err(ExportError::Exhausted { attempts, last: err });
            }

            // Only the backoff interval counts against the time budget; a
            // server-requested delay is always waited out.
            let backoff_delay = backoff.next_interval();
            if !self.config.max_elapsed_time.is_zero()
                && started.elapsed().saturating_add(backoff_delay) > self.config.max_elapsed_time
            {
                warn!(request_id, attempts, error = %err, "Retry time budget spent");
                return Err(ExportError::Exhausted { attempts, last: err });
            }

            let delay = err
                .throttle_delay()
                .map_or(backoff_delay, |throttle| backoff_delay.max(throttle));

            warn!(
                request_id,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Export attempt failed, will retry"
            );
            self.retries.fetch_add(1, Ordering::Relaxed);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ExportError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
