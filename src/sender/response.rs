//! Response classification.
//!
//! Maps the outcome of one exchange to success or a [`ClassifiedError`].
//! The message format is scraped by downstream alerting, so it is fixed:
//!
//! ```text
//! error exporting items, request to {url} responded with HTTP Status Code {code}[, Message={msg}, Details=[..]]
//! ```

use super::client::{TransportError, TransportResponse};
use super::otlp;
use crate::domain::ClassifiedError;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Which 4xx responses are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientErrorPolicy {
    /// Only 400 is permanent; other 4xx are retried.
    #[default]
    BadRequestOnly,
    /// Every 4xx except 429 is permanent.
    AllClientErrors,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseClassifier {
    policy: ClientErrorPolicy,
    default_throttle_delay: Duration,
}

impl ResponseClassifier {
    pub fn new(policy: ClientErrorPolicy, default_throttle_delay: Duration) -> Self {
        Self {
            policy,
            default_throttle_delay,
        }
    }

    pub fn classify(&self, url: &Url, response: &TransportResponse) -> Result<(), ClassifiedError> {
        let status = response.status;
        if (200..=299).contains(&status) {
            return Ok(());
        }

        let mut message = format!(
            "error exporting items, request to {url} responded with HTTP Status Code {status}"
        );
        if let Some(envelope) = otlp::decode_status(&response.body) {
            message.push_str(&format!(
                ", Message={}, Details={}",
                envelope.message,
                envelope.render_details()
            ));
        }

        match status {
            429 | 503 => {
                let delay =
                    parse_retry_after(&response.headers).unwrap_or(self.default_throttle_delay);
                Err(ClassifiedError::throttled(message, delay))
            }
            400 => Err(ClassifiedError::permanent(message)),
            400..=499 if self.policy == ClientErrorPolicy::AllClientErrors => {
                Err(ClassifiedError::permanent(message))
            }
            _ => Err(ClassifiedError::retryable(message)),
        }
    }

    /// Connectivity failures are always worth another attempt.
    pub fn classify_transport_error(&self, err: &TransportError) -> ClassifiedError {
        ClassifiedError::retryable(err.to_string())
    }
}

/// Upper bound on a server-requested resume delay.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

/// Reads `Retry-After` as whole seconds, capped at [`MAX_RETRY_AFTER`].
/// Anything else is ignored.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}
