use std::time::Duration;
use thiserror::Error;

/// Outcome of a single failed delivery attempt, decided once by the
/// response classifier and never re-interpreted downstream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedError {
    /// Must not be retried by this layer.
    #[error("{message}")]
    Permanent { message: String },

    /// Server-directed slowdown. A zero delay defers to the backoff policy.
    #[error("{message}")]
    Throttled { message: String, delay: Duration },

    /// Transient failure retried with the default backoff.
    #[error("{message}")]
    Retryable { message: String },
}

impl ClassifiedError {
    pub fn permanent(message: impl Into<String>) -> Self {
        ClassifiedError::Permanent {
            message: message.into(),
        }
    }

    pub fn throttled(message: impl Into<String>, delay: Duration) -> Self {
        ClassifiedError::Throttled {
            message: message.into(),
            delay,
        }
    }

    pub fn retryable(message: impl Into<String>) -> Self {
        ClassifiedError::Retryable {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ClassifiedError::Permanent { message }
            | ClassifiedError::Throttled { message, .. }
            | ClassifiedError::Retryable { message } => message,
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, ClassifiedError::Permanent { .. })
    }

    /// Server-specified resume delay, if this is a throttle.
    pub fn throttle_delay(&self) -> Option<Duration> {
        match self {
            ClassifiedError::Throttled { delay, .. } => Some(*delay),
            _ => None,
        }
    }
}

/// Terminal outcome of an export call, as seen by the producer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    /// The classifier's verdict, surfaced verbatim. Throttled and retryable
    /// verdicts only reach the producer when retries are disabled.
    #[error(transparent)]
    Rejected(#[from] ClassifiedError),

    #[error("sending queue is full")]
    QueueFull,

    #[error("export cancelled")]
    Cancelled,

    #[error("max elapsed time expired after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: ClassifiedError },

    #[error("exporter is shut down")]
    Shutdown,
}

impl ExportError {
    /// True when upstream should drop the data rather than retry the stage.
    pub fn is_permanent(&self) -> bool {
        matches!(self, ExportError::Rejected(err) if err.is_permanent())
    }

    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            ExportError::Rejected(err) => Some(err),
            ExportError::Exhausted { last, .. } => Some(last),
            _ => None,
        }
    }
}
