//! Domain layer for rask-otlp-exporter.
//!
//! Contains the canonical types shared across all modules:
//! - `Signal`: traces, metrics or logs
//! - `ExportRequest`: one batch of a single signal kind
//! - `ClassifiedError` / `ExportError`: per-attempt and terminal failures

pub mod error;
pub mod signal;

pub use error::{ClassifiedError, ExportError};
pub use signal::{ExportRequest, Signal};
