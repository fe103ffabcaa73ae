pub mod retry;

pub use retry::{ExponentialBackoff, RetryController};
