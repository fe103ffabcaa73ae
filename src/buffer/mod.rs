pub mod queue;

pub use queue::{Deliver, QueueStats, SendQueue};
