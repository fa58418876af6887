pub mod error;
pub mod payload;
pub mod queue;

pub use error::{QueueError, Result};
pub use payload::AccessUnit;
pub use queue::{Consumer, Producer, StreamHandle};
