#[cfg(feature = "adapter")]
pub mod adapter;
#[cfg(feature = "adapter")]
pub use adapter::{ContainerCommon, Queue, QueueLike, Stack, StackLike};

#[cfg(feature = "batch_deque")]
pub mod batch_deque;
#[cfg(feature = "batch_deque")]
pub use batch_deque::BatchDeque;

pub mod devector;
pub use devector::Devector;

mod guard;
mod raw;
