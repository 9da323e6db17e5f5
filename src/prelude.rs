pub use crate::config::QueueConfig;
pub use crate::ds::bucket::Bucket;
pub use crate::error::{ConfigError, InvariantError};
pub use crate::queue::batched::BatchedPriorityQueue;
pub use crate::queue::pq::PriorityQueue;
pub use crate::traits::{QueueItem, QueueKey};
