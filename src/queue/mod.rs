pub mod batched;
pub mod pq;

mod level;

pub use batched::BatchedPriorityQueue;
pub use pq::PriorityQueue;
