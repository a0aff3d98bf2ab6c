//! Persisted queue of optimistic transactions.
//!
//! The queue is the single owner of pending items: pollers and the reconciler only ever read
//! snapshots and request removals through [`TxnQueueStore`]. Every mutation is persisted before it
//! becomes visible, so memory and disk never diverge.

mod error;
mod storage;
mod store;

pub use error::TxnQueueError;
pub use storage::{JsonFileStorage, MemoryStorage, QueueStorage, PERSISTED_QUEUE_VERSION};
pub use store::{QueueSnapshot, TxnQueueStore};
