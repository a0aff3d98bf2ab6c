//! Reconciliation of optimistic publications.
//!
//! Every pending item of the [`TxnQueueStore`](lc_txn_queue::TxnQueueStore) gets its own
//! [`IndexingPoller`] task, mounted by the [`QueueSupervisor`]. The poller asks the indexer whether
//! the transaction went through every [`ReconcileConfig::poll_interval`] and reacts to terminal
//! answers:
//!
//! - the transaction failed, or was mined with invalid metadata: the item is dropped from the queue;
//! - the transaction was indexed: the [`Reconciler`] fetches the canonical publication, merges it
//!   into the [`PublicationCache`](lc_read_cache::PublicationCache) and only then drops the item.
//!
//! Every task holds a [`CancellationToken`](tokio_util::sync::CancellationToken). Unmounting a view
//! cancels it, and no queue or cache mutation happens once it is cancelled.

mod config;
mod error;
mod events;
mod poller;
mod reconciler;
mod supervisor;
mod verdict;
mod view;

pub use config::{ReconcileConfig, DEFAULT_POLL_INTERVAL};
pub use error::ReconcileError;
pub use events::{QueueEvent, QueueOutcome, TaskExit};
pub use poller::IndexingPoller;
pub use reconciler::Reconciler;
pub use supervisor::{QueueSupervisor, ReconcileContext};
pub use verdict::PollVerdict;
pub use view::{first_url, Embed, QueuedPublicationView};

#[cfg(test)]
mod tests;
