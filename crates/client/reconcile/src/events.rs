use lc_lens_client::PublicationMetadataStatusType;
use lp_optimistic::PublicationId;

/// Why an item left the pending queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueOutcome {
    /// Indexed, fetched and merged into the read cache.
    Reconciled { publication_id: PublicationId },
    /// The indexer reported a transaction error.
    Failed { reason: Option<String> },
    /// Mined, but the metadata did not validate.
    Invalid { status: PublicationMetadataStatusType },
    /// Given up on: the poll or fetch budget ran out.
    Abandoned { reason: String },
}

/// Notification sent whenever an item leaves the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEvent {
    pub key: String,
    pub outcome: QueueOutcome,
}

/// How a per-item task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskExit {
    Finished(QueueOutcome),
    /// The view was torn down before a terminal state. Nothing was mutated.
    Cancelled,
}
