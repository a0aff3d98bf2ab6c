use lc_txn_queue::TxnQueueError;
use lp_optimistic::TxnKeyError;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Queue error: {0}")]
    Queue(#[from] TxnQueueError),

    #[error("Cannot poll optimistic transaction: {0}")]
    InvalidTransaction(#[from] TxnKeyError),
}
