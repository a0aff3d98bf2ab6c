use lp_optimistic::TxnKeyError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TxnQueueError {
    #[error("Invalid optimistic transaction: {0}")]
    InvalidTransaction(#[from] TxnKeyError),

    #[error("An optimistic transaction with key `{0}` is already queued")]
    Duplicate(String),

    #[error("Failed to read queue file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write queue file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode persisted queue: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to encode queue: {0}")]
    Encode(#[source] serde_json::Error),
}
