use anyhow::Context;
use lc_txn_queue::{JsonFileStorage, TxnQueueStore};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

pub const QUEUE_DEFAULT_FILE: &str = "./lensq/txn-queue.json";

#[derive(Clone, Debug, clap::Args, Deserialize, Serialize)]
pub struct QueueParams {
    /// File the pending transactions are persisted to.
    #[arg(env = "LENSQ_QUEUE_FILE", long, value_name = "PATH", default_value = QUEUE_DEFAULT_FILE)]
    pub queue_file: PathBuf,
}

impl QueueParams {
    pub async fn open_store(&self) -> anyhow::Result<TxnQueueStore> {
        TxnQueueStore::open(Arc::new(JsonFileStorage::new(&self.queue_file)))
            .await
            .with_context(|| format!("Opening transaction queue at {}", self.queue_file.display()))
    }
}
