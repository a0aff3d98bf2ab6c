use crate::TxnQueueError;
use async_trait::async_trait;
use lp_optimistic::OptimisticTransaction;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Version of the persisted layout. Bump when [`OptimisticTransaction`] changes shape.
pub const PERSISTED_QUEUE_VERSION: u32 = 0;

/// Durable backing for the pending queue.
#[async_trait]
pub trait QueueStorage: Send + Sync {
    async fn load(&self) -> Result<Vec<OptimisticTransaction>, TxnQueueError>;
    async fn save(&self, queue: &[OptimisticTransaction]) -> Result<(), TxnQueueError>;
}

// Same layout as the web client's persisted store, so a queue can be exported from a browser.
#[derive(Deserialize)]
struct PersistedQueue {
    state: PersistedQueueState,
    #[serde(default)]
    version: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedQueueState {
    #[serde(default)]
    txn_queue: Vec<OptimisticTransaction>,
}

#[derive(Serialize)]
struct PersistedQueueRef<'a> {
    state: PersistedQueueStateRef<'a>,
    version: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistedQueueStateRef<'a> {
    txn_queue: &'a [OptimisticTransaction],
}

/// Stores the queue as a JSON document. Writes go to a sibling temporary file which is then renamed
/// over the target, so a crash mid-write never leaves a truncated queue behind.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut file_name = self.path.file_name().map(|s| s.to_os_string()).unwrap_or_default();
        file_name.push(".tmp");
        self.path.with_file_name(file_name)
    }
}

#[async_trait]
impl QueueStorage for JsonFileStorage {
    async fn load(&self) -> Result<Vec<OptimisticTransaction>, TxnQueueError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No persisted queue found, starting empty");
                return Ok(vec![]);
            }
            Err(source) => return Err(TxnQueueError::Read { path: self.path.clone(), source }),
        };
        let persisted: PersistedQueue = serde_json::from_slice(&bytes).map_err(TxnQueueError::Decode)?;
        if persisted.version != PERSISTED_QUEUE_VERSION {
            tracing::warn!(
                found = persisted.version,
                expected = PERSISTED_QUEUE_VERSION,
                "Persisted queue has an unknown version, loading it anyway"
            );
        }
        Ok(persisted.state.txn_queue)
    }

    async fn save(&self, queue: &[OptimisticTransaction]) -> Result<(), TxnQueueError> {
        let document = PersistedQueueRef {
            state: PersistedQueueStateRef { txn_queue: queue },
            version: PERSISTED_QUEUE_VERSION,
        };
        let bytes = serde_json::to_vec_pretty(&document).map_err(TxnQueueError::Encode)?;

        let write_err = |source| TxnQueueError::Write { path: self.path.clone(), source };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &bytes).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(write_err)?;
        Ok(())
    }
}

/// Non-durable storage, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    saved: Mutex<Vec<OptimisticTransaction>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryStorage {
    pub fn with_queue(queue: Vec<OptimisticTransaction>) -> Self {
        Self { saved: Mutex::new(queue), ..Default::default() }
    }

    /// Last saved queue.
    pub fn saved(&self) -> Vec<OptimisticTransaction> {
        self.saved.lock().map(|q| q.clone()).unwrap_or_default()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every following save fail with an I/O error.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl QueueStorage for MemoryStorage {
    async fn load(&self) -> Result<Vec<OptimisticTransaction>, TxnQueueError> {
        Ok(self.saved())
    }

    async fn save(&self, queue: &[OptimisticTransaction]) -> Result<(), TxnQueueError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(TxnQueueError::Write {
                path: PathBuf::from(":memory:"),
                source: std::io::Error::other("save failure requested"),
            });
        }
        if let Ok(mut saved) = self.saved.lock() {
            *saved = queue.to_vec();
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
