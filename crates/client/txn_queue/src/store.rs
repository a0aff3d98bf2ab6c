use crate::{QueueStorage, TxnQueueError};
use lp_optimistic::OptimisticTransaction;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

pub type QueueSnapshot = Arc<[OptimisticTransaction]>;

/// Index of the item `key` refers to: the item whose hash matches, else the item whose id matches.
fn position_of(queue: &[OptimisticTransaction], key: &str) -> Option<usize> {
    queue.iter().position(|txn| txn.has_hash(key)).or_else(|| queue.iter().position(|txn| txn.has_id(key)))
}

/// Drops keyless items and items colliding with an earlier one, keeping the order of the rest.
fn sanitize(txns: Vec<OptimisticTransaction>) -> Vec<OptimisticTransaction> {
    let mut queue: Vec<OptimisticTransaction> = Vec::with_capacity(txns.len());
    for txn in txns {
        if let Err(err) = txn.check_keys() {
            tracing::warn!(content = %txn.content, "Dropping transaction: {err}");
            continue;
        }
        if queue.iter().any(|queued| queued.collides_with(&txn)) {
            tracing::warn!(tx_key = ?txn.effective_key(), "Dropping duplicated transaction");
            continue;
        }
        queue.push(txn);
    }
    queue
}

/// Process-wide queue of pending optimistic transactions.
pub struct TxnQueueStore {
    queue: Mutex<Vec<OptimisticTransaction>>,
    storage: Arc<dyn QueueStorage>,
    snapshot: watch::Sender<QueueSnapshot>,
}

impl std::fmt::Debug for TxnQueueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxnQueueStore").field("len", &self.snapshot.borrow().len()).finish()
    }
}

impl TxnQueueStore {
    /// Loads the persisted queue. Keyless or duplicated entries are dropped with a warning.
    pub async fn open(storage: Arc<dyn QueueStorage>) -> Result<Self, TxnQueueError> {
        let loaded = storage.load().await?;
        let loaded_len = loaded.len();
        let queue = sanitize(loaded);
        if queue.len() != loaded_len {
            storage.save(&queue).await?;
        }

        tracing::debug!("Loaded {} pending transactions", queue.len());
        let (snapshot, _) = watch::channel(QueueSnapshot::from(queue.clone()));
        Ok(Self { queue: Mutex::new(queue), storage, snapshot })
    }

    /// Current pending items, in insertion order.
    pub async fn get(&self) -> Vec<OptimisticTransaction> {
        self.queue.lock().await.clone()
    }

    /// Latest published snapshot, without waiting on the queue lock.
    pub fn snapshot(&self) -> QueueSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receives a new snapshot after every successful mutation.
    pub fn subscribe(&self) -> watch::Receiver<QueueSnapshot> {
        self.snapshot.subscribe()
    }

    /// Appends a transaction. Rejects keyless transactions and transactions sharing a hash or an id
    /// with a queued one.
    pub async fn enqueue(&self, txn: OptimisticTransaction) -> Result<(), TxnQueueError> {
        txn.check_keys()?;
        let mut queue = self.queue.lock().await;
        if queue.iter().any(|queued| queued.collides_with(&txn)) {
            return Err(TxnQueueError::Duplicate(txn.effective_key().unwrap_or_default().to_owned()));
        }

        tracing::debug!(tx_key = ?txn.effective_key(), "Enqueuing optimistic transaction");
        let mut next = queue.clone();
        next.push(txn);
        self.commit(&mut queue, next).await
    }

    /// Removes the item whose `txHash` is `key`, or if there is none, the item whose `txId` is `key`.
    /// Removing an absent key is a no-op and does not touch storage.
    pub async fn remove(&self, key: &str) -> Result<Option<OptimisticTransaction>, TxnQueueError> {
        let mut queue = self.queue.lock().await;
        self.remove_locked(&mut queue, key).await
    }

    /// Same as [`TxnQueueStore::remove`], unless `token` is cancelled. The token is checked while
    /// holding the queue lock: once a view is torn down, nothing it started can mutate the queue.
    pub async fn remove_live(
        &self,
        key: &str,
        token: &CancellationToken,
    ) -> Result<Option<OptimisticTransaction>, TxnQueueError> {
        let mut queue = self.queue.lock().await;
        if token.is_cancelled() {
            tracing::debug!(tx_key = key, "Skipping removal, view was torn down");
            return Ok(None);
        }
        self.remove_locked(&mut queue, key).await
    }

    /// Replaces the whole queue. Keyless or duplicated entries are dropped with a warning, as on load.
    pub async fn set_txn_queue(&self, txns: Vec<OptimisticTransaction>) -> Result<(), TxnQueueError> {
        let txns = sanitize(txns);
        let mut queue = self.queue.lock().await;
        self.commit(&mut queue, txns).await
    }

    async fn remove_locked(
        &self,
        queue: &mut Vec<OptimisticTransaction>,
        key: &str,
    ) -> Result<Option<OptimisticTransaction>, TxnQueueError> {
        let Some(index) = position_of(queue, key) else {
            return Ok(None);
        };
        let mut next = queue.clone();
        let removed = next.remove(index);
        self.commit(queue, next).await?;
        tracing::debug!(tx_key = key, "Removed optimistic transaction");
        Ok(Some(removed))
    }

    /// Persists `next` and only then makes it the current queue.
    async fn commit(
        &self,
        queue: &mut Vec<OptimisticTransaction>,
        next: Vec<OptimisticTransaction>,
    ) -> Result<(), TxnQueueError> {
        self.storage.save(&next).await?;
        self.snapshot.send_replace(QueueSnapshot::from(next.clone()));
        *queue = next;
        Ok(())
    }
}
