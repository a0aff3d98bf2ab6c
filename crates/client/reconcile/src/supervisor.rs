use crate::{IndexingPoller, QueueEvent, QueuedPublicationView, ReconcileConfig, TaskExit};
use futures::future;
use lc_lens_client::LensApi;
use lc_read_cache::PublicationCache;
use lc_txn_queue::TxnQueueStore;
use lp_optimistic::OptimisticTransaction;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const EVENTS_CAPACITY: usize = 64;

/// Everything a per-item task needs.
pub struct ReconcileContext {
    pub lens: Arc<dyn LensApi>,
    pub queue: Arc<TxnQueueStore>,
    pub cache: Arc<PublicationCache>,
    pub config: ReconcileConfig,
    pub events: broadcast::Sender<QueueEvent>,
}

impl ReconcileContext {
    pub fn new(
        lens: Arc<dyn LensApi>,
        queue: Arc<TxnQueueStore>,
        cache: Arc<PublicationCache>,
        config: ReconcileConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENTS_CAPACITY);
        Self { lens, queue, cache, config, events }
    }
}

struct MountedTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Keeps exactly one poll task mounted per pending item.
///
/// The supervisor follows the queue snapshots: new items get a task, items which left the queue get
/// their task cancelled. [`QueueSupervisor::shutdown`] tears every task down.
pub struct QueueSupervisor {
    ctx: Arc<ReconcileContext>,
    root: CancellationToken,
    tasks: Mutex<HashMap<String, MountedTask>>,
}

impl QueueSupervisor {
    pub fn new(ctx: Arc<ReconcileContext>) -> Self {
        Self { ctx, root: CancellationToken::new(), tasks: Mutex::new(HashMap::new()) }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<QueueEvent> {
        self.ctx.events.subscribe()
    }

    /// View models of the items currently pending.
    pub fn views(&self) -> Vec<QueuedPublicationView> {
        self.ctx
            .queue
            .snapshot()
            .iter()
            .filter_map(|txn| QueuedPublicationView::new(txn, self.ctx.config.viewer.as_ref()))
            .collect()
    }

    /// Keys of the items which currently have a live poll task.
    pub fn mounted_keys(&self) -> Vec<String> {
        let tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<_> = tasks.iter().filter(|(_, t)| !t.handle.is_finished()).map(|(k, _)| k.clone()).collect();
        keys.sort();
        keys
    }

    /// Starts polling `txn`. Returns false if it is keyless or already has a live task. A task that
    /// ended while its item is still queued, e.g. after a failed write, is replaced.
    pub fn mount(&self, txn: &OptimisticTransaction) -> bool {
        let Some(key) = txn.effective_key() else {
            return false;
        };
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        if tasks.get(key).is_some_and(|task| !task.handle.is_finished()) {
            return false;
        }

        let token = self.root.child_token();
        let poller = IndexingPoller::new(Arc::clone(&self.ctx), txn.clone(), token.clone());
        let task_key = key.to_owned();
        let handle = tokio::spawn(async move {
            match poller.run().await {
                Ok(TaskExit::Finished(outcome)) => tracing::debug!(tx_key = %task_key, ?outcome, "Poll task finished"),
                Ok(TaskExit::Cancelled) => tracing::debug!(tx_key = %task_key, "Poll task cancelled"),
                Err(err) => tracing::error!(tx_key = %task_key, "Poll task failed: {err:#}"),
            }
        });
        tracing::debug!(tx_key = key, "Mounted poll task");
        tasks.insert(key.to_owned(), MountedTask { token, handle });
        true
    }

    /// Tears down the task of `key`. Its in-flight request, if any, has no effect anymore.
    pub fn unmount(&self, key: &str) -> bool {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        match tasks.remove(key) {
            Some(task) => {
                task.token.cancel();
                tracing::debug!(tx_key = key, "Unmounted poll task");
                true
            }
            None => false,
        }
    }

    /// Mounts a task for every item of `snapshot` and unmounts tasks of items that left it.
    pub fn sync(&self, snapshot: &[OptimisticTransaction]) {
        let pending: Vec<&str> = snapshot.iter().filter_map(|txn| txn.effective_key()).collect();
        let stale: Vec<String> = {
            let tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            tasks.keys().filter(|key| !pending.contains(&key.as_str())).cloned().collect()
        };
        for key in stale {
            self.unmount(&key);
        }
        for txn in snapshot {
            self.mount(txn);
        }
    }

    /// Follows the queue until [`QueueSupervisor::shutdown`] is called, then waits for every task to
    /// wind down.
    pub async fn run(&self) {
        let mut snapshots = self.ctx.queue.subscribe();
        loop {
            let snapshot = snapshots.borrow_and_update().clone();
            self.sync(&snapshot);

            tokio::select! {
                biased;
                _ = self.root.cancelled() => break,
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        let tasks: Vec<_> = {
            let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            tasks.drain().collect()
        };
        future::join_all(tasks.into_iter().map(|(key, task)| async move {
            task.token.cancel();
            if let Err(err) = task.handle.await {
                tracing::error!(tx_key = %key, "Poll task panicked: {err}");
            }
        }))
        .await;
        tracing::debug!("Queue supervisor stopped");
    }

    pub fn shutdown(&self) {
        self.root.cancel();
    }
}

impl Drop for QueueSupervisor {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
