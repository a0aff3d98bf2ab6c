use crate::*;
use assert_matches::assert_matches;
use async_trait::async_trait;
use lc_lens_client::{
    HasTxHashBeenIndexedRequest, IndexingResult, LensApi, LensClientError, MockLensApi, PublicationMetadataStatusType,
    PublicationQuery,
};
use lc_read_cache::PublicationCache;
use lc_txn_queue::{MemoryStorage, TxnQueueStore};
use lp_optimistic::{
    OptimisticTransaction, ProfileId, ProfileRef, Publication, PublicationId, PublicationKind, PublicationMetadata,
};
use lp_resilience::BackoffConfig;
use rstest::rstest;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

fn publication(id: &str, content: &str) -> Publication {
    Publication {
        kind: PublicationKind::Post,
        id: PublicationId::from(id),
        profile: ProfileRef { id: ProfileId::from("0x15"), handle: Some("stani.lens".into()) },
        metadata: PublicationMetadata { content: Some(content.into()), media: vec![] },
        created_at: "2023-06-01T10:00:00.000Z".into(),
        reaction: None,
        mirrors: vec![],
    }
}

struct Harness {
    storage: Arc<MemoryStorage>,
    ctx: Arc<ReconcileContext>,
}

impl Harness {
    async fn new(lens: impl LensApi + 'static, queue: Vec<OptimisticTransaction>, config: ReconcileConfig) -> Self {
        let storage = Arc::new(MemoryStorage::with_queue(queue));
        let store = TxnQueueStore::open(storage.clone()).await.unwrap();
        let ctx = ReconcileContext::new(Arc::new(lens), Arc::new(store), Arc::new(PublicationCache::new()), config);
        Self { storage, ctx: Arc::new(ctx) }
    }

    async fn run_poller(&self, txn: OptimisticTransaction) -> TaskExit {
        IndexingPoller::new(Arc::clone(&self.ctx), txn, CancellationToken::new()).run().await.unwrap()
    }
}

fn fast_fetch_backoff(max_attempts: u32) -> ReconcileConfig {
    ReconcileConfig {
        fetch_backoff: BackoffConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(400),
            max_attempts: Some(max_attempts),
            log_interval: Duration::from_secs(10),
        },
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn indexed_after_two_pending_polls_fetches_once_then_removes() {
    let storage_slot: Arc<std::sync::OnceLock<Arc<MemoryStorage>>> = Default::default();
    let polls = Arc::new(AtomicUsize::new(0));

    let mut lens = MockLensApi::new();
    let counter = Arc::clone(&polls);
    lens.expect_has_tx_hash_been_indexed().times(3).returning(move |_| {
        match counter.fetch_add(1, Ordering::SeqCst) {
            0 | 1 => Ok(IndexingResult::pending("0xb2")),
            _ => Ok(IndexingResult::indexed("0xb2", Some(PublicationMetadataStatusType::Success))),
        }
    });
    let slot = Arc::clone(&storage_slot);
    lens.expect_publication().times(1).returning(move |_| {
        // the item is still persisted while the publication is being fetched
        let saved = slot.get().unwrap().saved();
        assert_eq!(saved.len(), 1);
        Ok(Some(publication("0x15-0x01", "gm")))
    });

    let txn = OptimisticTransaction::with_hash("0xb2", "gm");
    let harness = Harness::new(lens, vec![txn.clone()], ReconcileConfig::default()).await;
    storage_slot.set(Arc::clone(&harness.storage)).unwrap();
    let saves_before = harness.storage.save_count();

    let exit = harness.run_poller(txn).await;

    assert_matches!(exit, TaskExit::Finished(QueueOutcome::Reconciled { publication_id }) => {
        assert_eq!(publication_id, PublicationId::from("0x15-0x01"));
    });
    assert_eq!(polls.load(Ordering::SeqCst), 3);
    assert!(harness.ctx.queue.get().await.is_empty());
    assert_eq!(harness.storage.save_count() - saves_before, 1);
    assert!(harness.ctx.cache.get(&PublicationId::from("0x15-0x01")).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn polls_are_spaced_by_the_interval() {
    let mut lens = MockLensApi::new();
    let seen = Arc::new(std::sync::Mutex::new(vec![]));
    let instants = Arc::clone(&seen);
    lens.expect_has_tx_hash_been_indexed().returning(move |_| {
        let mut instants = instants.lock().unwrap();
        instants.push(tokio::time::Instant::now());
        if instants.len() < 3 {
            Ok(IndexingResult::pending("0xb2"))
        } else {
            Ok(IndexingResult::error("reverted"))
        }
    });
    lens.expect_publication().never();

    let txn = OptimisticTransaction::with_hash("0xb2", "gm");
    let harness = Harness::new(lens, vec![txn.clone()], ReconcileConfig::default()).await;
    harness.run_poller(txn).await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[1] - seen[0], DEFAULT_POLL_INTERVAL);
    assert_eq!(seen[2] - seen[1], DEFAULT_POLL_INTERVAL);
}

#[tokio::test(start_paused = true)]
async fn transaction_error_removes_without_fetch() {
    let mut lens = MockLensApi::new();
    lens.expect_has_tx_hash_been_indexed().times(1).returning(|_| Ok(IndexingResult::error("reverted")));
    lens.expect_publication().never();

    let txn = OptimisticTransaction::with_id("a1", "gm");
    let harness = Harness::new(lens, vec![txn.clone()], ReconcileConfig::default()).await;

    let exit = harness.run_poller(txn).await;

    assert_eq!(exit, TaskExit::Finished(QueueOutcome::Failed { reason: Some("reverted".into()) }));
    assert!(harness.ctx.queue.get().await.is_empty());
    assert!(harness.ctx.cache.is_empty().await);
}

#[rstest]
#[case::not_found(PublicationMetadataStatusType::NotFound)]
#[case::validation_failed(PublicationMetadataStatusType::MetadataValidationFailed)]
#[tokio::test(start_paused = true)]
async fn invalid_metadata_removes_without_fetch(#[case] status: PublicationMetadataStatusType) {
    let mut lens = MockLensApi::new();
    lens.expect_has_tx_hash_been_indexed()
        .times(1)
        .returning(move |_| Ok(IndexingResult::indexed("0xb2", Some(status))));
    lens.expect_publication().never();

    let txn = OptimisticTransaction::with_hash("0xb2", "gm");
    let harness = Harness::new(lens, vec![txn.clone()], ReconcileConfig::default()).await;

    let exit = harness.run_poller(txn).await;

    assert_eq!(exit, TaskExit::Finished(QueueOutcome::Invalid { status }));
    assert!(harness.ctx.queue.get().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn fetch_uses_the_confirmed_hash_and_viewer() {
    let mut lens = MockLensApi::new();
    lens.expect_has_tx_hash_been_indexed().returning(|_| Ok(IndexingResult::indexed("0xB2", None)));
    lens.expect_publication()
        .withf(|query: &PublicationQuery| {
            query.request.tx_hash == "0xB2" && query.profile_id == Some(ProfileId::from("0x15"))
        })
        .times(1)
        .returning(|_| Ok(Some(publication("0x15-0x01", "gm"))));

    let txn = OptimisticTransaction::with_hash("0xb2", "gm");
    let config = ReconcileConfig { viewer: Some(ProfileId::from("0x15")), ..Default::default() };
    let harness = Harness::new(lens, vec![txn.clone()], config).await;

    assert_matches!(harness.run_poller(txn).await, TaskExit::Finished(QueueOutcome::Reconciled { .. }));
}

#[tokio::test(start_paused = true)]
async fn missing_publication_is_retried_then_abandoned() {
    let mut lens = MockLensApi::new();
    lens.expect_has_tx_hash_been_indexed().returning(|_| Ok(IndexingResult::indexed("0xb2", None)));
    lens.expect_publication().times(3).returning(|_| Ok(None));

    let txn = OptimisticTransaction::with_hash("0xb2", "gm");
    let harness = Harness::new(lens, vec![txn.clone()], fast_fetch_backoff(3)).await;
    let mut events = harness.ctx.events.subscribe();

    let exit = harness.run_poller(txn).await;

    assert_matches!(exit, TaskExit::Finished(QueueOutcome::Abandoned { .. }));
    assert!(harness.ctx.queue.get().await.is_empty());
    assert!(harness.ctx.cache.is_empty().await);
    let event = events.recv().await.unwrap();
    assert_eq!(event.key, "0xb2");
    assert_matches!(event.outcome, QueueOutcome::Abandoned { reason } => assert!(reason.contains("not found")));
}

#[tokio::test(start_paused = true)]
async fn fetch_recovers_after_a_transport_error() {
    let mut lens = MockLensApi::new();
    let fetches = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fetches);
    lens.expect_has_tx_hash_been_indexed().returning(|_| Ok(IndexingResult::indexed("0xb2", None)));
    lens.expect_publication().returning(move |_| match counter.fetch_add(1, Ordering::SeqCst) {
        0 => Err(LensClientError::MissingData),
        _ => Ok(Some(publication("0x15-0x01", "gm"))),
    });

    let txn = OptimisticTransaction::with_hash("0xb2", "gm");
    let harness = Harness::new(lens, vec![txn.clone()], fast_fetch_backoff(3)).await;

    assert_matches!(harness.run_poller(txn).await, TaskExit::Finished(QueueOutcome::Reconciled { .. }));
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn poll_budget_drops_items_that_never_index() {
    let mut lens = MockLensApi::new();
    lens.expect_has_tx_hash_been_indexed().times(3).returning(|_| Ok(IndexingResult::pending("0xb2")));
    lens.expect_publication().never();

    let txn = OptimisticTransaction::with_hash("0xb2", "gm");
    let config = ReconcileConfig { max_poll_attempts: Some(3), ..Default::default() };
    let harness = Harness::new(lens, vec![txn.clone()], config).await;

    let exit = harness.run_poller(txn).await;

    assert_matches!(exit, TaskExit::Finished(QueueOutcome::Abandoned { reason }) => {
        assert_eq!(reason, "not indexed after 3 polls");
    });
    assert!(harness.ctx.queue.get().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn transport_errors_keep_polling() {
    let mut lens = MockLensApi::new();
    let polls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&polls);
    lens.expect_has_tx_hash_been_indexed().returning(move |_| match counter.fetch_add(1, Ordering::SeqCst) {
        0..=3 => Err(LensClientError::Status { status: 502, body: "bad gateway".into() }),
        _ => Ok(IndexingResult::error("reverted")),
    });

    let txn = OptimisticTransaction::with_hash("0xb2", "gm");
    let harness = Harness::new(lens, vec![txn.clone()], ReconcileConfig::default()).await;

    assert_matches!(harness.run_poller(txn).await, TaskExit::Finished(QueueOutcome::Failed { .. }));
    assert_eq!(polls.load(Ordering::SeqCst), 5);
}

#[derive(Default)]
struct Gate {
    dispatched: Notify,
    release: Notify,
}

/// Lens API whose answers are held back until the test opens the gate.
struct GatedLens {
    gate: Arc<Gate>,
    indexing: IndexingResult,
}

impl GatedLens {
    async fn pass(&self) {
        self.gate.dispatched.notify_one();
        self.gate.release.notified().await;
    }
}

#[async_trait]
impl LensApi for GatedLens {
    async fn has_tx_hash_been_indexed(
        &self,
        _request: &HasTxHashBeenIndexedRequest,
    ) -> Result<IndexingResult, LensClientError> {
        // indexed answers go through so the fetch can be held back instead
        if !matches!(self.indexing, IndexingResult::TransactionIndexedResult(ref r) if r.indexed) {
            self.pass().await;
        }
        Ok(self.indexing.clone())
    }

    async fn publication(&self, _query: &PublicationQuery) -> Result<Option<Publication>, LensClientError> {
        self.pass().await;
        Ok(Some(publication("0x15-0x01", "gm")))
    }
}

#[rstest]
#[case::during_poll(IndexingResult::error("reverted"))]
#[case::during_fetch(IndexingResult::indexed("0xb2", None))]
#[tokio::test(start_paused = true)]
async fn teardown_before_the_answer_mutates_nothing(#[case] indexing: IndexingResult) {
    let gate = Arc::new(Gate::default());
    let lens = GatedLens { gate: Arc::clone(&gate), indexing };
    let txn = OptimisticTransaction::with_hash("0xb2", "gm");
    let harness = Harness::new(lens, vec![txn.clone()], ReconcileConfig::default()).await;
    let saves_before = harness.storage.save_count();

    let token = CancellationToken::new();
    let poller = IndexingPoller::new(Arc::clone(&harness.ctx), txn.clone(), token.clone());
    let task = tokio::spawn(poller.run());

    gate.dispatched.notified().await;
    token.cancel();
    gate.release.notify_one();

    assert_eq!(task.await.unwrap().unwrap(), TaskExit::Cancelled);
    assert_eq!(harness.ctx.queue.get().await, vec![txn]);
    assert_eq!(harness.storage.save_count(), saves_before);
    assert!(harness.ctx.cache.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn cancelled_view_cannot_remove() {
    let txn = OptimisticTransaction::with_hash("0xb2", "gm");
    let harness = Harness::new(MockLensApi::new(), vec![txn.clone()], ReconcileConfig::default()).await;
    let token = CancellationToken::new();
    token.cancel();

    let exit = Reconciler::new(Arc::clone(&harness.ctx))
        .finish("0xb2", QueueOutcome::Failed { reason: None }, &token)
        .await
        .unwrap();

    assert_eq!(exit, TaskExit::Cancelled);
    assert_eq!(harness.ctx.queue.get().await, vec![txn]);
}

async fn next_event(events: &mut tokio::sync::broadcast::Receiver<QueueEvent>) -> QueueEvent {
    tokio::time::timeout(Duration::from_secs(60), events.recv()).await.unwrap().unwrap()
}

#[tokio::test(start_paused = true)]
async fn supervisor_reconciles_b_then_drops_a() {
    let a_fails = Arc::new(AtomicBool::new(false));
    let fail_switch = Arc::clone(&a_fails);

    let mut lens = MockLensApi::new();
    lens.expect_has_tx_hash_been_indexed().returning(move |request| match request.tx_hash.as_deref() {
        Some("0xb2") => Ok(IndexingResult::indexed("0xb2", Some(PublicationMetadataStatusType::Success))),
        _ if fail_switch.load(Ordering::SeqCst) => Ok(IndexingResult::error("reverted")),
        _ => Ok(IndexingResult::pending("")),
    });
    lens.expect_publication().times(1).returning(|_| Ok(Some(publication("0x15-0x0b", "B"))));

    let a = OptimisticTransaction::with_id("a1", "A");
    let b = OptimisticTransaction::with_hash("0xb2", "B");
    let harness = Harness::new(lens, vec![a.clone(), b], ReconcileConfig::default()).await;

    let supervisor = Arc::new(QueueSupervisor::new(Arc::clone(&harness.ctx)));
    let mut events = supervisor.subscribe_events();
    let running = tokio::spawn({
        let supervisor = Arc::clone(&supervisor);
        async move { supervisor.run().await }
    });

    let event = next_event(&mut events).await;
    assert_eq!(event.key, "0xb2");
    assert_matches!(event.outcome, QueueOutcome::Reconciled { .. });
    assert_eq!(harness.ctx.queue.get().await, vec![a]);
    assert!(harness.ctx.cache.get(&PublicationId::from("0x15-0x0b")).await.is_some());

    a_fails.store(true, Ordering::SeqCst);
    let event = next_event(&mut events).await;
    assert_eq!(event.key, "a1");
    assert_matches!(event.outcome, QueueOutcome::Failed { .. });
    assert!(harness.ctx.queue.get().await.is_empty());
    assert_eq!(harness.ctx.cache.len().await, 1);

    supervisor.shutdown();
    running.await.unwrap();
    assert!(supervisor.mounted_keys().is_empty());
}

#[tokio::test(start_paused = true)]
async fn supervisor_unmounts_items_removed_elsewhere() {
    let mut lens = MockLensApi::new();
    lens.expect_has_tx_hash_been_indexed().returning(|_| Ok(IndexingResult::pending("0xb2")));

    let harness = Harness::new(lens, vec![], ReconcileConfig::default()).await;
    let supervisor = QueueSupervisor::new(Arc::clone(&harness.ctx));

    let txn = OptimisticTransaction::with_hash("0xb2", "gm");
    assert!(supervisor.mount(&txn));
    assert!(!supervisor.mount(&txn));
    assert_eq!(supervisor.mounted_keys(), vec!["0xb2".to_string()]);

    supervisor.sync(&[]);
    assert!(supervisor.mounted_keys().is_empty());
    assert!(!supervisor.unmount("0xb2"));
}

#[tokio::test(start_paused = true)]
async fn supervisor_remounts_item_whose_task_ended_early() {
    let mut lens = MockLensApi::new();
    lens.expect_has_tx_hash_been_indexed().returning(|_| Ok(IndexingResult::error("reverted")));
    lens.expect_publication().never();

    let txn = OptimisticTransaction::with_hash("0xb2", "gm");
    let harness = Harness::new(lens, vec![txn.clone()], ReconcileConfig::default()).await;
    let supervisor = QueueSupervisor::new(Arc::clone(&harness.ctx));
    let mut events = supervisor.subscribe_events();

    // the removal cannot be persisted, the task gives up with the item still queued
    harness.storage.set_fail_saves(true);
    assert!(supervisor.mount(&txn));
    while !supervisor.mounted_keys().is_empty() {
        tokio::task::yield_now().await;
    }
    assert_eq!(harness.ctx.queue.get().await, vec![txn.clone()]);

    harness.storage.set_fail_saves(false);
    supervisor.sync(&harness.ctx.queue.snapshot());
    assert_eq!(supervisor.mounted_keys(), vec!["0xb2".to_string()]);

    let event = next_event(&mut events).await;
    assert_eq!(event.key, "0xb2");
    assert_matches!(event.outcome, QueueOutcome::Failed { .. });
    assert!(harness.ctx.queue.get().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn supervisor_views_follow_the_queue() {
    let harness = Harness::new(
        MockLensApi::new(),
        vec![OptimisticTransaction::with_id("a1", "see https://lenster.xyz")],
        ReconcileConfig { viewer: Some(ProfileId::from("0x15")), ..Default::default() },
    )
    .await;
    let supervisor = QueueSupervisor::new(Arc::clone(&harness.ctx));

    let views = supervisor.views();

    assert_eq!(views.len(), 1);
    assert_eq!(views[0].key, "a1");
    assert_eq!(views[0].author, Some(ProfileId::from("0x15")));
    assert_matches!(views[0].embed, Embed::LinkPreview(_));
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn logs_reconciled_publication() {
    let mut lens = MockLensApi::new();
    lens.expect_has_tx_hash_been_indexed().returning(|_| Ok(IndexingResult::indexed("0xb2", None)));
    lens.expect_publication().returning(|_| Ok(Some(publication("0x15-0x01", "gm"))));

    let txn = OptimisticTransaction::with_hash("0xb2", "gm");
    let harness = Harness::new(lens, vec![txn.clone()], ReconcileConfig::default()).await;
    harness.run_poller(txn).await;

    assert!(logs_contain("Publication indexed"));
    assert!(logs_contain("0x15-0x01"));
}
