use crate::{QueueEvent, QueueOutcome, ReconcileContext, ReconcileError, TaskExit};
use lc_lens_client::PublicationQuery;
use lp_resilience::RetryState;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Resolves an indexed transaction to its publication and folds it into the read cache.
pub struct Reconciler {
    ctx: Arc<ReconcileContext>,
}

impl Reconciler {
    pub fn new(ctx: Arc<ReconcileContext>) -> Self {
        Self { ctx }
    }

    /// Fetches the publication created by `confirmed_tx_hash`, merges it into the cache, then removes
    /// `key` from the queue. The removal never happens before the merge.
    ///
    /// A missing publication or a failed fetch is retried with backoff; once the budget is spent the
    /// item is dropped and an [`QueueOutcome::Abandoned`] event is sent.
    pub async fn reconcile(
        &self,
        key: &str,
        confirmed_tx_hash: &str,
        token: &CancellationToken,
    ) -> Result<TaskExit, ReconcileError> {
        let query = PublicationQuery::by_tx_hash(confirmed_tx_hash, self.ctx.config.viewer.as_ref());
        let mut retry_state = RetryState::new(self.ctx.config.fetch_backoff.clone());

        loop {
            let fetched = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(TaskExit::Cancelled),
                fetched = self.ctx.lens.publication(&query) => fetched,
            };

            let reason = match fetched {
                Ok(Some(publication)) => {
                    let publication_id = publication.id.clone();
                    if self.ctx.cache.merge_live(publication, token).await.is_none() {
                        return Ok(TaskExit::Cancelled);
                    }
                    tracing::info!(tx_key = key, %publication_id, "📬 Publication indexed");
                    return self.finish(key, QueueOutcome::Reconciled { publication_id }, token).await;
                }
                Ok(None) => "publication not found".to_string(),
                Err(err) => err.to_string(),
            };

            let Some(delay) = retry_state.next_attempt() else {
                tracing::warn!(
                    tx_key = key,
                    tx_hash = confirmed_tx_hash,
                    attempts = retry_state.attempts(),
                    "Giving up on indexed transaction: {reason}"
                );
                let outcome = QueueOutcome::Abandoned { reason: format!("publication fetch failed: {reason}") };
                return self.finish(key, outcome, token).await;
            };

            tracing::debug!(
                tx_key = key,
                tx_hash = confirmed_tx_hash,
                attempt = retry_state.attempts(),
                "Retrying publication fetch in {delay:?}: {reason}"
            );
            tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(TaskExit::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Drops `key` from the queue and notifies listeners, unless the view was torn down meanwhile.
    pub(crate) async fn finish(
        &self,
        key: &str,
        outcome: QueueOutcome,
        token: &CancellationToken,
    ) -> Result<TaskExit, ReconcileError> {
        if token.is_cancelled() {
            return Ok(TaskExit::Cancelled);
        }
        if self.ctx.queue.remove_live(key, token).await?.is_none() {
            if token.is_cancelled() {
                return Ok(TaskExit::Cancelled);
            }
            tracing::debug!(tx_key = key, "Item already left the queue");
        }
        // No receivers is fine, nobody is listening.
        let _ = self.ctx.events.send(QueueEvent { key: key.to_owned(), outcome: outcome.clone() });
        Ok(TaskExit::Finished(outcome))
    }
}
