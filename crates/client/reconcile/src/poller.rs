use crate::{PollVerdict, QueueOutcome, ReconcileContext, ReconcileError, Reconciler, TaskExit};
use lc_lens_client::HasTxHashBeenIndexedRequest;
use lp_optimistic::{OptimisticTransaction, TxnKeyError};
use lp_resilience::{BackoffConfig, RetryState};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Polls the indexing status of one pending item until it reaches a terminal state or its view is
/// torn down.
///
/// Polls are strictly sequential: the next one is only sent once the previous answer was handled.
/// Transport failures are retried at the same interval, forever unless
/// [`ReconcileConfig::max_poll_attempts`](crate::ReconcileConfig::max_poll_attempts) is set.
pub struct IndexingPoller {
    ctx: Arc<ReconcileContext>,
    txn: OptimisticTransaction,
    token: CancellationToken,
}

impl IndexingPoller {
    pub fn new(ctx: Arc<ReconcileContext>, txn: OptimisticTransaction, token: CancellationToken) -> Self {
        Self { ctx, txn, token }
    }

    pub async fn run(self) -> Result<TaskExit, ReconcileError> {
        let key = self.txn.effective_key().ok_or(TxnKeyError::MissingKey)?.to_owned();
        let request = HasTxHashBeenIndexedRequest::from(&self.txn);
        let reconciler = Reconciler::new(Arc::clone(&self.ctx));
        let token = &self.token;

        let mut interval = tokio::time::interval(self.ctx.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Only used to count polls and throttle failure logs, the interval drives the pace.
        let mut retry_state = RetryState::new(
            BackoffConfig::fixed(self.ctx.config.poll_interval).with_max_attempts(self.ctx.config.max_poll_attempts),
        );

        tracing::debug!(tx_key = %key, "Polling indexing status");
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(TaskExit::Cancelled),
                _ = interval.tick() => {}
            }

            let response = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(TaskExit::Cancelled),
                response = self.ctx.lens.has_tx_hash_been_indexed(&request) => response,
            };

            let verdict = match response {
                Ok(result) => PollVerdict::from(result),
                Err(err) => {
                    if retry_state.should_log() {
                        let attempts = retry_state.attempts() + 1;
                        let transient = err.is_transient();
                        tracing::warn!(tx_key = %key, attempts, transient, "Indexing status poll failed: {err}");
                    }
                    PollVerdict::StillPending
                }
            };

            match verdict {
                PollVerdict::StillPending => {
                    if retry_state.next_attempt().is_none() {
                        let attempts = retry_state.attempts();
                        tracing::warn!(tx_key = %key, attempts, "Transaction still not indexed, dropping it");
                        let outcome = QueueOutcome::Abandoned { reason: format!("not indexed after {attempts} polls") };
                        return reconciler.finish(&key, outcome, token).await;
                    }
                }
                PollVerdict::Failed { reason } => {
                    tracing::info!(tx_key = %key, ?reason, "Transaction failed, dropping it");
                    return reconciler.finish(&key, QueueOutcome::Failed { reason }, token).await;
                }
                PollVerdict::Invalid { status } => {
                    tracing::info!(tx_key = %key, %status, "Publication metadata is invalid, dropping it");
                    return reconciler.finish(&key, QueueOutcome::Invalid { status }, token).await;
                }
                PollVerdict::Indexed { tx_hash } => {
                    tracing::debug!(tx_key = %key, %tx_hash, "Transaction indexed, fetching publication");
                    return reconciler.reconcile(&key, &tx_hash, token).await;
                }
            }
        }
    }
}
