use lc_reconcile::ReconcileConfig;
use lp_optimistic::ProfileId;
use lp_resilience::BackoffConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, clap::Args, Deserialize, Serialize)]
pub struct ReconcileParams {
    /// Profile the publications are fetched for. Lets the API fill in the viewer's reactions.
    #[arg(env = "LENSQ_PROFILE_ID", long, value_name = "PROFILE ID")]
    pub profile_id: Option<String>,

    /// Delay between two indexing status polls of the same transaction.
    #[arg(env = "LENSQ_POLL_INTERVAL_MS", long, value_name = "MILLISECONDS", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Drop a transaction once it was polled that many times without being indexed.
    /// Polls forever when unset.
    #[arg(env = "LENSQ_MAX_POLL_ATTEMPTS", long, value_name = "POLLS")]
    pub max_poll_attempts: Option<u32>,

    /// Number of publication fetches tried for an indexed transaction before dropping it.
    #[arg(env = "LENSQ_FETCH_MAX_ATTEMPTS", long, value_name = "ATTEMPTS", default_value_t = 5)]
    pub fetch_max_attempts: u32,

    /// Delay before the first publication fetch retry. Doubles on every retry.
    #[arg(env = "LENSQ_FETCH_INITIAL_DELAY_MS", long, value_name = "MILLISECONDS", default_value_t = 1000)]
    pub fetch_initial_delay_ms: u64,

    /// Cap of the publication fetch retry delay.
    #[arg(env = "LENSQ_FETCH_MAX_DELAY_MS", long, value_name = "MILLISECONDS", default_value_t = 16000)]
    pub fetch_max_delay_ms: u64,
}

impl ReconcileParams {
    pub fn check(&self) -> anyhow::Result<()> {
        if self.poll_interval_ms == 0 {
            anyhow::bail!("The poll interval cannot be zero");
        }
        if self.fetch_max_attempts == 0 {
            anyhow::bail!("At least one publication fetch attempt is needed");
        }
        if self.fetch_max_delay_ms < self.fetch_initial_delay_ms {
            anyhow::bail!(
                "Fetch max delay ({}ms) cannot be less than the initial delay ({}ms)",
                self.fetch_max_delay_ms,
                self.fetch_initial_delay_ms
            );
        }
        Ok(())
    }

    pub fn viewer(&self) -> Option<ProfileId> {
        self.profile_id.as_deref().map(ProfileId::from)
    }

    pub fn reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_poll_attempts: self.max_poll_attempts,
            fetch_backoff: BackoffConfig {
                initial_delay: Duration::from_millis(self.fetch_initial_delay_ms),
                max_delay: Duration::from_millis(self.fetch_max_delay_ms),
                max_attempts: Some(self.fetch_max_attempts),
                ..Default::default()
            },
            viewer: self.viewer(),
        }
    }
}
