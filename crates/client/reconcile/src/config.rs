use lp_optimistic::ProfileId;
use lp_resilience::BackoffConfig;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Delay between two indexing status polls of the same item.
    pub poll_interval: Duration,
    /// Number of non-terminal polls (still pending, or transport failure) after which an item is
    /// dropped. `None` polls forever.
    pub max_poll_attempts: Option<u32>,
    /// Backoff used when an indexed transaction does not resolve to a publication yet.
    pub fetch_backoff: BackoffConfig,
    /// Profile the publications are fetched for, so the API includes the viewer's reactions.
    pub viewer: Option<ProfileId>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: None,
            fetch_backoff: BackoffConfig::default(),
            viewer: None,
        }
    }
}
