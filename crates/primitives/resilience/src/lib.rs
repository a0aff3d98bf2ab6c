/// Retry primitives for talking to the Lens API.
///
/// - **Bounded retry**: exponential backoff with a cap and an optional attempt limit, used when a
///   confirmed transaction cannot be resolved to a publication yet.
/// - **Throttled logging**: when polls keep failing, only log a warning every `log_interval`.
///
/// # Example
///
/// ```rust,ignore
/// use lp_resilience::{BackoffConfig, RetryState};
///
/// let mut retry_state = RetryState::new(BackoffConfig::default());
///
/// loop {
///     match fetch().await {
///         Ok(Some(found)) => return Ok(found),
///         _ => {
///             let Some(delay) = retry_state.next_attempt() else { break };
///             tokio::time::sleep(delay).await;
///         }
///     }
/// }
/// ```
pub mod retry;

pub use retry::{BackoffConfig, RetryState};
