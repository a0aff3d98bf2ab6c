use std::time::Duration;

// tokio's Instant follows the paused test clock, std's is cheaper in production.
#[cfg(not(test))]
type InstantProvider = std::time::Instant;

#[cfg(test)]
type InstantProvider = tokio::time::Instant;

/// Configuration for exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Cap for exponential growth
    pub max_delay: Duration,
    /// Total number of attempts allowed, including the first one. `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Minimum interval between two warning logs
    pub log_interval: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(16),
            max_attempts: Some(5),
            log_interval: Duration::from_secs(10),
        }
    }
}

impl BackoffConfig {
    /// Retry forever at a fixed interval.
    pub fn fixed(interval: Duration) -> Self {
        Self { initial_delay: interval, max_delay: interval, max_attempts: None, ..Default::default() }
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// State tracker for retry attempts
pub struct RetryState {
    config: BackoffConfig,
    last_log_time: Option<InstantProvider>,
    attempts: u32,
}

impl std::fmt::Debug for RetryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryState").field("config", &self.config).field("attempts", &self.attempts).finish()
    }
}

impl RetryState {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, last_log_time: None, attempts: 0 }
    }

    /// Delay after the `attempts`-th failed attempt: `initial * 2^(attempts - 1)`, capped.
    pub fn current_delay(&self) -> Duration {
        // exponent is capped at 16 so the multiplication cannot overflow
        let exponent = self.attempts.saturating_sub(1).min(16);
        self.config.initial_delay.saturating_mul(2_u32.saturating_pow(exponent)).min(self.config.max_delay)
    }

    /// Records a failed attempt. Returns the delay to wait before the next one, or [`None`] once
    /// the attempt budget is spent.
    pub fn next_attempt(&mut self) -> Option<Duration> {
        self.attempts = self.attempts.saturating_add(1);
        if self.is_exhausted() {
            return None;
        }
        Some(self.current_delay())
    }

    pub fn is_exhausted(&self) -> bool {
        self.config.max_attempts.is_some_and(|max| self.attempts >= max)
    }

    /// Check if we should log this retry attempt (throttled logging)
    pub fn should_log(&mut self) -> bool {
        match self.last_log_time {
            Some(last) if last.elapsed() < self.config.log_interval => false,
            _ => {
                self.last_log_time = Some(InstantProvider::now());
                true
            }
        }
    }

    /// Number of failed attempts recorded so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
