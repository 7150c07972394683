use conductor_core::api::{RetryConfig, RetryStrategyPlugin};
use std::time::Duration;

/// Error prefixes that retrying cannot fix (see `TaskError` display strings).
const FATAL_PREFIXES: &[&str] = &["invalid payload", "task panicked", "failed to spawn"];

fn is_fatal(error: &str) -> bool {
    FATAL_PREFIXES.iter().any(|p| error.starts_with(p))
}

pub struct ExponentialBackoffPlugin {
    config: RetryConfig,
}

pub struct LinearRetryPlugin {
    config: RetryConfig,
}

impl ExponentialBackoffPlugin {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl LinearRetryPlugin {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl RetryStrategyPlugin for ExponentialBackoffPlugin {
    fn name(&self) -> &str {
        "exponential-backoff"
    }

    fn next_delay(&self, attempt: u32, _error: &str) -> Option<Duration> {
        if attempt == 0 || attempt >= self.config.max_attempts {
            return None;
        }
        let exp = 1u64 << (attempt - 1).min(30);
        let delay = self.config.base_delay_ms.saturating_mul(exp);
        let delay = delay.min(self.config.max_delay_ms);
        Some(Duration::from_millis(delay))
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    fn is_fatal_error(&self, error: &str) -> bool {
        is_fatal(error)
    }
}

impl RetryStrategyPlugin for LinearRetryPlugin {
    fn name(&self) -> &str {
        "linear"
    }

    fn next_delay(&self, attempt: u32, _error: &str) -> Option<Duration> {
        if attempt == 0 || attempt >= self.config.max_attempts {
            return None;
        }
        let delay = self.config.base_delay_ms.saturating_mul(attempt as u64);
        let delay = delay.min(self.config.max_delay_ms);
        Some(Duration::from_millis(delay))
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    fn is_fatal_error(&self, error: &str) -> bool {
        is_fatal(error)
    }
}
