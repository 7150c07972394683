use std::time::Duration;

/// 重试策略插件
///
/// `attempt` counts retries: the first retry is attempt 1.
pub trait RetryStrategyPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn next_delay(&self, attempt: u32, error: &str) -> Option<Duration>;
    /// Total executions allowed per node, including the first one
    fn max_attempts(&self) -> u32;
    fn should_retry(&self, attempt: u32, error: &str) -> bool {
        attempt < self.max_attempts() && !self.is_fatal_error(error)
    }
    fn is_fatal_error(&self, _error: &str) -> bool {
        false
    }
}
