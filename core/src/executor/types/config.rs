use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Runtime options for a single scheduler run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Run identity. A UUID is generated when absent.
    pub run_id: Option<String>,

    /// Checkpoint namespace; runs with the same id in different sessions do not collide.
    pub session_id: String,

    pub concurrency: ConcurrencyConfig,

    /// Keep running independent branches after a failure.
    pub continue_on_failure: bool,

    /// Overall wall-clock limit, checked at every level boundary.
    pub timeout: Option<Duration>,

    /// Save a checkpoint after every N applied batches (always at run end).
    pub checkpoint_interval: usize,

    /// Rehydrate state from the checkpoint store before running.
    pub resume: bool,

    /// Restore persisted `completed` nodes without re-validating their dependencies.
    pub trust_checkpoint: bool,

    /// Cooperative cancellation, observed at level and batch boundaries only.
    pub cancel: CancellationToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            run_id: None,
            session_id: default_session_id(),
            concurrency: ConcurrencyConfig::default(),
            continue_on_failure: true,
            timeout: None,
            checkpoint_interval: 1,
            resume: false,
            trust_checkpoint: false,
            cancel: CancellationToken::new(),
        }
    }
}

impl RunOptions {
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.concurrency.max_parallel = Some(max_parallel);
        self
    }

    pub fn with_continue_on_failure(mut self, continue_on_failure: bool) -> Self {
        self.continue_on_failure = continue_on_failure;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = interval.max(1);
        self
    }

    pub fn resuming(mut self, trust_checkpoint: bool) -> Self {
        self.resume = true;
        self.trust_checkpoint = trust_checkpoint;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Executor section of the application config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "default_continue_on_failure")]
    pub continue_on_failure: bool,

    /// Overall run timeout in seconds; 0 or absent disables it.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Default per-task timeout for subprocess-backed executors.
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,

    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub checkpoint: CheckpointConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            continue_on_failure: default_continue_on_failure(),
            timeout_secs: None,
            task_timeout_secs: default_task_timeout_secs(),
            concurrency: ConcurrencyConfig::default(),
            retry: RetryConfig::default(),
            checkpoint: CheckpointConfig::default(),
        }
    }
}

impl ExecutorConfig {
    /// Build engine run options from config. Identity and cancellation are left at defaults.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            session_id: self.checkpoint.session_id.clone(),
            concurrency: self.concurrency.clone(),
            continue_on_failure: self.continue_on_failure,
            timeout: self
                .timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            checkpoint_interval: self.checkpoint.interval.max(1),
            trust_checkpoint: self.checkpoint.trust_checkpoint,
            ..RunOptions::default()
        }
    }
}

fn default_continue_on_failure() -> bool {
    true
}

fn default_task_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Explicit limit; clamped to `[1, max_concurrency]`.
    #[serde(default)]
    pub max_parallel: Option<usize>,
    #[serde(default = "default_auto_detect")]
    pub auto_detect: bool,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_min_concurrency")]
    pub min_concurrency: usize,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_parallel: None,
            auto_detect: default_auto_detect(),
            multiplier: default_multiplier(),
            min_concurrency: default_min_concurrency(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_auto_detect() -> bool {
    true
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_min_concurrency() -> usize {
    2
}

fn default_max_concurrency() -> usize {
    16
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_strategy")]
    pub strategy: String,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Total attempts per node, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: default_retry_strategy(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_retry_strategy() -> String {
    "none".to_string()
}

fn default_base_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    5000
}

fn default_max_attempts() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default = "default_checkpoint_enabled")]
    pub enabled: bool,
    /// Checkpoint directory; defaults to `<data dir>/checkpoints`.
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default = "default_checkpoint_interval")]
    pub interval: usize,
    #[serde(default)]
    pub trust_checkpoint: bool,
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            enabled: default_checkpoint_enabled(),
            directory: None,
            interval: default_checkpoint_interval(),
            trust_checkpoint: false,
            session_id: default_session_id(),
        }
    }
}

fn default_checkpoint_enabled() -> bool {
    true
}

fn default_checkpoint_interval() -> usize {
    1
}

fn default_session_id() -> String {
    "default".to_string()
}
