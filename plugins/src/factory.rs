use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};

use conductor_core::api::{
    get_data_dir, AppConfig, CheckpointConfig, CheckpointStore, EventSink, FileCheckpointStore,
    OutputConfig, PayloadKind, RetryConfig, RetryStrategyPlugin, TaskExecutor,
};

use crate::executor::{
    ExponentialBackoffPlugin, JsonlRendererPlugin, LinearRetryPlugin, TextRendererPlugin,
};
use crate::runner::{CodeCliExecutor, CommandExecutor, NoopExecutor, PayloadRouter};

/// Executor handling every payload kind: commands, code-CLI prompts, noop and json.
pub fn build_executor(cfg: &AppConfig) -> Arc<dyn TaskExecutor> {
    let task_timeout = cfg.executor.task_timeout_secs;
    let router = PayloadRouter::new()
        .route(
            PayloadKind::Command,
            Arc::new(CommandExecutor::new(task_timeout, cfg.codecli.capture_bytes)),
        )
        .route(
            PayloadKind::Prompt,
            Arc::new(CodeCliExecutor::new(cfg.codecli.clone(), task_timeout)),
        )
        .route_supported(Arc::new(NoopExecutor));
    Arc::new(router)
}

/// Executor that completes every node without side effects.
pub fn build_dry_run_executor() -> Arc<dyn TaskExecutor> {
    let noop: Arc<dyn TaskExecutor> = Arc::new(NoopExecutor);
    let router = [
        PayloadKind::Command,
        PayloadKind::Prompt,
        PayloadKind::Json,
        PayloadKind::Noop,
    ]
    .into_iter()
    .fold(PayloadRouter::new(), |r, kind| r.route(kind, noop.clone()));
    Arc::new(router)
}

pub fn build_renderer(cfg: &OutputConfig) -> Arc<dyn EventSink> {
    match cfg.format.as_str() {
        "jsonl" => Arc::new(JsonlRendererPlugin::new(cfg.pretty_print)),
        // Anything other than jsonl behaves like text.
        _ => Arc::new(TextRendererPlugin::new(cfg.ascii_only)),
    }
}

/// `None` when retries are off (`strategy = "none"` or `max_attempts <= 1`).
pub fn build_retry_strategy(cfg: &RetryConfig) -> Result<Option<Arc<dyn RetryStrategyPlugin>>> {
    match cfg.strategy.as_str() {
        "none" | "" => Ok(None),
        _ if cfg.max_attempts <= 1 => Ok(None),
        "exponential-backoff" | "exponential" => {
            Ok(Some(Arc::new(ExponentialBackoffPlugin::new(cfg.clone()))))
        }
        "linear" => Ok(Some(Arc::new(LinearRetryPlugin::new(cfg.clone())))),
        other => bail!("unknown retry strategy: {other}"),
    }
}

/// Resolve the checkpoint directory: configured value, else `<data dir>/checkpoints`.
pub fn checkpoint_dir(cfg: &CheckpointConfig) -> Result<PathBuf> {
    match cfg.directory.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => Ok(get_data_dir()?.join("checkpoints")),
    }
}

pub fn build_checkpoint_store(cfg: &CheckpointConfig) -> Result<Option<Arc<dyn CheckpointStore>>> {
    if !cfg.enabled {
        return Ok(None);
    }
    let store = FileCheckpointStore::new(checkpoint_dir(cfg)?)?;
    Ok(Some(Arc::new(store)))
}
