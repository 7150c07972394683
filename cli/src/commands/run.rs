use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use conductor_core::api::{
    AppConfig, CliError, ExecutionResult, ExecutorError, InputParser, NodeStatus, ProgressSink,
    RunStatus, SchedulerEngine, TracingEventSink,
};
use conductor_plugins::factory;

use super::cli::RunArgs;

/// Fold command-line overrides into the loaded config.
pub fn apply_run_args(cfg: &mut AppConfig, args: &RunArgs) {
    if let Some(n) = args.max_parallel {
        cfg.executor.concurrency.max_parallel = Some(n);
    }
    if args.fail_fast {
        cfg.executor.continue_on_failure = false;
    }
    if let Some(secs) = args.timeout {
        cfg.executor.timeout_secs = Some(secs);
    }
    if let Some(session) = &args.session {
        cfg.executor.checkpoint.session_id = session.clone();
    }
    if let Some(format) = args.format {
        cfg.output.format = format.as_str().to_string();
    }
    if args.no_checkpoint {
        cfg.executor.checkpoint.enabled = false;
    }
    if let Some(dir) = &args.checkpoint_dir {
        cfg.executor.checkpoint.directory = Some(dir.to_string_lossy().to_string());
    }
    if let Some(interval) = args.checkpoint_interval {
        cfg.executor.checkpoint.interval = interval;
    }
    if args.progress {
        cfg.output.progress_bar = true;
    }
}

/// Run (or resume) a workflow and map the result to a process exit code.
pub async fn handle_run(
    mut cfg: AppConfig,
    args: RunArgs,
    resume: Option<bool>,
) -> Result<i32, CliError> {
    apply_run_args(&mut cfg, &args);

    if resume.is_some() && args.run_id.is_none() {
        return Err(CliError::Command("resume requires --run-id".to_string()));
    }
    if resume.is_some() && !cfg.executor.checkpoint.enabled {
        return Err(CliError::Command(
            "resume needs checkpoints; drop --no-checkpoint".to_string(),
        ));
    }

    let workflow = InputParser::load(&args.workflow)?;
    tracing::info!(
        workflow = %workflow.display_name(),
        tasks = workflow.tasks.len(),
        "loaded workflow"
    );

    let executor = if args.dry_run {
        factory::build_dry_run_executor()
    } else {
        factory::build_executor(&cfg)
    };

    let mut builder = SchedulerEngine::builder(executor)
        .event_sink(factory::build_renderer(&cfg.output))
        .event_sink(Arc::new(TracingEventSink));
    if cfg.output.progress_bar && cfg.output.format != "jsonl" {
        builder = builder.event_sink(Arc::new(ProgressSink::new(true, cfg.output.ascii_only)));
    }
    if let Some(store) = factory::build_checkpoint_store(&cfg.executor.checkpoint)? {
        builder = builder.checkpoint_store(store);
    }
    if let Some(strategy) = factory::build_retry_strategy(&cfg.executor.retry)? {
        builder = builder.retry_strategy(strategy);
    }
    let engine = builder.build();

    let cancel = CancellationToken::new();
    let mut opts = cfg.executor.run_options().with_cancel(cancel.clone());
    if let Some(run_id) = &args.run_id {
        opts = opts.with_run_id(run_id.clone());
    }
    if let Some(trust) = resume {
        opts = opts.resuming(trust);
    }

    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling after the current batch");
            cancel.cancel();
        }
    });

    let outcome = engine.run(&workflow.tasks, opts).await;
    watcher.abort();

    match outcome {
        Ok(result) => {
            print_summary(&result);
            Ok(exit_code_for_status(result.status))
        }
        Err(e) => {
            if let ExecutorError::TimeoutExceeded {
                limit_ms,
                elapsed_ms,
                state,
            } = &e
            {
                eprintln!(
                    "run {} timed out after {elapsed_ms}ms (limit {limit_ms}ms): {} of {} tasks completed",
                    state.run_id, state.counts.completed, state.counts.total
                );
            }
            Err(e.into())
        }
    }
}

pub fn exit_code_for_status(status: RunStatus) -> i32 {
    match status {
        RunStatus::Completed => 0,
        RunStatus::Failed | RunStatus::Running => 1,
        RunStatus::Cancelled => 31,
    }
}

fn print_summary(result: &ExecutionResult) {
    eprintln!(
        "run {} {}: {} completed, {} failed, {} skipped, {} cancelled in {:.2}s",
        result.run_id,
        result.status.as_str(),
        result.count(NodeStatus::Completed),
        result.count(NodeStatus::Failed),
        result.count(NodeStatus::Skipped),
        result.count(NodeStatus::Cancelled),
        Duration::from_millis(result.duration_ms()).as_secs_f64(),
    );
}
