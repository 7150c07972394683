use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio::sync::Semaphore;

use crate::state::NodeStatus;

use super::graph::GraphNode;
use super::traits::{EventSink, RetryStrategyPlugin, RunContext, SchedulerEvent, TaskExecutor};
use super::types::{NodeOutcome, TaskError, TaskOutput};

// Executor panics are contained per node with `catch_unwind`, which needs unwinding.
#[cfg(panic = "abort")]
compile_error!("conductor-core must be built with panic = \"unwind\"");

/// A node cleared for execution together with its context.
pub struct Dispatch<'g> {
    pub node: &'g GraphNode,
    pub ctx: RunContext,
}

/// Execute one batch of nodes concurrently
///
/// # Arguments
///
/// * `dispatches` - Nodes that passed the dependency check, with their contexts
/// * `executor` - Collaborator performing the work
/// * `retry` - Optional retry strategy; retries stay inside the node's branch
/// * `max_concurrency` - Upper bound on simultaneous executor calls
/// * `events` - Sink for retry notifications
///
/// # Returns
///
/// One outcome per dispatched node, in completion order. Executor errors and
/// panics are converted to `Failed` outcomes and never abort sibling nodes.
pub async fn execute_batch_parallel(
    dispatches: Vec<Dispatch<'_>>,
    executor: Arc<dyn TaskExecutor>,
    retry: Option<Arc<dyn RetryStrategyPlugin>>,
    max_concurrency: usize,
    events: &dyn EventSink,
) -> Vec<NodeOutcome> {
    let sem = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut futs: FuturesUnordered<_> = FuturesUnordered::new();

    for dispatch in dispatches {
        let sem = sem.clone();
        let executor = executor.clone();
        let retry = retry.clone();

        futs.push(async move {
            // The semaphore is never closed, so acquisition only fails if that changes
            let _permit = sem.acquire_owned().await.ok();
            run_node(dispatch, executor.as_ref(), retry.as_deref(), events).await
        });
    }

    let mut outcomes = Vec::new();
    while let Some(outcome) = futs.next().await {
        outcomes.push(outcome);
    }
    outcomes
}

async fn run_node(
    dispatch: Dispatch<'_>,
    executor: &dyn TaskExecutor,
    retry: Option<&dyn RetryStrategyPlugin>,
    events: &dyn EventSink,
) -> NodeOutcome {
    let Dispatch { node, mut ctx } = dispatch;
    let started_at = Utc::now();
    let start = Instant::now();

    let max_attempts = retry.map(|s| s.max_attempts().max(1)).unwrap_or(1);

    ctx.attempt = 1;
    let mut current = execute_once(executor, node, &ctx).await;

    // Retry if needed
    let mut retries_used: u32 = 0;
    if let Some(strategy) = retry {
        let mut last_err = current.as_ref().err().cloned();
        for attempt in 1..max_attempts {
            let Some(err) = last_err.take() else {
                break;
            };
            let message = err.to_string();
            if err.is_fatal() || !strategy.should_retry(attempt, &message) {
                break;
            }

            let Some(delay) = strategy.next_delay(attempt, &message) else {
                break;
            };

            tracing::warn!(
                run_id = %ctx.run_id,
                node_id = %node.id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %message,
                "retrying task"
            );
            events.emit(&SchedulerEvent::NodeRetry {
                run_id: ctx.run_id.clone(),
                node_id: node.id.clone(),
                attempt,
                delay_ms: delay.as_millis() as u64,
                error: message,
            });

            tokio::time::sleep(delay).await;

            ctx.attempt = attempt + 1;
            retries_used = attempt;
            current = execute_once(executor, node, &ctx).await;
            last_err = current.as_ref().err().cloned();
        }
    }

    let finished_at = Utc::now();
    let duration_ms = start.elapsed().as_millis() as u64;
    let attempts = retries_used + 1;

    match current {
        Ok(output) => NodeOutcome {
            node_id: node.id.clone(),
            status: NodeStatus::Completed,
            output: Some(output),
            error: None,
            started_at,
            finished_at,
            duration_ms,
            attempts,
        },
        Err(err) => NodeOutcome {
            node_id: node.id.clone(),
            status: NodeStatus::Failed,
            output: None,
            error: Some(err.to_string()),
            started_at,
            finished_at,
            duration_ms,
            attempts,
        },
    }
}

async fn execute_once(
    executor: &dyn TaskExecutor,
    node: &GraphNode,
    ctx: &RunContext,
) -> Result<TaskOutput, TaskError> {
    match AssertUnwindSafe(executor.execute(node, ctx))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(panic) => Err(TaskError::Panicked(panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
