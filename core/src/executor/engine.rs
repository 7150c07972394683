use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::error::ExecutorError;
use crate::state::{CheckpointStore, NodeStatus, RunState, RunStatus};

use super::graph::{DependencyGraph, GraphNode, UNASSIGNED_LEVEL};
use super::levels::prepare_graph;
use super::plan::{resolve_concurrency, ExecutionLevel, ExecutionPlan, ExecutionPlanner};
use super::scheduler::{execute_batch_parallel, Dispatch};
use super::timeline::TimelineEntry;
use super::traits::{
    EventFanout, EventSink, LevelSummary, RetryStrategyPlugin, RunContext, SchedulerEvent,
    TaskExecutor,
};
use super::types::{ExecutionResult, NodeOutcome, RunOptions, TaskLike};

const REASON_DEPENDENCY_NOT_MET: &str = "dependency not met";
const REASON_FAIL_FAST: &str = "run stopped after a failure (continue_on_failure = false)";
const REASON_CANCELLED: &str = "run cancelled";

/// Terminal status decided by the driver for a node that is not dispatched.
struct NotRun {
    node_id: String,
    status: NodeStatus,
    reason: String,
}

type SaveSet = JoinSet<anyhow::Result<usize>>;

/// Level-by-level, batch-by-batch driver for a dependency graph.
///
/// The engine is the only writer of `RunState`: concurrent branches return
/// `NodeOutcome`s and the driver merges a whole batch in one pass.
pub struct SchedulerEngine {
    executor: Arc<dyn TaskExecutor>,
    checkpoint: Option<Arc<dyn CheckpointStore>>,
    retry_strategy: Option<Arc<dyn RetryStrategyPlugin>>,
    events: EventFanout,
    cpu_count: usize,
}

pub struct SchedulerEngineBuilder {
    executor: Arc<dyn TaskExecutor>,
    checkpoint: Option<Arc<dyn CheckpointStore>>,
    retry_strategy: Option<Arc<dyn RetryStrategyPlugin>>,
    events: EventFanout,
    cpu_count: Option<usize>,
}

impl SchedulerEngine {
    pub fn new(executor: Arc<dyn TaskExecutor>) -> Self {
        SchedulerEngineBuilder::new(executor).build()
    }

    pub fn builder(executor: Arc<dyn TaskExecutor>) -> SchedulerEngineBuilder {
        SchedulerEngineBuilder::new(executor)
    }

    pub fn executor_name(&self) -> &str {
        self.executor.name()
    }

    /// Build, validate and execute `items`.
    ///
    /// Construction errors, timeouts and checkpoint failures are returned as
    /// `Err`. Node failures are not: they show up as `failed` statuses in an
    /// `Ok` result.
    #[tracing::instrument(
        name = "scheduler.run",
        skip_all,
        fields(run_id = tracing::field::Empty, nodes = items.len())
    )]
    pub async fn run<T: TaskLike>(
        &self,
        items: &[T],
        opts: RunOptions,
    ) -> Result<ExecutionResult, ExecutorError> {
        let start = Instant::now();

        let run_id = match &opts.run_id {
            Some(id) if id.trim().is_empty() => return Err(ExecutorError::EmptyRunId),
            Some(id) => id.clone(),
            None => Uuid::new_v4().to_string(),
        };
        tracing::Span::current().record("run_id", run_id.as_str());

        let graph = prepare_graph(items)?;
        self.check_support(&graph)?;

        let concurrency = resolve_concurrency(&opts.concurrency, self.cpu_count);
        let plan = ExecutionPlanner::plan_with_limit(&graph, concurrency)?;

        let mut state = RunState::new(&run_id, &opts.session_id);
        state.register(graph.ids());

        let restored = if opts.resume {
            self.restore(&graph, &plan, &mut state, opts.trust_checkpoint)
                .await?
        } else {
            0
        };

        tracing::info!(
            total_nodes = graph.len(),
            levels = plan.level_count(),
            batches = plan.batch_count(),
            concurrency,
            resumed = opts.resume,
            restored,
            "run started"
        );
        self.events.emit(&SchedulerEvent::RunStarted {
            run_id: run_id.clone(),
            total_nodes: graph.len(),
            total_levels: plan.level_count(),
            concurrency,
            resumed: opts.resume,
            restored,
        });
        self.events.emit(&SchedulerEvent::PlanReady {
            run_id: run_id.clone(),
            plan: plan.clone(),
        });

        let mut saves = SaveSet::new();
        let mut batches_since_save = 0usize;
        let mut cancelled = false;
        let mut halted = false;

        for (level_idx, level) in plan.levels.iter().enumerate() {
            if let Some(limit) = opts.timeout {
                let elapsed = start.elapsed();
                if elapsed >= limit {
                    return Err(self.abort_on_timeout(state, saves, limit, elapsed).await);
                }
            }

            if opts.cancel.is_cancelled() {
                tracing::warn!(level = level.level, "run cancelled before level");
                for remaining in &plan.levels[level_idx..] {
                    for id in &remaining.node_ids {
                        self.mark_not_run(&graph, &mut state, id, NodeStatus::Cancelled, REASON_CANCELLED)?;
                    }
                }
                cancelled = true;
                break;
            }

            let level_start = Instant::now();
            tracing::info!(
                level = level.level,
                nodes = level.node_ids.len(),
                batches = level.batches.len(),
                mode = ?level.mode,
                "level started"
            );
            self.events.emit(&SchedulerEvent::LevelStarted {
                run_id: run_id.clone(),
                level: level.level,
                node_count: level.node_ids.len(),
                batch_count: level.batches.len(),
            });

            for (batch_idx, batch) in level.batches.iter().enumerate() {
                if opts.cancel.is_cancelled() {
                    tracing::warn!(level = level.level, batch = batch_idx, "run cancelled at batch boundary");
                    for id in batch {
                        self.mark_not_run(&graph, &mut state, id, NodeStatus::Cancelled, REASON_CANCELLED)?;
                    }
                    cancelled = true;
                    break;
                }

                self.poll_saves(&mut saves, &state)?;

                let (ready, not_run) = partition_batch(&graph, &state, batch);

                let mut dispatches = Vec::with_capacity(ready.len());
                for node in ready {
                    let node_state = state.transition(&node.id, NodeStatus::Running)?;
                    node_state.started_at = Some(Utc::now());
                    self.events.emit(&SchedulerEvent::NodeStarted {
                        run_id: run_id.clone(),
                        node_id: node.id.clone(),
                        level: node.level,
                    });
                    dispatches.push(Dispatch {
                        node,
                        ctx: context_for(&state, node),
                    });
                }

                tracing::debug!(
                    level = level.level,
                    batch = batch_idx,
                    dispatched = dispatches.len(),
                    not_run = not_run.len(),
                    "dispatching batch"
                );
                self.events.emit(&SchedulerEvent::BatchStarted {
                    run_id: run_id.clone(),
                    level: level.level,
                    batch: batch_idx,
                    node_ids: dispatches.iter().map(|d| d.node.id.clone()).collect(),
                });

                let outcomes = if dispatches.is_empty() {
                    Vec::new()
                } else {
                    execute_batch_parallel(
                        dispatches,
                        self.executor.clone(),
                        self.retry_strategy.clone(),
                        plan.concurrency,
                        &self.events,
                    )
                    .await
                };

                let applied = !outcomes.is_empty() || !not_run.is_empty();
                let failed = self.apply_batch(&graph, &mut state, not_run, outcomes)?;

                if applied {
                    state.batches_applied += 1;
                    batches_since_save += 1;
                    if batches_since_save >= opts.checkpoint_interval.max(1) {
                        self.schedule_save(&mut saves, &state).await?;
                        batches_since_save = 0;
                    }
                }

                if failed && !opts.continue_on_failure {
                    tracing::warn!(
                        level = level.level,
                        batch = batch_idx,
                        "failure with continue_on_failure disabled, skipping remaining nodes"
                    );
                    self.sweep_pending(&graph, &plan, &mut state, NodeStatus::Skipped, REASON_FAIL_FAST)?;
                    halted = true;
                    break;
                }
            }

            let summary = level_summary(level, &state, level_start.elapsed());
            tracing::info!(
                level = summary.level,
                completed = summary.completed,
                failed = summary.failed,
                skipped = summary.skipped,
                cancelled = summary.cancelled,
                duration_ms = summary.duration_ms,
                "level finished"
            );
            self.events.emit(&SchedulerEvent::LevelFinished {
                run_id: run_id.clone(),
                summary,
            });

            if cancelled || halted {
                break;
            }
        }

        if cancelled {
            self.sweep_pending(&graph, &plan, &mut state, NodeStatus::Cancelled, REASON_CANCELLED)?;
        }
        debug_assert!(state.is_settled(), "nodes left pending at run end");

        let status = state.finish();

        if let Err(message) = drain_saves(&mut saves).await {
            tracing::error!(error = %message, "checkpoint save failed");
            return Err(ExecutorError::Checkpoint {
                message,
                state: Some(Box::new(state)),
            });
        }
        if let Some(store) = &self.checkpoint {
            if let Err(e) = store.save(&run_id, &opts.session_id, &state).await {
                tracing::error!(error = %e, "final checkpoint save failed");
                return Err(ExecutorError::Checkpoint {
                    message: format!("{e:#}"),
                    state: Some(Box::new(state)),
                });
            }
            tracing::debug!(batches_applied = state.batches_applied, "final checkpoint saved");
            self.events.emit(&SchedulerEvent::CheckpointSaved {
                run_id: run_id.clone(),
                batches_applied: state.batches_applied,
            });
        }

        let duration = start.elapsed();
        tracing::info!(
            status = %status,
            completed = state.counts.completed,
            failed = state.counts.failed,
            skipped = state.counts.skipped,
            cancelled = state.counts.cancelled,
            duration_ms = duration.as_millis() as u64,
            "run finished"
        );
        self.events.emit(&SchedulerEvent::RunFinished {
            run_id: run_id.clone(),
            status,
            counts: state.counts,
            duration_ms: duration.as_millis() as u64,
        });

        let node_statuses: BTreeMap<String, NodeStatus> = state
            .nodes
            .iter()
            .map(|(id, n)| (id.clone(), n.status))
            .collect();

        Ok(ExecutionResult {
            run_id,
            status,
            node_statuses,
            timeline: state.timeline.entries().to_vec(),
            duration,
            state,
            plan,
        })
    }

    /// Resolve payload capability for every node before anything runs.
    fn check_support(&self, graph: &DependencyGraph) -> Result<(), ExecutorError> {
        for node in graph.nodes() {
            if !self.executor.supports(node.kind()) {
                return Err(ExecutorError::UnsupportedPayload {
                    node_id: node.id.clone(),
                    kind: node.kind().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Rehydrate `state` from the checkpoint store. Returns the number of restored nodes.
    ///
    /// Only persisted `completed` nodes are restored. Unless `trust` is set, a node
    /// is restored only when all of its dependencies were restored as well.
    async fn restore(
        &self,
        graph: &DependencyGraph,
        plan: &ExecutionPlan,
        state: &mut RunState,
        trust: bool,
    ) -> Result<usize, ExecutorError> {
        let Some(store) = &self.checkpoint else {
            tracing::warn!("resume requested without a checkpoint store, starting fresh");
            return Ok(0);
        };

        let persisted = store
            .load(&state.run_id, &state.session_id)
            .await
            .map_err(|e| ExecutorError::Checkpoint {
                message: format!("failed to load checkpoint: {e:#}"),
                state: None,
            })?;
        let Some(persisted) = persisted else {
            tracing::info!("no checkpoint found, starting fresh");
            return Ok(0);
        };

        let mut restored: HashSet<String> = HashSet::new();
        let mut stale = 0usize;

        for level in &plan.levels {
            for id in &level.node_ids {
                let Some(saved) = persisted.nodes.get(id) else {
                    continue;
                };
                if saved.status != NodeStatus::Completed {
                    continue;
                }

                let upstream_ok = trust
                    || graph
                        .dependencies_of(id)
                        .iter()
                        .all(|dep| restored.contains(dep));
                if upstream_ok {
                    state.nodes.insert(id.clone(), saved.clone());
                    restored.insert(id.clone());
                } else {
                    stale += 1;
                    tracing::warn!(
                        node_id = %id,
                        "checkpointed node has an upstream that did not complete, re-running it"
                    );
                }
            }
        }

        let unknown = persisted
            .nodes
            .keys()
            .filter(|id| !graph.contains(id))
            .count();
        if unknown > 0 {
            tracing::warn!(unknown, "checkpoint mentions nodes that are not in the workflow");
        }

        let mut timeline = persisted.timeline;
        timeline.retain_nodes(&restored);
        state.timeline = timeline;
        state.recount();

        tracing::info!(restored = restored.len(), stale, trust, "restored run state from checkpoint");
        Ok(restored.len())
    }

    /// Merge one batch into run state and the timeline, then cascade skips.
    ///
    /// Returns true if any node of the batch failed.
    fn apply_batch(
        &self,
        graph: &DependencyGraph,
        state: &mut RunState,
        not_run: Vec<NotRun>,
        outcomes: Vec<NodeOutcome>,
    ) -> Result<bool, ExecutorError> {
        let mut cascade_from: Vec<String> = Vec::new();
        let mut failed = false;

        for skip in not_run {
            if self.mark_not_run(graph, state, &skip.node_id, skip.status, &skip.reason)? {
                cascade_from.push(skip.node_id);
            }
        }

        for outcome in outcomes {
            let retries = outcome.retries_used();
            {
                let node_state = state.transition(&outcome.node_id, outcome.status)?;
                node_state.result = outcome.output;
                node_state.error = outcome.error.clone();
                node_state.retry_count = retries;
                node_state.started_at = Some(outcome.started_at);
                node_state.finished_at = Some(outcome.finished_at);
                node_state.duration_ms = Some(outcome.duration_ms);
            }

            let node = graph.node(&outcome.node_id);
            let entry = TimelineEntry {
                node_id: outcome.node_id.clone(),
                label: node.and_then(|n| n.label.clone()),
                level: node.map(|n| n.level).unwrap_or(UNASSIGNED_LEVEL),
                status: outcome.status,
                started_at: Some(outcome.started_at),
                finished_at: outcome.finished_at,
                duration_ms: outcome.duration_ms,
                error: outcome.error,
                attempts: outcome.attempts,
            };

            if outcome.status == NodeStatus::Failed {
                tracing::warn!(
                    node_id = %entry.node_id,
                    attempts = entry.attempts,
                    error = entry.error.as_deref().unwrap_or(""),
                    "task failed"
                );
                failed = true;
                cascade_from.push(outcome.node_id);
            } else {
                tracing::debug!(
                    node_id = %entry.node_id,
                    duration_ms = entry.duration_ms,
                    "task completed"
                );
            }

            state.timeline.push(entry.clone());
            self.events.emit(&SchedulerEvent::NodeFinished {
                run_id: state.run_id.clone(),
                entry,
            });
        }

        for id in cascade_from {
            let skipped = self.cascade_skip(graph, state, &id)?;
            if skipped > 0 {
                tracing::warn!(node_id = %id, skipped, "skipped downstream tasks");
            }
        }

        Ok(failed)
    }

    /// Mark every transitive dependent of `from` that is still pending as skipped.
    ///
    /// Walks forward edges depth-first and stops at nodes that are already terminal.
    fn cascade_skip(
        &self,
        graph: &DependencyGraph,
        state: &mut RunState,
        from: &str,
    ) -> Result<usize, ExecutorError> {
        let mut skipped = 0;
        let mut stack: Vec<(String, String)> = graph
            .dependents_of(from)
            .iter()
            .rev()
            .map(|d| (d.clone(), from.to_string()))
            .collect();

        while let Some((id, cause)) = stack.pop() {
            if state.status_of(&id) != Some(NodeStatus::Pending) {
                continue;
            }
            let reason = format!("dependency '{cause}' did not complete");
            if self.mark_not_run(graph, state, &id, NodeStatus::Skipped, &reason)? {
                skipped += 1;
                for next in graph.dependents_of(&id).iter().rev() {
                    stack.push((next.clone(), id.clone()));
                }
            }
        }

        Ok(skipped)
    }

    /// Move a pending node straight to a terminal status and record it.
    ///
    /// Returns false if the node was not pending.
    fn mark_not_run(
        &self,
        graph: &DependencyGraph,
        state: &mut RunState,
        id: &str,
        status: NodeStatus,
        reason: &str,
    ) -> Result<bool, ExecutorError> {
        if state.status_of(id) != Some(NodeStatus::Pending) {
            return Ok(false);
        }

        let entry = {
            let node = graph.node(id);
            TimelineEntry::not_run(
                id,
                node.and_then(|n| n.label.clone()),
                node.map(|n| n.level).unwrap_or(UNASSIGNED_LEVEL),
                status,
                reason,
            )
        };

        let node_state = state.transition(id, status)?;
        node_state.error = Some(reason.to_string());
        node_state.finished_at = Some(entry.finished_at);
        node_state.duration_ms = Some(0);

        tracing::debug!(node_id = %id, status = %status, reason, "task not run");
        state.timeline.push(entry.clone());
        self.events.emit(&SchedulerEvent::NodeFinished {
            run_id: state.run_id.clone(),
            entry,
        });
        Ok(true)
    }

    /// Give every still-pending node `status`, in plan order.
    fn sweep_pending(
        &self,
        graph: &DependencyGraph,
        plan: &ExecutionPlan,
        state: &mut RunState,
        status: NodeStatus,
        reason: &str,
    ) -> Result<usize, ExecutorError> {
        let mut swept = 0;
        for level in &plan.levels {
            for id in &level.node_ids {
                if self.mark_not_run(graph, state, id, status, reason)? {
                    swept += 1;
                }
            }
        }
        Ok(swept)
    }

    /// Start a background checkpoint save of the current state.
    fn spawn_save(&self, saves: &mut SaveSet, state: &RunState) {
        let Some(store) = self.checkpoint.clone() else {
            return;
        };
        let snapshot = state.clone();
        let batches = state.batches_applied;
        tracing::debug!(batches_applied = batches, "checkpoint save scheduled");
        saves.spawn(async move {
            store
                .save(&snapshot.run_id, &snapshot.session_id, &snapshot)
                .await?;
            Ok(batches)
        });
    }

    /// Spawn a background save after the previous one has landed.
    ///
    /// At most one save is in flight, so snapshots reach the store in batch order
    /// and an older snapshot never overwrites a newer one.
    async fn schedule_save(&self, saves: &mut SaveSet, state: &RunState) -> Result<(), ExecutorError> {
        while let Some(joined) = saves.join_next().await {
            self.settle_save(joined, state)?;
        }
        self.spawn_save(saves, state);
        Ok(())
    }

    /// Collect finished background saves; a failed one aborts the run.
    fn poll_saves(&self, saves: &mut SaveSet, state: &RunState) -> Result<(), ExecutorError> {
        while let Some(joined) = saves.try_join_next() {
            self.settle_save(joined, state)?;
        }
        Ok(())
    }

    fn settle_save(
        &self,
        joined: Result<anyhow::Result<usize>, tokio::task::JoinError>,
        state: &RunState,
    ) -> Result<(), ExecutorError> {
        match flatten_save(joined) {
            Ok(batches_applied) => {
                self.events.emit(&SchedulerEvent::CheckpointSaved {
                    run_id: state.run_id.clone(),
                    batches_applied,
                });
                Ok(())
            }
            Err(message) => {
                tracing::error!(error = %message, "checkpoint save failed");
                Err(ExecutorError::Checkpoint {
                    message,
                    state: Some(Box::new(state.clone())),
                })
            }
        }
    }

    async fn abort_on_timeout(
        &self,
        mut state: RunState,
        mut saves: SaveSet,
        limit: Duration,
        elapsed: Duration,
    ) -> ExecutorError {
        tracing::warn!(
            limit_ms = limit.as_millis() as u64,
            elapsed_ms = elapsed.as_millis() as u64,
            "run timeout exceeded"
        );
        state.status = RunStatus::Failed;
        state.completed_at = Some(Utc::now());

        if let Err(message) = drain_saves(&mut saves).await {
            tracing::error!(error = %message, "checkpoint save failed");
        }
        if let Some(store) = &self.checkpoint {
            if let Err(e) = store.save(&state.run_id, &state.session_id, &state).await {
                tracing::error!(error = %e, "checkpoint save after timeout failed");
            }
        }

        ExecutorError::TimeoutExceeded {
            limit_ms: limit.as_millis() as u64,
            elapsed_ms: elapsed.as_millis() as u64,
            state: Box::new(state),
        }
    }
}

impl SchedulerEngineBuilder {
    pub fn new(executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            executor,
            checkpoint: None,
            retry_strategy: None,
            events: EventFanout::new(),
            cpu_count: None,
        }
    }

    pub fn checkpoint_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoint = Some(store);
        self
    }

    pub fn retry_strategy(mut self, strategy: Arc<dyn RetryStrategyPlugin>) -> Self {
        self.retry_strategy = Some(strategy);
        self
    }

    /// Add an event sink; may be called several times.
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events.push(sink);
        self
    }

    /// Override the CPU count used for concurrency auto-detection.
    pub fn cpu_count(mut self, cpus: usize) -> Self {
        self.cpu_count = Some(cpus);
        self
    }

    pub fn build(self) -> SchedulerEngine {
        SchedulerEngine {
            executor: self.executor,
            checkpoint: self.checkpoint,
            retry_strategy: self.retry_strategy,
            events: self.events,
            cpu_count: self.cpu_count.unwrap_or_else(num_cpus::get).max(1),
        }
    }
}

/// Split a batch into nodes cleared to run and nodes to skip.
///
/// Nodes that are no longer pending (restored or cascaded) are left alone.
fn partition_batch<'g>(
    graph: &'g DependencyGraph,
    state: &RunState,
    batch: &[String],
) -> (Vec<&'g GraphNode>, Vec<NotRun>) {
    let mut ready = Vec::new();
    let mut not_run = Vec::new();

    for id in batch {
        if state.status_of(id) != Some(NodeStatus::Pending) {
            continue;
        }
        let Some(node) = graph.node(id) else {
            continue;
        };
        if node.dependencies.iter().all(|dep| state.is_completed(dep)) {
            ready.push(node);
        } else {
            not_run.push(NotRun {
                node_id: id.clone(),
                status: NodeStatus::Skipped,
                reason: REASON_DEPENDENCY_NOT_MET.to_string(),
            });
        }
    }

    (ready, not_run)
}

fn context_for(state: &RunState, node: &GraphNode) -> RunContext {
    let dependency_outputs: HashMap<_, _> = node
        .dependencies
        .iter()
        .filter_map(|dep| {
            state
                .node(dep)
                .and_then(|n| n.result.clone())
                .map(|out| (dep.clone(), out))
        })
        .collect();

    RunContext {
        run_id: state.run_id.clone(),
        session_id: state.session_id.clone(),
        level: node.level,
        attempt: 1,
        dependency_outputs,
    }
}

fn level_summary(level: &ExecutionLevel, state: &RunState, elapsed: Duration) -> LevelSummary {
    let mut summary = LevelSummary {
        level: level.level,
        total: level.node_ids.len(),
        duration_ms: elapsed.as_millis() as u64,
        ..Default::default()
    };
    for id in &level.node_ids {
        match state.status_of(id) {
            Some(NodeStatus::Completed) => summary.completed += 1,
            Some(NodeStatus::Failed) => summary.failed += 1,
            Some(NodeStatus::Skipped) => summary.skipped += 1,
            Some(NodeStatus::Cancelled) => summary.cancelled += 1,
            _ => {}
        }
    }
    summary
}

fn flatten_save(
    joined: Result<anyhow::Result<usize>, tokio::task::JoinError>,
) -> Result<usize, String> {
    match joined {
        Ok(Ok(batches)) => Ok(batches),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(e) => Err(format!("checkpoint task failed: {e}")),
    }
}

/// Wait for every outstanding background save.
async fn drain_saves(saves: &mut SaveSet) -> Result<(), String> {
    let mut first_err = None;
    while let Some(joined) = saves.join_next().await {
        if let Err(message) = flatten_save(joined) {
            first_err.get_or_insert(message);
        }
    }
    match first_err {
        Some(message) => Err(message),
        None => Ok(()),
    }
}

/// Execute `items` with a default engine around `executor`.
pub async fn run<T: TaskLike>(
    items: &[T],
    executor: Arc<dyn TaskExecutor>,
    opts: RunOptions,
) -> Result<ExecutionResult, ExecutorError> {
    SchedulerEngine::new(executor).run(items, opts).await
}
