use crate::state::NodeStatus;

use super::traits::{EventSink, SchedulerEvent};

/// Forwards scheduler events to `tracing`, so a run without a renderer is still observable.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn name(&self) -> &str {
        "tracing"
    }

    fn emit(&self, event: &SchedulerEvent) {
        let event_type = event.event_type();
        match event {
            SchedulerEvent::RunStarted {
                run_id,
                total_nodes,
                total_levels,
                concurrency,
                resumed,
                restored,
            } => tracing::info!(
                target: "conductor::events",
                event_type,
                %run_id,
                total_nodes,
                total_levels,
                concurrency,
                resumed,
                restored
            ),
            SchedulerEvent::PlanReady { run_id, plan } => tracing::debug!(
                target: "conductor::events",
                event_type,
                %run_id,
                stages = ?plan.stages()
            ),
            SchedulerEvent::LevelStarted {
                run_id,
                level,
                node_count,
                batch_count,
            } => tracing::debug!(
                target: "conductor::events",
                event_type,
                %run_id,
                level,
                node_count,
                batch_count
            ),
            SchedulerEvent::BatchStarted {
                run_id,
                level,
                batch,
                node_ids,
            } => tracing::trace!(
                target: "conductor::events",
                event_type,
                %run_id,
                level,
                batch,
                ?node_ids
            ),
            SchedulerEvent::NodeStarted {
                run_id,
                node_id,
                level,
            } => tracing::debug!(target: "conductor::events", event_type, %run_id, %node_id, level),
            SchedulerEvent::NodeRetry {
                run_id,
                node_id,
                attempt,
                delay_ms,
                error,
            } => tracing::info!(
                target: "conductor::events",
                event_type,
                %run_id,
                %node_id,
                attempt,
                delay_ms,
                %error
            ),
            SchedulerEvent::NodeFinished { run_id, entry } => match entry.status {
                NodeStatus::Failed => tracing::warn!(
                    target: "conductor::events",
                    event_type,
                    %run_id,
                    node_id = %entry.node_id,
                    status = %entry.status,
                    error = entry.error.as_deref().unwrap_or("")
                ),
                _ => tracing::info!(
                    target: "conductor::events",
                    event_type,
                    %run_id,
                    node_id = %entry.node_id,
                    status = %entry.status,
                    duration_ms = entry.duration_ms
                ),
            },
            SchedulerEvent::LevelFinished { run_id, summary } => tracing::info!(
                target: "conductor::events",
                event_type,
                %run_id,
                level = summary.level,
                completed = summary.completed,
                failed = summary.failed,
                skipped = summary.skipped,
                cancelled = summary.cancelled,
                duration_ms = summary.duration_ms
            ),
            SchedulerEvent::CheckpointSaved {
                run_id,
                batches_applied,
            } => tracing::debug!(target: "conductor::events", event_type, %run_id, batches_applied),
            SchedulerEvent::RunFinished {
                run_id,
                status,
                counts,
                duration_ms,
            } => tracing::info!(
                target: "conductor::events",
                event_type,
                %run_id,
                %status,
                completed = counts.completed,
                failed = counts.failed,
                skipped = counts.skipped,
                cancelled = counts.cancelled,
                duration_ms
            ),
        }
    }
}
