use chrono::Local;
use conductor_core::api::{EventSink, SchedulerEvent};
use serde_json::{json, Value};

/// Prints one JSON object per scheduler event on stdout.
pub struct JsonlRendererPlugin {
    pretty_print: bool,
}

impl JsonlRendererPlugin {
    pub fn new(pretty_print: bool) -> Self {
        Self { pretty_print }
    }

    fn event_to_json(&self, event: &SchedulerEvent) -> Value {
        let ts = Local::now().to_rfc3339();
        let event_type = event.event_type();
        let run_id = event.run_id();
        match event {
            SchedulerEvent::RunStarted {
                total_nodes,
                total_levels,
                concurrency,
                resumed,
                restored,
                ..
            } => json!({
                "v": 1,
                "event_type": event_type,
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "total_tasks": total_nodes,
                    "total_levels": total_levels,
                    "concurrency": concurrency,
                    "resumed": resumed,
                    "restored": restored,
                }
            }),
            SchedulerEvent::PlanReady { plan, .. } => json!({
                "v": 1,
                "event_type": event_type,
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "stages": plan.stages(),
                    "total_tasks": plan.total_nodes,
                    "batches": plan.batch_count(),
                    "concurrency": plan.concurrency,
                }
            }),
            SchedulerEvent::LevelStarted {
                level,
                node_count,
                batch_count,
                ..
            } => json!({
                "v": 1,
                "event_type": event_type,
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "level": level,
                    "tasks": node_count,
                    "batches": batch_count,
                }
            }),
            SchedulerEvent::BatchStarted {
                level,
                batch,
                node_ids,
                ..
            } => json!({
                "v": 1,
                "event_type": event_type,
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "level": level,
                    "batch": batch,
                    "tasks": node_ids,
                }
            }),
            SchedulerEvent::NodeStarted { node_id, level, .. } => json!({
                "v": 1,
                "event_type": event_type,
                "ts": ts,
                "run_id": run_id,
                "task_id": node_id,
                "metadata": {
                    "level": level,
                }
            }),
            SchedulerEvent::NodeRetry {
                node_id,
                attempt,
                delay_ms,
                error,
                ..
            } => json!({
                "v": 1,
                "event_type": event_type,
                "ts": ts,
                "run_id": run_id,
                "task_id": node_id,
                "metadata": {
                    "attempt": attempt,
                    "delay_ms": delay_ms,
                    "error": error,
                }
            }),
            SchedulerEvent::NodeFinished { entry, .. } => json!({
                "v": 1,
                "event_type": event_type,
                "ts": ts,
                "run_id": run_id,
                "task_id": entry.node_id,
                "status": entry.status,
                "metadata": {
                    "level": entry.level,
                    "duration_ms": entry.duration_ms,
                    "attempts": entry.attempts,
                    "retries_used": entry.attempts.saturating_sub(1),
                    "error": entry.error,
                }
            }),
            SchedulerEvent::LevelFinished { summary, .. } => json!({
                "v": 1,
                "event_type": event_type,
                "ts": ts,
                "run_id": run_id,
                "metadata": summary,
            }),
            SchedulerEvent::CheckpointSaved {
                batches_applied, ..
            } => json!({
                "v": 1,
                "event_type": event_type,
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "batches_applied": batches_applied,
                }
            }),
            SchedulerEvent::RunFinished {
                status,
                counts,
                duration_ms,
                ..
            } => json!({
                "v": 1,
                "event_type": event_type,
                "ts": ts,
                "run_id": run_id,
                "status": status,
                "metadata": {
                    "total_tasks": counts.total,
                    "completed": counts.completed,
                    "failed": counts.failed,
                    "skipped": counts.skipped,
                    "cancelled": counts.cancelled,
                    "duration_ms": duration_ms,
                }
            }),
        }
    }
}

impl EventSink for JsonlRendererPlugin {
    fn name(&self) -> &str {
        "jsonl-renderer"
    }

    fn emit(&self, event: &SchedulerEvent) {
        let value = self.event_to_json(event);
        if self.pretty_print {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".into()));
        } else {
            println!("{}", serde_json::to_string(&value).unwrap_or_else(|_| "{}".into()));
        }
    }
}
