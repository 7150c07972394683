use conductor_core::api::{EventSink, NodeStatus, RunStatus, SchedulerEvent};

/// Prints human-readable run progress on stdout.
pub struct TextRendererPlugin {
    ascii_only: bool,
}

impl TextRendererPlugin {
    pub fn new(ascii_only: bool) -> Self {
        Self { ascii_only }
    }

    fn marker(&self, status: NodeStatus) -> &'static str {
        match (status, self.ascii_only) {
            (NodeStatus::Completed, true) => "OK",
            (NodeStatus::Completed, false) => "✓",
            (NodeStatus::Failed, true) => "FAIL",
            (NodeStatus::Failed, false) => "✗",
            (NodeStatus::Skipped, true) => "SKIP",
            (NodeStatus::Skipped, false) => "↷",
            (NodeStatus::Cancelled, true) => "CANCEL",
            (NodeStatus::Cancelled, false) => "⊘",
            (_, true) => "..",
            (_, false) => "…",
        }
    }

    fn run_status(&self, status: RunStatus) -> &'static str {
        match status {
            RunStatus::Completed => "SUCCESS",
            RunStatus::Failed => "FAILED",
            RunStatus::Cancelled => "CANCELLED",
            RunStatus::Running => "RUNNING",
        }
    }

    /// `None` for events that are not worth a line.
    fn format_event(&self, event: &SchedulerEvent) -> Option<String> {
        let line = match event {
            SchedulerEvent::RunStarted {
                run_id,
                total_nodes,
                total_levels,
                concurrency,
                restored,
                ..
            } => {
                let mut line = format!(
                    "RUN START {} (tasks: {}, levels: {}, concurrency: {})",
                    run_id, total_nodes, total_levels, concurrency
                );
                if *restored > 0 {
                    line.push_str(&format!(", restored {} from checkpoint", restored));
                }
                line
            }
            SchedulerEvent::PlanReady { run_id, plan } => {
                let mut out = format!("PLAN {}:", run_id);
                for level in &plan.levels {
                    let batches: Vec<String> =
                        level.batches.iter().map(|b| format!("[{}]", b.join(", "))).collect();
                    out.push_str(&format!(
                        "\n  level {} ({:?}): {}",
                        level.level,
                        level.mode,
                        batches.join(" ")
                    ));
                }
                out
            }
            SchedulerEvent::LevelStarted {
                level, node_count, ..
            } => format!("LEVEL {} START (tasks: {})", level, node_count),
            SchedulerEvent::BatchStarted { .. } | SchedulerEvent::NodeStarted { .. } => {
                return None;
            }
            SchedulerEvent::NodeRetry {
                node_id,
                attempt,
                delay_ms,
                error,
                ..
            } => format!(
                "  retry {} (attempt {}, in {}ms): {}",
                node_id, attempt, delay_ms, error
            ),
            SchedulerEvent::NodeFinished { entry, .. } => {
                let mut line = format!(
                    "  {} {} ({}ms)",
                    self.marker(entry.status),
                    entry.display_name(),
                    entry.duration_ms
                );
                if entry.attempts > 1 {
                    line.push_str(&format!(", retries {}", entry.attempts - 1));
                }
                if let Some(err) = &entry.error {
                    line.push_str(&format!(": {}", err));
                }
                line
            }
            SchedulerEvent::LevelFinished { summary, .. } => format!(
                "LEVEL {} END (completed {}, failed {}, skipped {}, cancelled {}, {}ms)",
                summary.level,
                summary.completed,
                summary.failed,
                summary.skipped,
                summary.cancelled,
                summary.duration_ms
            ),
            SchedulerEvent::CheckpointSaved { .. } => return None,
            SchedulerEvent::RunFinished {
                run_id,
                status,
                counts,
                duration_ms,
            } => format!(
                "RUN END {} {} (completed {}, failed {}, skipped {}, cancelled {}, duration {}ms)",
                run_id,
                self.run_status(*status),
                counts.completed,
                counts.failed,
                counts.skipped,
                counts.cancelled,
                duration_ms
            ),
        };
        Some(line)
    }
}

impl EventSink for TextRendererPlugin {
    fn name(&self) -> &str {
        "text-renderer"
    }

    fn emit(&self, event: &SchedulerEvent) {
        if let Some(line) = self.format_event(event) {
            println!("{}", line);
        }
    }
}
