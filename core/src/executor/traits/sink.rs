use std::sync::Arc;

use serde::Serialize;

use crate::executor::plan::ExecutionPlan;
use crate::executor::timeline::TimelineEntry;
use crate::state::{RunCounts, RunStatus};

/// 事件接收器（进度展示、日志、渲染）
///
/// `emit` is called from the run driver and must not block.
pub trait EventSink: Send + Sync {
    fn name(&self) -> &str {
        "sink"
    }
    fn emit(&self, event: &SchedulerEvent);
}

/// Per-level counts carried by `LevelFinished`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LevelSummary {
    pub level: i32,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub duration_ms: u64,
}

/// 调度事件（统一事件类型）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum SchedulerEvent {
    RunStarted {
        run_id: String,
        total_nodes: usize,
        total_levels: usize,
        concurrency: usize,
        resumed: bool,
        restored: usize,
    },
    PlanReady {
        run_id: String,
        plan: ExecutionPlan,
    },
    LevelStarted {
        run_id: String,
        level: i32,
        node_count: usize,
        batch_count: usize,
    },
    BatchStarted {
        run_id: String,
        level: i32,
        batch: usize,
        node_ids: Vec<String>,
    },
    NodeStarted {
        run_id: String,
        node_id: String,
        level: i32,
    },
    NodeRetry {
        run_id: String,
        node_id: String,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },
    NodeFinished {
        run_id: String,
        entry: TimelineEntry,
    },
    LevelFinished {
        run_id: String,
        summary: LevelSummary,
    },
    CheckpointSaved {
        run_id: String,
        batches_applied: usize,
    },
    RunFinished {
        run_id: String,
        status: RunStatus,
        counts: RunCounts,
        duration_ms: u64,
    },
}

impl SchedulerEvent {
    pub fn run_id(&self) -> &str {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::PlanReady { run_id, .. }
            | Self::LevelStarted { run_id, .. }
            | Self::BatchStarted { run_id, .. }
            | Self::NodeStarted { run_id, .. }
            | Self::NodeRetry { run_id, .. }
            | Self::NodeFinished { run_id, .. }
            | Self::LevelFinished { run_id, .. }
            | Self::CheckpointSaved { run_id, .. }
            | Self::RunFinished { run_id, .. } => run_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run.start",
            Self::PlanReady { .. } => "executor.plan",
            Self::LevelStarted { .. } => "level.start",
            Self::BatchStarted { .. } => "batch.start",
            Self::NodeStarted { .. } => "task.start",
            Self::NodeRetry { .. } => "task.retry",
            Self::NodeFinished { .. } => "task.end",
            Self::LevelFinished { .. } => "level.end",
            Self::CheckpointSaved { .. } => "checkpoint.saved",
            Self::RunFinished { .. } => "run.end",
        }
    }
}

/// Fans one event out to every registered sink.
#[derive(Clone, Default)]
pub struct EventFanout {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl EventFanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for EventFanout {
    fn name(&self) -> &str {
        "fanout"
    }

    fn emit(&self, event: &SchedulerEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
