use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::executor::plan::ExecutionPlan;
use crate::executor::timeline::TimelineEntry;
use crate::state::{NodeStatus, RunState, RunStatus};

/// Value produced by a successful task execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput {
    /// Captured output (may be truncated by the executor)
    #[serde(default)]
    pub output: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl TaskOutput {
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            ..Default::default()
        }
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Immutable outcome of one dispatched node, merged into run state by the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutcome {
    pub node_id: String,

    /// `Completed` or `Failed`
    pub status: NodeStatus,

    pub output: Option<TaskOutput>,

    pub error: Option<String>,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,

    /// Wall time across all attempts, including retry delays
    pub duration_ms: u64,

    /// Executor invocations, 1 + retries used
    pub attempts: u32,
}

impl NodeOutcome {
    pub fn is_success(&self) -> bool {
        self.status == NodeStatus::Completed
    }

    pub fn retries_used(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Result of executing a task graph
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub run_id: String,

    pub status: RunStatus,

    /// Terminal status of every node (node_id -> status)
    pub node_statuses: BTreeMap<String, NodeStatus>,

    /// Terminal outcomes in batch-completion order
    pub timeline: Vec<TimelineEntry>,

    pub duration: Duration,

    /// Final run state, suitable for inspection or a manual resume
    pub state: RunState,

    /// Plan the run was driven by
    pub plan: ExecutionPlan,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn count(&self, status: NodeStatus) -> usize {
        self.node_statuses.values().filter(|s| **s == status).count()
    }

    pub fn output_of(&self, node_id: &str) -> Option<&TaskOutput> {
        self.state.nodes.get(node_id).and_then(|n| n.result.as_ref())
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }
}
