//! 单次运行的可变状态
//!
//! `RunState` 在运行期间只由调度引擎持有和修改；
//! 交给 `CheckpointStore` 的总是它的不可变引用（快照）。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::transitions::{NodeTransition, TransitionError};
use super::types::{NodeStatus, RunStatus};
use crate::executor::timeline::Timeline;
use crate::executor::types::TaskOutput;

/// 单个节点的状态及元数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub status: NodeStatus,
    /// 完成时的输出
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskOutput>,
    /// 失败原因或跳过/取消原因
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 已使用的重试次数
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// 终态计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: usize,
}

impl RunCounts {
    pub fn terminal(&self) -> usize {
        self.completed + self.failed + self.skipped + self.cancelled
    }

    fn bump(&mut self, status: NodeStatus) {
        match status {
            NodeStatus::Completed => self.completed += 1,
            NodeStatus::Failed => self.failed += 1,
            NodeStatus::Skipped => self.skipped += 1,
            NodeStatus::Cancelled => self.cancelled += 1,
            NodeStatus::Pending | NodeStatus::Running => {}
        }
    }
}

/// 一次运行的完整状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    pub session_id: String,
    /// node_id -> 状态；序列化为扁平 JSON 对象
    pub nodes: BTreeMap<String, NodeState>,
    pub counts: RunCounts,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    #[serde(default)]
    pub timeline: Timeline,
    /// 已合并的批次数
    #[serde(default)]
    pub batches_applied: usize,
}

impl RunState {
    pub fn new(run_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            session_id: session_id.into(),
            nodes: BTreeMap::new(),
            counts: RunCounts::default(),
            started_at: Utc::now(),
            completed_at: None,
            status: RunStatus::Running,
            timeline: Timeline::default(),
            batches_applied: 0,
        }
    }

    /// 注册节点（初始为 pending）
    pub fn register<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            self.nodes.entry(id.into()).or_default();
        }
        self.recount();
    }

    pub fn node(&self, id: &str) -> Option<&NodeState> {
        self.nodes.get(id)
    }

    pub fn status_of(&self, id: &str) -> Option<NodeStatus> {
        self.nodes.get(id).map(|n| n.status)
    }

    pub fn is_completed(&self, id: &str) -> bool {
        self.status_of(id) == Some(NodeStatus::Completed)
    }

    /// 按转换规则修改节点状态，并维护计数
    pub fn transition(&mut self, id: &str, to: NodeStatus) -> Result<&mut NodeState, TransitionError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| TransitionError::UnknownNode(id.to_string()))?;
        NodeTransition::validate(id, node.status, to)?;
        node.status = to;
        self.counts.bump(to);
        Ok(node)
    }

    /// 重新计算计数（恢复检查点后使用）
    pub fn recount(&mut self) {
        let mut counts = RunCounts {
            total: self.nodes.len(),
            ..RunCounts::default()
        };
        for node in self.nodes.values() {
            counts.bump(node.status);
        }
        self.counts = counts;
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.status == NodeStatus::Pending)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn has_status(&self, status: NodeStatus) -> bool {
        self.nodes.values().any(|n| n.status == status)
    }

    /// 所有节点均已到达终态
    pub fn is_settled(&self) -> bool {
        self.nodes.values().all(|n| n.status.is_terminal())
    }

    /// 由节点终态推导运行状态：有失败即失败，其次取消，否则完成
    pub fn derive_status(&self) -> RunStatus {
        if self.has_status(NodeStatus::Failed) {
            RunStatus::Failed
        } else if self.has_status(NodeStatus::Cancelled) {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        }
    }

    /// 标记运行结束
    pub fn finish(&mut self) -> RunStatus {
        self.status = self.derive_status();
        self.completed_at = Some(Utc::now());
        self.status
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
