//! 节点状态转换规则和验证

use super::types::NodeStatus;
use thiserror::Error;

/// 状态转换错误
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransitionError {
    #[error("Invalid transition for node {node_id}: {from} -> {to}")]
    InvalidTransition {
        node_id: String,
        from: NodeStatus,
        to: NodeStatus,
    },
    #[error("Node {node_id} is already terminal ({state})")]
    FromTerminalState { node_id: String, state: NodeStatus },
    #[error("Unknown node: {0}")]
    UnknownNode(String),
}

/// 节点状态转换
pub struct NodeTransition;

impl NodeTransition {
    /// 验证状态转换是否合法
    ///
    /// `pending -> running -> {completed | failed}`，
    /// `pending -> {skipped | cancelled}`；终态不可再转换。
    pub fn validate(node_id: &str, from: NodeStatus, to: NodeStatus) -> Result<(), TransitionError> {
        if from.is_terminal() {
            return Err(TransitionError::FromTerminalState {
                node_id: node_id.to_string(),
                state: from,
            });
        }

        let is_valid = match (from, to) {
            (NodeStatus::Pending, NodeStatus::Running) => true,
            (NodeStatus::Pending, NodeStatus::Skipped) => true,
            (NodeStatus::Pending, NodeStatus::Cancelled) => true,
            (NodeStatus::Running, NodeStatus::Completed) => true,
            (NodeStatus::Running, NodeStatus::Failed) => true,
            // 已派发的节点由于上游失败而不会执行
            (NodeStatus::Running, NodeStatus::Skipped) => true,
            _ => false,
        };

        if is_valid {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition {
                node_id: node_id.to_string(),
                from,
                to,
            })
        }
    }

    /// 判断是否为终态
    pub fn is_terminal(status: NodeStatus) -> bool {
        status.is_terminal()
    }
}
