use std::collections::HashMap;

use async_trait::async_trait;

use crate::executor::graph::GraphNode;
use crate::executor::types::{PayloadKind, TaskError, TaskOutput};

/// 任务执行器（执行单个节点的实际工作）
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// 执行器名称（唯一标识）
    fn name(&self) -> &str;

    /// 是否能执行该类负载；引擎在运行前对每个节点检查一次
    fn supports(&self, _kind: PayloadKind) -> bool {
        true
    }

    /// 执行节点。返回 `Err` 或 panic 都会被记录为节点失败，不会中断同批次的其他节点。
    async fn execute(&self, node: &GraphNode, ctx: &RunContext) -> Result<TaskOutput, TaskError>;
}

/// 执行上下文
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub run_id: String,
    pub session_id: String,
    pub level: i32,
    /// 1-based attempt number
    pub attempt: u32,
    /// Outputs of the node's direct dependencies (all completed)
    pub dependency_outputs: HashMap<String, TaskOutput>,
}

impl RunContext {
    pub fn dependency_output(&self, id: &str) -> Option<&TaskOutput> {
        self.dependency_outputs.get(id)
    }
}
