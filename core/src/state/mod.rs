//! # 运行状态模块
//!
//! 负责单次调度运行中的节点状态、状态转换规则以及检查点持久化。
//!
//! ## 设计原则
//!
//! 1. **单写者**：`RunState` 仅由调度引擎在批次合并时修改
//! 2. **状态机**：节点终态不可再转换，非法转换返回 `TransitionError`
//! 3. **故障恢复**：通过 `CheckpointStore` 保存快照并在恢复时重建状态

pub mod checkpoint;
pub mod run_state;
pub mod snapshot;
pub mod transitions;
pub mod types;

pub use checkpoint::{CheckpointStore, InMemoryCheckpointStore};
pub use run_state::{NodeState, RunCounts, RunState};
pub use snapshot::{CheckpointInfo, FileCheckpointStore, RunSnapshot};
pub use transitions::{NodeTransition, TransitionError};
pub use types::{NodeStatus, RunStatus};
