//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `conductor_core::api` instead of reaching into internal modules.

pub use crate::config::{
    get_data_dir, load_default, load_from_path, AppConfig, CheckpointConfig, CodeCliConfig,
    ConcurrencyConfig, ExecutorConfig, LoggingConfig, OutputConfig, RetryConfig,
};
pub use crate::error::{CliError, ErrorCode, ExecutorError};
pub use crate::executor::traits::{
    EventFanout, EventSink, LevelSummary, RetryStrategyPlugin, RunContext, SchedulerEvent,
    TaskExecutor,
};
pub use crate::executor::types::{
    ExecutionResult, NodeOutcome, PayloadKind, RunOptions, TaskError, TaskLike, TaskOutput,
    TaskPayload, WorkItem,
};
pub use crate::executor::{
    prepare_graph, run, DependencyGraph, ExecutionLevel, ExecutionPlan, ExecutionPlanner,
    GraphBuilder, GraphNode, LevelMode, LevelPlanner, ProgressSink, SchedulerEngine,
    SchedulerEngineBuilder, Timeline, TimelineEntry, TracingEventSink,
};
pub use crate::input::{InputFormat, InputParser, WorkflowFile};
pub use crate::state::{
    CheckpointInfo, CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore, NodeState,
    NodeStatus, RunCounts, RunState, RunStatus,
};
