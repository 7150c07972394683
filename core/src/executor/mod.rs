//! Dependency-graph task scheduler
//!
//! This module turns a flat list of work items into a leveled DAG and drives
//! it to completion:
//! - Graph construction with duplicate/dangling dependency checks
//! - Cycle detection that reports every distinct cycle
//! - Longest-path level assignment
//! - Concurrency-bounded batch planning per level
//! - Batch execution with cascading skip, fail-fast and cooperative cancellation
//! - Checkpointed resume and an append-only timeline
//!
//! # Architecture
//!
//! ```text
//! Vec<WorkItem>
//!   ↓
//! GraphBuilder::build() → detect_cycles()
//!   ↓
//! LevelPlanner::assign_levels()
//!   ↓
//! ExecutionPlanner::plan() → ExecutionPlan { levels → batches }
//!   ↓
//! SchedulerEngine::run() → TaskExecutor per batch, CheckpointStore, EventSink
//!   ↓
//! ExecutionResult
//! ```

mod engine;
mod graph;
mod levels;
mod output;
mod plan;
mod progress;
mod scheduler;
pub mod timeline;
pub mod traits;
pub mod types;

pub use engine::{run, SchedulerEngine, SchedulerEngineBuilder};
pub use graph::{DependencyGraph, GraphBuilder, GraphNode, UNASSIGNED_LEVEL};
pub use levels::{prepare_graph, LevelPlanner};
pub use output::TracingEventSink;
pub use plan::{
    resolve_concurrency, ExecutionLevel, ExecutionPlan, ExecutionPlanner, LevelMode,
    DEFAULT_CONCURRENCY,
};
pub use progress::{ProgressMonitor, ProgressSink};
pub use scheduler::{execute_batch_parallel, Dispatch};
pub use timeline::{Timeline, TimelineEntry};
pub use types::{ExecutionResult, RunOptions, TaskOutput, WorkItem};
