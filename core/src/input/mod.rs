//! Input Processing Module
//!
//! Parses workflow documents into `WorkItem` lists:
//! - Structured TOML/JSON workflows (multi-task with dependencies)
//! - Plain text (auto-wrapped as a single prompt task)

mod parser;

pub use parser::{InputFormat, InputParser, WorkflowFile, PLAIN_TEXT_TASK_ID};
