use thiserror::Error;

use super::code::ErrorCode;
use crate::state::{RunState, TransitionError};

/// Errors that escape the scheduler core.
///
/// Per-node failures never show up here: they are recorded as `failed`
/// node status and drive the cascading skip instead.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Duplicate task ID: {0}")]
    DuplicateId(String),

    #[error("Dependency not found: task '{node_id}' depends on '{missing}'")]
    DanglingDependency { node_id: String, missing: String },

    #[error("Circular dependency detected: {}", format_cycles(.cycles))]
    CyclicDependency { cycles: Vec<Vec<String>> },

    #[error("No executor supports payload kind '{kind}' of task '{node_id}'")]
    UnsupportedPayload { node_id: String, kind: String },

    #[error("Run ID must not be empty")]
    EmptyRunId,

    #[error("Level not assigned for task '{0}' (run cycle detection and level planning first)")]
    LevelsNotAssigned(String),

    #[error("Run timeout of {limit_ms}ms exceeded after {elapsed_ms}ms")]
    TimeoutExceeded {
        limit_ms: u64,
        elapsed_ms: u64,
        state: Box<RunState>,
    },

    #[error("Checkpoint error: {message}")]
    Checkpoint {
        message: String,
        state: Option<Box<RunState>>,
    },

    #[error("Invalid state transition: {0}")]
    State(#[from] TransitionError),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl ExecutorError {
    /// Map executor error to protocol error code
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::DuplicateId(_) => ErrorCode::ValidationError,
            Self::DanglingDependency { .. } => ErrorCode::DependencyError,
            Self::CyclicDependency { .. } => ErrorCode::CircularDependency,
            Self::UnsupportedPayload { .. } => ErrorCode::ValidationError,
            Self::EmptyRunId => ErrorCode::ValidationError,
            Self::LevelsNotAssigned(_) => ErrorCode::InternalError,
            Self::TimeoutExceeded { .. } => ErrorCode::Timeout,
            Self::Checkpoint { .. } => ErrorCode::CheckpointError,
            Self::State(_) => ErrorCode::InternalError,
            Self::Input(_) => ErrorCode::ParseError,
            Self::Config(_) => ErrorCode::ConfigError,
        }
    }

    /// True for errors raised while building or validating the graph,
    /// before any task was dispatched.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateId(_)
                | Self::DanglingDependency { .. }
                | Self::CyclicDependency { .. }
                | Self::UnsupportedPayload { .. }
        )
    }

    /// Partial run state carried by run-level fatal errors.
    pub fn partial_state(&self) -> Option<&RunState> {
        match self {
            Self::TimeoutExceeded { state, .. } => Some(state),
            Self::Checkpoint { state, .. } => state.as_deref(),
            _ => None,
        }
    }
}

fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| {
            let mut path = cycle.clone();
            if let Some(first) = cycle.first() {
                path.push(first.clone());
            }
            path.join(" -> ")
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyclic_dependency_renders_closed_paths() {
        let err = ExecutorError::CyclicDependency {
            cycles: vec![
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
                vec!["x".to_string()],
            ],
        };
        assert_eq!(
            err.to_string(),
            "Circular dependency detected: a -> b -> c -> a; x -> x"
        );
        assert_eq!(err.error_code(), ErrorCode::CircularDependency);
        assert!(err.is_construction_error());
    }

    #[test]
    fn timeout_carries_partial_state() {
        let state = RunState::new("run-1", "default");
        let err = ExecutorError::TimeoutExceeded {
            limit_ms: 10,
            elapsed_ms: 25,
            state: Box::new(state),
        };
        assert!(!err.is_construction_error());
        assert_eq!(err.partial_state().map(|s| s.run_id.as_str()), Some("run-1"));
        assert_eq!(err.error_code(), ErrorCode::Timeout);
    }
}
