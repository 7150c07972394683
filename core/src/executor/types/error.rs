use thiserror::Error;

/// Per-node failure reported by a task executor.
///
/// These never escape a run: the engine records them on the node and cascades skips.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    #[error("task failed: {0}")]
    Failed(String),

    #[error("process exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("task timed out after {0}s")]
    Timeout(u64),

    #[error("failed to spawn: {0}")]
    Spawn(String),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl TaskError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::NonZeroExit { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Errors that retrying cannot fix.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidPayload(_) | Self::Panicked(_))
    }
}

impl From<std::io::Error> for TaskError {
    fn from(err: std::io::Error) -> Self {
        Self::Spawn(err.to_string())
    }
}
