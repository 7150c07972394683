use async_trait::async_trait;
use conductor_core::api::{
    GraphNode, PayloadKind, RunContext, TaskError, TaskExecutor, TaskOutput, TaskPayload,
};

/// Completes `noop` and `json` payloads without doing any work.
///
/// `json` payloads echo their value back as the task output, which makes the
/// executor handy for dry runs and wiring tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExecutor;

#[async_trait]
impl TaskExecutor for NoopExecutor {
    fn name(&self) -> &str {
        "noop"
    }

    fn supports(&self, kind: PayloadKind) -> bool {
        matches!(kind, PayloadKind::Noop | PayloadKind::Json)
    }

    async fn execute(&self, node: &GraphNode, _ctx: &RunContext) -> Result<TaskOutput, TaskError> {
        match &node.payload {
            TaskPayload::Noop => Ok(TaskOutput::default()),
            TaskPayload::Json { value } => {
                Ok(TaskOutput::text(value.to_string()).with_metadata(value.clone()))
            }
            other => Err(TaskError::InvalidPayload(format!(
                "noop executor cannot run '{}' payloads",
                other.kind()
            ))),
        }
    }
}
