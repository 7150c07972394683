use std::time::Duration;

use async_trait::async_trait;
use conductor_core::api::{
    GraphNode, PayloadKind, RunContext, TaskError, TaskExecutor, TaskOutput, TaskPayload,
};
use serde_json::json;

use super::process::{effective_timeout_secs, run_process, ProcessSpec, DEFAULT_TASK_TIMEOUT_SECS};

/// Runs `command` payloads as local child processes.
pub struct CommandExecutor {
    default_timeout_secs: u64,
    capture_bytes: usize,
}

impl CommandExecutor {
    pub fn new(default_timeout_secs: u64, capture_bytes: usize) -> Self {
        Self {
            default_timeout_secs,
            capture_bytes,
        }
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_TASK_TIMEOUT_SECS, 64 * 1024)
    }
}

#[async_trait]
impl TaskExecutor for CommandExecutor {
    fn name(&self) -> &str {
        "command"
    }

    fn supports(&self, kind: PayloadKind) -> bool {
        kind == PayloadKind::Command
    }

    async fn execute(&self, node: &GraphNode, ctx: &RunContext) -> Result<TaskOutput, TaskError> {
        let TaskPayload::Command {
            program,
            args,
            workdir,
            env,
            timeout_secs,
        } = &node.payload
        else {
            return Err(TaskError::InvalidPayload(format!(
                "command executor cannot run '{}' payloads",
                node.kind()
            )));
        };
        if program.trim().is_empty() {
            return Err(TaskError::InvalidPayload("empty program".to_string()));
        }

        let timeout = effective_timeout_secs(*timeout_secs, self.default_timeout_secs);
        tracing::info!(
            run_id = %ctx.run_id,
            node_id = %node.id,
            attempt = ctx.attempt,
            program = %program,
            timeout_secs = timeout,
            "running command"
        );

        let spec = ProcessSpec {
            program: program.clone(),
            args: args.clone(),
            workdir: workdir.clone(),
            env: env.clone(),
            stdin: None,
        };
        let outcome = run_process(&spec, Duration::from_secs(timeout), self.capture_bytes).await?;

        if !outcome.success() {
            return Err(TaskError::NonZeroExit {
                code: outcome.exit_code,
                stderr: outcome.stderr_tail.trim().to_string(),
            });
        }

        Ok(TaskOutput::text(outcome.stdout_tail)
            .with_exit_code(outcome.exit_code)
            .with_metadata(json!({
                "program": program,
                "duration_ms": outcome.duration_ms,
                "stderr_tail": outcome.stderr_tail,
            })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(payload: TaskPayload) -> GraphNode {
        GraphNode {
            id: "cmd".into(),
            label: None,
            dependencies: Vec::new(),
            dependents: Vec::new(),
            level: 0,
            parallel_allowed: true,
            payload,
        }
    }

    #[tokio::test]
    async fn rejects_other_payloads() {
        let exec = CommandExecutor::default();
        assert!(!exec.supports(PayloadKind::Prompt));
        let err = exec
            .execute(&node(TaskPayload::prompt("hi")), &RunContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::InvalidPayload(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_program_and_reports_exit_codes() {
        let exec = CommandExecutor::default();

        let ok = exec
            .execute(&node(TaskPayload::command("sh", &["-c", "printf done"])), &RunContext::default())
            .await
            .unwrap();
        assert_eq!(ok.output, "done");
        assert_eq!(ok.exit_code, Some(0));

        let err = exec
            .execute(
                &node(TaskPayload::command("sh", &["-c", "echo bad >&2; exit 7"])),
                &RunContext::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), Some(7));
        assert_eq!(
            err,
            TaskError::NonZeroExit {
                code: 7,
                stderr: "bad".into()
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn passes_env_and_workdir() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = std::collections::BTreeMap::new();
        env.insert("GREETING".to_string(), "hola".to_string());
        let payload = TaskPayload::Command {
            program: "sh".into(),
            args: vec!["-c".into(), "echo $GREETING; pwd".into()],
            workdir: Some(dir.path().display().to_string()),
            env,
            timeout_secs: Some(10),
        };
        let out = CommandExecutor::default()
            .execute(&node(payload), &RunContext::default())
            .await
            .unwrap();
        let lines: Vec<&str> = out.output.lines().collect();
        assert_eq!(lines[0], "hola");
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(std::path::Path::new(lines[1]).canonicalize().unwrap(), expected);
    }
}
