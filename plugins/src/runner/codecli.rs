use std::time::Duration;

use async_trait::async_trait;
use conductor_core::api::{
    CodeCliConfig, GraphNode, PayloadKind, RunContext, TaskError, TaskExecutor, TaskOutput,
    TaskPayload,
};
use serde_json::json;

use super::process::{effective_timeout_secs, run_process, ProcessSpec};
use crate::executor::context::inject_dependency_outputs;

/// Prompts larger than this go through stdin instead of argv.
const MAX_ARG_PROMPT_BYTES: usize = 8 * 1024;

/// Runs `prompt` payloads through a code-CLI agent (codex, claude, gemini, ...).
pub struct CodeCliExecutor {
    config: CodeCliConfig,
    default_timeout_secs: u64,
}

impl CodeCliExecutor {
    pub fn new(config: CodeCliConfig, default_timeout_secs: u64) -> Self {
        Self {
            config,
            default_timeout_secs,
        }
    }

    /// Build the process invocation for one prompt.
    pub fn plan(&self, prompt: &str, model: Option<&str>, workdir: Option<&str>) -> ProcessSpec {
        let mut args = self.config.args.clone();
        if let Some(m) = model.map(str::trim).filter(|m| !m.is_empty()) {
            if !self.config.model_flag.is_empty() {
                args.push(self.config.model_flag.clone());
                args.push(m.to_string());
            }
        }

        let use_stdin = prompt.len() > MAX_ARG_PROMPT_BYTES || prompt.contains('\0');
        let stdin = if use_stdin {
            Some(prompt.replace('\0', ""))
        } else {
            args.push(prompt.to_string());
            None
        };

        ProcessSpec {
            program: self.config.bin.clone(),
            args,
            workdir: workdir.map(str::to_string),
            env: Default::default(),
            stdin,
        }
    }
}

#[async_trait]
impl TaskExecutor for CodeCliExecutor {
    fn name(&self) -> &str {
        "codecli"
    }

    fn supports(&self, kind: PayloadKind) -> bool {
        kind == PayloadKind::Prompt
    }

    async fn execute(&self, node: &GraphNode, ctx: &RunContext) -> Result<TaskOutput, TaskError> {
        let TaskPayload::Prompt {
            text,
            model,
            workdir,
            timeout_secs,
        } = &node.payload
        else {
            return Err(TaskError::InvalidPayload(format!(
                "codecli executor cannot run '{}' payloads",
                node.kind()
            )));
        };

        let prompt = inject_dependency_outputs(text, &ctx.dependency_outputs);
        let spec = self.plan(&prompt, model.as_deref(), workdir.as_deref());
        let timeout = effective_timeout_secs(*timeout_secs, self.default_timeout_secs);

        tracing::info!(
            run_id = %ctx.run_id,
            node_id = %node.id,
            attempt = ctx.attempt,
            bin = %spec.program,
            prompt_len = prompt.len(),
            use_stdin = spec.stdin.is_some(),
            dependencies = ctx.dependency_outputs.len(),
            "running code-cli prompt"
        );

        let outcome = run_process(&spec, Duration::from_secs(timeout), self.config.capture_bytes).await?;
        if !outcome.success() {
            return Err(TaskError::NonZeroExit {
                code: outcome.exit_code,
                stderr: outcome.stderr_tail.trim().to_string(),
            });
        }

        Ok(TaskOutput::text(outcome.stdout_tail)
            .with_exit_code(outcome.exit_code)
            .with_metadata(json!({
                "backend": self.config.bin,
                "model": model,
                "duration_ms": outcome.duration_ms,
            })))
    }
}
