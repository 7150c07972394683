//! Child process execution with bounded output capture.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use conductor_core::api::TaskError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

use super::ring::RingBytes;

pub const DEFAULT_TASK_TIMEOUT_SECS: u64 = 300;
pub const MAX_TASK_TIMEOUT_SECS: u64 = 3600;

/// Per-task timeout: the payload's value, else `default_secs`, clamped to `[1, 3600]`.
pub fn effective_timeout_secs(requested: Option<u64>, default_secs: u64) -> u64 {
    requested
        .unwrap_or(default_secs)
        .clamp(1, MAX_TASK_TIMEOUT_SECS)
}

#[derive(Debug, Clone, Default)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: Option<String>,
    pub env: BTreeMap<String, String>,
    /// Written to the child's stdin, which is then closed
    pub stdin: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub exit_code: i32,
    pub stdout_tail: String,
    pub stderr_tail: String,
    pub duration_ms: u64,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run a child process to completion.
///
/// Stdout and stderr are drained concurrently into rings of `capture_bytes`.
/// On timeout the child is killed and `TaskError::Timeout` is returned.
pub async fn run_process(
    spec: &ProcessSpec,
    timeout: Duration,
    capture_bytes: usize,
) -> Result<ProcessOutcome, TaskError> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .envs(&spec.env)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .kill_on_drop(true);
    if let Some(dir) = spec.workdir.as_deref().filter(|d| !d.trim().is_empty()) {
        cmd.current_dir(dir);
    }

    let started = Instant::now();
    let mut child = cmd
        .spawn()
        .map_err(|e| TaskError::Spawn(format!("{}: {e}", spec.program)))?;
    tracing::debug!(program = %spec.program, pid = ?child.id(), "process spawned");

    if let (Some(payload), Some(mut stdin)) = (spec.stdin.clone(), child.stdin.take()) {
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                tracing::warn!(error = %e, "failed to write stdin payload");
            }
            let _ = stdin.shutdown().await;
        });
    }

    let ring_out = RingBytes::new(capture_bytes);
    let ring_err = RingBytes::new(capture_bytes);
    let out_task = child.stdout.take().map(|rd| pump(rd, ring_out.clone()));
    let err_task = child.stderr.take().map(|rd| pump(rd, ring_err.clone()));

    let waited = tokio::time::timeout(timeout, child.wait()).await;
    let status = match waited {
        Ok(res) => res?,
        Err(_) => {
            tracing::warn!(
                program = %spec.program,
                timeout_ms = timeout.as_millis() as u64,
                "process timed out, killing"
            );
            let _ = child.kill().await;
            return Err(TaskError::Timeout(timeout.as_secs().max(1)));
        }
    };

    for task in [out_task, err_task].into_iter().flatten() {
        match task.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "output stream read failed"),
            Err(e) => tracing::warn!(error = %e, "output pump task failed"),
        }
    }

    Ok(ProcessOutcome {
        exit_code: status.code().unwrap_or(-1),
        stdout_tail: ring_out.to_string_lossy(),
        stderr_tail: ring_err.to_string_lossy(),
        duration_ms: started.elapsed().as_millis() as u64,
    })
}

fn pump<R>(mut rd: R, ring: Arc<RingBytes>) -> JoinHandle<std::io::Result<u64>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; 16 * 1024];
        let mut total = 0u64;
        loop {
            let n = rd.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            ring.push(&buf[..n]);
            total += n as u64;
        }
        Ok(total)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_clamped() {
        assert_eq!(effective_timeout_secs(None, DEFAULT_TASK_TIMEOUT_SECS), 300);
        assert_eq!(effective_timeout_secs(Some(0), 300), 1);
        assert_eq!(effective_timeout_secs(Some(10_000), 300), 3600);
        assert_eq!(effective_timeout_secs(Some(42), 300), 42);
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let spec = ProcessSpec {
            program: "definitely-not-a-real-binary-xyz".into(),
            ..Default::default()
        };
        let err = run_process(&spec, Duration::from_secs(5), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Spawn(_)));
    }

    #[cfg(unix)]
    fn sh(script: &str) -> ProcessSpec {
        ProcessSpec {
            program: "sh".into(),
            args: vec!["-c".into(), script.into()],
            ..Default::default()
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_stdout_and_stderr_tails() {
        let outcome = run_process(&sh("echo hello; echo oops >&2; exit 3"), Duration::from_secs(5), 1024)
            .await
            .unwrap();
        assert_eq!(outcome.exit_code, 3);
        assert!(!outcome.success());
        assert_eq!(outcome.stdout_tail.trim(), "hello");
        assert_eq!(outcome.stderr_tail.trim(), "oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdin_payload_is_delivered() {
        let mut spec = sh("cat");
        spec.stdin = Some("from stdin".into());
        let outcome = run_process(&spec, Duration::from_secs(5), 1024).await.unwrap();
        assert_eq!(outcome.stdout_tail, "from stdin");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_process_times_out() {
        let err = run_process(&sh("sleep 5"), Duration::from_millis(100), 1024)
            .await
            .unwrap_err();
        assert_eq!(err, TaskError::Timeout(1));
    }
}
