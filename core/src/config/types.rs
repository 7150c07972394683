use serde::{Deserialize, Serialize};

pub use crate::executor::types::{
    CheckpointConfig, ConcurrencyConfig, ExecutorConfig, RetryConfig,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub codecli: CodeCliConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "conductor_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

/// How run events are rendered on stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// "text" or "jsonl"
    #[serde(default = "default_output_format")]
    pub format: String,

    #[serde(default)]
    pub pretty_print: bool,

    /// ASCII-only markers (no Unicode)
    #[serde(default)]
    pub ascii_only: bool,

    /// Draw indicatif progress bars (text format only)
    #[serde(default)]
    pub progress_bar: bool,
}

fn default_output_format() -> String {
    "text".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_output_format(),
            pretty_print: false,
            ascii_only: false,
            progress_bar: false,
        }
    }
}

/// Code-CLI agent used for `prompt` payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeCliConfig {
    #[serde(default = "default_codecli_bin")]
    pub bin: String,

    /// Arguments placed before the prompt
    #[serde(default = "default_codecli_args")]
    pub args: Vec<String>,

    /// Flag used to pass `model` from the payload, e.g. "--model"
    #[serde(default = "default_model_flag")]
    pub model_flag: String,

    /// Max bytes of stdout kept per task
    #[serde(default = "default_capture_bytes")]
    pub capture_bytes: usize,
}

fn default_codecli_bin() -> String {
    "codex".to_string()
}

fn default_codecli_args() -> Vec<String> {
    vec!["exec".to_string()]
}

fn default_model_flag() -> String {
    "--model".to_string()
}

fn default_capture_bytes() -> usize {
    65536
}

impl Default for CodeCliConfig {
    fn default() -> Self {
        Self {
            bin: default_codecli_bin(),
            args: default_codecli_args(),
            model_flag: default_model_flag(),
            capture_bytes: default_capture_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert!(cfg.logging.enabled);
        assert!(!cfg.logging.file);
        assert!(cfg.executor.continue_on_failure);
        assert_eq!(cfg.executor.task_timeout_secs, 300);
        assert_eq!(cfg.output.format, "text");
        assert_eq!(cfg.codecli.bin, "codex");
        assert_eq!(cfg.codecli.args, vec!["exec"]);
        assert_eq!(cfg.codecli.capture_bytes, 65536);
    }

    #[test]
    fn nested_executor_tables() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [executor]
            continue_on_failure = false
            timeout_secs = 120

            [executor.retry]
            strategy = "linear"
            max_attempts = 3

            [executor.checkpoint]
            interval = 2
            session_id = "nightly"

            [output]
            format = "jsonl"
            "#,
        )
        .unwrap();

        assert!(!cfg.executor.continue_on_failure);
        assert_eq!(cfg.executor.timeout_secs, Some(120));
        assert_eq!(cfg.executor.retry.strategy, "linear");
        assert_eq!(cfg.executor.retry.base_delay_ms, 100);
        assert_eq!(cfg.executor.checkpoint.interval, 2);
        assert_eq!(cfg.executor.checkpoint.session_id, "nightly");
        assert_eq!(cfg.output.format, "jsonl");
    }
}
