//! Input Parser
//!
//! Turns workflow files (TOML or JSON) or plain text into work items.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ExecutorError;
use crate::executor::types::{TaskPayload, WorkItem};

/// Id given to the single task produced from plain text input.
pub const PLAIN_TEXT_TASK_ID: &str = "main";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Toml,
    Json,
    /// Plain text wrapped as a single `prompt` task
    Text,
}

impl InputFormat {
    /// Guess the format from a file extension; unknown extensions are treated as TOML.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Self::Json,
            Some("txt") | Some("md") => Self::Text,
            _ => Self::Toml,
        }
    }
}

/// Workflow document: a name and a list of tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub tasks: Vec<WorkItem>,
}

impl WorkflowFile {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("workflow")
    }
}

/// Input parser for conductor
///
/// Provides a unified interface for parsing user input into `WorkItem` lists.
/// Supports two modes:
/// - **Structured mode**: a TOML or JSON workflow document with `[[tasks]]`
/// - **Plain text mode**: wraps input as a single prompt task
pub struct InputParser;

impl InputParser {
    /// Parse an in-memory document.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let wf = InputParser::parse_str(
    ///     r#"
    ///     [[tasks]]
    ///     id = "build"
    ///     [tasks.payload]
    ///     kind = "command"
    ///     program = "cargo"
    ///     args = ["build"]
    ///     "#,
    ///     InputFormat::Toml,
    /// )?;
    /// assert_eq!(wf.tasks.len(), 1);
    /// ```
    pub fn parse_str(input: &str, format: InputFormat) -> Result<WorkflowFile, ExecutorError> {
        match format {
            InputFormat::Toml => toml::from_str::<WorkflowFile>(input)
                .map_err(|e| ExecutorError::Input(format!("invalid TOML workflow: {e}"))),
            InputFormat::Json => serde_json::from_str::<WorkflowFile>(input)
                .map_err(|e| ExecutorError::Input(format!("invalid JSON workflow: {e}"))),
            InputFormat::Text => {
                let text = input.trim();
                if text.is_empty() {
                    return Err(ExecutorError::Input("empty prompt".to_string()));
                }
                Ok(WorkflowFile {
                    name: None,
                    tasks: vec![WorkItem::new(PLAIN_TEXT_TASK_ID)
                        .with_payload(TaskPayload::prompt(text))],
                })
            }
        }
    }

    /// Read and parse a workflow file, picking the format from its extension.
    pub fn load(path: impl AsRef<Path>) -> Result<WorkflowFile, ExecutorError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|e| {
            ExecutorError::Input(format!("failed to read {}: {e}", path.display()))
        })?;

        let workflow = Self::parse_str(&input, InputFormat::from_path(path)).map_err(|e| match e {
            ExecutorError::Input(msg) => ExecutorError::Input(format!("{}: {msg}", path.display())),
            other => other,
        })?;

        if workflow.tasks.is_empty() {
            tracing::warn!(path = %path.display(), "workflow contains no tasks");
        }
        Ok(workflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::types::PayloadKind;
    use pretty_assertions::assert_eq;

    const TOML_WORKFLOW: &str = r#"
name = "build-and-review"

[[tasks]]
id = "fetch"
label = "Fetch sources"
[tasks.payload]
kind = "command"
program = "git"
args = ["pull"]
timeout_secs = 60

[[tasks]]
id = "review"
depends_on = ["fetch"]
parallel = false
[tasks.payload]
kind = "prompt"
text = "Review the diff"
"#;

    #[test]
    fn test_parse_toml_workflow() {
        let wf = InputParser::parse_str(TOML_WORKFLOW, InputFormat::Toml).unwrap();
        assert_eq!(wf.display_name(), "build-and-review");
        assert_eq!(wf.tasks.len(), 2);
        assert_eq!(wf.tasks[0].payload.kind(), PayloadKind::Command);
        assert_eq!(wf.tasks[0].label.as_deref(), Some("Fetch sources"));
        assert_eq!(wf.tasks[1].depends_on, vec!["fetch"]);
        assert!(!wf.tasks[1].parallel);
        assert_eq!(wf.tasks[1].payload.kind(), PayloadKind::Prompt);
    }

    #[test]
    fn test_parse_json_workflow() {
        let wf = InputParser::parse_str(
            r#"{"tasks":[{"id":"a"},{"id":"b","dependencies":["a"],"payload":{"kind":"json","value":{"k":1}}}]}"#,
            InputFormat::Json,
        )
        .unwrap();
        assert_eq!(wf.tasks[1].depends_on, vec!["a"]);
        assert_eq!(wf.tasks[1].payload.kind(), PayloadKind::Json);
        assert_eq!(wf.tasks[0].payload.kind(), PayloadKind::Noop);
    }

    #[test]
    fn test_plain_text_becomes_single_prompt() {
        let wf = InputParser::parse_str("  explain this repo \n", InputFormat::Text).unwrap();
        assert_eq!(wf.tasks.len(), 1);
        assert_eq!(wf.tasks[0].id, PLAIN_TEXT_TASK_ID);
        assert_eq!(wf.tasks[0].payload, TaskPayload::prompt("explain this repo"));
        assert!(InputParser::parse_str("   ", InputFormat::Text).is_err());
    }

    #[test]
    fn test_unknown_payload_kind_is_input_error() {
        let err = InputParser::parse_str(
            "[[tasks]]\nid = \"a\"\n[tasks.payload]\nkind = \"teleport\"\n",
            InputFormat::Toml,
        )
        .unwrap_err();
        assert!(matches!(err, ExecutorError::Input(_)));
    }

    #[test]
    fn test_load_uses_extension_and_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("flow.json");
        std::fs::write(&good, r#"{"tasks":[{"id":"x"}]}"#).unwrap();
        assert_eq!(InputParser::load(&good).unwrap().tasks.len(), 1);

        let bad = dir.path().join("flow.toml");
        std::fs::write(&bad, "[[tasks]\n").unwrap();
        let err = InputParser::load(&bad).unwrap_err();
        assert!(err.to_string().contains("flow.toml"));

        assert!(InputParser::load(dir.path().join("missing.toml")).is_err());
    }
}
