use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One unit of work handed to the scheduler.
///
/// Work items are immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,

    /// Optional display label used by renderers and the timeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// IDs this item depends on. Duplicates are collapsed at graph build time.
    #[serde(default, alias = "dependencies")]
    pub depends_on: Vec<String>,

    /// When false the whole level this item lands in runs sequentially.
    #[serde(default = "default_parallel", alias = "parallel_allowed")]
    pub parallel: bool,

    #[serde(default)]
    pub payload: TaskPayload,
}

fn default_parallel() -> bool {
    true
}

impl WorkItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            depends_on: Vec::new(),
            parallel: true,
            payload: TaskPayload::Noop,
        }
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn with_payload(mut self, payload: TaskPayload) -> Self {
        self.payload = payload;
        self
    }
}

/// Executor-specific payload, tagged by `kind` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskPayload {
    /// Spawn a local program.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        workdir: Option<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        env: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_secs: Option<u64>,
    },
    /// Send a prompt to a code-CLI agent.
    Prompt {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        workdir: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_secs: Option<u64>,
    },
    /// Opaque structured payload for embedders.
    Json { value: serde_json::Value },
    /// Does nothing; completes immediately.
    #[default]
    Noop,
}

impl TaskPayload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Command { .. } => PayloadKind::Command,
            Self::Prompt { .. } => PayloadKind::Prompt,
            Self::Json { .. } => PayloadKind::Json,
            Self::Noop => PayloadKind::Noop,
        }
    }

    pub fn command(program: impl Into<String>, args: &[&str]) -> Self {
        Self::Command {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            workdir: None,
            env: BTreeMap::new(),
            timeout_secs: None,
        }
    }

    pub fn prompt(text: impl Into<String>) -> Self {
        Self::Prompt {
            text: text.into(),
            model: None,
            workdir: None,
            timeout_secs: None,
        }
    }
}

/// Payload capability, resolved once per node when the graph is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    Command,
    Prompt,
    Json,
    Noop,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Prompt => "prompt",
            Self::Json => "json",
            Self::Noop => "noop",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common task interface for executor graph handling.
pub trait TaskLike: Clone + Send + Sync {
    fn id(&self) -> &str;
    fn dependencies(&self) -> &[String];
    fn parallel_allowed(&self) -> bool {
        true
    }
    fn label(&self) -> Option<&str> {
        None
    }
    fn payload(&self) -> Option<&TaskPayload> {
        None
    }
}

impl TaskLike for WorkItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn dependencies(&self) -> &[String] {
        &self.depends_on
    }

    fn parallel_allowed(&self) -> bool {
        self.parallel
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn payload(&self) -> Option<&TaskPayload> {
        Some(&self.payload)
    }
}
