use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::NodeStatus;

/// Terminal outcome of one node, recorded once per node per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub node_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    pub level: i32,

    pub status: NodeStatus,

    /// Absent for nodes that never started (skipped, cancelled).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    pub finished_at: DateTime<Utc>,

    pub duration_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Executor invocations, including retries. Zero when the node never ran.
    #[serde(default)]
    pub attempts: u32,
}

impl TimelineEntry {
    /// Entry for a node that reached a terminal state without being dispatched.
    pub fn not_run(
        node_id: impl Into<String>,
        label: Option<String>,
        level: i32,
        status: NodeStatus,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            label,
            level,
            status,
            started_at: None,
            finished_at: Utc::now(),
            duration_ms: 0,
            error: Some(reason.into()),
            attempts: 0,
        }
    }

    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.node_id)
    }
}

/// Append-only record of terminal node outcomes, in batch-completion order.
///
/// Serialized as a plain array; the node-id index is rebuilt on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<TimelineEntry>", into = "Vec<TimelineEntry>")]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
    /// node_id -> position in `entries`
    index: HashMap<String, usize>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Returns false (and drops the entry) if the node already has one.
    pub fn push(&mut self, entry: TimelineEntry) -> bool {
        if self.contains(&entry.node_id) {
            tracing::warn!(node_id = %entry.node_id, "duplicate timeline entry ignored");
            return false;
        }
        self.index.insert(entry.node_id.clone(), self.entries.len());
        self.entries.push(entry);
        true
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.index.contains_key(node_id)
    }

    pub fn get(&self, node_id: &str) -> Option<&TimelineEntry> {
        self.index.get(node_id).and_then(|&pos| self.entries.get(pos))
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimelineEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn for_level(&self, level: i32) -> impl Iterator<Item = &TimelineEntry> {
        self.entries.iter().filter(move |e| e.level == level)
    }

    pub fn count(&self, status: NodeStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    /// Keep only entries for the given nodes (used when rehydrating from a checkpoint).
    pub fn retain_nodes(&mut self, keep: &HashSet<String>) {
        self.entries.retain(|e| keep.contains(&e.node_id));
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, e)| (e.node_id.clone(), pos))
            .collect();
    }
}

impl From<Vec<TimelineEntry>> for Timeline {
    /// Later duplicates of a node are dropped, as `push` would.
    fn from(entries: Vec<TimelineEntry>) -> Self {
        let mut timeline = Timeline::new();
        for entry in entries {
            timeline.push(entry);
        }
        timeline
    }
}

impl From<Timeline> for Vec<TimelineEntry> {
    fn from(timeline: Timeline) -> Self {
        timeline.entries
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a TimelineEntry;
    type IntoIter = std::slice::Iter<'a, TimelineEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_rejects_duplicate_node() {
        let mut timeline = Timeline::new();
        assert!(timeline.push(TimelineEntry::not_run("a", None, 0, NodeStatus::Skipped, "x")));
        assert!(!timeline.push(TimelineEntry::not_run("a", None, 0, NodeStatus::Cancelled, "y")));
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.get("a").map(|e| e.status), Some(NodeStatus::Skipped));
    }

    #[test]
    fn test_retain_and_level_filter() {
        let mut timeline = Timeline::new();
        timeline.push(TimelineEntry::not_run("a", None, 0, NodeStatus::Skipped, "x"));
        timeline.push(TimelineEntry::not_run("b", None, 1, NodeStatus::Skipped, "x"));
        timeline.push(TimelineEntry::not_run("c", None, 1, NodeStatus::Cancelled, "x"));

        assert_eq!(timeline.for_level(1).count(), 2);
        assert_eq!(timeline.count(NodeStatus::Skipped), 2);

        let keep: HashSet<String> = ["a".to_string(), "c".to_string()].into_iter().collect();
        timeline.retain_nodes(&keep);
        let ids: Vec<_> = timeline.iter().map(|e| e.node_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_lookups_survive_retain_and_reload() {
        let mut timeline = Timeline::new();
        for id in ["a", "b", "c"] {
            timeline.push(TimelineEntry::not_run(id, None, 0, NodeStatus::Skipped, "x"));
        }
        let keep: HashSet<String> = ["c".to_string()].into_iter().collect();
        timeline.retain_nodes(&keep);
        assert!(!timeline.contains("a"));
        assert_eq!(timeline.get("c").map(|e| e.node_id.as_str()), Some("c"));

        let json = serde_json::to_string(&timeline).unwrap();
        let mut reloaded: Timeline = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded, timeline);
        assert!(!reloaded.push(TimelineEntry::not_run("c", None, 0, NodeStatus::Cancelled, "y")));
        assert!(reloaded.push(TimelineEntry::not_run("a", None, 0, NodeStatus::Cancelled, "y")));
    }

    #[test]
    fn test_large_timeline_appends() {
        let mut timeline = Timeline::new();
        for i in 0..200_000 {
            let id = format!("n{i}");
            assert!(timeline.push(TimelineEntry::not_run(id, None, 0, NodeStatus::Skipped, "x")));
        }
        assert_eq!(timeline.len(), 200_000);
        assert!(timeline.contains("n199999"));
        assert_eq!(timeline.get("n123456").map(|e| e.node_id.as_str()), Some("n123456"));
    }

    #[test]
    fn test_serializes_as_array() {
        let mut timeline = Timeline::new();
        timeline.push(TimelineEntry::not_run("a", Some("Alpha".into()), 0, NodeStatus::Skipped, "x"));
        let value = serde_json::to_value(&timeline).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["label"], "Alpha");
        assert_eq!(timeline.entries()[0].display_name(), "Alpha");
    }
}
