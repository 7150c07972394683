use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::state::{NodeStatus, RunStatus};

use super::traits::{EventSink, SchedulerEvent};

/// Visual progress monitor for a scheduler run
///
/// One overall bar counting terminal nodes plus a spinner per running node.
pub struct ProgressMonitor {
    multi: MultiProgress,
    overall: ProgressBar,
    node_bars: HashMap<String, ProgressBar>,
    enabled: bool,
    ascii: bool,
}

impl ProgressMonitor {
    /// Create a new progress monitor
    ///
    /// # Arguments
    ///
    /// * `total_nodes` - Number of nodes in the run
    /// * `enabled` - Whether to draw anything (disabled for jsonl output)
    /// * `ascii` - Use plain ASCII markers instead of Unicode symbols
    pub fn new(total_nodes: usize, enabled: bool, ascii: bool) -> Self {
        if !enabled {
            return Self {
                multi: MultiProgress::new(),
                overall: ProgressBar::hidden(),
                node_bars: HashMap::new(),
                enabled: false,
                ascii,
            };
        }

        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_nodes as u64));

        let chars = if ascii { "=> " } else { "█▓▒░  " };
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tasks ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars(chars);
        overall.set_style(style);
        overall.set_message("Starting...");

        Self {
            multi,
            overall,
            node_bars: HashMap::new(),
            enabled: true,
            ascii,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Count nodes restored from a checkpoint as already done
    pub fn advance(&self, count: usize) {
        if self.enabled {
            self.overall.inc(count as u64);
        }
    }

    /// Add a spinner for a node that started running
    pub fn start_node(&mut self, node_id: &str) {
        if !self.enabled {
            return;
        }

        let bar = self.multi.add(ProgressBar::new_spinner());
        let style = ProgressStyle::default_spinner()
            .template("  {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let style = if self.ascii {
            style.tick_strings(&["-", "\\", "|", "/", "-"])
        } else {
            style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        };
        bar.set_style(style);
        bar.set_message(node_id.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        self.node_bars.insert(node_id.to_string(), bar);
    }

    /// Record a terminal node, finishing its spinner if it had one
    pub fn finish_node(&mut self, node_id: &str, status: NodeStatus, duration_ms: u64) {
        if !self.enabled {
            return;
        }

        let icon = status_marker(status, self.ascii);
        match self.node_bars.remove(node_id) {
            Some(bar) => bar.finish_with_message(format!("{icon} {node_id} ({duration_ms}ms)")),
            None => {
                let _ = self.multi.println(format!("  {icon} {node_id} ({status})"));
            }
        }

        self.overall.inc(1);
    }

    /// Show the current level on the overall bar
    pub fn update_level(&self, level: i32, total_levels: usize) {
        if self.enabled {
            self.overall
                .set_message(format!("Level {}/{}", level + 1, total_levels));
        }
    }

    pub fn finish(&self, status: RunStatus) {
        if !self.enabled {
            return;
        }

        let msg = match (status, self.ascii) {
            (RunStatus::Completed, false) => "✅ All tasks completed",
            (RunStatus::Completed, true) => "[ok] All tasks completed",
            (RunStatus::Cancelled, _) => "Run cancelled",
            (_, false) => "❌ Execution failed",
            (_, true) => "[x] Execution failed",
        };

        self.overall.finish_with_message(msg.to_string());
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        for (_, bar) in self.node_bars.drain() {
            bar.finish_and_clear();
        }
    }
}

fn status_marker(status: NodeStatus, ascii: bool) -> &'static str {
    match (status, ascii) {
        (NodeStatus::Completed, false) => "✅",
        (NodeStatus::Failed, false) => "❌",
        (NodeStatus::Skipped, false) => "⏭",
        (NodeStatus::Cancelled, false) => "⛔",
        (NodeStatus::Completed, true) => "[ok]",
        (NodeStatus::Failed, true) => "[x]",
        (NodeStatus::Skipped, true) => "[skip]",
        (NodeStatus::Cancelled, true) => "[cancel]",
        (_, _) => "..",
    }
}

/// `EventSink` that drives a `ProgressMonitor`.
///
/// The monitor is created on `RunStarted`, once the node count is known.
pub struct ProgressSink {
    enabled: bool,
    ascii: bool,
    total_levels: Mutex<usize>,
    monitor: Mutex<Option<ProgressMonitor>>,
}

impl ProgressSink {
    pub fn new(enabled: bool, ascii: bool) -> Self {
        Self {
            enabled,
            ascii,
            total_levels: Mutex::new(0),
            monitor: Mutex::new(None),
        }
    }
}

impl EventSink for ProgressSink {
    fn name(&self) -> &str {
        "progress"
    }

    fn emit(&self, event: &SchedulerEvent) {
        let mut guard = self.monitor.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            SchedulerEvent::RunStarted {
                total_nodes,
                total_levels,
                restored,
                ..
            } => {
                let monitor = ProgressMonitor::new(*total_nodes, self.enabled, self.ascii);
                monitor.advance(*restored);
                *guard = Some(monitor);
                *self.total_levels.lock().unwrap_or_else(|e| e.into_inner()) = *total_levels;
            }
            SchedulerEvent::LevelStarted { level, .. } => {
                let total = *self.total_levels.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(monitor) = guard.as_ref() {
                    monitor.update_level(*level, total);
                }
            }
            SchedulerEvent::NodeStarted { node_id, .. } => {
                if let Some(monitor) = guard.as_mut() {
                    monitor.start_node(node_id);
                }
            }
            SchedulerEvent::NodeFinished { entry, .. } => {
                if let Some(monitor) = guard.as_mut() {
                    monitor.finish_node(&entry.node_id, entry.status, entry.duration_ms);
                }
            }
            SchedulerEvent::RunFinished { status, .. } => {
                if let Some(monitor) = guard.take() {
                    monitor.finish(*status);
                }
            }
            _ => {}
        }
    }
}
