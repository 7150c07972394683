#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use conductor_core::api::{
    EventSink, GraphNode, PayloadKind, RunContext, SchedulerEvent, TaskError, TaskExecutor,
    TaskOutput, WorkItem,
};
use tokio_util::sync::CancellationToken;

/// What the fake does when a given node is executed.
#[derive(Debug, Clone)]
pub enum Script {
    Fail(String),
    /// Fail the first `n` attempts, then succeed
    FailTimes(usize),
    Sleep(Duration),
    Panic(String),
}

/// One recorded `execute` call.
#[derive(Debug, Clone)]
pub struct Call {
    pub node_id: String,
    pub attempt: u32,
    pub level: i32,
    pub dependency_outputs: Vec<String>,
}

/// Scripted executor recording every invocation.
#[derive(Default)]
pub struct FakeExecutor {
    scripts: HashMap<String, Script>,
    unsupported: HashSet<PayloadKind>,
    cancel_on: HashMap<String, CancellationToken>,
    calls: Mutex<Vec<Call>>,
    attempts: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, id: &str) -> Self {
        self.scripts
            .insert(id.to_string(), Script::Fail(format!("{id} exploded")));
        self
    }

    pub fn failing_times(mut self, id: &str, times: usize) -> Self {
        self.scripts.insert(id.to_string(), Script::FailTimes(times));
        self
    }

    pub fn sleeping(mut self, id: &str, ms: u64) -> Self {
        self.scripts
            .insert(id.to_string(), Script::Sleep(Duration::from_millis(ms)));
        self
    }

    pub fn panicking(mut self, id: &str) -> Self {
        self.scripts
            .insert(id.to_string(), Script::Panic(format!("{id} panicked")));
        self
    }

    pub fn without(mut self, kind: PayloadKind) -> Self {
        self.unsupported.insert(kind);
        self
    }

    /// Trigger `token` while `id` is executing.
    pub fn cancelling_on(mut self, id: &str, token: CancellationToken) -> Self {
        self.cancel_on.insert(id.to_string(), token);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called_ids(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.node_id).collect()
    }

    pub fn call_count(&self, id: &str) -> usize {
        self.calls().iter().filter(|c| c.node_id == id).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskExecutor for FakeExecutor {
    fn name(&self) -> &str {
        "fake"
    }

    fn supports(&self, kind: PayloadKind) -> bool {
        !self.unsupported.contains(&kind)
    }

    async fn execute(&self, node: &GraphNode, ctx: &RunContext) -> Result<TaskOutput, TaskError> {
        let mut deps: Vec<String> = ctx.dependency_outputs.keys().cloned().collect();
        deps.sort();
        self.calls.lock().unwrap().push(Call {
            node_id: node.id.clone(),
            attempt: ctx.attempt,
            level: ctx.level,
            dependency_outputs: deps,
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(token) = self.cancel_on.get(&node.id) {
            token.cancel();
        }

        let result = match self.scripts.get(&node.id) {
            Some(Script::Fail(msg)) => Err(TaskError::failed(msg.clone())),
            Some(Script::FailTimes(n)) => {
                let seen = {
                    let mut attempts = self.attempts.lock().unwrap();
                    let seen = attempts.entry(node.id.clone()).or_insert(0);
                    *seen += 1;
                    *seen
                };
                if seen <= *n {
                    Err(TaskError::failed(format!("{} flaky attempt {seen}", node.id)))
                } else {
                    Ok(TaskOutput::text(format!("out:{}", node.id)))
                }
            }
            Some(Script::Sleep(d)) => {
                tokio::time::sleep(*d).await;
                Ok(TaskOutput::text(format!("out:{}", node.id)))
            }
            Some(Script::Panic(msg)) => {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                panic!("{}", msg);
            }
            None => {
                tokio::task::yield_now().await;
                Ok(TaskOutput::text(format!("out:{}", node.id)))
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Event sink keeping every event in memory.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SchedulerEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<SchedulerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.event_type()).collect()
    }

    /// Node ids of `NodeFinished` events, in emission order.
    pub fn finished_ids(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SchedulerEvent::NodeFinished { entry, .. } => Some(entry.node_id),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn emit(&self, event: &SchedulerEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn item(id: &str, deps: &[&str]) -> WorkItem {
    WorkItem::new(id).depends_on(deps.iter().copied())
}

/// A -> B -> C -> D
pub fn linear() -> Vec<WorkItem> {
    vec![
        item("A", &[]),
        item("B", &["A"]),
        item("C", &["B"]),
        item("D", &["C"]),
    ]
}

/// A -> {B, C} -> D
pub fn diamond() -> Vec<WorkItem> {
    vec![
        item("A", &[]),
        item("B", &["A"]),
        item("C", &["A"]),
        item("D", &["B", "C"]),
    ]
}

pub fn independent(n: usize) -> Vec<WorkItem> {
    (1..=n).map(|i| item(&format!("n{i}"), &[])).collect()
}
