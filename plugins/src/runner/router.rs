use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use conductor_core::api::{GraphNode, PayloadKind, RunContext, TaskError, TaskExecutor, TaskOutput};

/// Dispatches each node to the executor registered for its payload kind.
#[derive(Clone, Default)]
pub struct PayloadRouter {
    routes: BTreeMap<PayloadKind, Arc<dyn TaskExecutor>>,
}

impl PayloadRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `executor` for `kind`, replacing any previous route.
    pub fn route(mut self, kind: PayloadKind, executor: Arc<dyn TaskExecutor>) -> Self {
        self.routes.insert(kind, executor);
        self
    }

    /// Register `executor` for every kind it reports as supported.
    pub fn route_supported(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        for kind in [
            PayloadKind::Command,
            PayloadKind::Prompt,
            PayloadKind::Json,
            PayloadKind::Noop,
        ] {
            if executor.supports(kind) {
                self.routes.insert(kind, executor.clone());
            }
        }
        self
    }

    pub fn kinds(&self) -> Vec<PayloadKind> {
        self.routes.keys().copied().collect()
    }
}

#[async_trait]
impl TaskExecutor for PayloadRouter {
    fn name(&self) -> &str {
        "router"
    }

    fn supports(&self, kind: PayloadKind) -> bool {
        self.routes.contains_key(&kind)
    }

    async fn execute(&self, node: &GraphNode, ctx: &RunContext) -> Result<TaskOutput, TaskError> {
        let Some(executor) = self.routes.get(&node.kind()) else {
            return Err(TaskError::InvalidPayload(format!(
                "no executor registered for '{}'",
                node.kind()
            )));
        };
        tracing::debug!(node_id = %node.id, executor = executor.name(), "routing task");
        executor.execute(node, ctx).await
    }
}
