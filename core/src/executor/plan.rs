use serde::{Deserialize, Serialize};

use crate::error::ExecutorError;

use super::graph::DependencyGraph;
use super::levels::LevelPlanner;
use super::types::ConcurrencyConfig;

/// Limit used when neither an explicit value nor auto-detection is configured.
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelMode {
    Parallel,
    Sequential,
}

/// One level of the plan with its concurrency-bounded batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLevel {
    pub level: i32,
    pub node_ids: Vec<String>,
    pub mode: LevelMode,
    /// Each batch holds at most `ExecutionPlan::concurrency` ids
    pub batches: Vec<Vec<String>>,
}

/// Ordered levels and batches the engine drives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub levels: Vec<ExecutionLevel>,
    /// Resolved concurrency limit
    pub concurrency: usize,
    pub total_nodes: usize,
}

impl ExecutionPlan {
    pub fn batch_count(&self) -> usize {
        self.levels.iter().map(|l| l.batches.len()).sum()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Level ids in plan order, the shape older renderers expect
    pub fn stages(&self) -> Vec<Vec<String>> {
        self.levels.iter().map(|l| l.node_ids.clone()).collect()
    }
}

/// Resolve the effective concurrency limit.
///
/// An explicit `max_parallel` is clamped to `[1, max_concurrency]`. Otherwise
/// auto-detection derives `floor(cpu_count * multiplier)` clamped to
/// `[min_concurrency, max_concurrency]`; with auto-detection off the limit is
/// `DEFAULT_CONCURRENCY`.
pub fn resolve_concurrency(config: &ConcurrencyConfig, cpu_count: usize) -> usize {
    let upper = config.max_concurrency.max(1);

    if let Some(explicit) = config.max_parallel {
        return explicit.clamp(1, upper);
    }

    if config.auto_detect {
        let multiplier = if config.multiplier.is_finite() && config.multiplier > 0.0 {
            config.multiplier
        } else {
            1.0
        };
        let derived = (cpu_count.max(1) as f64 * multiplier).floor() as usize;
        let lower = config.min_concurrency.max(1).min(upper);
        return derived.clamp(lower, upper);
    }

    DEFAULT_CONCURRENCY
}

/// Turns a leveled graph into ordered, concurrency-bounded batches.
pub struct ExecutionPlanner;

impl ExecutionPlanner {
    /// Plan with a limit resolved from `config` and the host CPU count.
    pub fn plan(
        graph: &DependencyGraph,
        config: &ConcurrencyConfig,
    ) -> Result<ExecutionPlan, ExecutorError> {
        Self::plan_with_limit(graph, resolve_concurrency(config, num_cpus::get()))
    }

    /// Plan with an already resolved limit.
    ///
    /// A level whose nodes all allow parallel execution is chunked in order into
    /// batches of at most `limit` ids. A single node with `parallel_allowed ==
    /// false` serializes its whole level into one-node batches.
    pub fn plan_with_limit(
        graph: &DependencyGraph,
        limit: usize,
    ) -> Result<ExecutionPlan, ExecutorError> {
        let limit = limit.max(1);
        let mut levels = Vec::new();

        for (level, node_ids) in LevelPlanner::levels(graph)?.into_iter().enumerate() {
            if node_ids.is_empty() {
                continue;
            }

            let all_parallel = node_ids
                .iter()
                .all(|id| graph.node(id).map(|n| n.parallel_allowed).unwrap_or(true));

            let (mode, batches) = if all_parallel {
                let batches = node_ids.chunks(limit).map(<[String]>::to_vec).collect();
                (LevelMode::Parallel, batches)
            } else {
                let batches = node_ids.iter().map(|id| vec![id.clone()]).collect();
                (LevelMode::Sequential, batches)
            };

            levels.push(ExecutionLevel {
                level: level as i32,
                node_ids,
                mode,
                batches,
            });
        }

        Ok(ExecutionPlan {
            levels,
            concurrency: limit,
            total_nodes: graph.len(),
        })
    }
}
