use std::collections::{HashMap, HashSet};

use crate::error::ExecutorError;
use crate::executor::types::{PayloadKind, TaskLike, TaskPayload};

/// Level value of a node that has not been through `LevelPlanner` yet.
pub const UNASSIGNED_LEVEL: i32 = -1;

/// One node of the dependency graph, derived from a work item.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,

    pub label: Option<String>,

    /// Direct dependencies, de-duplicated, in declaration order
    pub dependencies: Vec<String>,

    /// Direct dependents (reverse edges), in insertion order
    pub dependents: Vec<String>,

    /// Assigned by `LevelPlanner`; `UNASSIGNED_LEVEL` until then
    pub level: i32,

    pub parallel_allowed: bool,

    pub payload: TaskPayload,
}

impl GraphNode {
    pub fn kind(&self) -> PayloadKind {
        self.payload.kind()
    }

    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

/// Task dependency graph (DAG)
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Nodes in original insertion order
    nodes: Vec<GraphNode>,

    index: HashMap<String, usize>,

    /// Forward edges: node_id -> nodes that depend on it
    pub adjacency: HashMap<String, Vec<String>>,

    /// Reverse edges: node_id -> its dependencies
    pub reverse_adjacency: HashMap<String, Vec<String>>,

    pub max_level: i32,

    pub has_cycles: bool,

    /// Every distinct cycle found by `GraphBuilder::detect_cycles`
    pub cycles: Vec<Vec<String>>,
}

impl DependencyGraph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        match self.index.get(id) {
            Some(&i) => self.nodes.get_mut(i),
            None => None,
        }
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter()
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut GraphNode> {
        self.nodes.iter_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    /// Insertion position, used for stable ordering
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn dependents_of(&self, id: &str) -> &[String] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dependencies_of(&self, id: &str) -> &[String] {
        self.reverse_adjacency
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn roots(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(|n| n.dependencies.is_empty())
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.dependencies.len()).sum()
    }
}

/// Builds and validates `DependencyGraph`s.
pub struct GraphBuilder;

impl GraphBuilder {
    /// Construct the graph from a flat list of work items.
    ///
    /// Fails on duplicate ids and on dependencies that reference unknown ids.
    /// Cycles are not checked here; call `detect_cycles` before planning levels.
    ///
    /// # Time Complexity
    ///
    /// O(V + E) where V = number of items, E = number of declared dependencies
    pub fn build<T: TaskLike>(items: &[T]) -> Result<DependencyGraph, ExecutorError> {
        let mut graph = DependencyGraph {
            max_level: UNASSIGNED_LEVEL,
            ..Default::default()
        };

        for item in items {
            let id = item.id().to_string();
            if graph.index.contains_key(&id) {
                return Err(ExecutorError::DuplicateId(id));
            }
            graph.index.insert(id.clone(), graph.nodes.len());
            graph.nodes.push(GraphNode {
                id,
                label: item.label().map(str::to_string),
                dependencies: Vec::new(),
                dependents: Vec::new(),
                level: UNASSIGNED_LEVEL,
                parallel_allowed: item.parallel_allowed(),
                payload: item.payload().cloned().unwrap_or_default(),
            });
        }

        for item in items {
            let node_id = item.id();
            let mut seen = HashSet::new();
            let mut deps = Vec::with_capacity(item.dependencies().len());

            for dep in item.dependencies() {
                if !graph.index.contains_key(dep) {
                    return Err(ExecutorError::DanglingDependency {
                        node_id: node_id.to_string(),
                        missing: dep.clone(),
                    });
                }
                if seen.insert(dep.as_str()) {
                    deps.push(dep.clone());
                }
            }

            for dep in &deps {
                graph
                    .adjacency
                    .entry(dep.clone())
                    .or_default()
                    .push(node_id.to_string());
            }
            graph
                .reverse_adjacency
                .insert(node_id.to_string(), deps.clone());
            if let Some(node) = graph.node_mut(node_id) {
                node.dependencies = deps;
            }
        }

        let adjacency = graph.adjacency.clone();
        for node in graph.nodes_mut() {
            if let Some(dependents) = adjacency.get(&node.id) {
                node.dependents = dependents.clone();
            }
        }

        Ok(graph)
    }

    /// Detect circular dependencies with an iterative DFS.
    ///
    /// Records every distinct cycle on the graph (`has_cycles`, `cycles`) and
    /// fails with `CyclicDependency` if any was found. Each cycle is rotated so
    /// that its smallest id comes first. The walk keeps its own frame stack, so
    /// chain depth is bounded by memory rather than the thread stack.
    ///
    /// # Time Complexity
    ///
    /// O(V + E) plus the length of the reported cycles
    pub fn detect_cycles(graph: &mut DependencyGraph) -> Result<(), ExecutorError> {
        let found = find_cycles(graph);

        graph.has_cycles = !found.is_empty();
        graph.cycles = found.clone();

        if found.is_empty() {
            Ok(())
        } else {
            Err(ExecutorError::CyclicDependency { cycles: found })
        }
    }
}

/// Three-colour DFS over forward edges.
///
/// `frames` is the current path; each frame holds the node and the index of
/// the next dependent to visit. `on_path` mirrors `frames` for back-edge checks.
fn find_cycles(graph: &DependencyGraph) -> Vec<Vec<String>> {
    let mut visited: HashSet<&str> = HashSet::with_capacity(graph.len());
    let mut on_path: HashSet<&str> = HashSet::new();
    let mut frames: Vec<(&str, usize)> = Vec::new();
    let mut found: Vec<Vec<String>> = Vec::new();
    let mut seen_cycles: HashSet<Vec<String>> = HashSet::new();

    for root in graph.ids() {
        if !visited.insert(root) {
            continue;
        }
        on_path.insert(root);
        frames.push((root, 0));

        while let Some((node, next_idx)) = frames.last_mut() {
            let Some(next) = graph.dependents_of(*node).get(*next_idx) else {
                on_path.remove(*node);
                frames.pop();
                continue;
            };
            *next_idx += 1;
            let next = next.as_str();

            if on_path.contains(next) {
                // Back edge: the path from `next` closes a cycle
                if let Some(pos) = frames.iter().position(|(id, _)| *id == next) {
                    let path: Vec<String> =
                        frames[pos..].iter().map(|(id, _)| id.to_string()).collect();
                    let cycle = canonical_cycle(&path);
                    if seen_cycles.insert(cycle.clone()) {
                        found.push(cycle);
                    }
                }
            } else if visited.insert(next) {
                on_path.insert(next);
                frames.push((next, 0));
            }
        }
    }

    found
}

fn canonical_cycle(path: &[String]) -> Vec<String> {
    let start = path
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    path[start..].iter().chain(path[..start].iter()).cloned().collect()
}
