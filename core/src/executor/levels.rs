use std::collections::VecDeque;

use crate::error::ExecutorError;

use super::graph::{DependencyGraph, GraphBuilder, UNASSIGNED_LEVEL};

/// Assigns longest-path levels to an acyclic dependency graph.
pub struct LevelPlanner;

impl LevelPlanner {
    /// Assign each node its level, mutating the graph in place.
    ///
    /// Roots start at level 0. A breadth-first walk raises every dependent to
    /// `max(candidate, level + 1)` and re-enqueues it only when its level grew,
    /// so a node ends up one past its deepest dependency.
    ///
    /// Fails with `CyclicDependency` on a graph already known to be cyclic. If
    /// cycle detection was skipped and a level grows past the node count, cycle
    /// detection runs here and its error is returned.
    pub fn assign_levels(graph: &mut DependencyGraph) -> Result<(), ExecutorError> {
        if graph.has_cycles {
            return Err(ExecutorError::CyclicDependency {
                cycles: graph.cycles.clone(),
            });
        }

        let bound = graph.len() as i32;
        let mut levels: Vec<i32> = vec![UNASSIGNED_LEVEL; graph.len()];
        let mut queue: VecDeque<usize> = VecDeque::new();

        for node in graph.roots() {
            if let Some(pos) = graph.position(&node.id) {
                levels[pos] = 0;
                queue.push_back(pos);
            }
        }

        let ids: Vec<String> = graph.ids().map(str::to_string).collect();
        let mut overflowed = false;
        'walk: while let Some(pos) = queue.pop_front() {
            let current = levels[pos];
            for dependent in graph.dependents_of(&ids[pos]) {
                let Some(dpos) = graph.position(dependent) else {
                    continue;
                };
                let candidate = current + 1;
                if candidate > levels[dpos] {
                    // A level can only reach the node count by going around a cycle
                    if candidate >= bound {
                        overflowed = true;
                        break 'walk;
                    }
                    levels[dpos] = candidate;
                    queue.push_back(dpos);
                }
            }
        }

        if overflowed {
            GraphBuilder::detect_cycles(graph)?;
            return Err(ExecutorError::CyclicDependency {
                cycles: graph.cycles.clone(),
            });
        }

        let mut max_level = UNASSIGNED_LEVEL;
        for (node, level) in graph.nodes_mut().zip(levels) {
            node.level = level;
            max_level = max_level.max(level);
        }
        graph.max_level = max_level;

        // Nodes never reached from a root sit on a cycle with no entry point
        let unreached = graph
            .nodes()
            .find(|n| n.level == UNASSIGNED_LEVEL)
            .map(|n| n.id.clone());
        if let Some(id) = unreached {
            GraphBuilder::detect_cycles(graph)?;
            return Err(ExecutorError::LevelsNotAssigned(id));
        }

        Ok(())
    }

    /// Group node ids by level, preserving insertion order within a level.
    pub fn levels(graph: &DependencyGraph) -> Result<Vec<Vec<String>>, ExecutorError> {
        if graph.has_cycles {
            return Err(ExecutorError::CyclicDependency {
                cycles: graph.cycles.clone(),
            });
        }
        if graph.is_empty() {
            return Ok(Vec::new());
        }

        let mut grouped: Vec<Vec<String>> = vec![Vec::new(); (graph.max_level.max(0) + 1) as usize];
        for node in graph.nodes() {
            if node.level < 0 || node.level > graph.max_level {
                return Err(ExecutorError::LevelsNotAssigned(node.id.clone()));
            }
            grouped[node.level as usize].push(node.id.clone());
        }

        Ok(grouped)
    }
}

/// Build, validate and level a graph in one call.
pub fn prepare_graph<T: super::types::TaskLike>(
    items: &[T],
) -> Result<DependencyGraph, ExecutorError> {
    let mut graph = GraphBuilder::build(items)?;
    GraphBuilder::detect_cycles(&mut graph)?;
    LevelPlanner::assign_levels(&mut graph)?;
    Ok(graph)
}
