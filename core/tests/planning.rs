mod common;

use common::{diamond, independent, item};
use conductor_core::api::{
    ConcurrencyConfig, ExecutionPlanner, ExecutorError, GraphBuilder, LevelMode, LevelPlanner,
    WorkItem,
};
use conductor_core::executor::prepare_graph;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn diamond_levels_follow_longest_path() {
    let graph = prepare_graph(&diamond()).unwrap();
    let levels: Vec<(String, i32)> = graph.nodes().map(|n| (n.id.clone(), n.level)).collect();
    assert_eq!(
        levels,
        vec![
            ("A".to_string(), 0),
            ("B".to_string(), 1),
            ("C".to_string(), 1),
            ("D".to_string(), 2),
        ]
    );
    assert_eq!(graph.max_level, 2);
}

#[test]
fn node_waits_for_its_deepest_dependency() {
    // d depends on a (level 0) and c (level 2)
    let items = vec![
        item("d", &["a", "c"]),
        item("c", &["b"]),
        item("b", &["a"]),
        item("a", &[]),
    ];
    let graph = prepare_graph(&items).unwrap();
    assert_eq!(graph.node("d").unwrap().level, 3);
    assert_eq!(
        LevelPlanner::levels(&graph).unwrap(),
        vec![vec!["a"], vec!["b"], vec!["c"], vec!["d"]]
    );
}

#[test]
fn three_node_cycle_is_reported() {
    let items = vec![item("A", &["C"]), item("B", &["A"]), item("C", &["B"])];
    let mut graph = GraphBuilder::build(&items).unwrap();

    match GraphBuilder::detect_cycles(&mut graph) {
        Err(ExecutorError::CyclicDependency { cycles }) => {
            assert_eq!(cycles.len(), 1);
            let mut members = cycles[0].clone();
            members.sort();
            assert_eq!(members, vec!["A", "B", "C"]);
        }
        other => panic!("expected a cycle, got {other:?}"),
    }
    assert!(graph.has_cycles);
    assert!(LevelPlanner::assign_levels(&mut graph).is_err());
}

#[test]
fn every_distinct_cycle_is_reported() {
    let items = vec![
        item("a", &["b"]),
        item("b", &["a"]),
        item("x", &["z"]),
        item("y", &["x"]),
        item("z", &["y"]),
        item("ok", &[]),
    ];
    let err = prepare_graph(&items).unwrap_err();
    let ExecutorError::CyclicDependency { cycles } = err else {
        panic!("expected CyclicDependency");
    };
    assert_eq!(cycles.len(), 2);
    assert!(cycles.iter().any(|c| c.len() == 2 && c[0] == "a"));
    assert!(cycles.iter().any(|c| c.len() == 3 && c[0] == "x"));
}

#[test]
fn self_dependency_is_a_cycle() {
    let err = prepare_graph(&[item("solo", &["solo"])]).unwrap_err();
    assert!(matches!(err, ExecutorError::CyclicDependency { .. }));
    assert!(err.to_string().contains("solo -> solo"));
}

#[test]
fn construction_errors() {
    let dup = GraphBuilder::build(&[item("a", &[]), item("a", &[])]).unwrap_err();
    assert!(matches!(dup, ExecutorError::DuplicateId(ref id) if id == "a"));
    assert!(dup.is_construction_error());

    let dangling = GraphBuilder::build(&[item("a", &["ghost"])]).unwrap_err();
    match dangling {
        ExecutorError::DanglingDependency { node_id, missing } => {
            assert_eq!(node_id, "a");
            assert_eq!(missing, "ghost");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn parallel_level_of_five_is_batched_two_two_one() {
    let graph = prepare_graph(&independent(5)).unwrap();
    let plan = ExecutionPlanner::plan_with_limit(&graph, 2).unwrap();

    assert_eq!(plan.level_count(), 1);
    let level = &plan.levels[0];
    assert_eq!(level.mode, LevelMode::Parallel);
    assert_eq!(
        level.batches,
        vec![vec!["n1", "n2"], vec!["n3", "n4"], vec!["n5"]]
    );
    assert_eq!(plan.batch_count(), 3);
}

#[test]
fn one_sequential_node_serialises_its_level() {
    let mut items = independent(3);
    items[1] = WorkItem::new("n2").sequential();
    let graph = prepare_graph(&items).unwrap();
    let plan = ExecutionPlanner::plan_with_limit(&graph, 8).unwrap();

    assert_eq!(plan.levels[0].mode, LevelMode::Sequential);
    assert_eq!(plan.levels[0].batches, vec![vec!["n1"], vec!["n2"], vec!["n3"]]);
}

#[test]
fn plan_resolves_explicit_limit() {
    let graph = prepare_graph(&independent(6)).unwrap();
    let config = ConcurrencyConfig {
        max_parallel: Some(4),
        ..Default::default()
    };
    let plan = ExecutionPlanner::plan(&graph, &config).unwrap();
    assert_eq!(plan.concurrency, 4);
    assert_eq!(plan.batch_count(), 2);
}

#[test]
fn empty_input_plans_nothing() {
    let graph = prepare_graph::<WorkItem>(&[]).unwrap();
    let plan = ExecutionPlanner::plan_with_limit(&graph, 2).unwrap();
    assert!(plan.is_empty());
    assert_eq!(plan.total_nodes, 0);
}

#[test]
fn very_deep_chain_is_built_and_levelled() {
    const DEPTH: usize = 100_000;
    let items: Vec<WorkItem> = (0..DEPTH)
        .map(|i| {
            let node = WorkItem::new(format!("n{i}"));
            if i == 0 {
                node
            } else {
                node.depends_on([format!("n{}", i - 1)])
            }
        })
        .collect();

    let graph = prepare_graph(&items).unwrap();
    assert!(!graph.has_cycles);
    assert_eq!(graph.max_level, (DEPTH - 1) as i32);
    assert_eq!(graph.node("n99999").map(|n| n.level), Some(99_999));

    let plan = ExecutionPlanner::plan_with_limit(&graph, 4).unwrap();
    assert_eq!(plan.level_count(), DEPTH);
    assert_eq!(plan.batch_count(), DEPTH);
}

/// Random DAGs: node `i` may only depend on nodes with a smaller index.
fn dag_strategy() -> impl Strategy<Value = Vec<WorkItem>> {
    (1usize..40).prop_flat_map(|n| {
        prop::collection::vec(prop::collection::vec(any::<prop::sample::Index>(), 0..4), n)
            .prop_map(move |picks| {
                let mut items: Vec<WorkItem> = picks
                    .into_iter()
                    .enumerate()
                    .map(|(i, deps)| {
                        let deps: Vec<String> = if i == 0 {
                            Vec::new()
                        } else {
                            deps.iter().map(|ix| format!("t{}", ix.index(i))).collect()
                        };
                        WorkItem::new(format!("t{i}")).depends_on(deps)
                    })
                    .collect();
                // Input order must not matter
                items.reverse();
                items
            })
    })
}

proptest! {
    #[test]
    fn levels_are_monotonic_along_every_edge(items in dag_strategy()) {
        let graph = prepare_graph(&items).unwrap();
        for node in graph.nodes() {
            prop_assert!(node.level >= 0);
            for dep in &node.dependencies {
                let dep_level = graph.node(dep).unwrap().level;
                prop_assert!(dep_level < node.level, "{} ({}) -> {} ({})", dep, dep_level, node.id, node.level);
            }
            // Longest path: exactly one past the deepest dependency
            let deepest = node
                .dependencies
                .iter()
                .map(|d| graph.node(d).unwrap().level)
                .max();
            prop_assert_eq!(node.level, deepest.map(|l| l + 1).unwrap_or(0));
        }
    }

    #[test]
    fn batches_preserve_level_order_and_respect_limit(items in dag_strategy(), limit in 1usize..6) {
        let graph = prepare_graph(&items).unwrap();
        let plan = ExecutionPlanner::plan_with_limit(&graph, limit).unwrap();
        let mut total = 0;
        for level in &plan.levels {
            let flattened: Vec<String> = level.batches.iter().flatten().cloned().collect();
            prop_assert_eq!(&flattened, &level.node_ids);
            for batch in &level.batches {
                prop_assert!(!batch.is_empty() && batch.len() <= limit);
            }
            total += level.node_ids.len();
        }
        prop_assert_eq!(total, items.len());
    }
}
