use conductor_core::api::{
    prepare_graph, AppConfig, CliError, ExecutionPlan, ExecutionPlanner, InputParser, LevelMode,
};

use super::cli::PlanArgs;

pub fn handle_plan(mut cfg: AppConfig, args: PlanArgs) -> Result<i32, CliError> {
    if let Some(n) = args.max_parallel {
        cfg.executor.concurrency.max_parallel = Some(n);
    }

    let workflow = InputParser::load(&args.workflow)?;
    let graph = prepare_graph(&workflow.tasks)?;
    let plan = ExecutionPlanner::plan(&graph, &cfg.executor.concurrency)?;

    if args.json {
        let json = serde_json::to_string_pretty(&plan)
            .map_err(|e| CliError::Command(format!("failed to serialize plan: {e}")))?;
        println!("{json}");
    } else {
        print!("{}", render_plan(workflow.display_name(), &plan));
    }
    Ok(0)
}

pub fn render_plan(name: &str, plan: &ExecutionPlan) -> String {
    let mut out = format!(
        "{name}: {} tasks, {} levels, {} batches (concurrency {})\n",
        plan.total_nodes,
        plan.level_count(),
        plan.batch_count(),
        plan.concurrency
    );
    for level in &plan.levels {
        let mode = match level.mode {
            LevelMode::Parallel => "parallel",
            LevelMode::Sequential => "sequential",
        };
        out.push_str(&format!("level {} [{mode}]\n", level.level));
        for (i, batch) in level.batches.iter().enumerate() {
            out.push_str(&format!("  batch {}: {}\n", i + 1, batch.join(", ")));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::api::WorkItem;

    #[test]
    fn renders_levels_and_batches() {
        let items = vec![
            WorkItem::new("a"),
            WorkItem::new("b").depends_on(["a"]),
            WorkItem::new("c").depends_on(["a"]),
        ];
        let graph = prepare_graph(&items).unwrap();
        let plan = ExecutionPlanner::plan_with_limit(&graph, 1).unwrap();
        let text = render_plan("demo", &plan);

        assert!(text.starts_with("demo: 3 tasks, 2 levels, 3 batches (concurrency 1)"));
        assert!(text.contains("level 0 [parallel]\n  batch 1: a\n"));
        assert!(text.contains("level 1 [parallel]\n  batch 1: b\n  batch 2: c\n"));
    }
}
