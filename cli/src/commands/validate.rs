use conductor_core::api::{prepare_graph, CliError, InputParser, LevelPlanner};

use super::cli::ValidateArgs;

/// Construction errors (duplicates, dangling dependencies, cycles) surface as `Err`
/// and exit with the validation code.
pub fn handle_validate(args: ValidateArgs) -> Result<i32, CliError> {
    let workflow = InputParser::load(&args.workflow)?;
    let graph = prepare_graph(&workflow.tasks)?;
    let levels = LevelPlanner::levels(&graph)?;

    println!(
        "{}: ok ({} tasks, {} edges, {} levels)",
        workflow.display_name(),
        graph.len(),
        graph.edge_count(),
        levels.len()
    );
    Ok(0)
}
