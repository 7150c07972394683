use conductor_core::api::{AppConfig, CheckpointInfo, CliError, FileCheckpointStore};
use conductor_plugins::factory;

use super::cli::CheckpointsArgs;

pub fn handle_checkpoints(mut cfg: AppConfig, args: CheckpointsArgs) -> Result<i32, CliError> {
    if let Some(dir) = &args.checkpoint_dir {
        cfg.executor.checkpoint.directory = Some(dir.to_string_lossy().to_string());
    }
    let store = FileCheckpointStore::new(factory::checkpoint_dir(&cfg.executor.checkpoint)?)?;

    if args.clear {
        // clap guarantees --session alongside --clear
        let session = args.session.as_deref().unwrap_or_default();
        let removed = store.clear_session(session)?;
        println!("removed {removed} checkpoint(s) from session '{session}'");
        return Ok(0);
    }

    let runs = store.list_runs(args.session.as_deref())?;
    if args.json {
        let json = serde_json::to_string_pretty(&runs)
            .map_err(|e| CliError::Command(format!("failed to serialize checkpoints: {e}")))?;
        println!("{json}");
    } else if runs.is_empty() {
        println!("no checkpoints under {}", store.root().display());
    } else {
        for info in &runs {
            println!("{}", format_info(info));
        }
    }
    Ok(0)
}

fn format_info(info: &CheckpointInfo) -> String {
    format!(
        "{}/{}  {}  {}/{} completed  saved {}",
        info.session_id,
        info.run_id,
        info.status.as_str(),
        info.completed,
        info.total,
        info.saved_at.format("%Y-%m-%d %H:%M:%S"),
    )
}
