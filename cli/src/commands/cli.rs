use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Jsonl,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Jsonl => "jsonl",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "conductor", version, about = "Dependency-graph task scheduler")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.conductor/config.toml, then ./conductor.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Workflow file (.toml, .json; .txt/.md run as a single prompt)
    pub workflow: PathBuf,

    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Stop dispatching after the first failed batch
    #[arg(long)]
    pub fail_fast: bool,

    /// Overall run timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    #[arg(long)]
    pub run_id: Option<String>,

    /// Checkpoint session namespace
    #[arg(long)]
    pub session: Option<String>,

    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    #[arg(long)]
    pub no_checkpoint: bool,

    #[arg(long)]
    pub checkpoint_dir: Option<PathBuf>,

    /// Save a checkpoint every N batches
    #[arg(long)]
    pub checkpoint_interval: Option<usize>,

    /// Show progress bars (text output only)
    #[arg(long)]
    pub progress: bool,

    /// Complete every task without executing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ResumeArgs {
    #[command(flatten)]
    pub run_args: RunArgs,

    /// Restore completed tasks without re-checking their dependencies
    #[arg(long)]
    pub trust_checkpoint: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PlanArgs {
    pub workflow: PathBuf,

    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ValidateArgs {
    pub workflow: PathBuf,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct CheckpointsArgs {
    #[arg(long)]
    pub session: Option<String>,

    #[arg(long)]
    pub checkpoint_dir: Option<PathBuf>,

    /// Delete the listed checkpoints (requires --session)
    #[arg(long, requires = "session")]
    pub clear: bool,

    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a workflow
    Run(RunArgs),
    /// Resume a run from its checkpoint (requires --run-id)
    Resume(ResumeArgs),
    /// Show levels and batches without executing
    Plan(PlanArgs),
    /// Check a workflow for duplicate ids, missing dependencies and cycles
    Validate(ValidateArgs),
    /// List or clear stored checkpoints
    Checkpoints(CheckpointsArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_flags() {
        let args = Args::try_parse_from([
            "conductor",
            "run",
            "flow.toml",
            "--max-parallel",
            "3",
            "--fail-fast",
            "--format",
            "jsonl",
            "--timeout",
            "60",
        ])
        .unwrap();
        let Commands::Run(run) = args.command else {
            panic!("expected run");
        };
        assert_eq!(run.workflow, PathBuf::from("flow.toml"));
        assert_eq!(run.max_parallel, Some(3));
        assert!(run.fail_fast);
        assert_eq!(run.format, Some(OutputFormat::Jsonl));
        assert_eq!(run.timeout, Some(60));
    }

    #[test]
    fn resume_flattens_run_args() {
        let args = Args::try_parse_from([
            "conductor",
            "resume",
            "flow.toml",
            "--run-id",
            "r1",
            "--trust-checkpoint",
            "--config",
            "c.toml",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("c.toml")));
        let Commands::Resume(resume) = args.command else {
            panic!("expected resume");
        };
        assert_eq!(resume.run_args.run_id.as_deref(), Some("r1"));
        assert!(resume.trust_checkpoint);
    }

    #[test]
    fn clear_requires_session() {
        assert!(Args::try_parse_from(["conductor", "checkpoints", "--clear"]).is_err());
        assert!(Args::try_parse_from(["conductor", "checkpoints", "--clear", "--session", "s"]).is_ok());
    }
}
