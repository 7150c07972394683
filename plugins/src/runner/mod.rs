//! Task executors backed by local processes.

mod codecli;
mod command;
mod noop;
mod process;
mod ring;
mod router;

pub use codecli::CodeCliExecutor;
pub use command::CommandExecutor;
pub use noop::NoopExecutor;
pub use process::{
    effective_timeout_secs, run_process, ProcessOutcome, ProcessSpec, DEFAULT_TASK_TIMEOUT_SECS,
    MAX_TASK_TIMEOUT_SECS,
};
pub use ring::RingBytes;
pub use router::PayloadRouter;
