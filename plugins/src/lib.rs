//! Concrete collaborators for the conductor scheduler: task executors,
//! event renderers, retry strategies, and factories building them from config.

pub mod executor;
pub mod factory;
pub mod runner;
