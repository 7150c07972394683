pub mod context;
pub mod renderers;
pub mod strategies;

pub use context::inject_dependency_outputs;
pub use renderers::{JsonlRendererPlugin, TextRendererPlugin};
pub use strategies::{ExponentialBackoffPlugin, LinearRetryPlugin};
