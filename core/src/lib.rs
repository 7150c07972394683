//! Core of the conductor dependency-graph scheduler.
//!
//! Consumers should import from [`api`]; the other modules are public for
//! embedders that need lower-level pieces (graph building, planning, state).

pub mod api;
pub mod config;
pub mod error;
pub mod executor;
pub mod input;
pub mod state;
