//! conductor-cli library, exposes command modules for tests

pub mod commands;
