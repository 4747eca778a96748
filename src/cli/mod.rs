// file: src/cli/mod.rs
// version: 2.0.0
// guid: 5d1f8a34-b2c9-4e76-a018-9e3c7b4d2f65

//! Command line interface for the cluster install agent

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};
pub use commands::*;
