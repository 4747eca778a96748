// file: src/lib.rs
// version: 3.0.0
// guid: 3f6a9d18-c274-4e5b-8b03-d1e7f2a4c965

//! # Cluster Install Agent
//!
//! Install-config handling for cluster installs: deprecated-field
//! conversion, defaulting and validation, state files, the bootstrap node's
//! ignition payload, and host command execution (direct, chroot, or the
//! host namespaces through `nsenter`).

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod error;
pub mod ipnet;
pub mod logging;
pub mod ops;
pub mod types;

pub use error::{InstallError, Result};

/// Version information for the utility
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
