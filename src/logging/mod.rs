// file: src/logging/mod.rs
// version: 1.0.0
// guid: 3f8a1c6e-9b27-4d05-a4e2-6c0b7d9e1f58

//! Logging setup

pub mod logger;

pub use logger::{init_json_logger, init_logger, with_async_operation_span, with_operation_span};
