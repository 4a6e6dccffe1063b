//! Port definitions (interfaces for external dependencies)
//!
//! The application layer drives tools, probes and audit storage only through
//! these traits; adapters live in the infrastructure layer.

pub mod execution_sink;
pub mod health_probe;
pub mod tool_handler;
