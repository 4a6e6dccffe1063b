//! Infrastructure layer for conductor
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: configuration loading, the JSONL audit sink,
//! health probes, and the builtin tools.

pub mod config;
pub mod logging;
pub mod probes;
pub mod tools;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileAuditConfig, FileConfig, FileGroupConfig,
    FileHealthConfig, FileLoggingConfig,
};
pub use logging::JsonlExecutionSink;
#[cfg(feature = "http-probe")]
pub use probes::HttpProbe;
pub use probes::StaticProbe;
pub use tools::{DEMO_GROUP, builtin_catalog, register_builtins};
