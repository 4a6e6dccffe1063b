//! Application layer for conductor
//!
//! This crate contains the execution engine, the use cases built on it, port
//! definitions, and engine configuration. It depends only on the domain layer.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod ports;
pub mod runtime;
pub mod use_cases;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use catalog::ToolCatalog;
pub use config::{CachePolicy, ComplexityTimeouts, EngineConfig, HealthPolicy, RetryPolicy};
pub use engine::{
    BreakerBank, BreakerPermit, CacheStats, EngineState, HealthBoard, MetricsSink, ResultCache,
    ToolMetrics,
};
pub use ports::{
    execution_sink::{ExecutionSink, NoExecutionSink},
    health_probe::HealthProbe,
    tool_handler::{ExecutionContext, HandlerError, ToolHandler},
};
pub use runtime::{ConductorRuntime, RuntimeBuilder};
pub use use_cases::execute_chain::ExecuteChainUseCase;
pub use use_cases::execute_tool::{ExecuteToolUseCase, ToolOutput};
pub use use_cases::monitor_health::{GroupSweep, HealthMonitor};
pub use use_cases::snapshot::{OperationalSnapshot, SnapshotQuery};
pub use use_cases::sweep_cache::CacheSweeper;
