//! Use cases
//!
//! Application-level operations that orchestrate the engine components.

pub mod execute_chain;
pub mod execute_tool;
pub mod monitor_health;
pub mod snapshot;
pub mod sweep_cache;
