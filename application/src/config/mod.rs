//! Application-level configuration.
//!
//! - [`EngineConfig`]: retry, breaker, cache, health and timeout policies
//!   shared by the engine components and background loops

pub mod engine_config;

pub use engine_config::{
    CachePolicy, ComplexityTimeouts, EngineConfig, HealthPolicy, RetryPolicy,
};
