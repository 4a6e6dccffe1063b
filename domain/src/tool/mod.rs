//! Tool domain module
//!
//! Defines what a tool *is* to the orchestration engine. Tools are opaque
//! units of work; the engine only sees their [`ToolDescriptor`] and a
//! uniform handler contract (defined in the application layer).
//!
//! ```text
//! ┌────────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ ToolDescriptor │───▶│ ToolParams   │───▶│ Execution    │
//! │ (registry)     │    │ (validated)  │    │ (audit)      │
//! └───────┬────────┘    └──────────────┘    └──────────────┘
//!         │
//!         ├─ category / complexity → fallback ranking, default timeout
//!         ├─ dependencies          → dependency-group health gate
//!         └─ cacheable / cache_ttl → result cache
//! ```
//!
//! # Key Types
//!
//! - [`ToolRegistry`] - catalog of descriptors, registration order preserved
//! - [`ToolDescriptor`] - immutable definition (schema, timeout, cacheability)
//! - [`ToolParams`] - parameters, with canonicalisation for cache keys
//! - [`SchemaValidator`] - pure parameter validation
//! - [`Execution`] - one invocation record (`Pending -> Running -> Completed/Failed`)

pub mod descriptor;
pub mod execution;
pub mod params;
pub mod registry;
pub mod validation;

pub use descriptor::{Complexity, ParamSpec, ParamType, ToolCategory, ToolDescriptor};
pub use execution::{CallerIdentity, Execution, ExecutionId, ExecutionState};
pub use params::{PREVIOUS_RESULT, ToolParams, canonical_json, params_digest, params_from_value};
pub use registry::ToolRegistry;
pub use validation::{FieldViolation, ParamValidator, SchemaValidator, ViolationReason};
