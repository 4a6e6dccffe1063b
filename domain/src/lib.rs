//! Domain layer for conductor
//!
//! This crate contains the core types and pure state machines of the tool
//! orchestration engine. It has no dependencies on infrastructure,
//! presentation, or an async runtime.
//!
//! # Core Concepts
//!
//! ## Tools
//!
//! A tool is a uniformly invokable unit of work described by a
//! [`ToolDescriptor`]: parameter schema, timeout, cacheability, and the
//! dependency groups it relies on. Descriptors live in the [`ToolRegistry`].
//!
//! ## Fault isolation
//!
//! - **Circuit breaker**: one [`CircuitBreaker`] per tool stops calls to a
//!   failing dependency for a cooldown period
//! - **Dependency groups**: tools sharing an external resource are probed as a
//!   unit; each [`DependencyGroup`] keeps a rolling health score
//!
//! ## Chains
//!
//! A [`ChainDefinition`] runs tools in order, feeding each output to the next
//! step, and yields a [`ChainSynthesis`] or a [`ChainFailure`].

pub mod chain;
pub mod core;
pub mod health;
pub mod resilience;
pub mod tool;
pub mod util;

// Re-export commonly used types
pub use chain::{
    ChainDefinition, ChainFailure, ChainOutcome, ChainStepSpec, ChainSynthesis, StepRecord,
    StepStatus,
};
pub use core::error::{ErrorKind, RegistryError, ToolError};
pub use health::{DEFAULT_EMA_WEIGHT, DependencyGroup, GroupId, ProbeOutcome};
pub use resilience::{Admission, BreakerPolicy, BreakerSnapshot, CircuitBreaker, CircuitState};
pub use tool::{
    CallerIdentity, Complexity, Execution, ExecutionId, ExecutionState, FieldViolation,
    PREVIOUS_RESULT, ParamSpec, ParamType, ParamValidator, SchemaValidator, ToolCategory,
    ToolDescriptor, ToolParams, ToolRegistry, ViolationReason, canonical_json, params_digest,
    params_from_value,
};
