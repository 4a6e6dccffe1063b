//! Tool handler port
//!
//! Defines the single interface a collaborator tool implements. Handlers know
//! nothing about caching, breakers, retries, or chaining; the execution
//! engine applies all of that uniformly.

use async_trait::async_trait;
use conductor_domain::{CallerIdentity, FieldViolation, ToolError, ToolParams};
use serde_json::Value;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Typed failure reported by a handler.
///
/// Classification happens here, at the source of the failure, so the engine
/// never has to guess from an error message.
#[derive(Error, Debug, Clone)]
pub enum HandlerError {
    /// Network-like failure worth one retry
    #[error("{0}")]
    Transient(String),

    /// The collaborator failed and retrying will not help
    #[error("{0}")]
    Permanent(String),

    /// The input (often a previous chain step's output) has the wrong shape
    #[error("invalid input")]
    InvalidInput { fields: Vec<FieldViolation> },
}

impl HandlerError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }

    pub fn invalid_input(fields: Vec<FieldViolation>) -> Self {
        Self::InvalidInput { fields }
    }

    /// Map into the engine's taxonomy for `tool_id`.
    pub fn into_tool_error(self, tool_id: &str) -> ToolError {
        match self {
            HandlerError::Transient(message) => ToolError::transient(tool_id, message),
            HandlerError::Permanent(message) => ToolError::permanent(tool_id, message),
            HandlerError::InvalidInput { fields } => ToolError::invalid_parameters(tool_id, fields),
        }
    }
}

/// Per-call context handed to the engine and, opaquely, to the handler.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub caller: CallerIdentity,
    /// Cancelling this token aborts the in-flight handler call
    pub cancellation: Option<CancellationToken>,
    /// Caller deadline; caps the tool's own timeout when it is sooner
    pub deadline: Option<Instant>,
}

impl ExecutionContext {
    pub fn new(caller: CallerIdentity) -> Self {
        Self {
            caller,
            cancellation: None,
            deadline: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline relative to now.
    pub fn with_time_budget(self, budget: std::time::Duration) -> Self {
        self.with_deadline(Instant::now() + budget)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// Port for invoking one tool.
///
/// Implementations live in the infrastructure layer (and in tests).
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool with validated parameters.
    async fn invoke(&self, params: &ToolParams, ctx: &ExecutionContext)
    -> Result<Value, HandlerError>;
}
