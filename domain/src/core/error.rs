//! Error taxonomy for tool orchestration.
//!
//! Every failure is tagged with its kind at the point where it happens: tool
//! handlers report typed failures, the engine maps deadline overruns to
//! [`ToolError::Timeout`], and the breaker produces [`ToolError::CircuitOpen`]. Downstream code decides
//! retry and breaker accounting from [`ToolError::kind`], never from messages.
//!
//! | Kind | Retried | Counts against breaker |
//! |------|:-------:|:----------------------:|
//! | `UnknownTool` | no | no |
//! | `InvalidParameters` | no | no |
//! | `DependencyUnavailable` | no | no (never reaches it) |
//! | `CircuitOpen` | no | no (already open) |
//! | `Timeout` | once | yes |
//! | `External` (transient) | once | yes |
//! | `External` (permanent) | no | yes |
//! | `Cancelled` | no | yes |

use crate::tool::validation::FieldViolation;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Discriminant of a [`ToolError`], used for classification and audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownTool,
    InvalidParameters,
    DependencyUnavailable,
    CircuitOpen,
    Timeout,
    External,
    Cancelled,
    ChainStep,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownTool => "unknown_tool",
            ErrorKind::InvalidParameters => "invalid_parameters",
            ErrorKind::DependencyUnavailable => "dependency_unavailable",
            ErrorKind::CircuitOpen => "circuit_open",
            ErrorKind::Timeout => "timeout",
            ErrorKind::External => "external",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::ChainStep => "chain_step",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure of a single tool invocation or of a chain step.
#[derive(Error, Debug, Clone)]
pub enum ToolError {
    #[error("Unknown tool: {tool_id}")]
    UnknownTool { tool_id: String },

    #[error("Invalid parameters for '{tool_id}': {}", format_violations(.fields))]
    InvalidParameters {
        tool_id: String,
        fields: Vec<FieldViolation>,
    },

    #[error("Dependency group '{group}' is unavailable for '{tool_id}' (health {health:.2})")]
    DependencyUnavailable {
        tool_id: String,
        group: String,
        health: f64,
        suggested_fallback: Option<String>,
    },

    #[error("Circuit open for '{tool_id}'")]
    CircuitOpen {
        tool_id: String,
        retry_after: Option<Duration>,
        suggested_fallback: Option<String>,
    },

    #[error("Tool '{tool_id}' timed out after {}ms", .after.as_millis())]
    Timeout {
        tool_id: String,
        after: Duration,
        suggested_fallback: Option<String>,
    },

    #[error("Tool '{tool_id}' failed: {message}")]
    External {
        tool_id: String,
        message: String,
        transient: bool,
        suggested_fallback: Option<String>,
    },

    #[error("Execution of '{tool_id}' was cancelled")]
    Cancelled { tool_id: String },

    #[error("Chain step {position} ('{tool_id}') failed: {source}")]
    ChainStep {
        position: usize,
        tool_id: String,
        source: Box<ToolError>,
    },
}

impl ToolError {
    pub fn unknown_tool(tool_id: impl Into<String>) -> Self {
        Self::UnknownTool {
            tool_id: tool_id.into(),
        }
    }

    pub fn invalid_parameters(tool_id: impl Into<String>, fields: Vec<FieldViolation>) -> Self {
        Self::InvalidParameters {
            tool_id: tool_id.into(),
            fields,
        }
    }

    pub fn timeout(tool_id: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            tool_id: tool_id.into(),
            after,
            suggested_fallback: None,
        }
    }

    pub fn transient(tool_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::External {
            tool_id: tool_id.into(),
            message: message.into(),
            transient: true,
            suggested_fallback: None,
        }
    }

    pub fn permanent(tool_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::External {
            tool_id: tool_id.into(),
            message: message.into(),
            transient: false,
            suggested_fallback: None,
        }
    }

    pub fn cancelled(tool_id: impl Into<String>) -> Self {
        Self::Cancelled {
            tool_id: tool_id.into(),
        }
    }

    /// Wrap an error with its position inside a chain.
    pub fn in_chain(self, position: usize, tool_id: impl Into<String>) -> Self {
        Self::ChainStep {
            position,
            tool_id: tool_id.into(),
            source: Box::new(self),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::UnknownTool { .. } => ErrorKind::UnknownTool,
            ToolError::InvalidParameters { .. } => ErrorKind::InvalidParameters,
            ToolError::DependencyUnavailable { .. } => ErrorKind::DependencyUnavailable,
            ToolError::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            ToolError::Timeout { .. } => ErrorKind::Timeout,
            ToolError::External { .. } => ErrorKind::External,
            ToolError::Cancelled { .. } => ErrorKind::Cancelled,
            ToolError::ChainStep { .. } => ErrorKind::ChainStep,
        }
    }

    pub fn tool_id(&self) -> &str {
        match self {
            ToolError::UnknownTool { tool_id }
            | ToolError::InvalidParameters { tool_id, .. }
            | ToolError::DependencyUnavailable { tool_id, .. }
            | ToolError::CircuitOpen { tool_id, .. }
            | ToolError::Timeout { tool_id, .. }
            | ToolError::External { tool_id, .. }
            | ToolError::Cancelled { tool_id }
            | ToolError::ChainStep { tool_id, .. } => tool_id,
        }
    }

    /// The innermost error, unwrapping any chain-position wrappers.
    pub fn root(&self) -> &ToolError {
        match self {
            ToolError::ChainStep { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the engine may retry this failure once with backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            ToolError::Timeout { .. } => true,
            ToolError::External { transient, .. } => *transient,
            _ => false,
        }
    }

    /// Caller mistakes: no fault in the dependency, never retried, never
    /// counted by the breaker.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self.root(),
            ToolError::UnknownTool { .. } | ToolError::InvalidParameters { .. }
        )
    }

    /// Whether this failure increments the tool's breaker counter.
    pub fn counts_against_breaker(&self) -> bool {
        match self.root() {
            ToolError::UnknownTool { .. }
            | ToolError::InvalidParameters { .. }
            | ToolError::DependencyUnavailable { .. }
            | ToolError::CircuitOpen { .. } => false,
            ToolError::Timeout { .. }
            | ToolError::External { .. }
            | ToolError::Cancelled { .. } => true,
            ToolError::ChainStep { .. } => false,
        }
    }

    pub fn suggested_fallback(&self) -> Option<&str> {
        match self.root() {
            ToolError::DependencyUnavailable {
                suggested_fallback, ..
            }
            | ToolError::CircuitOpen {
                suggested_fallback, ..
            }
            | ToolError::Timeout {
                suggested_fallback, ..
            }
            | ToolError::External {
                suggested_fallback, ..
            } => suggested_fallback.as_deref(),
            _ => None,
        }
    }

    /// Attach a fallback suggestion to variants that carry one.
    pub fn with_fallback(mut self, fallback: Option<String>) -> Self {
        match &mut self {
            ToolError::DependencyUnavailable {
                suggested_fallback, ..
            }
            | ToolError::CircuitOpen {
                suggested_fallback, ..
            }
            | ToolError::Timeout {
                suggested_fallback, ..
            }
            | ToolError::External {
                suggested_fallback, ..
            } => *suggested_fallback = fallback,
            _ => {}
        }
        self
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), ToolError::Cancelled { .. })
    }
}

fn format_violations(fields: &[FieldViolation]) -> String {
    fields
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised while populating the tool registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("Invalid descriptor '{id}': {reason}")]
    InvalidDescriptor { id: String, reason: String },
}
