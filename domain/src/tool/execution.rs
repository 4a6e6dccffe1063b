//! Execution record state machine.
//!
//! Tracks the lifecycle of a single tool invocation:
//! `Pending -> Running -> Completed/Failed`.
//!
//! Each [`Execution`] wraps an [`ExecutionState`] enum so fields like
//! `started_at` only exist in states where they're meaningful. Transitions
//! are one-directional; out-of-order calls are no-ops, so a finished
//! execution can never be resurrected.
//!
//! # State Transitions
//!
//! ```text
//! Pending ──> Running ──> Completed
//!                    └──> Failed
//! ```

use super::params::ToolParams;
use crate::core::error::{ErrorKind, ToolError};
use crate::util::truncate_str;
use serde::{Deserialize, Serialize};

/// Unique identifier for an execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(String);

impl ExecutionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<T: Into<String>> From<T> for ExecutionId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

/// Who asked for an execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

impl CallerIdentity {
    pub fn user(user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            session: None,
        }
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }
}

/// State of an execution - tagged union where each variant carries
/// only the fields valid for that state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionState {
    /// Created, not yet started.
    Pending { params: ToolParams },
    /// Handler call (or cache lookup) in progress.
    Running {
        params: ToolParams,
        started_at: u64,
        attempt: u32,
    },
    /// Finished with a result.
    Completed {
        started_at: u64,
        completed_at: u64,
        output: serde_json::Value,
        cache_hit: bool,
        attempts: u32,
    },
    /// Finished with a classified error.
    Failed {
        started_at: u64,
        failed_at: u64,
        error_kind: ErrorKind,
        error_message: String,
        attempts: u32,
    },
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }

    pub fn status_str(&self) -> &'static str {
        match self {
            Self::Pending { .. } => "pending",
            Self::Running { .. } => "running",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
        }
    }

    /// Duration in milliseconds (only available for terminal states).
    pub fn duration_ms(&self) -> Option<u64> {
        match self {
            Self::Completed {
                started_at,
                completed_at,
                ..
            } => Some(completed_at.saturating_sub(*started_at)),
            Self::Failed {
                started_at,
                failed_at,
                ..
            } => Some(failed_at.saturating_sub(*started_at)),
            _ => None,
        }
    }
}

/// One invocation record, owned by the execution engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    pub tool_id: String,
    pub caller: CallerIdentity,
    pub state: ExecutionState,
}

impl Execution {
    /// Create a new execution in Pending state.
    pub fn new(tool_id: impl Into<String>, caller: CallerIdentity, params: ToolParams) -> Self {
        Self {
            id: ExecutionId::generate(),
            tool_id: tool_id.into(),
            caller,
            state: ExecutionState::Pending { params },
        }
    }

    /// Transition from Pending to Running.
    ///
    /// No-op if already past Pending.
    pub fn mark_running(&mut self) {
        if let ExecutionState::Pending { params } = &self.state {
            self.state = ExecutionState::Running {
                params: params.clone(),
                started_at: current_timestamp(),
                attempt: 1,
            };
        }
    }

    /// Record a further attempt while Running.
    pub fn mark_retry(&mut self) {
        if let ExecutionState::Running { attempt, .. } = &mut self.state {
            *attempt += 1;
        }
    }

    /// Transition from Running to Completed.
    ///
    /// No-op if not in Running state.
    pub fn mark_completed(&mut self, output: serde_json::Value, cache_hit: bool) {
        if let ExecutionState::Running {
            started_at,
            attempt,
            ..
        } = &self.state
        {
            self.state = ExecutionState::Completed {
                started_at: *started_at,
                completed_at: current_timestamp(),
                output,
                cache_hit,
                attempts: *attempt,
            };
        }
    }

    /// Transition from Running to Failed.
    ///
    /// No-op if not in Running state.
    pub fn mark_failed(&mut self, error: &ToolError) {
        if let ExecutionState::Running {
            started_at,
            attempt,
            ..
        } = &self.state
        {
            self.state = ExecutionState::Failed {
                started_at: *started_at,
                failed_at: current_timestamp(),
                error_kind: error.kind(),
                error_message: error.to_string(),
                attempts: *attempt,
            };
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn attempts(&self) -> u32 {
        match &self.state {
            ExecutionState::Pending { .. } => 0,
            ExecutionState::Running { attempt, .. } => *attempt,
            ExecutionState::Completed { attempts, .. } | ExecutionState::Failed { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.state.duration_ms()
    }

    /// Short rendering of the output for log lines.
    pub fn output_preview(&self, max_bytes: usize) -> Option<String> {
        match &self.state {
            ExecutionState::Completed { output, .. } => {
                let rendered = output.to_string();
                let preview = truncate_str(&rendered, max_bytes);
                if preview.len() < rendered.len() {
                    Some(format!("{}...", preview))
                } else {
                    Some(rendered)
                }
            }
            _ => None,
        }
    }
}

/// Get current timestamp in milliseconds.
fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_pending() -> Execution {
        let mut params = ToolParams::new();
        params.insert("zip".into(), json!("94110"));
        Execution::new("property_lookup", CallerIdentity::user("agent-7"), params)
    }

    #[test]
    fn test_new_is_pending() {
        let exec = make_pending();
        assert!(matches!(exec.state, ExecutionState::Pending { .. }));
        assert_eq!(exec.tool_id, "property_lookup");
        assert_eq!(exec.attempts(), 0);
        assert!(!exec.is_terminal());
        assert!(exec.duration_ms().is_none());
    }

    #[test]
    fn test_running_to_completed() {
        let mut exec = make_pending();
        exec.mark_running();
        assert!(matches!(exec.state, ExecutionState::Running { .. }));

        exec.mark_completed(json!({"price": 1200000}), false);
        assert!(exec.is_terminal());
        assert!(exec.duration_ms().is_some());
        assert_eq!(exec.attempts(), 1);
        assert_eq!(exec.output_preview(100).unwrap(), r#"{"price":1200000}"#);
    }

    #[test]
    fn test_retry_counts_attempts() {
        let mut exec = make_pending();
        exec.mark_running();
        exec.mark_retry();
        exec.mark_failed(&ToolError::transient("property_lookup", "503"));

        match &exec.state {
            ExecutionState::Failed {
                attempts,
                error_kind,
                ..
            } => {
                assert_eq!(*attempts, 2);
                assert_eq!(*error_kind, ErrorKind::External);
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_invalid_transition_pending_to_completed() {
        let mut exec = make_pending();
        exec.mark_completed(json!(1), false);
        assert!(matches!(exec.state, ExecutionState::Pending { .. }));
    }

    #[test]
    fn test_no_resurrection() {
        let mut exec = make_pending();
        exec.mark_running();
        exec.mark_failed(&ToolError::cancelled("property_lookup"));
        exec.mark_running();
        exec.mark_completed(json!(1), false);
        assert!(matches!(exec.state, ExecutionState::Failed { .. }));
    }

    #[test]
    fn test_output_preview_truncates() {
        let mut exec = make_pending();
        exec.mark_running();
        exec.mark_completed(json!("x".repeat(300)), true);
        let preview = exec.output_preview(20).unwrap();
        assert!(preview.ends_with("..."));
        assert!(preview.len() <= 23);
    }

    #[test]
    fn test_execution_ids_are_unique() {
        assert_ne!(ExecutionId::generate(), ExecutionId::generate());
        let id: ExecutionId = "fixed".into();
        assert_eq!(id.as_str(), "fixed");
    }

    #[test]
    fn test_serializes_status_tag() {
        let exec = make_pending();
        let value = serde_json::to_value(&exec).unwrap();
        assert_eq!(value["state"]["status"], "pending");
        assert_eq!(value["caller"]["user"], "agent-7");
    }
}
