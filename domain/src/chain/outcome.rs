//! Chain results: per-step records, the synthesis of a finished chain, and
//! the failure returned when a chain stops early.

use crate::core::error::{ErrorKind, ToolError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output field a tool may use to report how sure it is of its result.
pub const CONFIDENCE_FIELD: &str = "confidence";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    /// Failed, but the chain recovered and continued past it
    Recovered,
    /// Failed and stopped the chain
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Completed => "completed",
            StepStatus::Recovered => "recovered",
            StepStatus::Failed => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, StepStatus::Completed)
    }
}

/// Record of one chain step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub position: usize,
    pub tool_id: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub cache_hit: bool,
    pub duration_ms: u64,
}

impl StepRecord {
    pub fn completed(
        position: usize,
        tool_id: impl Into<String>,
        output: serde_json::Value,
        cache_hit: bool,
        duration_ms: u64,
    ) -> Self {
        Self {
            position,
            tool_id: tool_id.into(),
            status: StepStatus::Completed,
            output: Some(output),
            error_kind: None,
            error_message: None,
            cache_hit,
            duration_ms,
        }
    }

    pub fn failed(position: usize, tool_id: impl Into<String>, error: &ToolError, duration_ms: u64) -> Self {
        Self {
            position,
            tool_id: tool_id.into(),
            status: StepStatus::Failed,
            output: None,
            error_kind: Some(error.root().kind()),
            error_message: Some(error.root().to_string()),
            cache_hit: false,
            duration_ms,
        }
    }

    /// Mark a failed step as one the chain recovered from.
    pub fn recovered(mut self) -> Self {
        if self.status == StepStatus::Failed {
            self.status = StepStatus::Recovered;
        }
        self
    }

    /// Confidence of this step in `[0, 1]`.
    ///
    /// A completed step reports its output's numeric `confidence` field
    /// (clamped), or full confidence when the tool does not report one.
    /// Failed steps contribute nothing.
    pub fn confidence(&self) -> f64 {
        match (&self.status, &self.output) {
            (StepStatus::Completed, Some(output)) => output
                .get(CONFIDENCE_FIELD)
                .and_then(|v| v.as_f64())
                .filter(|c| c.is_finite())
                .map(|c| c.clamp(0.0, 1.0))
                .unwrap_or(1.0),
            _ => 0.0,
        }
    }
}

/// Summary of a chain that ran to its end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSynthesis {
    pub steps: Vec<StepRecord>,
    pub aggregate_confidence: f64,
    pub total_duration_ms: u64,
    pub completed: usize,
    pub failed: usize,
}

impl ChainSynthesis {
    pub fn new(steps: Vec<StepRecord>, total_duration_ms: u64) -> Self {
        let completed = steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        let failed = steps.len() - completed;
        Self {
            aggregate_confidence: aggregate_confidence(&steps),
            steps,
            total_duration_ms,
            completed,
            failed,
        }
    }

    /// Output of the last completed step.
    pub fn final_output(&self) -> Option<&serde_json::Value> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.status == StepStatus::Completed)
            .and_then(|s| s.output.as_ref())
    }

    pub fn is_fully_successful(&self) -> bool {
        self.failed == 0
    }
}

/// A chain that stopped before its end.
///
/// Carries every step record obtained so far, so completed work is never
/// dropped. The last record is always the [`StepStatus::Failed`] step that
/// stopped the chain.
#[derive(Error, Debug, Clone)]
#[error("Chain stopped at step {position} ('{failed_at}'): {error}")]
pub struct ChainFailure {
    pub steps: Vec<StepRecord>,
    pub failed_at: String,
    pub position: usize,
    pub error: ToolError,
    pub total_duration_ms: u64,
}

impl ChainFailure {
    /// Build a failure; `error` is wrapped with the step position and a
    /// failed record for the stopping step is appended to `steps`.
    pub fn new(
        mut steps: Vec<StepRecord>,
        position: usize,
        tool_id: impl Into<String>,
        error: ToolError,
        step_duration_ms: u64,
        total_duration_ms: u64,
    ) -> Self {
        let failed_at = tool_id.into();
        steps.push(StepRecord::failed(
            position,
            failed_at.clone(),
            &error,
            step_duration_ms,
        ));
        let error = match error {
            wrapped @ ToolError::ChainStep { .. } => wrapped,
            other => other.in_chain(position, failed_at.clone()),
        };
        Self {
            steps,
            failed_at,
            position,
            error,
            total_duration_ms,
        }
    }

    /// Steps that completed before the chain stopped.
    pub fn completed_steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
    }

    /// Record of the step that stopped the chain.
    pub fn stopping_step(&self) -> Option<&StepRecord> {
        self.steps
            .last()
            .filter(|s| s.status == StepStatus::Failed)
    }

    /// Kind of the underlying failure.
    pub fn root_kind(&self) -> ErrorKind {
        self.error.root().kind()
    }
}

pub type ChainOutcome = Result<ChainSynthesis, ChainFailure>;

fn aggregate_confidence(steps: &[StepRecord]) -> f64 {
    if steps.is_empty() {
        return 0.0;
    }
    steps.iter().map(StepRecord::confidence).sum::<f64>() / steps.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_confidence() {
        let plain = StepRecord::completed(0, "lookup", json!({"rows": 3}), false, 5);
        assert_eq!(plain.confidence(), 1.0);

        let reported = StepRecord::completed(1, "analyze", json!({"confidence": 0.6}), false, 5);
        assert!((reported.confidence() - 0.6).abs() < 1e-9);

        let clamped = StepRecord::completed(1, "analyze", json!({"confidence": 7}), false, 5);
        assert_eq!(clamped.confidence(), 1.0);

        let failed = StepRecord::failed(2, "x", &ToolError::transient("x", "boom"), 5);
        assert_eq!(failed.confidence(), 0.0);
    }

    #[test]
    fn test_synthesis_counts_and_confidence() {
        let steps = vec![
            StepRecord::completed(0, "lookup", json!({"confidence": 0.8}), false, 10),
            StepRecord::failed(1, "analyze", &ToolError::transient("analyze", "503"), 4).recovered(),
            StepRecord::completed(2, "summarize", json!({"text": "ok"}), true, 6),
        ];
        let synthesis = ChainSynthesis::new(steps, 20);

        assert_eq!(synthesis.completed, 2);
        assert_eq!(synthesis.failed, 1);
        assert!((synthesis.aggregate_confidence - 0.6).abs() < 1e-9);
        assert_eq!(synthesis.final_output(), Some(&json!({"text": "ok"})));
        assert!(!synthesis.is_fully_successful());
        assert_eq!(synthesis.steps[1].status, StepStatus::Recovered);
    }

    #[test]
    fn test_empty_synthesis() {
        let synthesis = ChainSynthesis::new(Vec::new(), 0);
        assert_eq!(synthesis.aggregate_confidence, 0.0);
        assert!(synthesis.final_output().is_none());
        assert!(synthesis.is_fully_successful());
    }

    #[test]
    fn test_failure_wraps_error_with_position() {
        let steps = vec![StepRecord::completed(0, "lookup", json!({}), false, 1)];
        let failure = ChainFailure::new(
            steps,
            1,
            "analyze",
            ToolError::invalid_parameters("analyze", vec![]),
            2,
            3,
        );

        assert_eq!(failure.failed_at, "analyze");
        assert_eq!(failure.root_kind(), ErrorKind::InvalidParameters);
        assert!(matches!(
            failure.error,
            ToolError::ChainStep { position: 1, .. }
        ));
        assert_eq!(failure.completed_steps().count(), 1);
        assert!(failure.to_string().starts_with("Chain stopped at step 1 ('analyze')"));

        let stopping = failure.stopping_step().unwrap();
        assert_eq!(failure.steps.len(), 2);
        assert_eq!(stopping.position, 1);
        assert_eq!(stopping.tool_id, "analyze");
        assert_eq!(stopping.status, StepStatus::Failed);
        assert_eq!(stopping.error_kind, Some(ErrorKind::InvalidParameters));
        assert_eq!(stopping.duration_ms, 2);
    }

    #[test]
    fn test_recovered_only_applies_to_failures() {
        let step = StepRecord::completed(0, "a", json!(1), false, 1).recovered();
        assert_eq!(step.status, StepStatus::Completed);
    }
}
