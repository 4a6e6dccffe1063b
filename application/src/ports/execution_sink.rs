//! Port for execution audit records.
//!
//! Defines the [`ExecutionSink`] trait for persisting finished executions and
//! chain results to an external store.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostics, while this port captures the audit trail in a
//! machine-readable form (JSONL in the infrastructure adapter).

use conductor_domain::{ChainOutcome, Execution};

/// Port for recording terminal executions and chain outcomes.
///
/// Methods are synchronous and infallible: persistence is fire-and-forget and
/// a failed write must never fail the invocation itself.
pub trait ExecutionSink: Send + Sync {
    /// Record an execution that reached Completed or Failed.
    fn record_execution(&self, execution: &Execution);

    /// Record the outcome of a chain run.
    fn record_chain(&self, chain_id: &str, outcome: &ChainOutcome);
}

/// No-op implementation for tests and when auditing is disabled.
pub struct NoExecutionSink;

impl ExecutionSink for NoExecutionSink {
    fn record_execution(&self, _execution: &Execution) {}

    fn record_chain(&self, _chain_id: &str, _outcome: &ChainOutcome) {}
}
