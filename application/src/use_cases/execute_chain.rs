//! Execute Chain use case
//!
//! Runs the steps of a [`ChainDefinition`] strictly in order through the
//! execution engine. Step *n+1* receives the initial parameters plus the
//! last successful output under `previousResult`.
//!
//! # Recovery
//!
//! When a step fails, the chain drops it and feeds the next step from the
//! last successful output. The chain stops instead when:
//!
//! - the step is marked required
//! - the failure is a caller input error or a cancellation
//! - the failed step is the last one
//! - the failure comes right after a recovered step (recovery itself failed)

use super::execute_tool::ExecuteToolUseCase;
use crate::ports::execution_sink::{ExecutionSink, NoExecutionSink};
use crate::ports::tool_handler::ExecutionContext;
use conductor_domain::{
    ChainDefinition, ChainFailure, ChainOutcome, ChainSynthesis, ExecutionId, PREVIOUS_RESULT,
    StepRecord, StepStatus, ToolError, ToolParams,
};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Use case for executing a chain of tools
pub struct ExecuteChainUseCase {
    engine: Arc<ExecuteToolUseCase>,
    sink: Arc<dyn ExecutionSink>,
}

impl ExecuteChainUseCase {
    pub fn new(engine: Arc<ExecuteToolUseCase>) -> Self {
        Self {
            engine,
            sink: Arc::new(NoExecutionSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ExecutionSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Run a chain of optional steps given as tool ids.
    pub async fn execute_ids(
        &self,
        tool_ids: &[&str],
        initial: ToolParams,
        ctx: &ExecutionContext,
    ) -> ChainOutcome {
        let chain = ChainDefinition::from_ids(tool_ids.iter().copied());
        self.execute(&chain, initial, ctx).await
    }

    /// Run `chain` and record its outcome.
    pub async fn execute(
        &self,
        chain: &ChainDefinition,
        initial: ToolParams,
        ctx: &ExecutionContext,
    ) -> ChainOutcome {
        let chain_id = ExecutionId::generate();
        info!(chain = %chain_id, steps = chain.len(), "Starting chain");

        let outcome = self.run(chain, &initial, ctx).await;
        match &outcome {
            Ok(synthesis) => info!(
                chain = %chain_id,
                completed = synthesis.completed,
                failed = synthesis.failed,
                confidence = synthesis.aggregate_confidence,
                elapsed_ms = synthesis.total_duration_ms,
                "Chain finished"
            ),
            Err(failure) => warn!(chain = %chain_id, "{}", failure),
        }
        self.sink.record_chain(chain_id.as_str(), &outcome);
        outcome
    }

    /// Run explicitly independent chains concurrently.
    ///
    /// Each branch starts from the same initial parameters; outcomes are
    /// returned in declaration order.
    pub async fn execute_parallel(
        &self,
        branches: &[ChainDefinition],
        initial: ToolParams,
        ctx: &ExecutionContext,
    ) -> Vec<ChainOutcome> {
        debug!(branches = branches.len(), "Running independent chains");
        join_all(
            branches
                .iter()
                .map(|branch| self.execute(branch, initial.clone(), ctx)),
        )
        .await
    }

    async fn run(
        &self,
        chain: &ChainDefinition,
        initial: &ToolParams,
        ctx: &ExecutionContext,
    ) -> ChainOutcome {
        let started = Instant::now();
        let mut records: Vec<StepRecord> = Vec::with_capacity(chain.len());
        let mut last_output: Option<Value> = None;

        for (position, step) in chain.steps.iter().enumerate() {
            let params = thread_params(initial, last_output.as_ref());
            let step_started = Instant::now();
            let result = self.engine.execute(&step.tool_id, params, ctx).await;
            let step_ms = step_started.elapsed().as_millis() as u64;

            match result {
                Ok(output) => {
                    records.push(StepRecord::completed(
                        position,
                        &step.tool_id,
                        output.value.clone(),
                        output.cache_hit,
                        step_ms,
                    ));
                    last_output = Some(output.value);
                }
                Err(err) => {
                    let is_last = position + 1 == chain.len();
                    let after_recovery = records
                        .last()
                        .is_some_and(|r| r.status == StepStatus::Recovered);

                    if can_recover(&err, step.required, is_last, after_recovery) {
                        warn!(
                            step = position,
                            tool = %step.tool_id,
                            kind = %err.kind(),
                            "Chain step failed, continuing from last successful output"
                        );
                        records
                            .push(StepRecord::failed(position, &step.tool_id, &err, step_ms).recovered());
                        continue;
                    }

                    return Err(ChainFailure::new(
                        records,
                        position,
                        &step.tool_id,
                        err,
                        step_ms,
                        started.elapsed().as_millis() as u64,
                    ));
                }
            }
        }

        Ok(ChainSynthesis::new(
            records,
            started.elapsed().as_millis() as u64,
        ))
    }
}

fn can_recover(err: &ToolError, required: bool, is_last: bool, after_recovery: bool) -> bool {
    !required && !is_last && !after_recovery && !err.is_caller_error() && !err.is_cancelled()
}

/// Parameters for the next step: the initial set plus the previous output,
/// never overwriting a caller-supplied field.
fn thread_params(initial: &ToolParams, previous: Option<&Value>) -> ToolParams {
    let mut params = initial.clone();
    if let Some(previous) = previous
        && !params.contains_key(PREVIOUS_RESULT)
    {
        params.insert(PREVIOUS_RESULT.to_string(), previous.clone());
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ToolCatalog;
    use crate::config::{EngineConfig, RetryPolicy};
    use crate::engine::EngineState;
    use crate::ports::tool_handler::HandlerError;
    use crate::test_support::{RecordingSink, ScriptedHandler};
    use conductor_domain::{ErrorKind, FieldViolation, ToolCategory, ToolDescriptor};
    use serde_json::json;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct Harness {
        chains: ExecuteChainUseCase,
        sink: Arc<RecordingSink>,
    }

    fn harness(tools: Vec<(&str, Arc<ScriptedHandler>)>) -> Harness {
        let mut catalog = ToolCatalog::new();
        for (id, handler) in tools {
            catalog
                .register(ToolDescriptor::new(id, id, ToolCategory::Analysis), handler)
                .unwrap();
        }
        let config = EngineConfig::default().with_retry(RetryPolicy::disabled());
        let state = EngineState::new(&config);
        let sink = Arc::new(RecordingSink::default());
        let engine = ExecuteToolUseCase::new(Arc::new(catalog), state, config).with_sink(sink.clone());
        Harness {
            chains: ExecuteChainUseCase::new(Arc::new(engine)).with_sink(sink.clone()),
            sink,
        }
    }

    fn initial() -> ToolParams {
        json!({"zip": "94110"}).as_object().cloned().unwrap()
    }

    fn ok(value: Value) -> Arc<ScriptedHandler> {
        Arc::new(ScriptedHandler::ok(value))
    }

    fn failing(err: HandlerError) -> Arc<ScriptedHandler> {
        Arc::new(ScriptedHandler::failing(err))
    }

    #[tokio::test(start_paused = true)]
    async fn test_outputs_thread_into_next_step() {
        let lookup = ok(json!({"rows": [1, 2, 3]}));
        let analyze = ok(json!({"trend": "up", "confidence": 0.5}));
        let h = harness(vec![("lookup", lookup.clone()), ("analyze", analyze.clone())]);

        let synthesis = h
            .chains
            .execute_ids(&["lookup", "analyze"], initial(), &ExecutionContext::default())
            .await
            .unwrap();

        assert!(!lookup.seen()[0].contains_key(PREVIOUS_RESULT));
        let seen = &analyze.seen()[0];
        assert_eq!(seen["zip"], json!("94110"));
        assert_eq!(seen[PREVIOUS_RESULT], json!({"rows": [1, 2, 3]}));

        assert_eq!(synthesis.completed, 2);
        assert!((synthesis.aggregate_confidence - 0.75).abs() < 1e-9);
        assert_eq!(synthesis.final_output(), Some(&json!({"trend": "up", "confidence": 0.5})));
        assert_eq!(h.sink.chains.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_previous_result_is_not_overwritten() {
        let second = ok(json!(2));
        let h = harness(vec![("first", ok(json!(1))), ("second", second.clone())]);
        let mut params = initial();
        params.insert(PREVIOUS_RESULT.into(), json!("from caller"));

        h.chains
            .execute_ids(&["first", "second"], params, &ExecutionContext::default())
            .await
            .unwrap();
        assert_eq!(second.seen()[0][PREVIOUS_RESULT], json!("from caller"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_middle_failure_recovers() {
        let summarize = ok(json!({"text": "done"}));
        let h = harness(vec![
            ("lookup", ok(json!({"rows": 3}))),
            ("analyze", failing(HandlerError::permanent("model offline"))),
            ("summarize", summarize.clone()),
        ]);

        let synthesis = h
            .chains
            .execute_ids(&["lookup", "analyze", "summarize"], initial(), &ExecutionContext::default())
            .await
            .unwrap();

        let statuses: Vec<StepStatus> = synthesis.steps.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![StepStatus::Completed, StepStatus::Recovered, StepStatus::Completed]
        );
        assert_eq!(synthesis.steps[1].error_kind, Some(ErrorKind::External));
        // Step 3 is fed from step 1's output
        assert_eq!(summarize.seen()[0][PREVIOUS_RESULT], json!({"rows": 3}));
        assert_eq!(synthesis.completed, 2);
        assert_eq!(synthesis.failed, 1);
        assert!((synthesis.aggregate_confidence - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_input_stops_chain() {
        let summarize = ok(json!("never"));
        let h = harness(vec![
            ("lookup", ok(json!({"unexpected": true}))),
            (
                "analyze",
                failing(HandlerError::invalid_input(vec![FieldViolation::missing("rows")])),
            ),
            ("summarize", summarize.clone()),
        ]);

        let failure = h
            .chains
            .execute_ids(&["lookup", "analyze", "summarize"], initial(), &ExecutionContext::default())
            .await
            .unwrap_err();

        assert_eq!(failure.failed_at, "analyze");
        assert_eq!(failure.position, 1);
        assert_eq!(failure.completed_steps().count(), 1);
        assert_eq!(failure.steps[0].output, Some(json!({"unexpected": true})));
        assert_eq!(failure.steps.len(), 2);
        assert_eq!(failure.steps[1].status, StepStatus::Failed);
        assert_eq!(failure.steps[1].tool_id, "analyze");
        assert_eq!(failure.root_kind(), ErrorKind::InvalidParameters);
        assert!(matches!(failure.error, ToolError::ChainStep { position: 1, .. }));
        assert_eq!(summarize.calls(), 0);
        assert!(!h.sink.chains.lock().unwrap()[0].1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_required_step_failure_stops_chain() {
        let h = harness(vec![
            ("lookup", failing(HandlerError::permanent("down"))),
            ("analyze", ok(json!(1))),
        ]);
        let chain = ChainDefinition::new().required_step("lookup").step("analyze");

        let failure = h
            .chains
            .execute(&chain, initial(), &ExecutionContext::default())
            .await
            .unwrap_err();
        assert_eq!(failure.failed_at, "lookup");
        assert_eq!(failure.completed_steps().count(), 0);
        assert_eq!(failure.steps.len(), 1);
        assert_eq!(failure.stopping_step().unwrap().error_kind, Some(ErrorKind::External));
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_step_failure_fails_chain() {
        let h = harness(vec![
            ("lookup", ok(json!(1))),
            ("analyze", failing(HandlerError::permanent("down"))),
        ]);

        let failure = h
            .chains
            .execute_ids(&["lookup", "analyze"], initial(), &ExecutionContext::default())
            .await
            .unwrap_err();
        assert_eq!(failure.failed_at, "analyze");
        assert_eq!(failure.completed_steps().count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_recovery_fails_chain() {
        let fourth = ok(json!(4));
        let h = harness(vec![
            ("one", ok(json!(1))),
            ("two", failing(HandlerError::permanent("down"))),
            ("three", failing(HandlerError::permanent("also down"))),
            ("four", fourth.clone()),
        ]);

        let failure = h
            .chains
            .execute_ids(&["one", "two", "three", "four"], initial(), &ExecutionContext::default())
            .await
            .unwrap_err();
        assert_eq!(failure.failed_at, "three");
        assert_eq!(failure.position, 2);
        // Completed, recovered and stopping records are all kept
        let statuses: Vec<StepStatus> = failure.steps.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![StepStatus::Completed, StepStatus::Recovered, StepStatus::Failed]
        );
        assert_eq!(fourth.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_tool_stops_chain() {
        let h = harness(vec![("lookup", ok(json!(1))), ("summarize", ok(json!(2)))]);
        let failure = h
            .chains
            .execute_ids(&["lookup", "ghost", "summarize"], initial(), &ExecutionContext::default())
            .await
            .unwrap_err();
        assert_eq!(failure.failed_at, "ghost");
        assert_eq!(failure.root_kind(), ErrorKind::UnknownTool);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_chain() {
        let h = harness(vec![("lookup", ok(json!(1))), ("analyze", ok(json!(2)))]);
        let token = CancellationToken::new();
        token.cancel();

        let failure = h
            .chains
            .execute_ids(
                &["lookup", "analyze"],
                initial(),
                &ExecutionContext::default().with_cancellation(token),
            )
            .await
            .unwrap_err();
        assert_eq!(failure.position, 0);
        assert_eq!(failure.root_kind(), ErrorKind::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_chain() {
        let h = harness(vec![]);
        let synthesis = h
            .chains
            .execute(&ChainDefinition::new(), initial(), &ExecutionContext::default())
            .await
            .unwrap();
        assert!(synthesis.steps.is_empty());
        assert_eq!(synthesis.aggregate_confidence, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_steps_run_in_order() {
        let slow = Arc::new(ScriptedHandler::ok(json!("slow")).with_delay(Duration::from_secs(2)));
        let fast = ok(json!("fast"));
        let h = harness(vec![("slow", slow.clone()), ("fast", fast.clone())]);

        let synthesis = h
            .chains
            .execute_ids(&["slow", "fast"], initial(), &ExecutionContext::default())
            .await
            .unwrap();
        assert_eq!(fast.seen()[0][PREVIOUS_RESULT], json!("slow"));
        assert_eq!(synthesis.total_duration_ms, 2000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_branches_keep_declaration_order() {
        let a = Arc::new(ScriptedHandler::ok(json!("a")).with_delay(Duration::from_secs(3)));
        let b = Arc::new(ScriptedHandler::ok(json!("b")).with_delay(Duration::from_secs(1)));
        let h = harness(vec![("a", a), ("b", b), ("broken", failing(HandlerError::permanent("x")))]);

        let started = Instant::now();
        let outcomes = h
            .chains
            .execute_parallel(
                &[
                    ChainDefinition::from_ids(["a"]),
                    ChainDefinition::from_ids(["b"]),
                    ChainDefinition::from_ids(["broken"]),
                ],
                initial(),
                &ExecutionContext::default(),
            )
            .await;

        // Branches overlap: total time is the slowest branch, not the sum
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].as_ref().unwrap().final_output(), Some(&json!("a")));
        assert_eq!(outcomes[1].as_ref().unwrap().final_output(), Some(&json!("b")));
        assert!(outcomes[2].is_err());
    }
}
