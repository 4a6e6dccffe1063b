//! Execute Tool use case
//!
//! Runs a single tool through the full pipeline:
//!
//! ```text
//! resolve ─▶ validate ─▶ dependency health ─▶ cache ─▶ breaker ─▶ handler (bounded)
//!                                               │                      │
//!                                               └──── hit: return      ├─▶ report to breaker
//!                                                                      ├─▶ cache write / metrics
//!                                                                      └─▶ classify, retry once
//! ```
//!
//! Caller mistakes (unknown tool, invalid parameters) are rejected before an
//! execution record exists: they leave no metrics, no audit record and never
//! touch the breaker.

use crate::catalog::ToolCatalog;
use crate::config::EngineConfig;
use crate::engine::EngineState;
use crate::ports::execution_sink::{ExecutionSink, NoExecutionSink};
use crate::ports::tool_handler::{ExecutionContext, ToolHandler};
use conductor_domain::{
    Admission, Execution, ExecutionId, ParamValidator, SchemaValidator, ToolDescriptor, ToolError,
    ToolParams,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Successful result of one tool execution.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutput {
    pub execution_id: ExecutionId,
    pub tool_id: String,
    pub value: Value,
    pub cache_hit: bool,
    pub attempts: u32,
    pub duration_ms: u64,
}

struct Success {
    value: Value,
    cache_hit: bool,
}

enum Backoff {
    Elapsed,
    Cancelled,
    /// The caller's deadline would pass before the retry could start
    OutOfTime,
}

/// Use case for executing one tool
pub struct ExecuteToolUseCase {
    catalog: Arc<ToolCatalog>,
    state: EngineState,
    config: EngineConfig,
    sink: Arc<dyn ExecutionSink>,
    validator: SchemaValidator,
}

impl ExecuteToolUseCase {
    pub fn new(catalog: Arc<ToolCatalog>, state: EngineState, config: EngineConfig) -> Self {
        Self {
            catalog,
            state,
            config,
            sink: Arc::new(NoExecutionSink),
            validator: SchemaValidator,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ExecutionSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Execute `tool_id` with `params`.
    pub async fn execute(
        &self,
        tool_id: &str,
        params: ToolParams,
        ctx: &ExecutionContext,
    ) -> Result<ToolOutput, ToolError> {
        let (descriptor, handler) = self.catalog.resolve(tool_id)?;
        if let Err(fields) = self.validator.validate(&params, descriptor) {
            debug!(tool = %tool_id, violations = fields.len(), "Rejected invalid parameters");
            return Err(ToolError::invalid_parameters(tool_id, fields));
        }

        let started = Instant::now();
        let mut execution = Execution::new(tool_id, ctx.caller.clone(), params.clone());
        execution.mark_running();
        debug!(tool = %tool_id, execution = %execution.id, "Execution started");

        let result = self
            .run(descriptor, handler.as_ref(), &params, ctx, &mut execution)
            .await;
        let elapsed = started.elapsed();

        let cache_hit = match &result {
            Ok(success) => {
                execution.mark_completed(success.value.clone(), success.cache_hit);
                success.cache_hit
            }
            Err(err) => {
                execution.mark_failed(err);
                false
            }
        };
        self.state
            .metrics
            .record(tool_id, result.is_ok(), cache_hit, elapsed);
        self.sink.record_execution(&execution);

        match result {
            Ok(success) => {
                info!(
                    tool = %tool_id,
                    cache_hit,
                    attempts = execution.attempts(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Tool completed"
                );
                Ok(ToolOutput {
                    tool_id: tool_id.to_string(),
                    value: success.value,
                    cache_hit,
                    attempts: execution.attempts(),
                    duration_ms: elapsed.as_millis() as u64,
                    execution_id: execution.id,
                })
            }
            Err(err) => {
                warn!(
                    tool = %tool_id,
                    kind = %err.kind(),
                    attempts = execution.attempts(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Tool failed: {}",
                    err
                );
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        descriptor: &ToolDescriptor,
        handler: &dyn ToolHandler,
        params: &ToolParams,
        ctx: &ExecutionContext,
        execution: &mut Execution,
    ) -> Result<Success, ToolError> {
        let tool_id = descriptor.id.as_str();

        if let Some((group, health)) = self
            .state
            .health
            .first_unavailable(&descriptor.dependencies, self.config.health.threshold)
        {
            return Err(ToolError::DependencyUnavailable {
                tool_id: tool_id.to_string(),
                group: group.to_string(),
                health,
                suggested_fallback: self.catalog.fallback_for(tool_id),
            });
        }

        if descriptor.cacheable
            && let Some(value) = self.state.cache.get(tool_id, params)
        {
            debug!(tool = %tool_id, "Cache hit");
            return Ok(Success {
                value,
                cache_hit: true,
            });
        }

        if ctx.is_cancelled() {
            return Err(ToolError::cancelled(tool_id));
        }

        let mut attempt: u32 = 0;
        let mut last_error: Option<ToolError> = None;
        loop {
            let permit = self.state.breakers.admit(tool_id);
            if let Admission::Rejected { retry_after } = permit.admission() {
                if let Some(err) = last_error {
                    debug!(tool = %tool_id, "Retry blocked by open circuit");
                    return Err(err.with_fallback(self.catalog.fallback_for(tool_id)));
                }
                return Err(ToolError::CircuitOpen {
                    tool_id: tool_id.to_string(),
                    retry_after,
                    suggested_fallback: self.catalog.fallback_for(tool_id),
                });
            }

            attempt += 1;
            if attempt > 1 {
                execution.mark_retry();
            }

            match self.invoke_bounded(descriptor, handler, params, ctx).await {
                Ok(value) => {
                    permit.succeed();
                    if descriptor.cacheable {
                        self.state.cache.put(
                            tool_id,
                            params,
                            value.clone(),
                            self.config.cache.ttl_for(descriptor),
                        );
                    }
                    return Ok(Success {
                        value,
                        cache_hit: false,
                    });
                }
                Err(err) => {
                    if err.counts_against_breaker() {
                        permit.fail();
                    } else {
                        permit.release();
                    }

                    if !err.is_retryable() || attempt > self.config.retry.max_retries {
                        return Err(err.with_fallback(self.catalog.fallback_for(tool_id)));
                    }

                    let delay = self.config.retry.backoff_for(attempt);
                    debug!(
                        tool = %tool_id,
                        attempt,
                        backoff_ms = delay.as_millis() as u64,
                        "Retrying after {}",
                        err.kind()
                    );
                    match wait_before_retry(delay, ctx).await {
                        Backoff::Elapsed => last_error = Some(err),
                        Backoff::Cancelled => return Err(ToolError::cancelled(tool_id)),
                        Backoff::OutOfTime => {
                            return Err(err.with_fallback(self.catalog.fallback_for(tool_id)));
                        }
                    }
                }
            }
        }
    }

    /// Call the handler under the tool timeout, the caller deadline and the
    /// caller's cancellation token, whichever fires first.
    async fn invoke_bounded(
        &self,
        descriptor: &ToolDescriptor,
        handler: &dyn ToolHandler,
        params: &ToolParams,
        ctx: &ExecutionContext,
    ) -> Result<Value, ToolError> {
        let tool_id = descriptor.id.as_str();
        let timeout = self.config.timeouts.timeout_for(descriptor);
        let tool_deadline = Instant::now() + timeout;
        let (deadline, caller_bound) = match ctx.deadline {
            Some(caller_deadline) if caller_deadline < tool_deadline => (caller_deadline, true),
            _ => (tool_deadline, false),
        };

        let call = tokio::time::timeout_at(deadline, handler.invoke(params, ctx));
        let outcome = match &ctx.cancellation {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(tool = %tool_id, "Cancelled in flight");
                    return Err(ToolError::cancelled(tool_id));
                }
                outcome = call => outcome,
            },
            None => call.await,
        };

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(err.into_tool_error(tool_id)),
            Err(_) if caller_bound => Err(ToolError::cancelled(tool_id)),
            Err(_) => Err(ToolError::timeout(tool_id, timeout)),
        }
    }
}

async fn wait_before_retry(delay: Duration, ctx: &ExecutionContext) -> Backoff {
    if let Some(deadline) = ctx.deadline
        && Instant::now() + delay >= deadline
    {
        return Backoff::OutOfTime;
    }
    match &ctx.cancellation {
        Some(token) => tokio::select! {
            _ = tokio::time::sleep(delay) => Backoff::Elapsed,
            _ = token.cancelled() => Backoff::Cancelled,
        },
        None => {
            tokio::time::sleep(delay).await;
            Backoff::Elapsed
        }
    }
}
