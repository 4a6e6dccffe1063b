//! Hand-written port implementations shared by the use case tests.

use crate::ports::execution_sink::ExecutionSink;
use crate::ports::health_probe::HealthProbe;
use crate::ports::tool_handler::{ExecutionContext, HandlerError, ToolHandler};
use async_trait::async_trait;
use conductor_domain::{ChainOutcome, Execution, GroupId, ProbeOutcome, ToolParams};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Handler that replays scripted results, then repeats a default.
pub struct ScriptedHandler {
    script: Mutex<VecDeque<Result<Value, HandlerError>>>,
    default: Result<Value, HandlerError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    seen: Mutex<Vec<ToolParams>>,
}

impl ScriptedHandler {
    pub fn ok(value: Value) -> Self {
        Self::with_default(Ok(value))
    }

    pub fn failing(err: HandlerError) -> Self {
        Self::with_default(Err(err))
    }

    fn with_default(default: Result<Value, HandlerError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default,
            delay: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Queue a result returned before the default kicks in.
    pub fn then(self, result: Result<Value, HandlerError>) -> Self {
        self.script.lock().unwrap().push_back(result);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<ToolParams> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolHandler for ScriptedHandler {
    async fn invoke(
        &self,
        params: &ToolParams,
        _ctx: &ExecutionContext,
    ) -> Result<Value, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(params.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.default.clone())
    }
}

/// Sink that keeps everything it is given.
#[derive(Default)]
pub struct RecordingSink {
    pub executions: Mutex<Vec<Execution>>,
    pub chains: Mutex<Vec<(String, bool)>>,
}

impl RecordingSink {
    pub fn execution_count(&self) -> usize {
        self.executions.lock().unwrap().len()
    }
}

impl ExecutionSink for RecordingSink {
    fn record_execution(&self, execution: &Execution) {
        self.executions.lock().unwrap().push(execution.clone());
    }

    fn record_chain(&self, chain_id: &str, outcome: &ChainOutcome) {
        self.chains
            .lock()
            .unwrap()
            .push((chain_id.to_string(), outcome.is_ok()));
    }
}

/// Probe whose answer is flipped by the test.
pub struct SwitchProbe {
    healthy: AtomicBool,
    delay: Option<Duration>,
    pub probes: AtomicUsize,
}

impl SwitchProbe {
    pub fn new(healthy: bool) -> Self {
        Self {
            healthy: AtomicBool::new(healthy),
            delay: None,
            probes: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

#[async_trait]
impl HealthProbe for SwitchProbe {
    async fn probe(&self, _group: &GroupId) -> ProbeOutcome {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.healthy.load(Ordering::SeqCst) {
            ProbeOutcome::healthy(Duration::from_millis(1))
        } else {
            ProbeOutcome::unhealthy()
        }
    }
}
