//! Runtime wiring
//!
//! Builds one of each engine component from a [`ToolCatalog`] and an
//! [`EngineConfig`], and hands out the use cases that share them.

use crate::catalog::ToolCatalog;
use crate::config::EngineConfig;
use crate::engine::EngineState;
use crate::ports::execution_sink::{ExecutionSink, NoExecutionSink};
use crate::ports::health_probe::HealthProbe;
use crate::use_cases::execute_chain::ExecuteChainUseCase;
use crate::use_cases::execute_tool::ExecuteToolUseCase;
use crate::use_cases::monitor_health::HealthMonitor;
use crate::use_cases::snapshot::{OperationalSnapshot, SnapshotQuery};
use crate::use_cases::sweep_cache::CacheSweeper;
use conductor_domain::GroupId;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct RuntimeBuilder {
    catalog: ToolCatalog,
    config: EngineConfig,
    sink: Arc<dyn ExecutionSink>,
    probes: Vec<(GroupId, Arc<dyn HealthProbe>)>,
}

impl RuntimeBuilder {
    pub fn with_sink(mut self, sink: Arc<dyn ExecutionSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_probe(mut self, group: impl Into<GroupId>, probe: Arc<dyn HealthProbe>) -> Self {
        self.probes.push((group.into(), probe));
        self
    }

    pub fn build(self) -> ConductorRuntime {
        let catalog = Arc::new(self.catalog);
        let state = EngineState::new(&self.config);

        let engine = Arc::new(
            ExecuteToolUseCase::new(Arc::clone(&catalog), state.clone(), self.config.clone())
                .with_sink(Arc::clone(&self.sink)),
        );
        let chains = ExecuteChainUseCase::new(Arc::clone(&engine)).with_sink(self.sink);

        let monitor = self.probes.into_iter().fold(
            HealthMonitor::new(Arc::clone(&catalog), state.clone(), self.config.health),
            |monitor, (group, probe)| monitor.with_probe(group, probe),
        );
        let sweeper = CacheSweeper::new(Arc::clone(&state.cache));

        ConductorRuntime {
            catalog,
            config: self.config,
            snapshots: SnapshotQuery::new(state.clone()),
            state,
            engine,
            chains,
            monitor: Arc::new(monitor),
            sweeper: Arc::new(sweeper),
        }
    }
}

/// Every component of a running engine.
pub struct ConductorRuntime {
    catalog: Arc<ToolCatalog>,
    config: EngineConfig,
    state: EngineState,
    engine: Arc<ExecuteToolUseCase>,
    chains: ExecuteChainUseCase,
    monitor: Arc<HealthMonitor>,
    sweeper: Arc<CacheSweeper>,
    snapshots: SnapshotQuery,
}

impl ConductorRuntime {
    pub fn builder(catalog: ToolCatalog, config: EngineConfig) -> RuntimeBuilder {
        RuntimeBuilder {
            catalog,
            config,
            sink: Arc::new(NoExecutionSink),
            probes: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn tools(&self) -> &ExecuteToolUseCase {
        &self.engine
    }

    pub fn chains(&self) -> &ExecuteChainUseCase {
        &self.chains
    }

    pub fn monitor(&self) -> &HealthMonitor {
        &self.monitor
    }

    pub fn snapshot(&self) -> OperationalSnapshot {
        self.snapshots.snapshot()
    }

    /// Start the health monitor and cache sweeper; both stop when `token`
    /// is cancelled.
    pub fn spawn_background(&self, token: &CancellationToken) -> Vec<JoinHandle<()>> {
        vec![
            Arc::clone(&self.monitor).spawn(token.child_token()),
            Arc::clone(&self.sweeper).spawn(token.child_token()),
        ]
    }
}
