//! Operational snapshot
//!
//! Read model for dashboards and alerting: breaker states, cache hit rate,
//! per-tool metrics and dependency group health, all at one point in time.
//! Nothing in the orchestration logic reads it back.

use crate::engine::{CacheStats, EngineState, ToolMetrics};
use conductor_domain::{BreakerSnapshot, CircuitState, DependencyGroup};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationalSnapshot {
    /// RFC 3339 UTC timestamp
    pub generated_at: String,
    pub breakers: Vec<BreakerSnapshot>,
    pub cache: CacheStats,
    pub metrics: Vec<ToolMetrics>,
    pub groups: Vec<DependencyGroup>,
}

impl OperationalSnapshot {
    pub fn open_breakers(&self) -> impl Iterator<Item = &BreakerSnapshot> {
        self.breakers
            .iter()
            .filter(|b| b.state != CircuitState::Closed)
    }
}

pub struct SnapshotQuery {
    state: EngineState,
}

impl SnapshotQuery {
    pub fn new(state: EngineState) -> Self {
        Self { state }
    }

    pub fn snapshot(&self) -> OperationalSnapshot {
        OperationalSnapshot {
            generated_at: chrono::Utc::now().to_rfc3339(),
            breakers: self.state.breakers.snapshot(),
            cache: self.state.cache.stats(),
            metrics: self.state.metrics.snapshot(),
            groups: self.state.health.snapshot(),
        }
    }
}
