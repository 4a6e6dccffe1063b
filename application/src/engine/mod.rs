//! Shared engine state
//!
//! Each component owns exactly one piece of mutable state and is shared
//! through `Arc` by the use cases and background loops:
//!
//! | Component | State | Discipline |
//! |-----------|-------|------------|
//! | [`ResultCache`] | cached tool results | `RwLock`, lazy expiry |
//! | [`BreakerBank`] | one breaker per tool | mutex per tool |
//! | [`HealthBoard`] | per-group health scores | `RwLock` |
//! | [`MetricsSink`] | per-tool counters | atomics |

pub mod breaker_bank;
pub mod cache;
pub mod clock;
pub mod health_board;
pub mod metrics;

pub use breaker_bank::{BreakerBank, BreakerPermit};
pub use cache::{CacheKey, CacheStats, ResultCache};
pub use health_board::HealthBoard;
pub use metrics::{MetricsSink, ToolMetrics};

use crate::config::EngineConfig;
use std::sync::Arc;

/// Handles to every shared component, cloned into each use case.
#[derive(Clone)]
pub struct EngineState {
    pub cache: Arc<ResultCache>,
    pub breakers: Arc<BreakerBank>,
    pub health: Arc<HealthBoard>,
    pub metrics: Arc<MetricsSink>,
}

impl EngineState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            cache: Arc::new(ResultCache::new(config.cache)),
            breakers: Arc::new(BreakerBank::new(config.breaker)),
            health: Arc::new(HealthBoard::new(config.health.ema_weight)),
            metrics: Arc::new(MetricsSink::new()),
        }
    }
}
