//! Dependency group health
//!
//! Tools that share an external resource declare the same [`GroupId`]. Each
//! group carries a rolling health score in `[0, 1]`, updated by an
//! exponential moving average of probe samples:
//!
//! ```text
//! score' = weight * sample + (1 - weight) * score
//! ```
//!
//! where `sample` is `1.0` for a healthy probe and `0.0` otherwise.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Weight given to the newest probe sample.
pub const DEFAULT_EMA_WEIGHT: f64 = 0.3;

/// Identifier of a dependency group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for GroupId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Result of one health probe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<Duration>,
}

impl ProbeOutcome {
    pub fn healthy(latency: Duration) -> Self {
        Self {
            healthy: true,
            latency: Some(latency),
        }
    }

    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            latency: None,
        }
    }

    pub fn sample(&self) -> f64 {
        if self.healthy { 1.0 } else { 0.0 }
    }
}

/// Rolling health of one dependency group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyGroup {
    pub id: GroupId,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_healthy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_latency_ms: Option<u64>,
    pub probe_count: u64,
    /// Unix milliseconds of the last probe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_probed_at: Option<u64>,
}

impl DependencyGroup {
    /// A group nobody has probed yet is presumed healthy.
    pub fn new(id: impl Into<GroupId>) -> Self {
        Self {
            id: id.into(),
            score: 1.0,
            last_healthy: None,
            last_latency_ms: None,
            probe_count: 0,
            last_probed_at: None,
        }
    }

    /// Fold a probe into the score. `weight` is clamped to `(0, 1]`.
    pub fn record_probe(&mut self, outcome: ProbeOutcome, weight: f64, probed_at_ms: u64) -> f64 {
        let weight = if weight.is_finite() {
            weight.clamp(f64::EPSILON, 1.0)
        } else {
            DEFAULT_EMA_WEIGHT
        };
        self.score = (weight * outcome.sample() + (1.0 - weight) * self.score).clamp(0.0, 1.0);
        self.last_healthy = Some(outcome.healthy);
        self.last_latency_ms = outcome.latency.map(|l| l.as_millis() as u64);
        self.probe_count += 1;
        self.last_probed_at = Some(probed_at_ms);
        self.score
    }

    pub fn is_available(&self, threshold: f64) -> bool {
        self.score >= threshold
    }
}
