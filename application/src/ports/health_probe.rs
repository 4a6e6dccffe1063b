//! Health probe port
//!
//! A cheap, side-effect-free check of one dependency group, used only by the
//! health monitor. Probes never go through the execution engine, so probing
//! cannot trip a breaker that protects real traffic.

use async_trait::async_trait;
use conductor_domain::{GroupId, ProbeOutcome};

#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Probe `group`. Failures are reported as an unhealthy outcome.
    async fn probe(&self, group: &GroupId) -> ProbeOutcome;
}
