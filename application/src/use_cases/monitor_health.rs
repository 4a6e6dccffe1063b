//! Health monitor
//!
//! Background loop that probes every dependency group, folds the outcome
//! into the group's rolling score, and lets breakers of recovered groups try
//! again as soon as their cooldown has passed.

use crate::catalog::ToolCatalog;
use crate::config::HealthPolicy;
use crate::engine::{EngineState, clock};
use crate::ports::health_probe::HealthProbe;
use conductor_domain::{GroupId, ProbeOutcome};
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of probing one group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSweep {
    pub group: GroupId,
    pub healthy: bool,
    pub score: f64,
    /// Tools whose open breaker was moved to half-open
    pub trials_allowed: Vec<String>,
}

pub struct HealthMonitor {
    catalog: Arc<ToolCatalog>,
    state: EngineState,
    policy: HealthPolicy,
    probes: BTreeMap<GroupId, Arc<dyn HealthProbe>>,
}

impl HealthMonitor {
    pub fn new(catalog: Arc<ToolCatalog>, state: EngineState, policy: HealthPolicy) -> Self {
        for group in catalog.registry().dependency_groups() {
            state.health.register(&group);
        }
        Self {
            catalog,
            state,
            policy,
            probes: BTreeMap::new(),
        }
    }

    pub fn with_probe(mut self, group: impl Into<GroupId>, probe: Arc<dyn HealthProbe>) -> Self {
        let group = group.into();
        self.state.health.register(&group);
        self.probes.insert(group, probe);
        self
    }

    /// Groups that have a probe attached.
    pub fn probed_groups(&self) -> impl Iterator<Item = &GroupId> {
        self.probes.keys()
    }

    /// Probe every group once, concurrently.
    ///
    /// Groups without a probe keep their current score.
    pub async fn sweep_once(&self) -> Vec<GroupSweep> {
        let outcomes = join_all(
            self.probes
                .iter()
                .map(|(group, probe)| self.probe_group(group, probe.as_ref())),
        )
        .await;

        self.probes
            .keys()
            .zip(outcomes)
            .map(|(group, outcome)| self.apply(group, outcome))
            .collect()
    }

    async fn probe_group(&self, group: &GroupId, probe: &dyn HealthProbe) -> ProbeOutcome {
        match tokio::time::timeout(self.policy.probe_timeout, probe.probe(group)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(group = %group, "Health probe timed out");
                ProbeOutcome::unhealthy()
            }
        }
    }

    fn apply(&self, group: &GroupId, outcome: ProbeOutcome) -> GroupSweep {
        let before = self.state.health.score(group);
        let score = self.state.health.record(group, outcome, clock::unix_millis());

        if before >= self.policy.threshold && score < self.policy.threshold {
            warn!(group = %group, score, "Dependency group degraded");
        }

        let mut trials_allowed = Vec::new();
        if score >= self.policy.threshold {
            for tool in self.catalog.registry().tools_in_group(group) {
                // A tool spanning several groups needs all of them healthy
                let all_healthy = self
                    .state
                    .health
                    .first_unavailable(&tool.dependencies, self.policy.threshold)
                    .is_none();
                if all_healthy && self.state.breakers.allow_trial(&tool.id) {
                    trials_allowed.push(tool.id.clone());
                }
            }
            if !trials_allowed.is_empty() {
                info!(group = %group, tools = ?trials_allowed, "Dependency recovered");
            }
        }

        GroupSweep {
            group: group.clone(),
            healthy: outcome.healthy,
            score,
            trials_allowed,
        }
    }

    /// Probe on the configured interval until `token` is cancelled. The first
    /// sweep runs immediately.
    pub async fn run(&self, token: CancellationToken) {
        let mut interval = tokio::time::interval(self.policy.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(
            groups = self.probes.len(),
            interval_secs = self.policy.interval.as_secs(),
            "Health monitor started"
        );
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    self.sweep_once().await;
                }
            }
        }
        debug!("Health monitor stopped");
    }

    pub fn spawn(self: Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(token).await })
    }
}
