//! Breaker bank: one circuit breaker per tool id.
//!
//! Each breaker sits behind its own mutex, so state transitions for one tool
//! are serialised while unrelated tools never contend. The outer map is only
//! write-locked the first time a tool is seen.

use super::clock;
use conductor_domain::{Admission, BreakerPolicy, BreakerSnapshot, CircuitBreaker, CircuitState};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct BreakerBank {
    policy: BreakerPolicy,
    breakers: RwLock<HashMap<String, Arc<Mutex<CircuitBreaker>>>>,
}

impl BreakerBank {
    pub fn new(policy: BreakerPolicy) -> Self {
        Self {
            policy,
            breakers: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &BreakerPolicy {
        &self.policy
    }

    fn breaker(&self, tool_id: &str) -> Arc<Mutex<CircuitBreaker>> {
        if let Some(breaker) = self.breakers.read().get(tool_id) {
            return Arc::clone(breaker);
        }
        Arc::clone(
            self.breakers
                .write()
                .entry(tool_id.to_string())
                .or_default(),
        )
    }

    fn existing(&self, tool_id: &str) -> Option<Arc<Mutex<CircuitBreaker>>> {
        self.breakers.read().get(tool_id).cloned()
    }

    /// Ask permission for one call to `tool_id`.
    ///
    /// The returned permit must be settled with the call's outcome. Dropping
    /// it unsettled counts as a failure, so a trial whose future is dropped
    /// mid-call reopens the breaker instead of holding the slot.
    pub fn admit(&self, tool_id: &str) -> BreakerPermit {
        let breaker = self.breaker(tool_id);
        let admission = breaker.lock().admit(&self.policy, clock::now());
        if admission == Admission::Trial {
            info!(tool = %tool_id, "Circuit half-open, admitting trial call");
        }
        BreakerPermit {
            tool_id: tool_id.to_string(),
            admission,
            policy: self.policy,
            breaker: admission.is_allowed().then_some(breaker),
        }
    }

    #[cfg(test)]
    pub(crate) fn record_success(&self, tool_id: &str) {
        on_success(tool_id, &self.breaker(tool_id), Admission::Allowed);
    }

    #[cfg(test)]
    pub(crate) fn record_failure(&self, tool_id: &str) {
        on_failure(tool_id, &self.breaker(tool_id), Admission::Allowed, &self.policy);
    }

    /// Let the next call through early: Open past cooldown -> HalfOpen.
    pub fn allow_trial(&self, tool_id: &str) -> bool {
        let Some(breaker) = self.existing(tool_id) else {
            return false;
        };
        let allowed = breaker.lock().force_half_open(&self.policy, clock::now());
        if allowed {
            info!(tool = %tool_id, "Dependency recovered, breaker moved to half-open");
        }
        allowed
    }

    /// Operator reset to Closed. Returns false for a tool with no breaker yet.
    pub fn reset(&self, tool_id: &str) -> bool {
        match self.existing(tool_id) {
            Some(breaker) => {
                breaker.lock().reset();
                info!(tool = %tool_id, "Circuit manually reset");
                true
            }
            None => false,
        }
    }

    pub fn state(&self, tool_id: &str) -> CircuitState {
        self.existing(tool_id)
            .map(|b| b.lock().state())
            .unwrap_or_default()
    }

    pub fn consecutive_failures(&self, tool_id: &str) -> u32 {
        self.existing(tool_id)
            .map(|b| b.lock().consecutive_failures())
            .unwrap_or(0)
    }

    /// All breakers, sorted by tool id.
    pub fn snapshot(&self) -> Vec<BreakerSnapshot> {
        let now = clock::now();
        let breakers: Vec<(String, Arc<Mutex<CircuitBreaker>>)> = self
            .breakers
            .read()
            .iter()
            .map(|(id, b)| (id.clone(), Arc::clone(b)))
            .collect();

        let mut snapshots: Vec<BreakerSnapshot> = breakers
            .iter()
            .map(|(id, b)| b.lock().snapshot(id, &self.policy, now))
            .collect();
        snapshots.sort_by(|a, b| a.tool_id.cmp(&b.tool_id));
        snapshots
    }
}

/// Permission for one call, handed out by [`BreakerBank::admit`].
///
/// Settle it with [`succeed`](Self::succeed) or [`fail`](Self::fail), or give
/// it back with [`release`](Self::release) when the call said nothing about
/// the dependency. An unsettled permit counts as a failure when dropped.
#[must_use = "a dropped permit counts as a failed call"]
pub struct BreakerPermit {
    tool_id: String,
    admission: Admission,
    policy: BreakerPolicy,
    // None once settled, and for rejected calls
    breaker: Option<Arc<Mutex<CircuitBreaker>>>,
}

impl BreakerPermit {
    pub fn admission(&self) -> Admission {
        self.admission
    }

    pub fn is_allowed(&self) -> bool {
        self.admission.is_allowed()
    }

    pub fn succeed(mut self) {
        if let Some(breaker) = self.breaker.take() {
            on_success(&self.tool_id, &breaker, self.admission);
        }
    }

    pub fn fail(mut self) {
        if let Some(breaker) = self.breaker.take() {
            on_failure(&self.tool_id, &breaker, self.admission, &self.policy);
        }
    }

    /// Settle without an outcome; a trial slot goes back to the next caller.
    pub fn release(mut self) {
        if let Some(breaker) = self.breaker.take()
            && self.admission == Admission::Trial
        {
            breaker.lock().release_trial();
        }
    }
}

impl Drop for BreakerPermit {
    fn drop(&mut self) {
        if let Some(breaker) = self.breaker.take() {
            debug!(
                tool = %self.tool_id,
                trial = self.admission == Admission::Trial,
                "Call abandoned in flight, counting as failure"
            );
            on_failure(&self.tool_id, &breaker, self.admission, &self.policy);
        }
    }
}

fn on_success(tool_id: &str, breaker: &Mutex<CircuitBreaker>, admission: Admission) {
    let mut breaker = breaker.lock();
    let before = breaker.state();
    breaker.record_success(admission);
    if before == CircuitState::HalfOpen && breaker.state() == CircuitState::Closed {
        info!(tool = %tool_id, "Circuit closed after successful trial");
    }
}

fn on_failure(
    tool_id: &str,
    breaker: &Mutex<CircuitBreaker>,
    admission: Admission,
    policy: &BreakerPolicy,
) {
    let mut breaker = breaker.lock();
    let before = breaker.state();
    breaker.record_failure(admission, policy, clock::now());
    if before != CircuitState::Open && breaker.state() == CircuitState::Open {
        warn!(
            tool = %tool_id,
            failures = breaker.consecutive_failures(),
            cooldown_secs = policy.cooldown.as_secs(),
            "Circuit opened"
        );
    }
}

impl Default for BreakerBank {
    fn default() -> Self {
        Self::new(BreakerPolicy::default())
    }
}
