//! Probe whose answer is set by the process itself.
//!
//! Used for groups without a remote health endpoint and by the CLI demo
//! tools, which toggle it to simulate an upstream outage.

use async_trait::async_trait;
use conductor_application::HealthProbe;
use conductor_domain::{GroupId, ProbeOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Debug)]
pub struct StaticProbe {
    healthy: AtomicBool,
}

impl StaticProbe {
    pub fn new(healthy: bool) -> Self {
        Self {
            healthy: AtomicBool::new(healthy),
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

impl Default for StaticProbe {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl HealthProbe for StaticProbe {
    async fn probe(&self, _group: &GroupId) -> ProbeOutcome {
        if self.is_healthy() {
            ProbeOutcome::healthy(Duration::ZERO)
        } else {
            ProbeOutcome::unhealthy()
        }
    }
}
