//! HTTP health probe: a group is healthy when its endpoint answers 2xx.

use async_trait::async_trait;
use conductor_application::HealthProbe;
use conductor_domain::{GroupId, ProbeOutcome};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    /// `timeout` bounds the whole request; the monitor applies its own
    /// probe timeout on top.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("conductor/", env!("CARGO_PKG_VERSION"), " (health probe)"))
            .build()?;
        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(&self, group: &GroupId) -> ProbeOutcome {
        let start = Instant::now();
        match self.client.get(&self.url).send().await {
            Ok(response) if response.status().is_success() => {
                ProbeOutcome::healthy(start.elapsed())
            }
            Ok(response) => {
                debug!(group = %group, status = response.status().as_u16(), "Probe got non-2xx");
                ProbeOutcome::unhealthy()
            }
            Err(e) => {
                debug!(group = %group, "Probe request failed: {}", e);
                ProbeOutcome::unhealthy()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unhealthy() {
        // Port 9 (discard) on localhost is closed on test machines
        let probe = HttpProbe::new("http://127.0.0.1:9/health", Duration::from_millis(500)).unwrap();
        let outcome = probe.probe(&GroupId::new("mls")).await;
        assert!(!outcome.healthy);
    }
}
