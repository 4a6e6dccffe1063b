//! Engine configuration - policies for retries, breakers, cache and health.
//!
//! [`EngineConfig`] groups the static parameters shared by the execution
//! engine, the chain orchestrator and the background loops. It is built once
//! (usually from the infrastructure config loader) and cloned into each
//! component.

use conductor_domain::{BreakerPolicy, Complexity, DEFAULT_EMA_WEIGHT, ToolDescriptor};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Extra attempts after the first one, for retryable failures only
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each further retry
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1u32 << exponent)
    }

    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CachePolicy {
    /// TTL for cacheable tools that do not declare their own
    pub default_ttl: Duration,
    /// Upper bound on any entry's TTL
    pub max_ttl: Duration,
    /// How often the background sweeper runs
    pub sweep_interval: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            max_ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl CachePolicy {
    /// Entries older than this are swept regardless of their own TTL.
    pub fn stale_after(&self) -> Duration {
        self.max_ttl.saturating_mul(4)
    }

    /// Effective TTL for a descriptor.
    pub fn ttl_for(&self, descriptor: &ToolDescriptor) -> Duration {
        descriptor
            .cache_ttl
            .unwrap_or(self.default_ttl)
            .min(self.max_ttl)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthPolicy {
    pub interval: Duration,
    pub probe_timeout: Duration,
    /// EMA weight of the newest probe sample
    pub ema_weight: f64,
    /// Minimum score a group needs for its tools to run. Also the score at
    /// which the monitor lets breakers past their cooldown try again.
    pub threshold: f64,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            ema_weight: DEFAULT_EMA_WEIGHT,
            threshold: 0.5,
        }
    }
}

/// Default handler timeouts when a descriptor does not set its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexityTimeouts {
    pub simple: Duration,
    pub standard: Duration,
    pub research: Duration,
}

impl Default for ComplexityTimeouts {
    fn default() -> Self {
        Self {
            simple: Complexity::Simple.default_timeout(),
            standard: Complexity::Standard.default_timeout(),
            research: Complexity::Research.default_timeout(),
        }
    }
}

impl ComplexityTimeouts {
    pub fn for_complexity(&self, complexity: Complexity) -> Duration {
        match complexity {
            Complexity::Simple => self.simple,
            Complexity::Standard => self.standard,
            Complexity::Research => self.research,
        }
    }

    pub fn timeout_for(&self, descriptor: &ToolDescriptor) -> Duration {
        descriptor.timeout_or(self.for_complexity(descriptor.complexity))
    }
}

/// All engine policies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub retry: RetryPolicy,
    pub breaker: BreakerPolicy,
    pub cache: CachePolicy,
    pub health: HealthPolicy,
    pub timeouts: ComplexityTimeouts,
}

impl EngineConfig {
    // ==================== Builder Methods ====================

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_breaker(mut self, breaker: BreakerPolicy) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn with_cache(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_health(mut self, health: HealthPolicy) -> Self {
        self.health = health;
        self
    }

    pub fn with_timeouts(mut self, timeouts: ComplexityTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_domain::ToolCategory;

    #[test]
    fn test_default() {
        let config = EngineConfig::default();
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.initial_backoff, Duration::from_secs(1));
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.breaker.cooldown, Duration::from_secs(60));
        assert_eq!(config.health.interval, Duration::from_secs(30));
        assert_eq!(config.health.ema_weight, 0.3);
        assert_eq!(config.timeouts.simple, Duration::from_secs(3));
    }

    #[test]
    fn test_backoff_doubles() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.backoff_for(1), Duration::from_secs(1));
        assert_eq!(retry.backoff_for(2), Duration::from_secs(2));
        assert_eq!(retry.backoff_for(3), Duration::from_secs(4));
    }

    #[test]
    fn test_timeout_resolution() {
        let timeouts = ComplexityTimeouts::default();
        let research = ToolDescriptor::new("deep", "Deep", ToolCategory::Analysis)
            .with_complexity(Complexity::Research);
        assert_eq!(timeouts.timeout_for(&research), Duration::from_secs(30));

        let explicit = research.with_timeout(Duration::from_millis(750));
        assert_eq!(timeouts.timeout_for(&explicit), Duration::from_millis(750));
    }

    #[test]
    fn test_ttl_is_capped() {
        let policy = CachePolicy {
            default_ttl: Duration::from_secs(60),
            max_ttl: Duration::from_secs(120),
            sweep_interval: Duration::from_secs(10),
        };
        let plain = ToolDescriptor::new("a", "A", ToolCategory::Data).cacheable();
        assert_eq!(policy.ttl_for(&plain), Duration::from_secs(60));

        let long = plain.with_cache_ttl(Duration::from_secs(900));
        assert_eq!(policy.ttl_for(&long), Duration::from_secs(120));
        assert_eq!(policy.stale_after(), Duration::from_secs(480));
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::default()
            .with_retry(RetryPolicy::disabled())
            .with_breaker(BreakerPolicy::new(2, Duration::from_secs(5)));
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.breaker.failure_threshold, 2);
    }
}
