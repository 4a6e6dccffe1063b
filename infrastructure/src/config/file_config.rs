//! Raw TOML configuration data types
//!
//! These structs mirror the config file layout. Durations are plain integers
//! with the unit in the field name so that files and `CONDUCTOR_*`
//! environment variables stay readable.

use conductor_application::{
    CachePolicy, ComplexityTimeouts, EngineConfig, HealthPolicy, RetryPolicy,
};
use conductor_domain::{BreakerPolicy, GroupId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("breaker.failure_threshold cannot be 0")]
    ZeroFailureThreshold,

    #[error("{field} cannot be 0")]
    ZeroDuration { field: &'static str },

    #[error("health.ema_weight must be in (0, 1], got {0}")]
    InvalidEmaWeight(f64),

    #[error("engine.min_dependency_health must be in [0, 1], got {0}")]
    InvalidHealthThreshold(f64),

    #[error("cache.default_ttl_secs ({default}) exceeds cache.max_ttl_secs ({max})")]
    DefaultTtlAboveMax { default: u64, max: u64 },

    #[error("health group name cannot be empty")]
    EmptyGroupName,

    #[error("health group '{0}' is declared more than once")]
    DuplicateGroup(String),
}

/// `[engine]`: retries, per-complexity timeouts and the dependency gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEngineConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub simple_timeout_secs: u64,
    pub standard_timeout_secs: u64,
    pub research_timeout_secs: u64,
    /// Minimum rolling health a dependency group needs for its tools to run
    pub min_dependency_health: f64,
}

impl Default for FileEngineConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        let timeouts = ComplexityTimeouts::default();
        Self {
            max_retries: retry.max_retries,
            initial_backoff_ms: retry.initial_backoff.as_millis() as u64,
            simple_timeout_secs: timeouts.simple.as_secs(),
            standard_timeout_secs: timeouts.standard.as_secs(),
            research_timeout_secs: timeouts.research.as_secs(),
            min_dependency_health: HealthPolicy::default().threshold,
        }
    }
}

/// `[breaker]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBreakerConfig {
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

impl Default for FileBreakerConfig {
    fn default() -> Self {
        let policy = BreakerPolicy::default();
        Self {
            failure_threshold: policy.failure_threshold,
            cooldown_secs: policy.cooldown.as_secs(),
        }
    }
}

/// `[cache]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCacheConfig {
    pub default_ttl_secs: u64,
    pub max_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for FileCacheConfig {
    fn default() -> Self {
        let policy = CachePolicy::default();
        Self {
            default_ttl_secs: policy.default_ttl.as_secs(),
            max_ttl_secs: policy.max_ttl.as_secs(),
            sweep_interval_secs: policy.sweep_interval.as_secs(),
        }
    }
}

/// One `[[health.groups]]` entry.
///
/// A group without `probe_url` is still registered and reported, with a
/// probe that always answers healthy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGroupConfig {
    pub name: String,
    /// Polled with GET when the `http-probe` feature is enabled
    pub probe_url: Option<String>,
}

/// `[health]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileHealthConfig {
    pub interval_secs: u64,
    pub probe_timeout_secs: u64,
    pub ema_weight: f64,
    pub groups: Vec<FileGroupConfig>,
}

impl Default for FileHealthConfig {
    fn default() -> Self {
        let policy = HealthPolicy::default();
        Self {
            interval_secs: policy.interval.as_secs(),
            probe_timeout_secs: policy.probe_timeout.as_secs(),
            ema_weight: policy.ema_weight,
            groups: Vec::new(),
        }
    }
}

/// `[audit]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAuditConfig {
    /// Append execution and chain records here as JSON lines
    pub jsonl_path: Option<PathBuf>,
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Daily rolling log files are written here when set
    pub dir: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            file_prefix: "conductor.log".to_string(),
        }
    }
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub engine: FileEngineConfig,
    pub breaker: FileBreakerConfig,
    pub cache: FileCacheConfig,
    pub health: FileHealthConfig,
    pub audit: FileAuditConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Check every value that would make the engine misbehave.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.breaker.failure_threshold == 0 {
            return Err(ConfigValidationError::ZeroFailureThreshold);
        }

        let durations = [
            ("engine.simple_timeout_secs", self.engine.simple_timeout_secs),
            ("engine.standard_timeout_secs", self.engine.standard_timeout_secs),
            ("engine.research_timeout_secs", self.engine.research_timeout_secs),
            ("breaker.cooldown_secs", self.breaker.cooldown_secs),
            ("cache.max_ttl_secs", self.cache.max_ttl_secs),
            ("cache.sweep_interval_secs", self.cache.sweep_interval_secs),
            ("health.interval_secs", self.health.interval_secs),
            ("health.probe_timeout_secs", self.health.probe_timeout_secs),
        ];
        if let Some((field, _)) = durations.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigValidationError::ZeroDuration { field });
        }

        let weight = self.health.ema_weight;
        if !(weight > 0.0 && weight <= 1.0) {
            return Err(ConfigValidationError::InvalidEmaWeight(weight));
        }

        let threshold = self.engine.min_dependency_health;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigValidationError::InvalidHealthThreshold(threshold));
        }

        if self.cache.default_ttl_secs > self.cache.max_ttl_secs {
            return Err(ConfigValidationError::DefaultTtlAboveMax {
                default: self.cache.default_ttl_secs,
                max: self.cache.max_ttl_secs,
            });
        }

        let mut seen = std::collections::HashSet::new();
        for group in &self.health.groups {
            if group.name.trim().is_empty() {
                return Err(ConfigValidationError::EmptyGroupName);
            }
            if !seen.insert(group.name.as_str()) {
                return Err(ConfigValidationError::DuplicateGroup(group.name.clone()));
            }
        }

        Ok(())
    }

    /// Validate and convert to the engine's policies.
    pub fn into_engine_config(&self) -> Result<EngineConfig, ConfigValidationError> {
        self.validate()?;

        Ok(EngineConfig::default()
            .with_retry(RetryPolicy {
                max_retries: self.engine.max_retries,
                initial_backoff: Duration::from_millis(self.engine.initial_backoff_ms),
            })
            .with_breaker(BreakerPolicy::new(
                self.breaker.failure_threshold,
                Duration::from_secs(self.breaker.cooldown_secs),
            ))
            .with_cache(CachePolicy {
                default_ttl: Duration::from_secs(self.cache.default_ttl_secs),
                max_ttl: Duration::from_secs(self.cache.max_ttl_secs),
                sweep_interval: Duration::from_secs(self.cache.sweep_interval_secs),
            })
            .with_health(HealthPolicy {
                interval: Duration::from_secs(self.health.interval_secs),
                probe_timeout: Duration::from_secs(self.health.probe_timeout_secs),
                ema_weight: self.health.ema_weight,
                threshold: self.engine.min_dependency_health,
            })
            .with_timeouts(ComplexityTimeouts {
                simple: Duration::from_secs(self.engine.simple_timeout_secs),
                standard: Duration::from_secs(self.engine.standard_timeout_secs),
                research: Duration::from_secs(self.engine.research_timeout_secs),
            }))
    }

    /// Every configured group with its probe URL, if any.
    pub fn health_groups(&self) -> impl Iterator<Item = (GroupId, Option<&str>)> {
        self.health
            .groups
            .iter()
            .map(|group| (GroupId::new(group.name.as_str()), group.probe_url.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_defaults() {
        let config = FileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.into_engine_config().unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[engine]
max_retries = 2
initial_backoff_ms = 250
research_timeout_secs = 45
min_dependency_health = 0.6

[breaker]
failure_threshold = 3
cooldown_secs = 20

[cache]
default_ttl_secs = 120

[health]
ema_weight = 0.5

[[health.groups]]
name = "mls"
probe_url = "http://localhost:9000/health"

[[health.groups]]
name = "geocoder"

[audit]
jsonl_path = "/var/log/conductor/audit.jsonl"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let engine = config.into_engine_config().unwrap();

        assert_eq!(engine.retry.max_retries, 2);
        assert_eq!(engine.retry.initial_backoff, Duration::from_millis(250));
        assert_eq!(engine.timeouts.research, Duration::from_secs(45));
        // Unset keys keep their defaults
        assert_eq!(engine.timeouts.simple, Duration::from_secs(3));
        assert_eq!(engine.breaker.failure_threshold, 3);
        assert_eq!(engine.breaker.cooldown, Duration::from_secs(20));
        assert_eq!(engine.cache.default_ttl, Duration::from_secs(120));
        assert_eq!(engine.cache.max_ttl, Duration::from_secs(3600));
        assert_eq!(engine.health.ema_weight, 0.5);
        assert_eq!(engine.health.threshold, 0.6);

        let groups: Vec<_> = config.health_groups().collect();
        assert_eq!(
            groups,
            vec![
                (GroupId::new("mls"), Some("http://localhost:9000/health")),
                (GroupId::new("geocoder"), None),
            ]
        );
        assert_eq!(
            config.audit.jsonl_path,
            Some(PathBuf::from("/var/log/conductor/audit.jsonl"))
        );
    }

    #[test]
    fn test_empty_file_is_default() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_rejects_zero_threshold() {
        let mut config = FileConfig::default();
        config.breaker.failure_threshold = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::ZeroFailureThreshold)
        );
    }

    #[test]
    fn test_rejects_zero_duration() {
        let mut config = FileConfig::default();
        config.health.probe_timeout_secs = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::ZeroDuration {
                field: "health.probe_timeout_secs"
            })
        );
    }

    #[test]
    fn test_rejects_weight_out_of_range() {
        for weight in [0.0, 1.5, f64::NAN] {
            let mut config = FileConfig::default();
            config.health.ema_weight = weight;
            assert!(matches!(
                config.validate(),
                Err(ConfigValidationError::InvalidEmaWeight(_))
            ));
        }

        let mut config = FileConfig::default();
        config.health.ema_weight = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_default_ttl_above_max() {
        let mut config = FileConfig::default();
        config.cache.default_ttl_secs = 7200;
        assert!(matches!(
            config.into_engine_config(),
            Err(ConfigValidationError::DefaultTtlAboveMax { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_group() {
        let mut config = FileConfig::default();
        config.health.groups = vec![
            FileGroupConfig {
                name: "mls".into(),
                probe_url: None,
            },
            FileGroupConfig {
                name: "mls".into(),
                probe_url: Some("http://x".into()),
            },
        ];
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::DuplicateGroup("mls".into()))
        );
    }
}
