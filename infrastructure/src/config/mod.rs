//! Configuration loading
//!
//! Loads the engine configuration from TOML files and the environment.
//!
//! # Priority (highest to lowest)
//!
//! 1. `CONDUCTOR_*` environment variables (`__` separates nested keys)
//! 2. `--config <path>`
//! 3. `./conductor.toml` or `./.conductor.toml`
//! 4. `$XDG_CONFIG_HOME/conductor/config.toml`
//! 5. Built-in defaults

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileAuditConfig, FileBreakerConfig, FileCacheConfig, FileConfig,
    FileEngineConfig, FileGroupConfig, FileHealthConfig, FileLoggingConfig,
};
pub use loader::{ConfigLoader, ENV_PREFIX};
