//! Configuration management for the vote service.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Component-wise validation
mod audit;
mod monitoring;
mod retry;
mod storage;
mod voting;
pub use audit::*;
pub use monitoring::*;
pub use retry::*;
pub use storage::*;
pub use voting::*;

#[cfg(test)]
mod config_test;

use std::env;
use std::fmt::Debug;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Prefix of environment variables overriding configuration values,
/// e.g. `VOTE__RETRY__TRANSACTION__MAX_RETRIES=8`.
pub const ENV_PREFIX: &str = "VOTE";

/// Main configuration container for the vote service components
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct VoteServiceConfig {
    /// Document store backend
    #[serde(default)]
    pub storage: StorageConfig,
    /// Voting rules and voter identity handling
    #[serde(default)]
    pub voting: VotingConfig,
    /// Audit trail sinks
    #[serde(default)]
    pub audit: AuditConfig,
    /// Retry policies for transactional operations
    #[serde(default)]
    pub retry: RetryPolicies,
    /// Metrics and monitoring settings
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

impl Debug for VoteServiceConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        // voter_key_secret stays out of logs
        f.debug_struct("VoteServiceConfig")
            .field("storage", &self.storage)
            .field("retry", &self.retry)
            .field("audit", &self.audit)
            .field("monitoring", &self.monitoring)
            .finish()
    }
}

impl VoteServiceConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `VOTE__` prefix (highest priority)
    ///
    /// # Note
    /// This method does NOT validate the configuration. Callers MUST call `validate()`
    /// before using the configuration.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONFIG_PATH", "config/vote.toml");
    /// std::env::set_var("VOTE__VOTING__ENFORCE_WINDOW", "false");
    /// let cfg = VoteServiceConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns validated instance.
    ///
    /// Consumes self and performs validation of all subsystems. Must be called
    /// after all configuration overrides to ensure the final config is valid.
    pub fn validate(self) -> Result<Self> {
        self.storage.validate()?;
        self.voting.validate()?;
        self.audit.validate()?;
        self.retry.validate()?;
        self.monitoring.validate()?;
        Ok(self)
    }
}

pub(super) fn invalid_config(msg: impl Into<String>) -> Error {
    Error::Config(ConfigError::Message(msg.into()))
}
