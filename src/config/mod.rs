//! Configuration management for the cluster handle.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Component-wise validation
//!
//! A loaded [`ClusterConfig`] is frozen behind an `Arc` by the builder and
//! shared read-only by the handle, its runtime and any wrapper around it.
mod monitoring;
mod pooling;
mod socket;
pub use monitoring::*;
pub use pooling::*;
pub use socket::*;

use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Main configuration container of a cluster handle
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables prefixed with `CLUSTER__` (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ClusterConfig {
    /// Per-host connection pool sizing
    #[serde(default)]
    pub pooling: PoolingOptions,
    /// Connect and read timeouts
    #[serde(default)]
    pub socket: SocketOptions,
    /// Default port for contact points
    #[serde(default)]
    pub protocol: ProtocolOptions,
    /// Control connection refresh behaviour
    #[serde(default)]
    pub metadata: MetadataOptions,
    /// Exported metric naming
    #[serde(default)]
    pub metrics: MetricsOptions,
}

impl ClusterConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Type defaults
    /// 2. `CONFIG_PATH` file, if the variable is set
    /// 3. Environment variables with `CLUSTER__` prefix
    ///
    /// # Example
    /// ```ignore
    /// std::env::set_var("CLUSTER__SOCKET__READ_TIMEOUT_MS", "500");
    /// let cfg = ClusterConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        let config: Self = builder.add_source(env_source()).build()?.try_deserialize()?;
        Ok(config)
    }

    /// Loads defaults, then an optional file, then the environment.
    ///
    /// Convenience over [`new`](Self::new) +
    /// [`with_override_config`](Self::with_override_config) that also
    /// validates the result.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config = Self::new()?;
        let config = match path {
            Some(path) => config.with_override_config(path)?,
            None => config,
        };
        config.validate()
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Environment variables are re-applied on top so they keep the highest
    /// priority.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns validated instance.
    pub fn validate(self) -> Result<Self> {
        self.pooling.validate()?;
        self.socket.validate()?;
        self.protocol.validate()?;
        self.metadata.validate()?;
        self.metrics.validate()?;
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("CLUSTER")
        .prefix_separator("__")
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
