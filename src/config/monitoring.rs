use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::InitializationError;
use crate::Result;

/// Port and contact point settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProtocolOptions {
    /// Port used for contact points given without one
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ProtocolOptions {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

impl ProtocolOptions {
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(InitializationError::InvalidConfig("protocol.port cannot be 0".into()).into());
        }
        Ok(())
    }
}

/// Control connection refresh behaviour
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MetadataOptions {
    /// Interval of the background topology refresh
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// Whether keyspace and table metadata is fetched at all
    #[serde(default = "default_schema_enabled")]
    pub schema_enabled: bool,
}

impl Default for MetadataOptions {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            schema_enabled: default_schema_enabled(),
        }
    }
}

impl MetadataOptions {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_ms == 0 {
            return Err(InitializationError::InvalidConfig("metadata.refresh_interval_ms cannot be 0".into()).into());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MetricsOptions {
    /// Prefix of every exported metric name
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

impl MetricsOptions {
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(InitializationError::InvalidConfig("metrics.namespace cannot be empty".into()).into());
        }
        if !self.namespace.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(InitializationError::InvalidConfig(format!(
                "metrics.namespace {:?} may only contain [a-zA-Z0-9_]",
                self.namespace
            ))
            .into());
        }
        Ok(())
    }
}

fn default_port() -> u16 {
    9042
}
fn default_refresh_interval_ms() -> u64 {
    1000
}
fn default_schema_enabled() -> bool {
    true
}
fn default_namespace() -> String {
    "cluster".to_string()
}
