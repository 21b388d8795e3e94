use serde::Deserialize;
use serde::Serialize;

use crate::InitializationError;
use crate::Result;

/// Per-host connection pool sizing
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PoolingOptions {
    /// Connections opened eagerly to every host by `connect()`
    /// Default: 1
    #[serde(default = "default_core_connections_per_host")]
    pub core_connections_per_host: usize,
}

impl Default for PoolingOptions {
    fn default() -> Self {
        Self {
            core_connections_per_host: default_core_connections_per_host(),
        }
    }
}

impl PoolingOptions {
    pub fn validate(&self) -> Result<()> {
        if self.core_connections_per_host == 0 {
            return Err(InitializationError::InvalidConfig(
                "pooling.core_connections_per_host must be at least 1".into(),
            )
            .into());
        }
        Ok(())
    }
}

fn default_core_connections_per_host() -> usize {
    1
}
