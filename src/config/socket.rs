use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::InitializationError;
use crate::Result;

/// Socket level timeouts applied by the connection layer
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SocketOptions {
    /// Maximum time to wait for a connection to be established
    /// Default: 5 seconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Maximum time to wait for a statement response
    /// Default: 12 seconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl SocketOptions {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_ms == 0 {
            return Err(InitializationError::InvalidConfig("socket.connect_timeout_ms cannot be 0".into()).into());
        }
        if self.read_timeout_ms == 0 {
            return Err(InitializationError::InvalidConfig("socket.read_timeout_ms cannot be 0".into()).into());
        }
        Ok(())
    }
}

fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_read_timeout_ms() -> u64 {
    12000
}
