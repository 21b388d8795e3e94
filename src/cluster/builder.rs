use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use super::ClusterHandle;
use crate::connection::parse_address;
use crate::constants::DEFAULT_CLUSTER_NAME_PREFIX;
use crate::ClusterConfig;
use crate::Connector;
use crate::InitializationError;
use crate::Result;

static NEXT_CLUSTER_ID: AtomicUsize = AtomicUsize::new(1);

pub struct ClusterBuilder {
    connector: Arc<dyn Connector>,
    config: ClusterConfig,
    name: Option<String>,
    contact_points: Vec<String>,
}

impl ClusterBuilder {
    /// Create a new builder with default config and no contact point
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            config: ClusterConfig::default(),
            name: None,
            contact_points: Vec::new(),
        }
    }

    /// Handle name (default: `cluster1`, `cluster2`, ... in creation order)
    pub fn with_cluster_name(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds `ip` or `ip:port`; a bare ip uses `protocol.port`.
    pub fn add_contact_point(
        mut self,
        address: impl Into<String>,
    ) -> Self {
        self.contact_points.push(address.into());
        self
    }

    pub fn add_contact_points<I, S>(
        mut self,
        addresses: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contact_points.extend(addresses.into_iter().map(Into::into));
        self
    }

    /// Set connection timeout (default: 5s)
    pub fn connect_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.socket.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set read timeout (default: 12s)
    pub fn read_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.socket.read_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Connections opened per host by `connect` (default: 1)
    pub fn core_connections_per_host(
        mut self,
        core: usize,
    ) -> Self {
        self.config.pooling.core_connections_per_host = core;
        self
    }

    /// Completely replaces the configuration
    ///
    /// # Warning: Configuration Override
    /// This discards every setting applied through the granular methods
    /// above. Call it first, then refine.
    ///
    /// # Example
    /// ```ignore
    /// let config = ClusterConfig::load(Some("cluster.toml"))?;
    /// let handle = ClusterHandle::builder(connector)
    ///     .with_config(config)
    ///     .add_contact_point("127.0.0.1")
    ///     .build()?;
    /// ```
    pub fn with_config(
        mut self,
        config: ClusterConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Validates the configuration and contact points.
    ///
    /// Nothing is connected here; see [`Cluster::init`](crate::Cluster::init).
    ///
    /// # Errors
    /// - [`InitializationError::InvalidConfig`] from validation
    /// - [`InitializationError::InvalidContactPoint`] for unparsable addresses
    /// - [`InitializationError::NoContactPoints`] if none was added
    pub fn build(self) -> Result<ClusterHandle> {
        let config = self.config.validate()?;

        let mut endpoints: Vec<SocketAddr> = Vec::with_capacity(self.contact_points.len());
        for raw in &self.contact_points {
            let address = parse_address(raw.trim(), config.protocol.port)?;
            if !endpoints.contains(&address) {
                endpoints.push(address);
            }
        }
        if endpoints.is_empty() {
            return Err(InitializationError::NoContactPoints.into());
        }

        let name = self.name.unwrap_or_else(|| {
            format!(
                "{}{}",
                DEFAULT_CLUSTER_NAME_PREFIX,
                NEXT_CLUSTER_ID.fetch_add(1, Ordering::Relaxed)
            )
        });
        Ok(ClusterHandle::new(name, endpoints, Arc::new(config), self.connector))
    }
}
