use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::ClusterBuilder;
use super::ClusterRuntime;
use super::ClusterState;
use super::CloseFuture;
use super::Lifecycle;
use crate::ClosedResourceError;
use crate::Cluster;
use crate::ClusterConfig;
use crate::Connector;
use crate::HostStateListener;
use crate::LatencyTracker;
use crate::Listeners;
use crate::Metadata;
use crate::Metrics;
use crate::QueryError;
use crate::Result;
use crate::Session;

/// The real cluster handle.
///
/// Cheap to build: nothing is acquired until [`init`](Cluster::init) or the
/// first capability call. Share it behind an `Arc` to use it from several
/// tasks, or wrap it in a [`DelegatingCluster`](crate::DelegatingCluster).
pub struct ClusterHandle {
    name: String,
    endpoints: Vec<SocketAddr>,
    config: Arc<ClusterConfig>,
    /// `None` only for neutralized handles
    connector: Option<Arc<dyn Connector>>,
    listeners: Arc<Listeners>,
    lifecycle: Lifecycle,
}

impl ClusterHandle {
    pub fn builder(connector: Arc<dyn Connector>) -> ClusterBuilder {
        ClusterBuilder::new(connector)
    }

    pub(crate) fn new(
        name: String,
        endpoints: Vec<SocketAddr>,
        config: Arc<ClusterConfig>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        debug!("cluster handle {} created, endpoints: {:?}", name, endpoints);
        Self {
            lifecycle: Lifecycle::new(&name),
            name,
            endpoints,
            config,
            connector: Some(connector),
            listeners: Arc::new(Listeners::new()),
        }
    }

    /// Builds an inert handle that is closed from construction.
    ///
    /// It has no endpoints and no connector: every capability fails with
    /// [`ClosedResourceError`]. Wrappers that keep a handle of their own next
    /// to their delegate use this so the unused part can never connect.
    pub fn neutralized(
        name: impl Into<String>,
        config: Arc<ClusterConfig>,
    ) -> Self {
        let name = name.into();
        let lifecycle = Lifecycle::new(&name);
        // Uninitialized -> Closed, nothing to release
        let _ = lifecycle.close_async();
        Self {
            name,
            endpoints: Vec::new(),
            config,
            connector: None,
            listeners: Arc::new(Listeners::new()),
            lifecycle,
        }
    }

    /// Contact points used by initialization
    pub fn endpoints(&self) -> &[SocketAddr] {
        &self.endpoints
    }

    pub fn state(&self) -> ClusterState {
        self.lifecycle.state()
    }

    async fn runtime(
        &self,
        operation: &'static str,
    ) -> Result<Arc<ClusterRuntime>> {
        self.lifecycle
            .ensure_active(operation, || {
                let name = self.name.clone();
                let endpoints = self.endpoints.clone();
                let config = self.config.clone();
                let connector = self.connector.clone();
                let listeners = self.listeners.clone();
                async move {
                    let connector = connector.ok_or_else(|| ClosedResourceError::new(&name, operation))?;
                    ClusterRuntime::start(name, endpoints, config, connector, listeners).await
                }
            })
            .await
    }
}

#[async_trait]
impl Cluster for ClusterHandle {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self) -> Result<&dyn Cluster> {
        self.runtime("init").await?;
        Ok(self)
    }

    async fn new_session(&self) -> Result<Session> {
        self.runtime("new_session").await?.new_session(None).await
    }

    async fn connect(&self) -> Result<Session> {
        let session = self.runtime("connect").await?.new_session(None).await?;
        session.warm_up().await;
        Ok(session)
    }

    async fn connect_keyspace(
        &self,
        keyspace: &str,
    ) -> Result<Session> {
        let runtime = self.runtime("connect").await?;
        if runtime.config().metadata.schema_enabled && runtime.metadata().keyspace(keyspace).is_none() {
            return Err(QueryError::InvalidKeyspace(keyspace.to_string()).into());
        }
        let session = runtime.new_session(Some(keyspace.to_string())).await?;
        session.warm_up().await;
        Ok(session)
    }

    async fn metadata(&self) -> Result<Metadata> {
        Ok(self.runtime("metadata").await?.metadata())
    }

    async fn configuration(&self) -> Result<Arc<ClusterConfig>> {
        self.runtime("configuration").await?;
        Ok(self.config.clone())
    }

    async fn metrics(&self) -> Result<Metrics> {
        Ok(self.runtime("metrics").await?.metrics().clone())
    }

    async fn register_listener(
        &self,
        listener: Arc<dyn HostStateListener>,
    ) -> Result<&dyn Cluster> {
        self.runtime("register").await?;
        if self.listeners.hosts.insert(listener.clone()) {
            listener.on_register(self);
        }
        Ok(self)
    }

    async fn unregister_listener(
        &self,
        listener: Arc<dyn HostStateListener>,
    ) -> Result<&dyn Cluster> {
        self.runtime("unregister").await?;
        if self.listeners.hosts.remove(&listener) {
            listener.on_unregister(self);
        }
        Ok(self)
    }

    async fn register_tracker(
        &self,
        tracker: Arc<dyn LatencyTracker>,
    ) -> Result<&dyn Cluster> {
        self.runtime("register").await?;
        if self.listeners.trackers.insert(tracker.clone()) {
            tracker.on_register(self);
        }
        Ok(self)
    }

    async fn unregister_tracker(
        &self,
        tracker: Arc<dyn LatencyTracker>,
    ) -> Result<&dyn Cluster> {
        self.runtime("unregister").await?;
        if self.listeners.trackers.remove(&tracker) {
            tracker.on_unregister(self);
        }
        Ok(self)
    }

    fn close_async(&self) -> CloseFuture {
        self.lifecycle.close_async()
    }

    async fn close(&self) -> Result<()> {
        self.close_async().await
    }

    fn is_closed(&self) -> bool {
        self.lifecycle.is_closed()
    }
}

impl std::fmt::Debug for ClusterHandle {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ClusterHandle")
            .field("name", &self.name)
            .field("endpoints", &self.endpoints)
            .field("state", &self.state())
            .finish()
    }
}
