use std::sync::Arc;

use async_trait::async_trait;

use super::CloseFuture;
use crate::Cluster;
use crate::ClusterConfig;
use crate::HostStateListener;
use crate::LatencyTracker;
use crate::Metadata;
use crate::Metrics;
use crate::Result;
use crate::Session;

/// Forwards every operation to another [`Cluster`].
///
/// Owns nothing but the delegate reference: no endpoints, no runtime, no
/// lifecycle of its own. `init` and the registration methods return what the
/// delegate returns, so chained calls keep operating on the delegate.
///
/// Embed it (or implement [`Cluster`] the same way) to decorate a handle:
///
/// ```ignore
/// struct Audited {
///     inner: DelegatingCluster,
/// }
///
/// #[async_trait]
/// impl Cluster for Audited {
///     async fn connect(&self) -> Result<Session> {
///         info!("connect on {}", self.name());
///         self.inner.connect().await
///     }
///     // every other operation forwards to `self.inner`
/// }
/// ```
#[derive(Clone)]
pub struct DelegatingCluster {
    delegate: Arc<dyn Cluster>,
}

impl DelegatingCluster {
    pub fn new(delegate: Arc<dyn Cluster>) -> Self {
        Self { delegate }
    }

    pub fn delegate(&self) -> &Arc<dyn Cluster> {
        &self.delegate
    }
}

#[async_trait]
impl Cluster for DelegatingCluster {
    fn name(&self) -> &str {
        self.delegate.name()
    }

    async fn init(&self) -> Result<&dyn Cluster> {
        self.delegate.init().await
    }

    async fn new_session(&self) -> Result<Session> {
        self.delegate.new_session().await
    }

    async fn connect(&self) -> Result<Session> {
        self.delegate.connect().await
    }

    async fn connect_keyspace(
        &self,
        keyspace: &str,
    ) -> Result<Session> {
        self.delegate.connect_keyspace(keyspace).await
    }

    async fn metadata(&self) -> Result<Metadata> {
        self.delegate.metadata().await
    }

    async fn configuration(&self) -> Result<Arc<ClusterConfig>> {
        self.delegate.configuration().await
    }

    async fn metrics(&self) -> Result<Metrics> {
        self.delegate.metrics().await
    }

    async fn register_listener(
        &self,
        listener: Arc<dyn HostStateListener>,
    ) -> Result<&dyn Cluster> {
        self.delegate.register_listener(listener).await
    }

    async fn unregister_listener(
        &self,
        listener: Arc<dyn HostStateListener>,
    ) -> Result<&dyn Cluster> {
        self.delegate.unregister_listener(listener).await
    }

    async fn register_tracker(
        &self,
        tracker: Arc<dyn LatencyTracker>,
    ) -> Result<&dyn Cluster> {
        self.delegate.register_tracker(tracker).await
    }

    async fn unregister_tracker(
        &self,
        tracker: Arc<dyn LatencyTracker>,
    ) -> Result<&dyn Cluster> {
        self.delegate.unregister_tracker(tracker).await
    }

    fn close_async(&self) -> CloseFuture {
        self.delegate.close_async()
    }

    async fn close(&self) -> Result<()> {
        self.delegate.close().await
    }

    fn is_closed(&self) -> bool {
        self.delegate.is_closed()
    }
}

impl std::fmt::Debug for DelegatingCluster {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("DelegatingCluster")
            .field("delegate", &self.delegate.name())
            .field("closed", &self.delegate.is_closed())
            .finish()
    }
}
