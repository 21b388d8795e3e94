//! A decorator forwarding to a real, initialized handle behaves exactly like
//! that handle.

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use cluster_handle::async_trait;
use cluster_handle::CloseFuture;
use cluster_handle::Cluster;
use cluster_handle::ClusterConfig;
use cluster_handle::ClusterHandle;
use cluster_handle::DelegatingCluster;
use cluster_handle::HostStateListener;
use cluster_handle::LatencyTracker;
use cluster_handle::Metadata;
use cluster_handle::Metrics;
use cluster_handle::Result;
use cluster_handle::Session;

use crate::common::handle;
use crate::common::local_cluster;
use crate::common::USERS_QUERY;

/// Counts connects, forwards everything. Keeps an inert handle of its own to
/// show it stays closed whatever happens to the delegate.
struct CountingCluster {
    base: ClusterHandle,
    inner: DelegatingCluster,
    connects: AtomicUsize,
}

impl CountingCluster {
    fn new(delegate: Arc<dyn Cluster>) -> Self {
        Self {
            base: ClusterHandle::neutralized(delegate.name(), Arc::new(ClusterConfig::default())),
            inner: DelegatingCluster::new(delegate),
            connects: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Cluster for CountingCluster {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn init(&self) -> Result<&dyn Cluster> {
        self.inner.init().await
    }

    async fn new_session(&self) -> Result<Session> {
        self.inner.new_session().await
    }

    async fn connect(&self) -> Result<Session> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.inner.connect().await
    }

    async fn connect_keyspace(
        &self,
        keyspace: &str,
    ) -> Result<Session> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.inner.connect_keyspace(keyspace).await
    }

    async fn metadata(&self) -> Result<Metadata> {
        self.inner.metadata().await
    }

    async fn configuration(&self) -> Result<Arc<ClusterConfig>> {
        self.inner.configuration().await
    }

    async fn metrics(&self) -> Result<Metrics> {
        self.inner.metrics().await
    }

    async fn register_listener(
        &self,
        listener: Arc<dyn HostStateListener>,
    ) -> Result<&dyn Cluster> {
        self.inner.register_listener(listener).await
    }

    async fn unregister_listener(
        &self,
        listener: Arc<dyn HostStateListener>,
    ) -> Result<&dyn Cluster> {
        self.inner.unregister_listener(listener).await
    }

    async fn register_tracker(
        &self,
        tracker: Arc<dyn LatencyTracker>,
    ) -> Result<&dyn Cluster> {
        self.inner.register_tracker(tracker).await
    }

    async fn unregister_tracker(
        &self,
        tracker: Arc<dyn LatencyTracker>,
    ) -> Result<&dyn Cluster> {
        self.inner.unregister_tracker(tracker).await
    }

    fn close_async(&self) -> CloseFuture {
        self.inner.close_async()
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

#[tokio::test]
async fn test_wrapper_query_matches_delegate_query() {
    let local = local_cluster(3);
    let delegate = Arc::new(handle(&local, "scenario-a"));
    delegate.init().await.unwrap();
    let wrapper = DelegatingCluster::new(delegate.clone());

    let through_wrapper = wrapper.connect().await.unwrap().execute(USERS_QUERY).await.unwrap();
    let direct = delegate.connect().await.unwrap().execute(USERS_QUERY).await.unwrap();

    assert_eq!(through_wrapper, direct);
    assert_eq!(through_wrapper.len(), 3);
    // one control connection, two sessions of two connections per host
    assert_eq!(local.connections_opened(), 1 + 2 * 3 * 2);
}

#[tokio::test]
async fn test_custom_decorator_forwards_and_keeps_its_base_closed() {
    let local = local_cluster(2);
    let delegate = Arc::new(handle(&local, "decorated"));
    let wrapper = CountingCluster::new(delegate.clone());

    assert!(wrapper.base.is_closed());
    assert!(!wrapper.is_closed());
    assert_eq!(wrapper.name(), "decorated");

    let session = wrapper.connect_keyspace("ks").await.unwrap();
    assert_eq!(session.execute("SELECT * FROM users").await.unwrap().len(), 3);
    wrapper.connect().await.unwrap();
    assert_eq!(wrapper.connects.load(Ordering::SeqCst), 2);
    assert_eq!(wrapper.metadata().await.unwrap().all_hosts().len(), 2);
    assert_eq!(wrapper.metrics().await.unwrap().requests(), 1);

    wrapper.close().await.unwrap();
    assert!(wrapper.is_closed());
    assert!(delegate.is_closed());
    assert!(wrapper.base.is_closed());
    assert_eq!(local.open_connections(), 0);
}

#[tokio::test]
async fn test_is_closed_tracks_the_delegate() {
    let local = local_cluster(1);
    let delegate = Arc::new(handle(&local, "observed"));
    let wrapper = CountingCluster::new(delegate.clone());

    assert!(!wrapper.is_closed());
    delegate.close().await.unwrap();
    assert!(wrapper.is_closed());
    assert!(wrapper.connect().await.unwrap_err().is_closed());
}
