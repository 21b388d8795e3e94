//! A wrapper that only neutralizes its own handle and forwards nothing
//! fails loudly instead of returning empty data.

use std::sync::Arc;

use cluster_handle::async_trait;
use cluster_handle::CloseFuture;
use cluster_handle::Cluster;
use cluster_handle::ClusterConfig;
use cluster_handle::ClusterHandle;
use cluster_handle::Error;
use cluster_handle::HostStateListener;
use cluster_handle::LatencyTracker;
use cluster_handle::Metadata;
use cluster_handle::Metrics;
use cluster_handle::Result;
use cluster_handle::Session;

use crate::common::handle;
use crate::common::local_cluster;
use crate::common::USERS_QUERY;

/// Holds a delegate but routes every call to its own neutralized handle.
struct BrokenWrapper {
    base: ClusterHandle,
    delegate: Arc<dyn Cluster>,
}

impl BrokenWrapper {
    fn new(delegate: Arc<dyn Cluster>) -> Self {
        Self {
            base: ClusterHandle::neutralized(delegate.name(), Arc::new(ClusterConfig::default())),
            delegate,
        }
    }
}

#[async_trait]
impl Cluster for BrokenWrapper {
    fn name(&self) -> &str {
        self.base.name()
    }

    async fn init(&self) -> Result<&dyn Cluster> {
        self.base.init().await
    }

    async fn new_session(&self) -> Result<Session> {
        self.base.new_session().await
    }

    async fn connect(&self) -> Result<Session> {
        self.base.connect().await
    }

    async fn connect_keyspace(
        &self,
        keyspace: &str,
    ) -> Result<Session> {
        self.base.connect_keyspace(keyspace).await
    }

    async fn metadata(&self) -> Result<Metadata> {
        self.base.metadata().await
    }

    async fn configuration(&self) -> Result<Arc<ClusterConfig>> {
        self.base.configuration().await
    }

    async fn metrics(&self) -> Result<Metrics> {
        self.base.metrics().await
    }

    async fn register_listener(
        &self,
        listener: Arc<dyn HostStateListener>,
    ) -> Result<&dyn Cluster> {
        self.base.register_listener(listener).await
    }

    async fn unregister_listener(
        &self,
        listener: Arc<dyn HostStateListener>,
    ) -> Result<&dyn Cluster> {
        self.base.unregister_listener(listener).await
    }

    async fn register_tracker(
        &self,
        tracker: Arc<dyn LatencyTracker>,
    ) -> Result<&dyn Cluster> {
        self.base.register_tracker(tracker).await
    }

    async fn unregister_tracker(
        &self,
        tracker: Arc<dyn LatencyTracker>,
    ) -> Result<&dyn Cluster> {
        self.base.unregister_tracker(tracker).await
    }

    fn close_async(&self) -> CloseFuture {
        self.base.close_async()
    }

    async fn close(&self) -> Result<()> {
        self.base.close().await
    }

    fn is_closed(&self) -> bool {
        self.base.is_closed()
    }
}

struct NoopListener;

impl HostStateListener for NoopListener {
    fn on_add(
        &self,
        _host: &cluster_handle::Host,
    ) {
    }

    fn on_up(
        &self,
        _host: &cluster_handle::Host,
    ) {
    }

    fn on_down(
        &self,
        _host: &cluster_handle::Host,
    ) {
    }

    fn on_remove(
        &self,
        _host: &cluster_handle::Host,
    ) {
    }
}

fn assert_closed(
    operation: &str,
    result: Result<()>,
) {
    match result {
        Err(Error::Closed(closed)) => assert_eq!(closed.cluster, "scenario-b", "{}", operation),
        other => panic!("{} should fail with a closed-resource error, got {:?}", operation, other),
    }
}

#[tokio::test]
async fn test_broken_wrapper_connect_fails_with_closed_resource_error() {
    let local = local_cluster(2);
    let delegate = Arc::new(handle(&local, "scenario-b"));
    delegate.init().await.unwrap();
    let broken = BrokenWrapper::new(delegate.clone());

    let err = broken.connect().await.unwrap_err();

    assert!(err.is_closed(), "{:?}", err);
    assert!(broken.is_closed());
    // the delegate is untouched and still serves queries
    assert!(!broken.delegate.is_closed());
    let rows = broken.delegate.connect().await.unwrap().execute(USERS_QUERY).await.unwrap();
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn test_broken_wrapper_fails_every_capability() {
    let local = local_cluster(1);
    let delegate = Arc::new(handle(&local, "scenario-b"));
    let broken = BrokenWrapper::new(delegate.clone());
    let listener: Arc<dyn HostStateListener> = Arc::new(NoopListener);

    assert_closed("init", broken.init().await.map(|_| ()));
    assert_closed("new_session", broken.new_session().await.map(|_| ()));
    assert_closed("connect", broken.connect().await.map(|_| ()));
    assert_closed("connect_keyspace", broken.connect_keyspace("ks").await.map(|_| ()));
    assert_closed("metadata", broken.metadata().await.map(|_| ()));
    assert_closed("configuration", broken.configuration().await.map(|_| ()));
    assert_closed("metrics", broken.metrics().await.map(|_| ()));
    assert_closed("register", broken.register_listener(listener.clone()).await.map(|_| ()));
    assert_closed("unregister", broken.unregister_listener(listener).await.map(|_| ()));

    // closing the inert base is a no-op
    broken.close().await.unwrap();
    assert!(!delegate.is_closed());
    assert_eq!(local.connections_opened(), 0);
}
