//! Initialization against the local backend.

use std::sync::Arc;

use cluster_handle::Cluster;
use cluster_handle::ClusterHandle;
use cluster_handle::ClusterState;
use cluster_handle::Error;
use cluster_handle::InitializationError;

use crate::common::config;
use crate::common::handle;
use crate::common::local_cluster;
use crate::common::node;

#[tokio::test]
async fn test_init_twice_acquires_once() {
    let local = local_cluster(3);
    let handle = handle(&local, "idempotent");

    let first = handle.init().await.unwrap().name().to_string();
    let second = handle.init().await.unwrap().name().to_string();

    assert_eq!(first, second);
    assert_eq!(local.connections_opened(), 1);
    assert_eq!(handle.metadata().await.unwrap().all_hosts().len(), 3);
    assert_eq!(handle.state(), ClusterState::Active);
}

#[tokio::test]
async fn test_init_falls_back_to_later_contact_points() {
    let local = local_cluster(3);
    local.stop_node(node(1));
    let handle = ClusterHandle::builder(Arc::new(local.clone()))
        .with_config(config())
        .add_contact_point(node(1).to_string())
        .add_contact_point(node(3).to_string())
        .build()
        .unwrap();

    let metadata = handle.metadata().await.unwrap();

    assert_eq!(metadata.cluster_name(), "Integration Cluster");
    assert_eq!(metadata.all_hosts().len(), 3);
}

#[tokio::test]
async fn test_unreachable_cluster_fails_init_and_closes() {
    let local = local_cluster(2);
    local.stop_node(node(1));
    local.stop_node(node(2));
    let handle = handle(&local, "unreachable");

    match handle.connect().await.unwrap_err() {
        Error::Initialization(InitializationError::NoHostAvailable { errors }) => {
            assert_eq!(errors.len(), 2);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(handle.is_closed());
    assert!(handle.connect().await.unwrap_err().is_closed());
}

#[tokio::test]
async fn test_metrics_are_scoped_per_handle() {
    let local = local_cluster(1);
    let a = handle(&local, "metrics-a");
    let b = handle(&local, "metrics-b");

    a.connect().await.unwrap().execute("SELECT * FROM ks.users").await.unwrap();
    b.init().await.unwrap();

    let exported = a.metrics().await.unwrap().export();
    assert!(exported.contains("cluster_requests_total{cluster=\"metrics-a\"} 1"), "{}", exported);
    assert_eq!(b.metrics().await.unwrap().requests(), 0);
}
