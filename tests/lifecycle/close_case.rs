//! Concurrent and repeated shutdown of an active handle.

use std::sync::Arc;

use cluster_handle::Cluster;
use cluster_handle::ClusterState;

use crate::common::handle;
use crate::common::local_cluster;
use crate::common::USERS_QUERY;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_close_async_tears_down_once() {
    let local = local_cluster(3);
    let handle = Arc::new(handle(&local, "scenario-c"));
    let session = handle.connect().await.unwrap();
    session.execute(USERS_QUERY).await.unwrap();
    let opened = local.connections_opened();

    let first = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.close_async().await })
    };
    let second = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.close_async().await })
    };
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    assert_eq!(handle.state(), ClusterState::Closed);
    assert_eq!(local.connections_closed(), opened);
    assert_eq!(local.open_connections(), 0);

    // later calls resolve immediately, nothing left to release
    handle.close().await.unwrap();
    handle.close_async().await.unwrap();
    assert_eq!(local.connections_closed(), opened);
}

#[tokio::test]
async fn test_sessions_fail_after_close() {
    let local = local_cluster(2);
    let handle = handle(&local, "closed-sessions");
    let session = handle.connect().await.unwrap();

    handle.close().await.unwrap();

    assert!(session.is_closed());
    let err = session.execute(USERS_QUERY).await.unwrap_err();
    assert!(err.is_closed(), "{:?}", err);
    assert!(handle.new_session().await.unwrap_err().is_closed());
}

#[tokio::test]
async fn test_close_future_outlives_the_handle() {
    let local = local_cluster(2);
    let handle = handle(&local, "dropped");
    handle.connect().await.unwrap();

    let closing = handle.close_async();
    drop(handle);

    closing.await.unwrap();
    assert_eq!(local.open_connections(), 0);
}
