use std::net::SocketAddr;
use std::sync::Arc;

use crate::ClusterConfig;
use crate::ClusterHandle;
use crate::LocalCluster;
use crate::Row;

pub(crate) const TEST_KEYSPACE: &str = "ks";
pub(crate) const TEST_TABLE: &str = "users";

/// `127.0.0.{last}:9042`
pub(crate) fn node_addr(last: u8) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, last], 9042))
}

pub(crate) fn user_rows() -> Vec<Row> {
    vec![
        Row::new().with("id", 1).with("name", "alice"),
        Row::new().with("id", 2).with("name", "bob"),
    ]
}

/// `nodes` running nodes `127.0.0.1..=nodes` in dc1 with `ks.users` filled.
pub(crate) fn local_cluster(nodes: u8) -> LocalCluster {
    let mut builder = LocalCluster::builder().name("Test Cluster");
    for i in 1..=nodes {
        builder = builder.node(node_addr(i).to_string(), "dc1", format!("rack{}", i));
    }
    for row in user_rows() {
        builder = builder.row(TEST_KEYSPACE, TEST_TABLE, row);
    }
    builder.build().expect("local cluster should build")
}

/// Short timeouts, and a refresh interval long enough that tests drive
/// refreshes themselves.
pub(crate) fn test_config() -> ClusterConfig {
    let mut config = ClusterConfig::default();
    config.socket.connect_timeout_ms = 200;
    config.socket.read_timeout_ms = 500;
    config.metadata.refresh_interval_ms = 60_000;
    config
}

/// Handle on `local` using its first node as only contact point.
pub(crate) fn handle_for(local: &LocalCluster) -> ClusterHandle {
    ClusterHandle::builder(Arc::new(local.clone()))
        .with_config(test_config())
        .with_cluster_name("test")
        .add_contact_point(node_addr(1).to_string())
        .build()
        .expect("handle should build")
}
