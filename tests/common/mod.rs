use std::net::SocketAddr;
use std::sync::Arc;

use cluster_handle::ClusterConfig;
use cluster_handle::ClusterHandle;
use cluster_handle::LocalCluster;
use cluster_handle::Row;

pub const USERS_QUERY: &str = "SELECT * FROM ks.users";

pub fn node(last: u8) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, last], 9042))
}

/// `nodes` running nodes with `ks.users` holding three rows
pub fn local_cluster(nodes: u8) -> LocalCluster {
    let mut builder = LocalCluster::builder().name("Integration Cluster");
    for i in 1..=nodes {
        builder = builder.node(node(i).to_string(), "dc1", "rack1");
    }
    for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol")] {
        builder = builder.row("ks", "users", Row::new().with("id", id).with("name", name));
    }
    builder.build().expect("local cluster should build")
}

pub fn config() -> ClusterConfig {
    let mut config = ClusterConfig::default();
    config.socket.connect_timeout_ms = 500;
    config.socket.read_timeout_ms = 1000;
    config.pooling.core_connections_per_host = 2;
    config.metadata.refresh_interval_ms = 60_000;
    config
}

pub fn handle(
    local: &LocalCluster,
    name: &str,
) -> ClusterHandle {
    ClusterHandle::builder(Arc::new(local.clone()))
        .with_config(config())
        .with_cluster_name(name)
        .add_contact_points(local.contact_points())
        .build()
        .expect("handle should build")
}
