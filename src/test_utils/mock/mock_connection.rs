use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::connection::MockConnection;
use crate::connection::MockConnector;
use crate::constants::SELECT_KEYSPACES;
use crate::constants::SELECT_LOCAL;
use crate::constants::SELECT_PEERS;
use crate::constants::SELECT_TABLES;
use crate::Connection;
use crate::ConnectionError;
use crate::ResultSet;
use crate::Row;

pub(crate) const MOCK_CLUSTER_NAME: &str = "Mock Cluster";

/// Opened/closed connection counts shared with a mock connector
#[derive(Clone, Default)]
pub(crate) struct ConnectionCounters {
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl ConnectionCounters {
    pub(crate) fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Answers the control connection queries as if `peers` were the other
/// nodes of the cluster; any other statement returns no row.
pub(crate) fn system_rows(
    query: &str,
    peers: &[SocketAddr],
) -> ResultSet {
    let rows = match query {
        SELECT_LOCAL => vec![Row::new()
            .with("cluster_name", MOCK_CLUSTER_NAME)
            .with("partitioner", "Murmur3Partitioner")
            .with("data_center", "dc1")
            .with("rack", "rack1")],
        SELECT_PEERS => peers
            .iter()
            .map(|p| Row::new().with("peer", p.to_string()).with("data_center", "dc1").with("rack", "rack1"))
            .collect(),
        SELECT_KEYSPACES => vec![
            Row::new().with("keyspace_name", "system"),
            Row::new().with("keyspace_name", "ks"),
        ],
        SELECT_TABLES => vec![
            Row::new().with("keyspace_name", "system").with("table_name", "local"),
            Row::new().with("keyspace_name", "ks").with("table_name", "users"),
        ],
        _ => Vec::new(),
    };
    ResultSet::new(rows)
}

pub(crate) fn mock_connection(
    address: SocketAddr,
    peers: Vec<SocketAddr>,
    counters: ConnectionCounters,
) -> MockConnection {
    let mut conn = MockConnection::new();
    conn.expect_address().return_const(address);
    conn.expect_execute()
        .returning(move |statement, _keyspace| Ok(system_rows(statement.query(), &peers)));
    conn.expect_close().returning(move || {
        counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    conn
}

/// Connector reaching only `reachable`; every reachable host reports the
/// others as peers.
pub(crate) fn mock_connector(reachable: Vec<SocketAddr>) -> (MockConnector, ConnectionCounters) {
    let counters = ConnectionCounters::default();
    let handed_out = counters.clone();
    let mut connector = MockConnector::new();
    connector.expect_connect().returning(move |address, _config| {
        if !reachable.contains(&address) {
            return Err(ConnectionError::Refused { address }.into());
        }
        handed_out.opened.fetch_add(1, Ordering::SeqCst);
        let peers = reachable.iter().copied().filter(|p| *p != address).collect();
        Ok(Arc::new(mock_connection(address, peers, handed_out.clone())) as Arc<dyn Connection>)
    });
    (connector, counters)
}
