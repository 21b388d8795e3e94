//! In-process data store implementing the connection layer.
//!
//! A [`LocalCluster`] holds a few nodes and a keyspace/table/row catalog in
//! memory and answers `SELECT * FROM [keyspace.]table` plus the system
//! tables read by the control connection. Nodes can be stopped, restarted,
//! added and removed at runtime, and every connection opened or closed is
//! counted, which makes it suitable for embedding and for tests.
//!
//! ```ignore
//! let local = LocalCluster::builder()
//!     .name("Test Cluster")
//!     .node("127.0.0.1:9042", "dc1", "rack1")
//!     .row("ks", "users", Row::new().with("id", 1).with("name", "alice"))
//!     .build()?;
//!
//! let handle = ClusterHandle::builder(Arc::new(local.clone()))
//!     .add_contact_points(local.contact_points())
//!     .build()?;
//! let rows = handle.connect().await?.execute("SELECT * FROM ks.users").await?;
//! ```

mod connection;
mod query;


use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;
use tracing::info;

use self::connection::LocalConnection;
use self::query::Select;
use crate::constants::SYSTEM_KEYSPACE;
use crate::constants::SYSTEM_SCHEMA_KEYSPACE;
use crate::ClusterConfig;
use crate::Connection;
use crate::ConnectionError;
use crate::Connector;
use crate::InitializationError;
use crate::QueryError;
use crate::Result;
use crate::ResultSet;
use crate::Row;

const DEFAULT_LOCAL_CLUSTER_NAME: &str = "Test Cluster";
const DEFAULT_PARTITIONER: &str = "org.apache.cassandra.dht.Murmur3Partitioner";

/// System tables per system keyspace
const SYSTEM_TABLES: [(&str, &str); 4] = [
    (SYSTEM_KEYSPACE, "local"),
    (SYSTEM_KEYSPACE, "peers"),
    (SYSTEM_SCHEMA_KEYSPACE, "keyspaces"),
    (SYSTEM_SCHEMA_KEYSPACE, "tables"),
];

#[derive(Debug, Clone)]
struct LocalNode {
    datacenter: String,
    rack: String,
    up: bool,
}

type Tables = BTreeMap<String, Vec<Row>>;

pub(crate) struct LocalClusterInner {
    name: String,
    partitioner: String,
    nodes: RwLock<BTreeMap<SocketAddr, LocalNode>>,
    keyspaces: RwLock<BTreeMap<String, Tables>>,
    connect_delay: Option<Duration>,
    connections_opened: AtomicUsize,
    connections_closed: AtomicUsize,
}

impl LocalClusterInner {
    fn is_up(
        &self,
        address: SocketAddr,
    ) -> bool {
        self.nodes.read().get(&address).map(|n| n.up).unwrap_or(false)
    }

    fn connection_closed(
        &self,
        address: SocketAddr,
    ) {
        self.connections_closed.fetch_add(1, Ordering::AcqRel);
        debug!("local connection to {} closed", address);
    }

    /// Answers `select` as seen from the node at `coordinator`.
    fn select(
        &self,
        coordinator: SocketAddr,
        select: &Select,
        session_keyspace: Option<&str>,
    ) -> std::result::Result<ResultSet, QueryError> {
        let keyspace = select
            .keyspace
            .as_deref()
            .or(session_keyspace)
            .ok_or_else(|| QueryError::UnknownTable(select.table.clone()))?;

        match (keyspace, select.table.as_str()) {
            (SYSTEM_KEYSPACE, "local") => Ok(self.system_local(coordinator)),
            (SYSTEM_KEYSPACE, "peers") => Ok(self.system_peers(coordinator)),
            (SYSTEM_SCHEMA_KEYSPACE, "keyspaces") => Ok(self.schema_keyspaces()),
            (SYSTEM_SCHEMA_KEYSPACE, "tables") => Ok(self.schema_tables()),
            (SYSTEM_KEYSPACE, table) | (SYSTEM_SCHEMA_KEYSPACE, table) => {
                Err(QueryError::UnknownTable(format!("{}.{}", keyspace, table)))
            }
            (keyspace, table) => {
                let keyspaces = self.keyspaces.read();
                let tables = keyspaces
                    .get(keyspace)
                    .ok_or_else(|| QueryError::InvalidKeyspace(keyspace.to_string()))?;
                let rows = tables
                    .get(table)
                    .ok_or_else(|| QueryError::UnknownTable(format!("{}.{}", keyspace, table)))?;
                Ok(ResultSet::new(rows.clone()))
            }
        }
    }

    fn system_local(
        &self,
        coordinator: SocketAddr,
    ) -> ResultSet {
        let nodes = self.nodes.read();
        let rows = nodes
            .get(&coordinator)
            .map(|node| {
                Row::new()
                    .with("cluster_name", self.name.as_str())
                    .with("partitioner", self.partitioner.as_str())
                    .with("data_center", node.datacenter.as_str())
                    .with("rack", node.rack.as_str())
                    .with("broadcast_address", coordinator.to_string())
            })
            .into_iter()
            .collect();
        ResultSet::new(rows)
    }

    fn system_peers(
        &self,
        coordinator: SocketAddr,
    ) -> ResultSet {
        let rows = self
            .nodes
            .read()
            .iter()
            .filter(|(address, _)| **address != coordinator)
            .map(|(address, node)| {
                Row::new()
                    .with("peer", address.to_string())
                    .with("data_center", node.datacenter.as_str())
                    .with("rack", node.rack.as_str())
            })
            .collect();
        ResultSet::new(rows)
    }

    fn schema_keyspaces(&self) -> ResultSet {
        let mut rows: Vec<Row> = [SYSTEM_KEYSPACE, SYSTEM_SCHEMA_KEYSPACE]
            .iter()
            .map(|ks| Row::new().with("keyspace_name", *ks))
            .collect();
        rows.extend(
            self.keyspaces
                .read()
                .keys()
                .map(|ks| Row::new().with("keyspace_name", ks.as_str())),
        );
        ResultSet::new(rows)
    }

    fn schema_tables(&self) -> ResultSet {
        let mut rows: Vec<Row> = SYSTEM_TABLES
            .iter()
            .map(|(ks, table)| Row::new().with("keyspace_name", *ks).with("table_name", *table))
            .collect();
        for (ks, tables) in self.keyspaces.read().iter() {
            rows.extend(
                tables
                    .keys()
                    .map(|table| Row::new().with("keyspace_name", ks.as_str()).with("table_name", table.as_str())),
            );
        }
        ResultSet::new(rows)
    }
}

/// In-memory cluster; clones share the same nodes, data and counters.
#[derive(Clone)]
pub struct LocalCluster {
    inner: Arc<LocalClusterInner>,
}

impl LocalCluster {
    pub fn builder() -> LocalClusterBuilder {
        LocalClusterBuilder::new()
    }

    /// Name reported in `system.local`
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Addresses of every node, up or not, as `ip:port`
    pub fn contact_points(&self) -> Vec<String> {
        self.inner.nodes.read().keys().map(|a| a.to_string()).collect()
    }

    /// Stops accepting connections on `address` and fails statements on
    /// connections already open to it. Returns false for unknown nodes.
    pub fn stop_node(
        &self,
        address: SocketAddr,
    ) -> bool {
        self.set_up(address, false)
    }

    pub fn start_node(
        &self,
        address: SocketAddr,
    ) -> bool {
        self.set_up(address, true)
    }

    /// Adds a running node; it shows up in `system.peers` right away.
    pub fn add_node(
        &self,
        address: SocketAddr,
        datacenter: impl Into<String>,
        rack: impl Into<String>,
    ) {
        info!("local cluster {}: node {} added", self.inner.name, address);
        self.inner.nodes.write().insert(
            address,
            LocalNode {
                datacenter: datacenter.into(),
                rack: rack.into(),
                up: true,
            },
        );
    }

    pub fn remove_node(
        &self,
        address: SocketAddr,
    ) -> bool {
        info!("local cluster {}: node {} removed", self.inner.name, address);
        self.inner.nodes.write().remove(&address).is_some()
    }

    /// Creates the keyspace and table if needed.
    pub fn create_table(
        &self,
        keyspace: &str,
        table: &str,
    ) {
        self.inner
            .keyspaces
            .write()
            .entry(keyspace.to_string())
            .or_default()
            .entry(table.to_string())
            .or_default();
    }

    /// Appends `row`, creating keyspace and table if needed.
    pub fn insert(
        &self,
        keyspace: &str,
        table: &str,
        row: Row,
    ) {
        self.inner
            .keyspaces
            .write()
            .entry(keyspace.to_string())
            .or_default()
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    pub fn connections_opened(&self) -> usize {
        self.inner.connections_opened.load(Ordering::Acquire)
    }

    pub fn connections_closed(&self) -> usize {
        self.inner.connections_closed.load(Ordering::Acquire)
    }

    pub fn open_connections(&self) -> usize {
        self.connections_opened().saturating_sub(self.connections_closed())
    }

    fn set_up(
        &self,
        address: SocketAddr,
        up: bool,
    ) -> bool {
        match self.inner.nodes.write().get_mut(&address) {
            Some(node) => {
                info!(
                    "local cluster {}: node {} {}",
                    self.inner.name,
                    address,
                    if up { "started" } else { "stopped" }
                );
                node.up = up;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl Connector for LocalCluster {
    async fn connect(
        &self,
        address: SocketAddr,
        _config: &ClusterConfig,
    ) -> Result<Arc<dyn Connection>> {
        if let Some(delay) = self.inner.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if !self.inner.is_up(address) {
            return Err(ConnectionError::Refused { address }.into());
        }
        self.inner.connections_opened.fetch_add(1, Ordering::AcqRel);
        debug!("local connection to {} opened", address);
        Ok(Arc::new(LocalConnection::new(self.inner.clone(), address)))
    }
}

impl std::fmt::Debug for LocalCluster {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("LocalCluster")
            .field("name", &self.inner.name)
            .field("nodes", &self.inner.nodes.read().len())
            .field("open_connections", &self.open_connections())
            .finish()
    }
}

pub struct LocalClusterBuilder {
    name: String,
    partitioner: String,
    nodes: Vec<(String, String, String)>,
    keyspaces: BTreeMap<String, Tables>,
    connect_delay: Option<Duration>,
}

impl LocalClusterBuilder {
    fn new() -> Self {
        Self {
            name: DEFAULT_LOCAL_CLUSTER_NAME.to_string(),
            partitioner: DEFAULT_PARTITIONER.to_string(),
            nodes: Vec::new(),
            keyspaces: BTreeMap::new(),
            connect_delay: None,
        }
    }

    /// Cluster name reported in `system.local` (default: "Test Cluster")
    pub fn name(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.name = name.into();
        self
    }

    pub fn partitioner(
        mut self,
        partitioner: impl Into<String>,
    ) -> Self {
        self.partitioner = partitioner.into();
        self
    }

    /// Adds a running node at `address` (`ip:port`)
    pub fn node(
        mut self,
        address: impl Into<String>,
        datacenter: impl Into<String>,
        rack: impl Into<String>,
    ) -> Self {
        self.nodes.push((address.into(), datacenter.into(), rack.into()));
        self
    }

    /// Declares an empty keyspace
    pub fn keyspace(
        mut self,
        keyspace: impl Into<String>,
    ) -> Self {
        self.keyspaces.entry(keyspace.into()).or_default();
        self
    }

    /// Declares an empty table, creating its keyspace if needed
    pub fn table(
        mut self,
        keyspace: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        self.keyspaces
            .entry(keyspace.into())
            .or_default()
            .entry(table.into())
            .or_default();
        self
    }

    pub fn row(
        mut self,
        keyspace: impl Into<String>,
        table: impl Into<String>,
        row: Row,
    ) -> Self {
        self.keyspaces
            .entry(keyspace.into())
            .or_default()
            .entry(table.into())
            .or_default()
            .push(row);
        self
    }

    /// Delays every connection attempt, for timeout and race scenarios
    pub fn connect_delay(
        mut self,
        delay: Duration,
    ) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    /// # Errors
    /// - [`InitializationError::InvalidContactPoint`] for a node address that
    ///   is not `ip:port`
    /// - [`InitializationError::InvalidConfig`] without any node
    pub fn build(self) -> Result<LocalCluster> {
        if self.nodes.is_empty() {
            return Err(InitializationError::InvalidConfig("local cluster needs at least one node".into()).into());
        }
        let mut nodes = BTreeMap::new();
        for (raw, datacenter, rack) in self.nodes {
            let address: SocketAddr = raw
                .parse()
                .map_err(|_| InitializationError::InvalidContactPoint(raw.clone()))?;
            nodes.insert(
                address,
                LocalNode {
                    datacenter,
                    rack,
                    up: true,
                },
            );
        }
        debug!("local cluster {} built with {} node(s)", self.name, nodes.len());

        Ok(LocalCluster {
            inner: Arc::new(LocalClusterInner {
                name: self.name,
                partitioner: self.partitioner,
                nodes: RwLock::new(nodes),
                keyspaces: RwLock::new(self.keyspaces),
                connect_delay: self.connect_delay,
                connections_opened: AtomicUsize::new(0),
                connections_closed: AtomicUsize::new(0),
            }),
        })
    }
}
