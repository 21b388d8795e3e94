use std::collections::BTreeMap;
use std::net::IpAddr;
use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use tracing::warn;

use super::open_connection;
use super::Connection;
use super::Connector;
use crate::constants::SELECT_KEYSPACES;
use crate::constants::SELECT_LOCAL;
use crate::constants::SELECT_PEERS;
use crate::constants::SELECT_TABLES;
use crate::metadata::HostInfo;
use crate::metadata::Topology;
use crate::ClusterConfig;
use crate::ConnectionError;
use crate::InitializationError;
use crate::KeyspaceMetadata;
use crate::Result;
use crate::Row;
use crate::Statement;

/// Dedicated connection used to discover topology and schema.
///
/// Never used for user statements. On failure it moves to the next
/// reachable candidate host.
pub(crate) struct ControlConnection {
    connector: Arc<dyn Connector>,
    config: Arc<ClusterConfig>,
    connection: Mutex<Option<Arc<dyn Connection>>>,
    closed: AtomicBool,
}

impl ControlConnection {
    pub(crate) fn new(
        connector: Arc<dyn Connector>,
        config: Arc<ClusterConfig>,
    ) -> Self {
        Self {
            connector,
            config,
            connection: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Host currently serving the control connection
    pub(crate) fn address(&self) -> Option<SocketAddr> {
        self.connection.lock().as_ref().map(|c| c.address())
    }

    /// Tries `candidates` in order and keeps the first that answers.
    ///
    /// # Errors
    /// [`InitializationError::NoHostAvailable`] carrying one entry per
    /// candidate tried.
    pub(crate) async fn connect(
        &self,
        candidates: &[SocketAddr],
    ) -> Result<Topology> {
        let mut errors = Vec::new();
        for &address in candidates {
            match self.try_host(address).await {
                Ok(topology) => {
                    debug!("control connection established to {}", address);
                    return Ok(topology);
                }
                Err(e) => {
                    warn!("control connection to {} failed: {}", address, e);
                    errors.push((address, e.to_string()));
                }
            }
        }
        Err(InitializationError::NoHostAvailable { errors }.into())
    }

    /// Re-reads topology, reconnecting to one of `candidates` if the current
    /// connection is gone.
    pub(crate) async fn refresh(
        &self,
        candidates: &[SocketAddr],
    ) -> Result<Topology> {
        let current = self.connection.lock().clone();
        if let Some(conn) = current {
            match fetch_topology(conn.as_ref(), &self.config).await {
                Ok(topology) => return Ok(topology),
                Err(e) => {
                    warn!("control connection to {} lost: {}, reconnecting", conn.address(), e);
                    self.connection.lock().take();
                    let _ = conn.close().await;
                }
            }
        }
        self.connect(candidates).await
    }

    pub(crate) async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        let conn = self.connection.lock().take();
        match conn {
            Some(conn) => conn.close().await,
            None => Ok(()),
        }
    }

    async fn try_host(
        &self,
        address: SocketAddr,
    ) -> Result<Topology> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ConnectionError::Closed { address }.into());
        }
        let conn = open_connection(self.connector.as_ref(), address, &self.config).await?;
        match fetch_topology(conn.as_ref(), &self.config).await {
            Ok(topology) => {
                let previous = self.connection.lock().replace(conn);
                if let Some(previous) = previous {
                    let _ = previous.close().await;
                }
                Ok(topology)
            }
            Err(e) => {
                let _ = conn.close().await;
                Err(e)
            }
        }
    }
}

/// Reads hosts and, unless disabled, schema through `conn`.
pub(crate) async fn fetch_topology(
    conn: &dyn Connection,
    config: &ClusterConfig,
) -> Result<Topology> {
    let local = conn.execute(&Statement::new(SELECT_LOCAL), None).await?;
    let row = local
        .one()
        .ok_or_else(|| InitializationError::Metadata("system.local returned no row".into()))?;
    let cluster_name = row
        .get_text("cluster_name")
        .ok_or_else(|| InitializationError::Metadata("system.local has no cluster_name".into()))?
        .to_string();

    let mut hosts = vec![host_info(conn.address(), row)];

    let peers = conn.execute(&Statement::new(SELECT_PEERS), None).await?;
    for peer in peers.all() {
        let raw = peer
            .get_text("peer")
            .ok_or_else(|| InitializationError::Metadata("system.peers row without peer".into()))?;
        let address = parse_address(raw, config.protocol.port)?;
        if hosts.iter().all(|h| h.address != address) {
            hosts.push(host_info(address, peer));
        }
    }

    let keyspaces = if config.metadata.schema_enabled {
        fetch_schema(conn).await?
    } else {
        BTreeMap::new()
    };

    Ok(Topology {
        cluster_name,
        partitioner: row.get_text("partitioner").map(str::to_string),
        hosts,
        keyspaces,
    })
}

async fn fetch_schema(conn: &dyn Connection) -> Result<BTreeMap<String, KeyspaceMetadata>> {
    let mut keyspaces = BTreeMap::new();
    for row in conn.execute(&Statement::new(SELECT_KEYSPACES), None).await?.all() {
        if let Some(name) = row.get_text("keyspace_name") {
            keyspaces.insert(name.to_string(), KeyspaceMetadata::new(name));
        }
    }
    for row in conn.execute(&Statement::new(SELECT_TABLES), None).await?.all() {
        let (Some(ks), Some(table)) = (row.get_text("keyspace_name"), row.get_text("table_name")) else {
            continue;
        };
        keyspaces
            .entry(ks.to_string())
            .or_insert_with(|| KeyspaceMetadata::new(ks))
            .add_table(table);
    }
    Ok(keyspaces)
}

fn host_info(
    address: SocketAddr,
    row: &Row,
) -> HostInfo {
    HostInfo {
        address,
        datacenter: row.get_text("data_center").map(str::to_string),
        rack: row.get_text("rack").map(str::to_string),
    }
}

/// Accepts `ip:port`, or a bare ip completed with `default_port`.
pub(crate) fn parse_address(
    raw: &str,
    default_port: u16,
) -> Result<SocketAddr> {
    if let Ok(addr) = raw.parse::<SocketAddr>() {
        return Ok(addr);
    }
    raw.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, default_port))
        .map_err(|_| InitializationError::InvalidContactPoint(raw.to_string()).into())
}
