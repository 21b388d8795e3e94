use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;
use tracing::warn;

use super::open_connection;
use super::Connection;
use super::Connector;
use crate::ClusterConfig;
use crate::ConnectionError;
use crate::Host;
use crate::Metrics;
use crate::Result;

/// Connections of one session to one host.
///
/// Connections are opened lazily on first borrow, or eagerly up to
/// `pooling.core_connections_per_host` by [`warm_up`](Self::warm_up).
/// Borrowing hands out connections round-robin; they stay owned by the pool.
pub(crate) struct HostConnectionPool {
    host: Arc<Host>,
    connector: Arc<dyn Connector>,
    config: Arc<ClusterConfig>,
    metrics: Metrics,
    connections: Mutex<Vec<Arc<dyn Connection>>>,
    next: AtomicUsize,
    closed: AtomicBool,
}

impl HostConnectionPool {
    pub(crate) fn new(
        host: Arc<Host>,
        connector: Arc<dyn Connector>,
        config: Arc<ClusterConfig>,
        metrics: Metrics,
    ) -> Self {
        Self {
            host,
            connector,
            config,
            metrics,
            connections: Mutex::new(Vec::new()),
            next: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Opens connections until the core size is reached.
    pub(crate) async fn warm_up(&self) -> Result<()> {
        let core = self.config.pooling.core_connections_per_host;
        let mut connections = self.connections.lock().await;
        while connections.len() < core {
            self.ensure_open()?;
            let conn = open_connection(self.connector.as_ref(), self.host.address(), &self.config).await?;
            self.metrics.connection_opened();
            connections.push(conn);
        }
        Ok(())
    }

    /// Picks the next connection, opening the first one if needed.
    pub(crate) async fn borrow(&self) -> Result<Arc<dyn Connection>> {
        let mut connections = self.connections.lock().await;
        self.ensure_open()?;
        if connections.is_empty() {
            let conn = open_connection(self.connector.as_ref(), self.host.address(), &self.config).await?;
            self.metrics.connection_opened();
            connections.push(conn);
        }
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % connections.len();
        Ok(connections[idx].clone())
    }

    /// Drops every connection after a host failure; the pool stays usable.
    pub(crate) async fn discard_all(&self) {
        let drained: Vec<_> = self.connections.lock().await.drain(..).collect();
        debug!("discarding {} connection(s) to {}", drained.len(), self.host);
        self.release(drained).await;
    }

    pub(crate) async fn open_connections(&self) -> usize {
        self.connections.lock().await.len()
    }

    /// Closes the pool. Only the first call releases connections.
    pub(crate) async fn close(&self) -> Vec<String> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Vec::new();
        }
        let drained: Vec<_> = self.connections.lock().await.drain(..).collect();
        self.release(drained).await
    }

    async fn release(
        &self,
        connections: Vec<Arc<dyn Connection>>,
    ) -> Vec<String> {
        let mut failures = Vec::new();
        for conn in connections {
            if let Err(e) = conn.close().await {
                warn!("failed to close connection to {}: {:?}", self.host, e);
                failures.push(format!("{}: {}", self.host, e));
            }
            self.metrics.connection_closed();
        }
        failures
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ConnectionError::Closed {
                address: self.host.address(),
            }
            .into());
        }
        Ok(())
    }
}
