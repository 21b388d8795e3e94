//! Connection layer abstraction consumed by the cluster handle.
//!
//! The handle never speaks a wire protocol itself. It asks a [`Connector`]
//! for [`Connection`]s to individual hosts and keeps them in:
//! - one control connection per handle, used to discover topology and schema
//! - one [`HostConnectionPool`] per host and session, used for statements
//!
//! All network operations are bounded by the socket timeouts of
//! [`ClusterConfig`].

mod control;
mod pool;

pub(crate) use control::*;
pub(crate) use pool::*;


use std::net::SocketAddr;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use async_trait::async_trait;
use tokio::time::timeout;
use tracing::debug;

use crate::ClusterConfig;
use crate::ConnectionError;
use crate::Result;
use crate::ResultSet;
use crate::Statement;

/// Opens connections to individual hosts.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Establishes a connection to `address`.
    ///
    /// # Errors
    /// - [`ConnectionError::Refused`] if the host is not accepting connections
    async fn connect(
        &self,
        address: SocketAddr,
        config: &ClusterConfig,
    ) -> Result<Arc<dyn Connection>>;
}

/// A single connection to one host
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    fn address(&self) -> SocketAddr;

    /// Runs one statement, using `keyspace` for unqualified table names.
    async fn execute(
        &self,
        statement: &Statement,
        keyspace: Option<String>,
    ) -> Result<ResultSet>;

    /// Releases the connection. Must tolerate repeated calls.
    async fn close(&self) -> Result<()>;
}

/// Opens one connection bounded by `socket.connect_timeout_ms`.
pub(crate) async fn open_connection(
    connector: &dyn Connector,
    address: SocketAddr,
    config: &ClusterConfig,
) -> Result<Arc<dyn Connection>> {
    let duration = config.socket.connect_timeout();
    debug!("open_connection, address = {:?}", address);
    match timeout(duration, connector.connect(address, config)).await {
        Ok(result) => result,
        Err(_) => Err(ConnectionError::Timeout { address, duration }.into()),
    }
}
