use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use super::query::parse_select;
use super::LocalClusterInner;
use crate::Connection;
use crate::ConnectionError;
use crate::Result;
use crate::ResultSet;
use crate::Statement;

/// Connection to one node of a [`LocalCluster`](super::LocalCluster)
pub(crate) struct LocalConnection {
    cluster: Arc<LocalClusterInner>,
    address: SocketAddr,
    closed: AtomicBool,
}

impl LocalConnection {
    pub(crate) fn new(
        cluster: Arc<LocalClusterInner>,
        address: SocketAddr,
    ) -> Self {
        Self {
            cluster,
            address,
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Connection for LocalConnection {
    fn address(&self) -> SocketAddr {
        self.address
    }

    async fn execute(
        &self,
        statement: &Statement,
        keyspace: Option<String>,
    ) -> Result<ResultSet> {
        if self.closed.load(Ordering::Acquire) || !self.cluster.is_up(self.address) {
            return Err(ConnectionError::Closed { address: self.address }.into());
        }
        trace!("{} executes {:?}", self.address, statement.query());
        let select = parse_select(statement.query())?;
        Ok(self.cluster.select(self.address, &select, keyspace.as_deref())?)
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.cluster.connection_closed(self.address);
        }
        Ok(())
    }
}
