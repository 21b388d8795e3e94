//! Sessions execute statements against the hosts of an initialized cluster.
//!
//! A session owns one [`HostConnectionPool`] per host it talked to. Closing
//! the session releases those pools. The cluster keeps every pool set it
//! handed out until the session closes, so closing the cluster releases
//! them even for sessions that were dropped unclosed.

mod statement;
pub use statement::*;


use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use rand::Rng;
use tokio::time::timeout;
use tracing::debug;
use tracing::warn;

use crate::cluster::ClusterRuntime;
use crate::connection::HostConnectionPool;
use crate::ClosedResourceError;
use crate::Error;
use crate::Host;
use crate::QueryError;
use crate::Result;

#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    runtime: Arc<ClusterRuntime>,
    keyspace: Option<String>,
    pools: Arc<SessionPools>,
    next_host: AtomicUsize,
}

/// Connection pools of one session, one per host.
///
/// Shared with the runtime that created the session, so shutdown reaches
/// them even after every `Session` clone was dropped.
pub(crate) struct SessionPools {
    id: u64,
    hosts: DashMap<SocketAddr, Arc<HostConnectionPool>>,
    closed: AtomicBool,
}

impl SessionPools {
    pub(crate) fn new(id: u64) -> Self {
        Self {
            id,
            hosts: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Only the first call releases anything.
    pub(crate) async fn close(&self) -> Vec<String> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Vec::new();
        }
        debug!("closing pools of session {}", self.id);
        let pools: Vec<_> = self.hosts.iter().map(|e| e.value().clone()).collect();
        self.hosts.clear();
        let mut failures = Vec::new();
        for pool in pools {
            failures.extend(pool.close().await);
        }
        failures
    }

    pub(crate) async fn discard_host(
        &self,
        address: SocketAddr,
    ) {
        let pool = self.hosts.get(&address).map(|p| p.value().clone());
        if let Some(pool) = pool {
            pool.discard_all().await;
        }
    }

    pub(crate) async fn remove_host(
        &self,
        address: SocketAddr,
    ) {
        if let Some((_, pool)) = self.hosts.remove(&address) {
            pool.close().await;
        }
    }

    async fn open_connections(&self) -> usize {
        let pools: Vec<_> = self.hosts.iter().map(|e| e.value().clone()).collect();
        let mut total = 0;
        for pool in pools {
            total += pool.open_connections().await;
        }
        total
    }

    async fn pool(
        &self,
        host: &Arc<Host>,
        runtime: &ClusterRuntime,
    ) -> Arc<HostConnectionPool> {
        let pool = self
            .hosts
            .entry(host.address())
            .or_insert_with(|| {
                Arc::new(HostConnectionPool::new(
                    host.clone(),
                    runtime.connector().clone(),
                    runtime.config().clone(),
                    runtime.metrics().clone(),
                ))
            })
            .value()
            .clone();
        // Inserted after close drained the map
        if self.is_closed() {
            pool.close().await;
        }
        pool
    }
}

impl Session {
    pub(crate) fn new(
        runtime: Arc<ClusterRuntime>,
        keyspace: Option<String>,
        pools: Arc<SessionPools>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                runtime,
                keyspace,
                pools,
                next_host: AtomicUsize::new(rand::thread_rng().gen()),
            }),
        }
    }

    /// Keyspace used for unqualified table names
    pub fn keyspace(&self) -> Option<&str> {
        self.inner.keyspace.as_deref()
    }

    /// Name of the cluster handle that created this session
    pub fn cluster_name(&self) -> &str {
        self.inner.runtime.name()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.pools.is_closed() || self.inner.runtime.is_shut_down()
    }

    /// Executes `statement` on the first host of the query plan that
    /// accepts it.
    ///
    /// Hosts failing with a connection error are marked down and the next
    /// host is tried. Any other error is returned as is.
    ///
    /// # Errors
    /// - [`ClosedResourceError`] if the session or its cluster is closed
    /// - [`QueryError::NoHostAvailable`] if every host failed
    /// - [`QueryError::Timeout`] if a host did not answer within
    ///   `socket.read_timeout_ms`
    pub async fn execute(
        &self,
        statement: impl Into<crate::Statement>,
    ) -> Result<crate::ResultSet> {
        let statement = statement.into();
        self.ensure_open("execute")?;

        let runtime = &self.inner.runtime;
        let read_timeout = runtime.config().socket.read_timeout();
        let plan = runtime.query_plan(self.inner.next_host.fetch_add(1, Ordering::Relaxed));
        let mut errors = Vec::new();

        for host in plan {
            let start = Instant::now();
            let result = match self.inner.pools.pool(&host, runtime).await.borrow().await {
                Ok(conn) => match timeout(read_timeout, conn.execute(&statement, self.inner.keyspace.clone())).await {
                    Ok(result) => result,
                    Err(_) => Err(QueryError::Timeout {
                        address: host.address(),
                        duration: read_timeout,
                    }
                    .into()),
                },
                Err(e) => Err(e),
            };
            runtime.track(&host, &statement, result.as_ref().err(), start.elapsed());

            match result {
                Ok(rows) => return Ok(rows),
                Err(Error::Connection(e)) => {
                    // Pools closed under us mean the session went away, not the host
                    self.ensure_open("execute")?;
                    warn!("statement failed on {}: {}, trying next host", host, e);
                    runtime.mark_down(&host).await;
                    errors.push((host.address(), e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }
        Err(QueryError::NoHostAvailable { errors }.into())
    }

    /// Opens core connections to every up host.
    ///
    /// Unreachable hosts are marked down rather than failing the session.
    pub(crate) async fn warm_up(&self) {
        let runtime = &self.inner.runtime;
        for host in runtime.query_plan(0) {
            if let Err(e) = self.inner.pools.pool(&host, runtime).await.warm_up().await {
                warn!("could not open pool to {}: {}", host, e);
                if matches!(e, Error::Connection(_)) {
                    runtime.mark_down(&host).await;
                }
            }
        }
    }

    /// Connections currently open by this session across all hosts
    pub async fn open_connections(&self) -> usize {
        self.inner.pools.open_connections().await
    }

    /// Releases every pool of this session. The cluster stays usable.
    pub async fn close(&self) -> Result<()> {
        let failures = self.inner.pools.close().await;
        self.inner.runtime.forget_session(self.inner.pools.id());
        if failures.is_empty() {
            Ok(())
        } else {
            Err(crate::ShutdownError {
                cluster: self.cluster_name().to_string(),
                failures,
            }
            .into())
        }
    }

    fn ensure_open(
        &self,
        operation: &'static str,
    ) -> Result<()> {
        if self.is_closed() {
            return Err(ClosedResourceError::new(self.cluster_name(), operation).into());
        }
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.pools.id())
            .field("cluster", &self.cluster_name())
            .field("keyspace", &self.inner.keyspace)
            .field("closed", &self.is_closed())
            .finish()
    }
}
