use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::connection::open_connection;
use crate::connection::ControlConnection;
use crate::metadata::MetadataSnapshot;
use crate::metadata::Topology;
use crate::session::SessionPools;
use crate::ClosedResourceError;
use crate::ClusterConfig;
use crate::Connector;
use crate::Error;
use crate::Host;
use crate::HostState;
use crate::Listeners;
use crate::Metadata;
use crate::Metrics;
use crate::Result;
use crate::Session;
use crate::ShutdownError;
use crate::Statement;

/// Everything a real cluster handle acquires on initialization.
///
/// Exclusively owned by the handle that materialized it; sessions hold an
/// `Arc` back to it so they can route statements and observe shutdown. The
/// runtime owns the pools of every open session, dropped or not.
pub(crate) struct ClusterRuntime {
    name: String,
    contact_points: Vec<SocketAddr>,
    config: Arc<ClusterConfig>,
    connector: Arc<dyn Connector>,
    control: ControlConnection,
    metadata: ArcSwap<MetadataSnapshot>,
    listeners: Arc<Listeners>,
    metrics: Metrics,
    sessions: DashMap<u64, Arc<SessionPools>>,
    next_session_id: AtomicU64,
    shutdown: CancellationToken,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
    refresh_lock: tokio::sync::Mutex<()>,
    executor: Handle,
}

impl ClusterRuntime {
    /// Connects the control connection, loads metadata and starts the
    /// background refresh.
    ///
    /// On error nothing stays acquired: the control connection only keeps a
    /// host once topology was read successfully.
    pub(crate) async fn start(
        name: String,
        contact_points: Vec<SocketAddr>,
        config: Arc<ClusterConfig>,
        connector: Arc<dyn Connector>,
        listeners: Arc<Listeners>,
    ) -> Result<Arc<Self>> {
        debug!("starting runtime of cluster {}, contact points: {:?}", name, contact_points);
        let metrics = Metrics::new(&config.metrics.namespace, &name)?;
        let control = ControlConnection::new(connector.clone(), config.clone());
        let topology = control.connect(&contact_points).await?;

        let runtime = Arc::new(Self {
            name,
            contact_points,
            config,
            connector,
            control,
            metadata: ArcSwap::from_pointee(MetadataSnapshot::default()),
            listeners,
            metrics,
            sessions: DashMap::new(),
            next_session_id: AtomicU64::new(1),
            shutdown: CancellationToken::new(),
            refresh_task: Mutex::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            executor: Handle::current(),
        });
        runtime.apply_topology(topology).await;
        runtime.spawn_refresh();

        info!(
            "cluster {} initialized, {} host(s) known, control connection on {:?}",
            runtime.name,
            runtime.metadata.load().hosts.len(),
            runtime.control.address()
        );
        Ok(runtime)
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn config(&self) -> &Arc<ClusterConfig> {
        &self.config
    }

    pub(crate) fn connector(&self) -> &Arc<dyn Connector> {
        &self.connector
    }

    pub(crate) fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub(crate) fn executor(&self) -> &Handle {
        &self.executor
    }

    pub(crate) fn metadata(&self) -> Metadata {
        Metadata::new(self.metadata.load_full())
    }

    /// Fails once shutdown started.
    pub(crate) fn ensure_open(
        &self,
        operation: &'static str,
    ) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(ClosedResourceError::new(&self.name, operation).into());
        }
        Ok(())
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Registers a new session with this runtime.
    pub(crate) async fn new_session(
        self: &Arc<Self>,
        keyspace: Option<String>,
    ) -> Result<Session> {
        self.ensure_open("new_session")?;
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let pools = Arc::new(SessionPools::new(id));
        self.sessions.insert(id, pools.clone());
        let session = Session::new(self.clone(), keyspace, pools.clone());

        // Lost a race against shutdown: the teardown may not have seen it
        if self.shutdown.is_cancelled() {
            self.sessions.remove(&id);
            pools.close().await;
            return Err(ClosedResourceError::new(&self.name, "new_session").into());
        }
        debug!("session {} opened on cluster {}", id, self.name);
        Ok(session)
    }

    pub(crate) fn forget_session(
        &self,
        id: u64,
    ) {
        self.sessions.remove(&id);
    }

    fn sessions(&self) -> Vec<Arc<SessionPools>> {
        self.sessions.iter().map(|e| e.value().clone()).collect()
    }

    /// Up hosts, rotated so consecutive plans start on different hosts.
    pub(crate) fn query_plan(
        &self,
        offset: usize,
    ) -> Vec<Arc<Host>> {
        let mut hosts: Vec<_> = self.metadata.load().hosts.iter().filter(|h| h.is_up()).cloned().collect();
        if !hosts.is_empty() {
            let len = hosts.len();
            hosts.rotate_left(offset % len);
        }
        hosts
    }

    pub(crate) fn track(
        &self,
        host: &Host,
        statement: &Statement,
        error: Option<&Error>,
        latency: Duration,
    ) {
        use crate::LatencyTracker;
        self.metrics.update(host, statement, error, latency);
        self.listeners.track_latency(host, statement, error, latency);
    }

    /// Excludes `host` from query plans after a connection failure.
    pub(crate) async fn mark_down(
        &self,
        host: &Arc<Host>,
    ) {
        let known = self.metadata.load().hosts.iter().any(|h| Arc::ptr_eq(h, host));
        if !known || host.set_state(HostState::Down) == HostState::Down {
            return;
        }
        warn!("host {} of cluster {} marked down", host, self.name);
        for session in self.sessions() {
            session.discard_host(host.address()).await;
        }
        self.listeners.on_down(host);
        self.update_host_metrics();
    }

    /// Re-reads topology through the control connection.
    pub(crate) async fn refresh(&self) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        self.ensure_open("refresh")?;

        let topology = self.control.refresh(&self.refresh_candidates()).await?;
        self.apply_topology(topology).await;
        self.revive_down_hosts().await;
        Ok(())
    }

    /// Up hosts first, then the original contact points.
    fn refresh_candidates(&self) -> Vec<SocketAddr> {
        let mut candidates: Vec<SocketAddr> = self
            .metadata
            .load()
            .hosts
            .iter()
            .filter(|h| h.is_up())
            .map(|h| h.address())
            .collect();
        for addr in &self.contact_points {
            if !candidates.contains(addr) {
                candidates.push(*addr);
            }
        }
        candidates
    }

    async fn apply_topology(
        &self,
        topology: Topology,
    ) {
        let current = self.metadata.load_full();

        let mut hosts = Vec::with_capacity(topology.hosts.len());
        let mut added = Vec::new();
        for info in &topology.hosts {
            match current.hosts.iter().find(|h| h.address() == info.address) {
                Some(existing) => hosts.push(existing.clone()),
                None => {
                    let host = Arc::new(Host::new(info.address, info.datacenter.clone(), info.rack.clone()));
                    host.set_state(HostState::Up);
                    hosts.push(host.clone());
                    added.push(host);
                }
            }
        }
        let removed: Vec<_> = current
            .hosts
            .iter()
            .filter(|h| topology.hosts.iter().all(|info| info.address != h.address()))
            .cloned()
            .collect();

        self.metadata.store(Arc::new(MetadataSnapshot {
            cluster_name: topology.cluster_name,
            partitioner: topology.partitioner,
            hosts,
            keyspaces: topology.keyspaces,
        }));

        for host in &added {
            self.listeners.on_add(host);
        }
        for host in &removed {
            host.set_state(HostState::Down);
            for session in self.sessions() {
                session.remove_host(host.address()).await;
            }
            self.listeners.on_remove(host);
        }
        self.update_host_metrics();
    }

    /// Probes down hosts with a throwaway connection.
    async fn revive_down_hosts(&self) {
        let down: Vec<_> = self.metadata.load().hosts.iter().filter(|h| !h.is_up()).cloned().collect();
        for host in down {
            match open_connection(self.connector.as_ref(), host.address(), &self.config).await {
                Ok(conn) => {
                    let _ = conn.close().await;
                    if host.set_state(HostState::Up) == HostState::Down {
                        info!("host {} of cluster {} is back up", host, self.name);
                        self.listeners.on_up(&host);
                    }
                }
                Err(e) => debug!("host {} still down: {}", host, e),
            }
        }
        self.update_host_metrics();
    }

    fn update_host_metrics(&self) {
        let snapshot = self.metadata.load();
        let up = snapshot.hosts.iter().filter(|h| h.is_up()).count();
        self.metrics.set_hosts(snapshot.hosts.len(), up);
    }

    fn spawn_refresh(self: &Arc<Self>) {
        let runtime = Arc::downgrade(self);
        let token = self.shutdown.clone();
        let interval = self.config.metadata.refresh_interval();

        let handle = self.executor.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately; topology was just loaded
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(runtime) = runtime.upgrade() else {
                            break;
                        };
                        if let Err(e) = runtime.refresh().await {
                            if !e.is_closed() {
                                warn!("metadata refresh of cluster {} failed: {}", runtime.name, e);
                            }
                        }
                    }
                }
            }
            debug!("metadata refresh task stopped");
        });
        *self.refresh_task.lock() = Some(handle);
    }

    /// Releases everything this runtime acquired.
    ///
    /// Called exactly once, from the task spawned by the first `close_async`.
    pub(crate) async fn shutdown(self: Arc<Self>) -> std::result::Result<(), ShutdownError> {
        debug!("shutting down cluster {}", self.name);
        self.shutdown.cancel();

        let mut failures = Vec::new();
        let task = self.refresh_task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                failures.push(format!("refresh task: {}", e));
            }
        }

        let sessions = self.sessions();
        self.sessions.clear();
        for session in sessions {
            failures.extend(session.close().await);
        }

        if let Err(e) = self.control.close().await {
            failures.push(format!("control connection: {}", e));
        }

        if failures.is_empty() {
            info!("cluster {} closed", self.name);
            Ok(())
        } else {
            error!("cluster {} closed with failures: {:?}", self.name, failures);
            Err(ShutdownError {
                cluster: self.name.clone(),
                failures,
            })
        }
    }
}
