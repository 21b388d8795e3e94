use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::debug;

use super::Host;
use crate::Cluster;
use crate::Error;
use crate::Statement;

/// Receives host up/down/add/remove events from a cluster handle.
///
/// Callbacks run on the task that detected the change and must not block.
pub trait HostStateListener: Send + Sync {
    /// A new host joined the cluster
    fn on_add(
        &self,
        host: &Host,
    );

    /// A host previously down is reachable again
    fn on_up(
        &self,
        host: &Host,
    );

    /// A host failed and is excluded from query plans
    fn on_down(
        &self,
        host: &Host,
    );

    /// A host left the cluster
    fn on_remove(
        &self,
        host: &Host,
    );

    fn on_register(
        &self,
        _cluster: &dyn Cluster,
    ) {
    }

    fn on_unregister(
        &self,
        _cluster: &dyn Cluster,
    ) {
    }
}

/// Observes the latency of every statement executed through the handle.
pub trait LatencyTracker: Send + Sync {
    /// Called once per attempt against `host`, successful or not
    fn update(
        &self,
        host: &Host,
        statement: &Statement,
        error: Option<&Error>,
        latency: Duration,
    );

    fn on_register(
        &self,
        _cluster: &dyn Cluster,
    ) {
    }

    fn on_unregister(
        &self,
        _cluster: &dyn Cluster,
    ) {
    }
}

/// Identity keyed set of observers.
///
/// Two registrations of the same `Arc` collapse into one entry; distinct
/// `Arc`s wrapping equal values are kept apart.
pub(crate) struct ListenerRegistry<T: ?Sized> {
    entries: DashMap<usize, Arc<T>>,
}

impl<T: ?Sized> ListenerRegistry<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    fn key(item: &Arc<T>) -> usize {
        Arc::as_ptr(item) as *const () as usize
    }

    /// Returns false if the observer was already registered.
    pub(crate) fn insert(
        &self,
        item: Arc<T>,
    ) -> bool {
        self.entries.insert(Self::key(&item), item).is_none()
    }

    /// Returns false if the observer was not registered.
    pub(crate) fn remove(
        &self,
        item: &Arc<T>,
    ) -> bool {
        self.entries.remove(&Self::key(item)).is_some()
    }

    /// Copy of the current observers; callbacks run outside the map locks.
    pub(crate) fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries.iter().map(|e| e.value().clone()).collect()
    }
}

/// Host listeners and latency trackers of one cluster handle
pub(crate) struct Listeners {
    pub(crate) hosts: ListenerRegistry<dyn HostStateListener>,
    pub(crate) trackers: ListenerRegistry<dyn LatencyTracker>,
}

impl Listeners {
    pub(crate) fn new() -> Self {
        Self {
            hosts: ListenerRegistry::new(),
            trackers: ListenerRegistry::new(),
        }
    }

    pub(crate) fn on_add(
        &self,
        host: &Host,
    ) {
        debug!("host {} added", host);
        self.hosts.snapshot().iter().for_each(|l| l.on_add(host));
    }

    pub(crate) fn on_up(
        &self,
        host: &Host,
    ) {
        debug!("host {} is up", host);
        self.hosts.snapshot().iter().for_each(|l| l.on_up(host));
    }

    pub(crate) fn on_down(
        &self,
        host: &Host,
    ) {
        debug!("host {} is down", host);
        self.hosts.snapshot().iter().for_each(|l| l.on_down(host));
    }

    pub(crate) fn on_remove(
        &self,
        host: &Host,
    ) {
        debug!("host {} removed", host);
        self.hosts.snapshot().iter().for_each(|l| l.on_remove(host));
    }

    pub(crate) fn track_latency(
        &self,
        host: &Host,
        statement: &Statement,
        error: Option<&Error>,
        latency: Duration,
    ) {
        for tracker in self.trackers.snapshot() {
            tracker.update(host, statement, error, latency);
        }
    }
}
