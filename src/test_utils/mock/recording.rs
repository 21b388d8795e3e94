use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use parking_lot::Mutex;

use crate::Cluster;
use crate::Error;
use crate::Host;
use crate::HostStateListener;
use crate::LatencyTracker;
use crate::Statement;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HostEvent {
    Added(SocketAddr),
    Up(SocketAddr),
    Down(SocketAddr),
    Removed(SocketAddr),
}

#[derive(Default)]
pub(crate) struct RecordingListener {
    events: Mutex<Vec<HostEvent>>,
    registrations: AtomicUsize,
    unregistrations: AtomicUsize,
}

impl RecordingListener {
    pub(crate) fn events(&self) -> Vec<HostEvent> {
        self.events.lock().clone()
    }

    pub(crate) fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    pub(crate) fn unregistrations(&self) -> usize {
        self.unregistrations.load(Ordering::SeqCst)
    }
}

impl HostStateListener for RecordingListener {
    fn on_add(
        &self,
        host: &Host,
    ) {
        self.events.lock().push(HostEvent::Added(host.address()));
    }

    fn on_up(
        &self,
        host: &Host,
    ) {
        self.events.lock().push(HostEvent::Up(host.address()));
    }

    fn on_down(
        &self,
        host: &Host,
    ) {
        self.events.lock().push(HostEvent::Down(host.address()));
    }

    fn on_remove(
        &self,
        host: &Host,
    ) {
        self.events.lock().push(HostEvent::Removed(host.address()));
    }

    fn on_register(
        &self,
        _cluster: &dyn Cluster,
    ) {
        self.registrations.fetch_add(1, Ordering::SeqCst);
    }

    fn on_unregister(
        &self,
        _cluster: &dyn Cluster,
    ) {
        self.unregistrations.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct RecordingTracker {
    updates: AtomicUsize,
    failures: AtomicUsize,
    registrations: AtomicUsize,
}

impl RecordingTracker {
    pub(crate) fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub(crate) fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    pub(crate) fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }
}

impl LatencyTracker for RecordingTracker {
    fn update(
        &self,
        _host: &Host,
        _statement: &Statement,
        error: Option<&Error>,
        _latency: Duration,
    ) {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if error.is_some() {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn on_register(
        &self,
        _cluster: &dyn Cluster,
    ) {
        self.registrations.fetch_add(1, Ordering::SeqCst);
    }
}
