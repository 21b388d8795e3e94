//! Cluster hosts and the observers notified about them.
//!
//! A [`Host`] is shared between the metadata snapshot, the connection pools
//! and the listeners; its state is updated in place so every holder observes
//! the latest up/down transition.

mod listener;
pub use listener::*;


use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HostState {
    /// Known from metadata, no connection attempted yet
    Added = 0,
    Up = 1,
    Down = 2,
}

impl HostState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => HostState::Up,
            2 => HostState::Down,
            _ => HostState::Added,
        }
    }
}

/// A node of the cluster as seen through `system.local` / `system.peers`
#[derive(Debug)]
pub struct Host {
    address: SocketAddr,
    datacenter: Option<String>,
    rack: Option<String>,
    state: AtomicU8,
}

impl Host {
    pub fn new(
        address: SocketAddr,
        datacenter: Option<String>,
        rack: Option<String>,
    ) -> Self {
        Self {
            address,
            datacenter,
            rack,
            state: AtomicU8::new(HostState::Added as u8),
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn datacenter(&self) -> Option<&str> {
        self.datacenter.as_deref()
    }

    pub fn rack(&self) -> Option<&str> {
        self.rack.as_deref()
    }

    pub fn state(&self) -> HostState {
        HostState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// A host is usable for queries unless it was marked down
    pub fn is_up(&self) -> bool {
        self.state() != HostState::Down
    }

    /// Stores the new state, returns the previous one.
    pub(crate) fn set_state(
        &self,
        state: HostState,
    ) -> HostState {
        HostState::from_u8(self.state.swap(state as u8, Ordering::AcqRel))
    }
}

impl fmt::Display for Host {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}
