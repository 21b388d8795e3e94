//! Cluster topology and schema as discovered by the control connection.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::Host;

/// Host row of `system.local` / `system.peers`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HostInfo {
    pub(crate) address: SocketAddr,
    pub(crate) datacenter: Option<String>,
    pub(crate) rack: Option<String>,
}

/// Raw result of one control connection refresh
#[derive(Debug, Clone, Default)]
pub(crate) struct Topology {
    pub(crate) cluster_name: String,
    pub(crate) partitioner: Option<String>,
    pub(crate) hosts: Vec<HostInfo>,
    pub(crate) keyspaces: BTreeMap<String, KeyspaceMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyspaceMetadata {
    name: String,
    tables: BTreeSet<String>,
}

impl KeyspaceMetadata {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: BTreeSet::new(),
        }
    }

    pub(crate) fn add_table(
        &mut self,
        table: impl Into<String>,
    ) {
        self.tables.insert(table.into());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(String::as_str)
    }

    pub fn has_table(
        &self,
        table: &str,
    ) -> bool {
        self.tables.contains(table)
    }
}

#[derive(Debug, Default)]
pub(crate) struct MetadataSnapshot {
    pub(crate) cluster_name: String,
    pub(crate) partitioner: Option<String>,
    pub(crate) hosts: Vec<Arc<Host>>,
    pub(crate) keyspaces: BTreeMap<String, KeyspaceMetadata>,
}

/// Read-only view of the cluster at the time it was requested.
///
/// Hosts are shared with the live runtime, so their state keeps tracking
/// up/down transitions; the host list and schema do not change after the
/// snapshot was taken. Call `metadata()` again for a fresh one.
#[derive(Debug, Clone)]
pub struct Metadata {
    inner: Arc<MetadataSnapshot>,
}

impl Metadata {
    pub(crate) fn new(inner: Arc<MetadataSnapshot>) -> Self {
        Self { inner }
    }

    /// Name reported by the cluster itself, not the handle name
    pub fn cluster_name(&self) -> &str {
        &self.inner.cluster_name
    }

    pub fn partitioner(&self) -> Option<&str> {
        self.inner.partitioner.as_deref()
    }

    pub fn all_hosts(&self) -> &[Arc<Host>] {
        &self.inner.hosts
    }

    pub fn get_host(
        &self,
        address: SocketAddr,
    ) -> Option<&Arc<Host>> {
        self.inner.hosts.iter().find(|h| h.address() == address)
    }

    pub fn keyspace(
        &self,
        name: &str,
    ) -> Option<&KeyspaceMetadata> {
        self.inner.keyspaces.get(name)
    }

    pub fn keyspaces(&self) -> impl Iterator<Item = &KeyspaceMetadata> {
        self.inner.keyspaces.values()
    }
}
