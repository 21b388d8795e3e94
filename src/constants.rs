// -
// System tables read by the control connection

pub(crate) const SELECT_LOCAL: &str = "SELECT * FROM system.local";
pub(crate) const SELECT_PEERS: &str = "SELECT * FROM system.peers";
pub(crate) const SELECT_KEYSPACES: &str = "SELECT * FROM system_schema.keyspaces";
pub(crate) const SELECT_TABLES: &str = "SELECT * FROM system_schema.tables";

/// Keyspaces every cluster exposes
pub(crate) const SYSTEM_KEYSPACE: &str = "system";
pub(crate) const SYSTEM_SCHEMA_KEYSPACE: &str = "system_schema";

/// Handle names default to `cluster1`, `cluster2`, ...
pub(crate) const DEFAULT_CLUSTER_NAME_PREFIX: &str = "cluster";
