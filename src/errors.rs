//! Cluster Handle Error Hierarchy
//!
//! Defines the error types surfaced by the cluster handle, its sessions and
//! the connection layer behind them, categorized by the layer that detects
//! the failure.

use std::net::SocketAddr;
use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Operation attempted on a handle whose lifecycle is terminal
    #[error(transparent)]
    Closed(#[from] ClosedResourceError),

    /// The internal runtime could not be materialized
    #[error(transparent)]
    Initialization(#[from] InitializationError),

    /// Host-level transport failures
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Statement execution failures
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Resource release failures reported by a close future
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),

    /// Metric registration failures
    #[error(transparent)]
    Metrics(#[from] prometheus::Error),
}

impl Error {
    /// Returns true if this is the closed-resource signal.
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::Closed(_))
    }

    /// Short label used for error metrics
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Error::Closed(_) => "closed",
            Error::Initialization(_) => "initialization",
            Error::Connection(_) => "connection",
            Error::Query(QueryError::Timeout { .. }) => "timeout",
            Error::Query(_) => "query",
            Error::Config(_) => "config",
            Error::Shutdown(_) => "shutdown",
            Error::Metrics(_) => "metrics",
        }
    }
}

/// Raised by every capability operation invoked on a closed handle.
///
/// This also covers the inert base of a wrapper: a neutralized handle is
/// closed from construction, so anything routed to it fails with this error
/// instead of silently touching uninitialized internals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Can't use cluster instance {cluster:?} for {operation}: it was previously closed")]
pub struct ClosedResourceError {
    pub cluster: String,
    pub operation: &'static str,
}

impl ClosedResourceError {
    pub(crate) fn new(
        cluster: impl Into<String>,
        operation: &'static str,
    ) -> Self {
        Self {
            cluster: cluster.into(),
            operation,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InitializationError {
    /// Builder finished without any contact point
    #[error("At least one contact point is required")]
    NoContactPoints,

    /// Contact point could not be parsed into a socket address
    #[error("Invalid contact point: {0}")]
    InvalidContactPoint(String),

    /// Every contact point was tried and none accepted a control connection
    #[error("All host(s) tried for control connection failed: {errors:?}")]
    NoHostAvailable { errors: Vec<(SocketAddr, String)> },

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// System tables could not be interpreted as cluster metadata
    #[error("Metadata error: {0}")]
    Metadata(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectionError {
    /// Host refused or is not listening
    #[error("Connection refused by {address}")]
    Refused { address: SocketAddr },

    /// Connect or request exceeded the socket timeout
    #[error("Connection to {address} timed out after {duration:?}")]
    Timeout {
        address: SocketAddr,
        duration: Duration,
    },

    /// Connection was released while in use
    #[error("Connection to {address} is closed")]
    Closed { address: SocketAddr },
}

impl ConnectionError {
    pub fn address(&self) -> SocketAddr {
        match self {
            ConnectionError::Refused { address }
            | ConnectionError::Timeout { address, .. }
            | ConnectionError::Closed { address } => *address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Syntax error in statement: {0}")]
    Syntax(String),

    #[error("Keyspace '{0}' does not exist")]
    InvalidKeyspace(String),

    #[error("Unconfigured table {0}")]
    UnknownTable(String),

    /// Every host of the query plan failed
    #[error("No host available to execute the statement: {errors:?}")]
    NoHostAvailable { errors: Vec<(SocketAddr, String)> },

    #[error("Statement timed out on {address} after {duration:?}")]
    Timeout {
        address: SocketAddr,
        duration: Duration,
    },
}

/// Failure reported by a [`CloseFuture`](crate::CloseFuture).
///
/// Cloneable so every caller awaiting the same shutdown observes the same
/// outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Shutdown of cluster {cluster:?} failed: {failures:?}")]
pub struct ShutdownError {
    pub cluster: String,
    pub failures: Vec<String>,
}
