//! A lifecycle-managed handle to a distributed data store cluster.
//!
//! [`ClusterHandle`] owns endpoints, configuration and, after
//! [`init`](Cluster::init), a runtime made of a control connection,
//! metadata, sessions and metrics. [`DelegatingCluster`] forwards every
//! operation of the [`Cluster`] trait to another implementation, so
//! decorating a handle never involves a second, half-initialized one.
//!
//! The wire protocol lives behind [`Connector`] and [`Connection`];
//! [`LocalCluster`] is an in-process implementation.

mod cluster;
mod config;
mod connection;
mod constants;
mod errors;
mod host;
mod local;
mod metadata;
mod metrics;
mod session;

pub use cluster::*;
pub use config::*;
pub use connection::Connection;
pub use connection::Connector;
pub use errors::*;
pub use host::*;
pub use local::*;
pub use metadata::KeyspaceMetadata;
pub use metadata::Metadata;
pub use metrics::Metrics;
pub use session::*;

#[doc(hidden)]
pub use async_trait::async_trait;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
