//! The cluster handle and its capability surface.
//!
//! [`Cluster`] lists every lifecycle and capability operation. It has no
//! default methods, so any implementation, including a forwarding one, has
//! to state what each operation does:
//!
//! ```compile_fail
//! use cluster_handle::async_trait;
//! use cluster_handle::Cluster;
//! use cluster_handle::Result;
//! use cluster_handle::Session;
//!
//! struct ForgetfulWrapper;
//!
//! #[async_trait]
//! impl Cluster for ForgetfulWrapper {
//!     fn name(&self) -> &str {
//!         "forgetful"
//!     }
//!
//!     async fn connect(&self) -> Result<Session> {
//!         unimplemented!()
//!     }
//! }
//! ```
//!
//! Two implementations ship with the crate:
//! - [`ClusterHandle`] owns endpoints, configuration and, once initialized,
//!   a runtime (control connection, metadata, sessions, metrics).
//! - [`DelegatingCluster`] owns nothing and forwards to another [`Cluster`].
//!
//! [`ClusterHandle::neutralized`] builds a handle that is closed from the
//! start; whatever reaches it fails with [`ClosedResourceError`].
//!
//! [`ClosedResourceError`]: crate::ClosedResourceError

mod builder;
mod close_future;
mod delegate;
mod handle;
mod lifecycle;
mod runtime;

pub use builder::*;
pub use close_future::*;
pub use delegate::*;
pub use handle::*;
pub use lifecycle::ClusterState;
pub(crate) use lifecycle::Lifecycle;
pub(crate) use runtime::ClusterRuntime;


use std::sync::Arc;

use async_trait::async_trait;

use crate::ClusterConfig;
use crate::HostStateListener;
use crate::LatencyTracker;
use crate::Metadata;
use crate::Metrics;
use crate::Result;
use crate::Session;

/// Capability surface of a cluster handle.
///
/// On a real handle every capability operation initializes the handle if
/// needed and fails with [`ClosedResourceError`](crate::ClosedResourceError)
/// once it is closing or closed.
#[async_trait]
pub trait Cluster: Send + Sync {
    /// Handle name, not the name the cluster reports about itself
    fn name(&self) -> &str;

    /// Materializes the runtime: control connection, topology, schema and
    /// background refresh.
    ///
    /// Idempotent; concurrent callers share one initialization. Returns the
    /// handle for chaining.
    ///
    /// # Errors
    /// - [`InitializationError`](crate::InitializationError) if no contact
    ///   point answered. The handle is closed afterwards.
    async fn init(&self) -> Result<&dyn Cluster>;

    /// New session without keyspace; pools open on first use.
    async fn new_session(&self) -> Result<Session>;

    /// New session with core connections already open to every up host.
    async fn connect(&self) -> Result<Session>;

    /// Like [`connect`](Self::connect), resolving unqualified tables in
    /// `keyspace`.
    ///
    /// # Errors
    /// - [`QueryError::InvalidKeyspace`](crate::QueryError::InvalidKeyspace)
    ///   if schema metadata is enabled and does not know `keyspace`
    async fn connect_keyspace(
        &self,
        keyspace: &str,
    ) -> Result<Session>;

    async fn metadata(&self) -> Result<Metadata>;

    async fn configuration(&self) -> Result<Arc<ClusterConfig>>;

    async fn metrics(&self) -> Result<Metrics>;

    /// Registering the same `Arc` twice is a no-op.
    async fn register_listener(
        &self,
        listener: Arc<dyn HostStateListener>,
    ) -> Result<&dyn Cluster>;

    async fn unregister_listener(
        &self,
        listener: Arc<dyn HostStateListener>,
    ) -> Result<&dyn Cluster>;

    /// Registering the same `Arc` twice is a no-op.
    async fn register_tracker(
        &self,
        tracker: Arc<dyn LatencyTracker>,
    ) -> Result<&dyn Cluster>;

    async fn unregister_tracker(
        &self,
        tracker: Arc<dyn LatencyTracker>,
    ) -> Result<&dyn Cluster>;

    /// Starts releasing everything and returns without waiting.
    ///
    /// Every call, concurrent or later, returns a future for the same
    /// teardown.
    fn close_async(&self) -> CloseFuture;

    /// Awaits [`close_async`](Self::close_async).
    async fn close(&self) -> Result<()>;

    /// True as soon as closing started
    fn is_closed(&self) -> bool;
}
