use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::warn;

use super::close_future::CloseOutcome;
use super::CloseFuture;
use super::ClusterRuntime;
use crate::ClosedResourceError;
use crate::Result;

pub(crate) enum LifecycleState {
    Uninitialized,
    /// Runtime being materialized; `Some` once a close was requested meanwhile
    Initializing(Option<PendingClose>),
    Active(Arc<ClusterRuntime>),
    Closing(CloseFuture),
    Closed(CloseFuture),
}

/// Close requested while the runtime was being materialized. The init task
/// resolves it after releasing what it acquired.
pub(crate) struct PendingClose {
    future: CloseFuture,
    done: oneshot::Sender<CloseOutcome>,
}

/// Observable lifecycle position of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterState {
    Uninitialized,
    Active,
    /// Teardown spawned, not finished yet
    Closing,
    Closed,
}

/// State machine of one cluster handle.
///
/// ```text
/// Uninitialized --ensure_active--> Initializing --> Active --close_async--> Closing --> Closed
/// Initializing  --close_async----> Closing (released by the init task) -------------> Closed
/// Initializing  --failed-----------------------------------------------------------> Closed
/// Uninitialized --close_async------------------------------------------------------> Closed
/// ```
pub(crate) struct Lifecycle {
    name: String,
    state: Arc<Mutex<LifecycleState>>,
    /// Held by the init task for the whole materialization; the state mutex
    /// is never held across it
    init_lock: Arc<tokio::sync::Mutex<()>>,
}

impl Lifecycle {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Arc::new(Mutex::new(LifecycleState::Uninitialized)),
            init_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub(crate) fn state(&self) -> ClusterState {
        match &*self.state.lock() {
            LifecycleState::Uninitialized | LifecycleState::Initializing(None) => ClusterState::Uninitialized,
            LifecycleState::Active(_) => ClusterState::Active,
            LifecycleState::Initializing(Some(_)) | LifecycleState::Closing(_) => ClusterState::Closing,
            LifecycleState::Closed(_) => ClusterState::Closed,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        matches!(
            &*self.state.lock(),
            LifecycleState::Initializing(Some(_)) | LifecycleState::Closing(_) | LifecycleState::Closed(_)
        )
    }

    /// Returns the runtime, materializing it with `materialize` on first use.
    ///
    /// Exactly one caller runs `materialize`; concurrent callers wait for it
    /// and observe the same runtime. Materialization runs on its own task and
    /// finishes even if the caller is dropped.
    ///
    /// # Errors
    /// - [`ClosedResourceError`] once `close_async` was called, including
    ///   when it lands while `materialize` is running
    /// - whatever `materialize` returns; the handle is closed afterwards
    pub(crate) async fn ensure_active<F, Fut>(
        &self,
        operation: &'static str,
        materialize: F,
    ) -> Result<Arc<ClusterRuntime>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<ClusterRuntime>>> + Send + 'static,
    {
        if let Some(runtime) = self.current(operation)? {
            return Ok(runtime);
        }

        let guard = self.init_lock.clone().lock_owned().await;
        if let Some(runtime) = self.current(operation)? {
            return Ok(runtime);
        }
        *self.state.lock() = LifecycleState::Initializing(None);

        debug!("materializing runtime of cluster {} on {}", self.name, operation);
        let materializing = materialize();
        let name = self.name.clone();
        let state = self.state.clone();
        let task = tokio::spawn(async move {
            let _guard = guard;
            let result = materializing.await;
            finish_init(&name, &state, operation, result).await
        });

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(ClosedResourceError::new(&self.name, operation).into()),
        }
    }

    /// Starts shutdown if needed and returns its completion.
    ///
    /// Never blocks: an active runtime is torn down on its own executor, a
    /// runtime still being materialized by the init task that builds it.
    pub(crate) fn close_async(&self) -> CloseFuture {
        let mut state = self.state.lock();
        match &mut *state {
            LifecycleState::Uninitialized => {
                debug!("cluster {} closed before initialization", self.name);
                let future = CloseFuture::completed();
                *state = LifecycleState::Closed(future.clone());
                future
            }
            LifecycleState::Initializing(Some(pending)) => pending.future.clone(),
            LifecycleState::Initializing(pending) => {
                debug!("cluster {} closed during initialization", self.name);
                let (done, outcome) = oneshot::channel();
                let future = CloseFuture::pending(outcome);
                *pending = Some(PendingClose {
                    future: future.clone(),
                    done,
                });
                future
            }
            LifecycleState::Active(runtime) => {
                debug!("closing cluster {}", self.name);
                let runtime = runtime.clone();
                let executor = runtime.executor().clone();
                let shared = self.state.clone();
                let future = CloseFuture::spawn_on(&executor, &self.name, async move {
                    let outcome = runtime.shutdown().await;
                    *shared.lock() = LifecycleState::Closed(CloseFuture::resolved(outcome.clone()));
                    outcome
                });
                *state = LifecycleState::Closing(future.clone());
                future
            }
            LifecycleState::Closing(future) | LifecycleState::Closed(future) => future.clone(),
        }
    }

    fn current(
        &self,
        operation: &'static str,
    ) -> Result<Option<Arc<ClusterRuntime>>> {
        match &*self.state.lock() {
            // Initializing(None) here means the init task was cancelled
            LifecycleState::Uninitialized | LifecycleState::Initializing(None) => Ok(None),
            LifecycleState::Active(runtime) => Ok(Some(runtime.clone())),
            LifecycleState::Initializing(Some(_)) | LifecycleState::Closing(_) | LifecycleState::Closed(_) => {
                Err(ClosedResourceError::new(&self.name, operation).into())
            }
        }
    }
}

/// Publishes the outcome of a materialization, releasing the runtime if a
/// close landed while it was built.
async fn finish_init(
    name: &str,
    state: &Mutex<LifecycleState>,
    operation: &'static str,
    result: Result<Arc<ClusterRuntime>>,
) -> Result<Arc<ClusterRuntime>> {
    let pending = {
        let mut state = state.lock();
        match std::mem::replace(&mut *state, LifecycleState::Uninitialized) {
            LifecycleState::Initializing(Some(pending)) => {
                *state = LifecycleState::Closing(pending.future.clone());
                Some(pending)
            }
            _ => {
                *state = match &result {
                    Ok(runtime) => LifecycleState::Active(runtime.clone()),
                    Err(_) => LifecycleState::Closed(CloseFuture::completed()),
                };
                None
            }
        }
    };

    let Some(pending) = pending else {
        if let Err(e) = &result {
            warn!("initialization of cluster {} failed: {}", name, e);
        }
        return result;
    };

    let outcome = match result {
        Ok(runtime) => {
            warn!("cluster {} was closed during initialization, releasing runtime", name);
            runtime.shutdown().await
        }
        Err(e) => {
            debug!("initialization of closed cluster {} failed: {}", name, e);
            Ok(())
        }
    };
    if let Err(e) = &outcome {
        warn!("{}", e);
    }
    *state.lock() = LifecycleState::Closed(CloseFuture::resolved(outcome.clone()));
    // Nobody may be waiting on the close future any more
    let _ = pending.done.send(outcome);
    Err(ClosedResourceError::new(name, operation).into())
}
