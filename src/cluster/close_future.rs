use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;

use futures::future;
use futures::future::BoxFuture;
use futures::future::Shared;
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::Error;
use crate::Result;
use crate::ShutdownError;

pub(crate) type CloseOutcome = std::result::Result<(), ShutdownError>;

/// Completion of a cluster shutdown.
///
/// Cloneable; every clone resolves to the same outcome. Teardown runs on
/// its own task, so dropping the future does not cancel it.
#[derive(Clone)]
pub struct CloseFuture {
    inner: Shared<BoxFuture<'static, CloseOutcome>>,
}

impl CloseFuture {
    /// Already resolved successfully
    pub(crate) fn completed() -> Self {
        Self::resolved(Ok(()))
    }

    pub(crate) fn resolved(outcome: CloseOutcome) -> Self {
        Self {
            inner: future::ready(outcome).boxed().shared(),
        }
    }

    /// Resolves with the outcome sent by whoever owns the teardown
    pub(crate) fn pending(outcome: oneshot::Receiver<CloseOutcome>) -> Self {
        // Sender gone: the executor shut down before the teardown could report
        let inner = async move { outcome.await.unwrap_or(Ok(())) }.boxed().shared();
        Self { inner }
    }

    /// Starts `teardown` on `executor` right away.
    pub(crate) fn spawn_on<F>(
        executor: &Handle,
        cluster: &str,
        teardown: F,
    ) -> Self
    where
        F: Future<Output = CloseOutcome> + Send + 'static,
    {
        let task = executor.spawn(teardown);
        let cluster = cluster.to_string();
        let inner = async move {
            task.await.unwrap_or_else(|e| {
                Err(ShutdownError {
                    cluster,
                    failures: vec![format!("teardown task: {}", e)],
                })
            })
        }
        .boxed()
        .shared();
        Self { inner }
    }
}

impl Future for CloseFuture {
    type Output = Result<()>;

    fn poll(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx).map(|outcome| outcome.map_err(Error::from))
    }
}

impl fmt::Debug for CloseFuture {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("CloseFuture")
            .field("resolved", &self.inner.peek().is_some())
            .finish()
    }
}
