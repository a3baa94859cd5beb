// ── Staged intents and per-call handles ──
//
// Every submission becomes a `Staged` envelope on its kind's FIFO queue.
// The envelope carries a oneshot sender; the caller keeps the matching
// `Submission` and may await it or drop it.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::SyncError;
use crate::store::Snapshot;

/// A mutation intent waiting on its drain queue.
pub(crate) struct Staged<P> {
    pub payload: P,
    pub respond: oneshot::Sender<Result<serde_json::Value, SyncError>>,
}

/// Messages consumed by the refetch task.
pub(crate) enum RefreshRequest<T> {
    /// A mutation settled; the mirror is stale.
    Invalidate,
    /// Someone called `refetch()` and may be waiting for the outcome.
    Explicit(oneshot::Sender<Result<Snapshot<T>, SyncError>>),
}

/// Outcome of one submitted operation.
///
/// Resolves once the remote call settles. Dropping it is fine: the operation
/// still runs, and failures still land in the controller's shared `error`.
#[must_use = "a Submission does nothing extra when awaited, but dropping it discards the per-call outcome"]
pub struct Submission<R = serde_json::Value> {
    rx: oneshot::Receiver<Result<R, SyncError>>,
}

impl<R> Submission<R> {
    pub(crate) fn new(rx: oneshot::Receiver<Result<R, SyncError>>) -> Self {
        Self { rx }
    }

    /// A submission that has already failed.
    pub(crate) fn failed(err: SyncError) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(err));
        Self { rx }
    }
}

impl<R> Future for Submission<R> {
    type Output = Result<R, SyncError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(outcome) => outcome,
            // Sender dropped without answering: the task went away.
            Err(_) => Err(SyncError::Shutdown),
        })
    }
}
