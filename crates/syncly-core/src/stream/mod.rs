// ── Mirror subscriptions ──
//
// Read-only handles UI consumers hold to observe the mirror.

mod filter;

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::{ItemId, SyncItem};
use crate::store::Snapshot;

pub use filter::TodoFilter;

/// A subscription to a controller's mirror.
///
/// Offers point-in-time snapshot access and change notification via
/// [`changed()`](Self::changed) or by converting into a `Stream`.
pub struct MirrorStream<T: SyncItem> {
    current: Snapshot<T>,
    receiver: watch::Receiver<Snapshot<T>>,
}

impl<T: SyncItem> MirrorStream<T> {
    pub(crate) fn new(mut receiver: watch::Receiver<Snapshot<T>>) -> Self {
        let current = receiver.borrow_and_update().clone();
        Self { current, receiver }
    }

    /// The snapshot last observed by this handle.
    pub fn current(&self) -> &Snapshot<T> {
        &self.current
    }

    /// The mirror as it is right now (may be newer than `current()`).
    pub fn latest(&self) -> Snapshot<T> {
        self.receiver.borrow().clone()
    }

    /// Find an item by id in the last observed snapshot.
    pub fn get(&self, id: &ItemId) -> Option<Arc<T>> {
        self.current.iter().find(|item| item.id() == id).map(Arc::clone)
    }

    /// Wait for the next change and return the new snapshot.
    /// Returns `None` once the controller has been dropped.
    pub async fn changed(&mut self) -> Option<Snapshot<T>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// The stream yields the current snapshot first, then one item per change.
    pub fn into_stream(self) -> MirrorWatchStream<T> {
        MirrorWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct MirrorWatchStream<T: SyncItem> {
    inner: WatchStream<Snapshot<T>>,
}

impl<T: SyncItem> Stream for MirrorWatchStream<T> {
    type Item = Snapshot<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // WatchStream is Unpin; Snapshot<T> is an Arc.
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
