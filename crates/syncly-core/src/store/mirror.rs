// ── Local mirror of a remote collection ──
//
// Ordered storage with push-based change notification via a `watch`
// channel. Every mutation runs inside `send_modify` / `send_if_modified`,
// so observers only ever see a complete snapshot.

use std::sync::Arc;

use tokio::sync::watch;

use crate::model::{Identified, ItemId, SyncItem};

/// Shared, immutable view of the mirror at one point in time.
pub type Snapshot<T> = Arc<Vec<Arc<T>>>;

/// The controller's current belief about the remote collection.
///
/// Replaced wholesale by every successful fetch; appended to, merged into,
/// and filtered by optimistic mutations.
pub(crate) struct Mirror<T: SyncItem> {
    snapshot: watch::Sender<Snapshot<T>>,
}

impl<T: SyncItem> Mirror<T> {
    pub(crate) fn new() -> Self {
        Self::seeded(Arc::new(Vec::new()))
    }

    pub(crate) fn seeded(items: Snapshot<T>) -> Self {
        let (snapshot, _) = watch::channel(items);
        Self { snapshot }
    }

    /// Replace the whole collection with server truth. Returns the new snapshot.
    pub(crate) fn replace(&self, items: Vec<T>) -> Snapshot<T> {
        let next: Snapshot<T> = Arc::new(items.into_iter().map(Arc::new).collect());
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::clone(&next));
        next
    }

    pub(crate) fn append(&self, item: T) {
        self.snapshot
            .send_modify(|snap| Arc::make_mut(snap).push(Arc::new(item)));
    }

    /// Shallow-merge a patch into the matching entry. Returns `false` (and
    /// notifies nobody) when no entry has the patch's id.
    pub(crate) fn merge(&self, patch: &T::Patch) -> bool {
        self.snapshot.send_if_modified(|snap| {
            let Some(pos) = snap.iter().position(|item| item.id() == patch.id()) else {
                return false;
            };
            if let Some(entry) = Arc::make_mut(snap).get_mut(pos) {
                Arc::make_mut(entry).merge(patch);
            }
            true
        })
    }

    /// Remove the entry with `id`, if present.
    pub(crate) fn remove(&self, id: &ItemId) -> Option<Arc<T>> {
        let mut removed = None;
        self.snapshot.send_if_modified(|snap| {
            let Some(pos) = snap.iter().position(|item| item.id() == id) else {
                return false;
            };
            removed = Some(Arc::make_mut(snap).remove(pos));
            true
        });
        removed
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Snapshot<T> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.snapshot.subscribe()
    }
}
