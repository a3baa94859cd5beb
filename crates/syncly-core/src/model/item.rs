// ── Item traits ──
//
// The controller is generic over the mirrored entity. It only needs
// identifier equality, a way to synthesize an item from a create
// payload, and a shallow merge for update payloads.

use serde::{Deserialize, Serialize};

use super::ItemId;

/// Anything that names a single item.
pub trait Identified {
    fn id(&self) -> &ItemId;
}

/// An entity that can be mirrored by a [`SyncController`](crate::SyncController).
pub trait SyncItem: Identified + Clone + Send + Sync + 'static {
    /// Create payload: the item minus its identifier and server-generated fields.
    type Draft: Clone + Send + Sync + 'static;

    /// Update payload: an `id` plus the fields to change.
    type Patch: Identified + Clone + Send + Sync + 'static;

    /// Build the provisional item shown between an optimistic create and
    /// the next refetch.
    fn from_draft(id: ItemId, draft: &Self::Draft) -> Self;

    /// Shallow-merge `patch` over `self`. Fields absent from the patch are kept.
    fn merge(&mut self, patch: &Self::Patch);
}

/// Bare delete payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    pub id: ItemId,
}

impl Identified for ItemRef {
    fn id(&self) -> &ItemId {
        &self.id
    }
}

impl From<ItemId> for ItemRef {
    fn from(id: ItemId) -> Self {
        Self { id }
    }
}
