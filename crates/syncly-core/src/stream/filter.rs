// ── Filter predicates for todo snapshots ──
//
// Used by consumers to filter snapshots without re-querying the server.

use crate::model::Todo;

/// Filter predicate for todo collections.
pub enum TodoFilter {
    /// Everything the server returned, soft-deleted entries included.
    All,
    /// Entries without a `deleted_at` marker.
    Visible,
    Active,
    Completed,
    /// Optimistic entries not yet confirmed by a refetch.
    Unsynced,
    Custom(Box<dyn Fn(&Todo) -> bool + Send + Sync>),
}

impl TodoFilter {
    pub fn matches(&self, todo: &Todo) -> bool {
        match self {
            Self::All => true,
            Self::Visible => !todo.is_deleted(),
            Self::Active => !todo.is_deleted() && !todo.completed,
            Self::Completed => !todo.is_deleted() && todo.completed,
            Self::Unsynced => todo.id.is_local(),
            Self::Custom(f) => f(todo),
        }
    }
}
