// ── Shared lookup cache ──
//
// An explicit cache object handed to whichever components need shared
// lookup. Nothing here is global: two `SharedCache::new()` values never
// see each other's entries, while clones of one value share everything.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

type Entry = Arc<dyn Any + Send + Sync>;

/// Concurrent, type-erased key/value cache with explicit invalidation.
#[derive(Clone, Default)]
pub struct SharedCache {
    entries: Arc<DashMap<String, Entry>>,
}

impl SharedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key` and downcast it to `V`.
    ///
    /// Returns `None` both for a missing key and for a value stored under a
    /// different type.
    pub fn get<V: Any + Send + Sync>(&self, key: &str) -> Option<Arc<V>> {
        let entry = Arc::clone(self.entries.get(key)?.value());
        entry.downcast::<V>().ok()
    }

    /// Insert or overwrite `key`.
    pub fn insert<V: Any + Send + Sync>(&self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), Arc::new(value));
    }

    /// Drop a single entry. Returns `true` if it existed.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for SharedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCache")
            .field("len", &self.entries.len())
            .finish()
    }
}
