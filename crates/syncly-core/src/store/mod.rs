// ── Reactive storage ──
//
// The mirror owned by each controller, and the cache controllers may share.

mod cache;
mod mirror;

pub use cache::SharedCache;
pub(crate) use mirror::Mirror;
pub use mirror::Snapshot;
