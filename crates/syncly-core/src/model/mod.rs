// ── Domain model ──
//
// Identity, the generic item traits, and the todo entity shipped with
// the CLI.

pub mod item;
pub mod item_id;
pub mod todo;

pub use item::{Identified, ItemRef, SyncItem};
pub use item_id::ItemId;
pub(crate) use item_id::LocalIds;
pub use todo::{NewTodo, Todo, TodoPatch};
