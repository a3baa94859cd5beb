//! Optimistic client-side synchronization of a remote collection.
//!
//! This crate owns the coordination logic between an immediately rendered
//! local collection and the server that holds the truth:
//!
//! - **[`SyncController`]**: Built from four async capabilities (fetch,
//!   create, update, delete) via [`SyncOptions`]. Mutations are applied to the
//!   mirror optimistically, staged on a FIFO queue per kind, executed by a
//!   drain task, and followed by a coalesced refetch that replaces the mirror
//!   with server truth.
//!
//! - **[`Submission`]**: Per-call outcome of a staged mutation or refetch.
//!   Await it or drop it; failures are also reflected in [`SyncStatus`].
//!
//! - **[`MirrorStream<T>`]**: Subscription handle exposing `current()` /
//!   `latest()` / `changed()` and a `Stream` adapter for UI consumers.
//!
//! - **[`SharedCache`]**: Explicit, cloneable key/value cache controllers can
//!   share collections through.
//!
//! - **Domain model** ([`model`]): The [`SyncItem`] trait, [`ItemId`] with
//!   its server vs. provisional variants, and the todo entity used by the CLI.

pub mod command;
pub mod controller;
pub mod convert;
pub mod error;
pub mod model;
pub mod options;
pub mod store;
pub mod stream;
pub mod todos;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::Submission;
pub use controller::{PendingCounts, SyncController, SyncStatus};
pub use error::{OperationKind, SyncError};
pub use options::{FetchFn, MutationFn, SyncOptions};
pub use store::{SharedCache, Snapshot};
pub use stream::{MirrorStream, MirrorWatchStream, TodoFilter};
pub use todos::{TodoController, todo_sync_options};

pub use model::{Identified, ItemId, ItemRef, NewTodo, SyncItem, Todo, TodoPatch};
