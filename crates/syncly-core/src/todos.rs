// ── Todo wiring ──
//
// Binds `TodoClient` calls to the four controller capabilities.

use std::sync::Arc;

use syncly_api::{NewTodoBody, TodoClient, TodoPatchBody, TodoQuery};

use crate::controller::SyncController;
use crate::error::SyncError;
use crate::model::{ItemId, ItemRef, NewTodo, Todo, TodoPatch};
use crate::options::SyncOptions;

/// Controller over the todo collection.
pub type TodoController = SyncController<Todo, TodoQuery, ItemRef>;

/// Capabilities backed by `client`. Flags, query and cache are left at their
/// defaults for the caller to set.
pub fn todo_sync_options(client: TodoClient) -> SyncOptions<Todo, TodoQuery, ItemRef> {
    let client = Arc::new(client);
    let fetch_client = Arc::clone(&client);
    let create_client = Arc::clone(&client);
    let update_client = Arc::clone(&client);
    let delete_client = client;

    SyncOptions::new(
        move |query: Option<TodoQuery>| {
            let client = Arc::clone(&fetch_client);
            async move {
                let records = client.list(query.as_ref()).await?;
                Ok(records.into_iter().map(Todo::from).collect())
            }
        },
        move |draft: NewTodo| {
            let client = Arc::clone(&create_client);
            async move { Ok(client.create(&NewTodoBody::from(&draft)).await?) }
        },
    )
    .with_update(move |patch: TodoPatch| {
        let client = Arc::clone(&update_client);
        async move {
            let id = remote_id(&patch.id)?;
            Ok(client.update(&id, &TodoPatchBody::from(&patch)).await?)
        }
    })
    .with_delete(move |params: ItemRef| {
        let client = Arc::clone(&delete_client);
        async move {
            let id = remote_id(&params.id)?;
            Ok(client.remove(&id).await?)
        }
    })
}

/// Server id for `id`. Provisional ids have no server counterpart yet.
fn remote_id(id: &ItemId) -> Result<String, SyncError> {
    id.as_remote()
        .map(str::to_owned)
        .ok_or_else(|| SyncError::NotSynced { id: id.to_string() })
}
