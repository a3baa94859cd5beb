// ── API-to-domain type conversions ──
//
// Bridges raw `syncly_api` wire types into canonical `syncly_core::model`
// types and back for request bodies.

use syncly_api::{NewTodoBody, TodoPatchBody, TodoRecord};

use crate::model::{ItemId, NewTodo, Todo, TodoPatch};

impl From<TodoRecord> for Todo {
    fn from(r: TodoRecord) -> Self {
        Self {
            id: ItemId::Remote(r.id),
            title: r.title,
            text: r.text,
            completed: r.completed,
            created_at: r.created_at,
            updated_at: r.updated_at,
            deleted_at: r.deleted_at,
        }
    }
}

impl From<&NewTodo> for NewTodoBody {
    fn from(t: &NewTodo) -> Self {
        Self {
            title: t.title.clone(),
            text: t.text.clone(),
            completed: t.completed,
        }
    }
}

impl From<&TodoPatch> for TodoPatchBody {
    fn from(p: &TodoPatch) -> Self {
        Self {
            title: p.title.clone(),
            text: p.text.clone(),
            completed: p.completed,
        }
    }
}
