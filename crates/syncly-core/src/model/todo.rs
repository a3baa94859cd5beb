use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Identified, ItemId, SyncItem};

/// A todo entry as mirrored by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: ItemId,
    pub title: String,
    pub text: String,
    pub completed: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Soft-delete marker; consumers usually hide these.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Todo {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Create payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTodo {
    pub title: String,
    pub text: String,
    pub completed: bool,
}

impl NewTodo {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            completed: false,
        }
    }
}

/// Update payload. `None` fields are left as they are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPatch {
    pub id: ItemId,
    pub title: Option<String>,
    pub text: Option<String>,
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            title: None,
            text: None,
            completed: None,
        }
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

impl Identified for Todo {
    fn id(&self) -> &ItemId {
        &self.id
    }
}

impl Identified for TodoPatch {
    fn id(&self) -> &ItemId {
        &self.id
    }
}

impl SyncItem for Todo {
    type Draft = NewTodo;
    type Patch = TodoPatch;

    fn from_draft(id: ItemId, draft: &NewTodo) -> Self {
        Self {
            id,
            title: draft.title.clone(),
            text: draft.text.clone(),
            completed: draft.completed,
            created_at: None,
            updated_at: None,
            deleted_at: None,
        }
    }

    fn merge(&mut self, patch: &TodoPatch) {
        if let Some(ref title) = patch.title {
            self.title.clone_from(title);
        }
        if let Some(ref text) = patch.text {
            self.text.clone_from(text);
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
    }
}
