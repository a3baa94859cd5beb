// Todo resource endpoints
//
// Wire types and a typed wrapper around `RestClient` for `/api/todos`.
// Field names match the server's JSON; conversion to domain types
// happens in syncly-core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::RestClient;
use crate::error::Error;

/// Default collection path on the server.
pub const TODOS_PATH: &str = "/api/todos";

/// A todo as returned by `GET /api/todos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// `POST /api/todos` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTodoBody {
    pub title: String,
    pub text: String,
    pub completed: bool,
}

/// `PATCH /api/todos/{id}` body. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPatchBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

/// Query string for the list call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

/// Typed client for the todo collection.
#[derive(Debug, Clone)]
pub struct TodoClient {
    rest: RestClient,
    path: String,
}

impl TodoClient {
    pub fn new(rest: RestClient) -> Self {
        Self::with_path(rest, TODOS_PATH)
    }

    /// Use a non-default collection path.
    pub fn with_path(rest: RestClient, path: impl Into<String>) -> Self {
        Self {
            rest,
            path: path.into(),
        }
    }

    pub async fn list(&self, query: Option<&TodoQuery>) -> Result<Vec<TodoRecord>, Error> {
        self.rest.list(&self.path, query).await
    }

    pub async fn create(&self, body: &NewTodoBody) -> Result<serde_json::Value, Error> {
        self.rest.create(&self.path, body).await
    }

    pub async fn update(&self, id: &str, body: &TodoPatchBody) -> Result<serde_json::Value, Error> {
        self.rest.update(&self.path, id, body).await
    }

    pub async fn remove(&self, id: &str) -> Result<serde_json::Value, Error> {
        self.rest.delete(&self.path, id).await
    }
}
