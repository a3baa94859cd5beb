// syncly-api: Async HTTP client for JSON collection resources

pub mod client;
pub mod error;
pub mod todos;
pub mod transport;

pub use client::RestClient;
pub use error::Error;
pub use todos::{NewTodoBody, TODOS_PATH, TodoClient, TodoPatchBody, TodoQuery, TodoRecord};
pub use transport::{TlsMode, TransportConfig};
