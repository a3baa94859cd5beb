// ── Core error types ──
//
// One operational kind per capability failure. Consumers never see
// reqwest errors or JSON parse failures directly; the
// `From<syncly_api::Error>` impl flattens them into `Remote`.
//
// `SyncError` is `Clone` because the same failure is delivered to the
// submitting caller and stored in the shared `error` status slot.

use strum::Display;
use thiserror::Error;

/// The remote capability an error or log line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum OperationKind {
    Fetch,
    Create,
    Update,
    Delete,
}

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// A capability call failed. Transport, validation and not-found
    /// failures all land here.
    #[error("Remote operation failed: {message}")]
    Remote {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    /// The controller was built without this capability.
    #[error("Operation not supported: no {operation} capability configured")]
    Unsupported { operation: OperationKind },

    /// The item only exists locally (optimistic create not yet reconciled).
    #[error("Item {id} has not been synchronized with the server yet")]
    NotSynced { id: String },

    /// The controller stopped before the request could be answered.
    #[error("Sync controller has shut down")]
    Shutdown,
}

impl SyncError {
    /// Convenience constructor for capability implementations that are not
    /// backed by `syncly-api`.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
            status: None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<syncly_api::Error> for SyncError {
    fn from(err: syncly_api::Error) -> Self {
        let status = err.status();
        let message = match err {
            syncly_api::Error::Http { status, body } if body.is_empty() => {
                format!("HTTP {status}")
            }
            syncly_api::Error::Deserialization { message, body: _ } => {
                format!("invalid response: {message}")
            }
            other => other.to_string(),
        };
        Self::Remote { message, status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_errors_keep_their_status() {
        let err = SyncError::from(syncly_api::Error::Http {
            status: 422,
            body: "title required".into(),
        });
        assert_eq!(
            err,
            SyncError::Remote {
                message: "HTTP 422: title required".into(),
                status: Some(422),
            }
        );
    }

    #[test]
    fn empty_http_body_is_not_echoed() {
        let err = SyncError::from(syncly_api::Error::Http {
            status: 500,
            body: String::new(),
        });
        assert_eq!(err.to_string(), "Remote operation failed: HTTP 500");
    }

    #[test]
    fn unsupported_names_the_operation() {
        let err = SyncError::Unsupported {
            operation: OperationKind::Delete,
        };
        assert!(err.to_string().contains("no delete capability"));
    }
}
