//! CLI error types with miette diagnostics.
//!
//! Maps `SyncError` and config failures into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use syncly_config::ConfigError;
use syncly_core::SyncError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Remote ───────────────────────────────────────────────────────

    #[error("Could not reach the server: {message}")]
    #[diagnostic(
        code(syncly::connection_failed),
        help(
            "Check that the server is running and the base URL is right.\n\
             Self-signed certificate? Try --insecure (-k)."
        )
    )]
    ConnectionFailed { message: String },

    #[error("The server rejected the credentials (HTTP {status})")]
    #[diagnostic(
        code(syncly::auth_failed),
        help("Pass --token, set SYNCLY_TOKEN, or run: syncly config init")
    )]
    AuthFailed { status: u16 },

    #[error("Server error (HTTP {status}): {message}")]
    #[diagnostic(code(syncly::api_error))]
    Api { status: u16, message: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(syncly::not_found),
        help("Run: syncly {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Todo '{id}' has not reached the server yet")]
    #[diagnostic(
        code(syncly::not_synced),
        help("Wait for the create to finish, then use the ID assigned by the server.")
    )]
    NotSynced { id: String },

    #[error("The server does not support '{operation}'")]
    #[diagnostic(code(syncly::unsupported))]
    Unsupported { operation: String },

    #[error("The sync controller stopped before the operation finished")]
    #[diagnostic(code(syncly::shutdown))]
    Shutdown,

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(syncly::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(syncly::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: syncly config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No server configured")]
    #[diagnostic(
        code(syncly::no_config),
        help(
            "Create a profile with: syncly config init\n\
             or pass --base-url. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(syncly::config))]
    Config(#[from] ConfigError),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(syncly::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(syncly::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::NotSynced { .. } => exit_code::CONFLICT,
            Self::Unsupported { .. } => exit_code::PERMISSION,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::ProfileNotFound { .. }
            | Self::NoConfig { .. } => exit_code::USAGE,
            Self::Api { status, .. } => match status {
                404 => exit_code::NOT_FOUND,
                409 => exit_code::CONFLICT,
                _ => exit_code::GENERAL,
            },
            _ => exit_code::GENERAL,
        }
    }
}

// ── SyncError → CliError mapping ─────────────────────────────────────

impl From<SyncError> for CliError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Remote {
                message,
                status: None,
            } => CliError::ConnectionFailed { message },
            SyncError::Remote {
                status: Some(status @ (401 | 403)),
                ..
            } => CliError::AuthFailed { status },
            SyncError::Remote {
                message,
                status: Some(status),
            } => CliError::Api { status, message },
            SyncError::Unsupported { operation } => CliError::Unsupported {
                operation: operation.to_string(),
            },
            SyncError::NotSynced { id } => CliError::NotSynced { id },
            SyncError::Shutdown => CliError::Shutdown,
        }
    }
}

impl From<syncly_api::Error> for CliError {
    fn from(err: syncly_api::Error) -> Self {
        SyncError::from(err).into()
    }
}
