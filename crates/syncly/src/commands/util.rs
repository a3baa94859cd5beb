//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::sync::Arc;

use syncly_core::{ItemId, Snapshot, Todo};

use crate::error::CliError;

/// Find a todo by id in a snapshot.
pub fn find_todo(snapshot: &Snapshot<Todo>, identifier: &str) -> Result<Arc<Todo>, CliError> {
    let id = ItemId::from(identifier);
    snapshot
        .iter()
        .find(|todo| todo.id == id)
        .map(Arc::clone)
        .ok_or_else(|| CliError::NotFound {
            resource_type: "todo".into(),
            identifier: identifier.into(),
            list_command: "todos list --filter all".into(),
        })
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}

/// Map a dialoguer failure into CliError.
pub fn prompt_err(e: dialoguer::Error) -> CliError {
    CliError::Io(std::io::Error::other(e))
}
