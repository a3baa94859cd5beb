//! Command dispatch: bridges CLI args -> sync controller -> output formatting.

pub mod config_cmd;
pub mod download;
pub mod todos;
pub mod util;

use syncly_config::ClientSettings;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    settings: ClientSettings,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Todos(args) => todos::handle(&settings, args, global).await,
        Command::Download(args) => download::handle(settings, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
