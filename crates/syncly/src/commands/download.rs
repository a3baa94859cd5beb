//! File download handler.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use syncly_api::RestClient;
use syncly_config::ClientSettings;

use crate::cli::{DownloadArgs, GlobalOpts};
use crate::error::CliError;

pub async fn handle(
    settings: ClientSettings,
    args: DownloadArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let out = match args.out {
        Some(path) => path,
        None => default_output_path(&args.path)?,
    };

    let rest = RestClient::new(settings.base_url, &settings.transport)?;

    let spinner = (!global.quiet && std::io::stderr().is_terminal())
        .then(|| create_spinner(&format!("Downloading {}", args.path)));

    let result = rest.download(&args.path).await;
    if let Some(ref spinner) = spinner {
        spinner.finish_and_clear();
    }
    let bytes = result?;

    tokio::fs::write(&out, &bytes).await?;
    tracing::info!(path = %out.display(), bytes = bytes.len(), "download saved");
    if !global.quiet {
        eprintln!("Saved {} bytes to {}", bytes.len(), out.display());
    }
    Ok(())
}

/// Last non-empty path segment, without any query string.
fn default_output_path(path: &str) -> Result<PathBuf, CliError> {
    path.split(['?', '#'])
        .next()
        .unwrap_or_default()
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| CliError::Validation {
            field: "out".into(),
            reason: format!("cannot derive a file name from '{path}'; pass --out"),
        })
}

fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
