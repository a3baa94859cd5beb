mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::{CommandFactory, Parser};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.global);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// `-v` raises the level one step per flag, `-q` drops it to errors.
/// `RUST_LOG` replaces both.
fn log_level(global: &GlobalOpts) -> LevelFilter {
    if global.quiet {
        return LevelFilter::ERROR;
    }
    match global.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn init_tracing(global: &GlobalOpts) {
    let filter = EnvFilter::builder()
        .with_default_directive(log_level(global).into())
        .from_env_lossy();

    // stdout carries command output only.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli { global, command } = cli;

    let command = match command {
        Command::Config(args) => return commands::config_cmd::handle(args, &global),
        Command::Completions(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "syncly", &mut std::io::stdout());
            return Ok(());
        }
        server_bound => server_bound,
    };

    let settings = config::resolve_settings(&global)?;
    tracing::debug!(
        base_url = %settings.base_url,
        resource = %settings.resource,
        optimistic = settings.optimistic,
        "resolved server settings"
    );
    commands::dispatch(command, settings, &global).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> GlobalOpts {
        Cli::try_parse_from(["syncly"].iter().chain(args).chain(&["todos", "list"]))
            .map(|cli| cli.global)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn verbosity_flags_pick_the_log_level() {
        assert_eq!(log_level(&parse(&[])), LevelFilter::WARN);
        assert_eq!(log_level(&parse(&["-vv"])), LevelFilter::DEBUG);
        assert_eq!(log_level(&parse(&["-vvvv"])), LevelFilter::TRACE);
        assert_eq!(log_level(&parse(&["-q", "-v"])), LevelFilter::ERROR);
    }
}
