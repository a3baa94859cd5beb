//! Clap derive structures for the `syncly` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// syncly -- optimistic todo client
#[derive(Debug, Parser)]
#[command(
    name = "syncly",
    version,
    about = "Keep a remote todo collection in sync from the command line",
    long_about = "Drives a todo REST API through an optimistic sync controller.\n\n\
        Mutations are staged and applied locally first, then the collection\n\
        is refetched so the output always reflects server truth.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "SYNCLY_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Server base URL (overrides profile)
    #[arg(long, short = 'u', env = "SYNCLY_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Bearer token
    #[arg(long, env = "SYNCLY_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SYNCLY_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "SYNCLY_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "SYNCLY_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Wait for server confirmation instead of applying changes locally first
    #[arg(long, global = true)]
    pub no_optimistic: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List and edit todos
    #[command(alias = "t")]
    Todos(TodosArgs),

    /// Download a file from the server
    #[command(alias = "dl")]
    Download(DownloadArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Todos ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TodosArgs {
    #[command(subcommand)]
    pub command: TodosCommand,
}

#[derive(Debug, Subcommand)]
pub enum TodosCommand {
    /// List todos
    #[command(alias = "ls")]
    List {
        /// Which todos to show
        #[arg(long, short = 'f', value_enum, default_value = "visible")]
        filter: FilterArg,
    },

    /// Create a todo
    Add {
        /// Title of the new todo
        title: String,

        /// Longer description
        #[arg(long, short = 't', default_value = "")]
        text: String,

        /// Create it already completed
        #[arg(long)]
        done: bool,
    },

    /// Flip a todo between open and completed
    Toggle {
        /// Todo ID
        id: String,
    },

    /// Change a todo's title or text
    Edit {
        /// Todo ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New text
        #[arg(long, short = 't')]
        text: Option<String>,
    },

    /// Delete a todo
    #[command(alias = "rm")]
    Remove {
        /// Todo ID
        id: String,
    },

    /// Follow the collection, printing it whenever it changes
    Watch {
        /// Seconds between refreshes
        #[arg(long, short = 'i', default_value = "2")]
        interval: u64,

        /// Which todos to show
        #[arg(long, short = 'f', value_enum, default_value = "visible")]
        filter: FilterArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FilterArg {
    /// Everything, including soft-deleted todos
    All,
    /// Not soft-deleted
    Visible,
    /// Open todos
    Active,
    /// Completed todos
    Completed,
}

// ── Download ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Path on the server, relative to the base URL
    pub path: String,

    /// Output file (defaults to the last path segment)
    #[arg(long, short = 'O')]
    pub out: Option<PathBuf>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or extend the config file (guided unless --url is given)
    Init {
        /// Profile name
        #[arg(long)]
        name: Option<String>,

        /// Server base URL; skips the interactive prompts
        #[arg(long)]
        url: Option<String>,
    },

    /// Display current configuration (secrets masked)
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
