//! Command-line interface definition.
//!
//! All argument parsing lives here so the rest of the codebase can stay
//! agnostic to `clap`.  The `Cli` struct is parsed once in `main` and the
//! subcommand arguments are handed to the command handlers.
//!
//! Source and destination paths are kept as the exact strings typed on the
//! command line: they double as keys of the mapping file.

use std::path::PathBuf;

use clap::{Args, Parser};

/// Top-level CLI arguments, shared across every subcommand.
#[derive(Parser, Debug)]
#[command(
    name    = "git-backup",
    about   = "Commit a source directory and sync it to its backup clones",
    version,
    // Show a compact two-column help layout.
    help_template = "\
{before-help}{name} {version}
{about}

{usage-heading} {usage}

{all-args}{after-help}"
)]
pub struct Cli {
    /// Path to the settings file.
    ///
    /// Defaults to `backup.toml` in the current working directory.  The file
    /// is optional; values in it override the global
    /// `<config dir>/git-backup/config.toml`.
    #[arg(short, long, default_value = "backup.toml", global = true)]
    pub config: PathBuf,

    /// Path to the source → destinations mapping file.
    ///
    /// Overrides `store` from the settings.  Without either, the mapping is
    /// kept in `backup_config.json` next to the executable.
    #[arg(short, long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Subcommand,
}

#[derive(clap::Subcommand, Debug, PartialEq, Eq)]
pub enum Subcommand {
    /// Set up the source repository and its backup destinations.
    ///
    /// The source is created and initialised with a README commit if it is
    /// not a repository yet.  Every destination that is not already a
    /// repository becomes a clone tracking the source.
    Init(InitArgs),

    /// Commit new files in a source and pull them into its destinations.
    Commit(CommitArgs),

    /// Show registered sources, their latest commit and each destination's
    /// sync state.
    Info,
}

#[derive(Args, Debug, PartialEq, Eq)]
pub struct InitArgs {
    /// Backup source directory.
    pub source: String,

    /// Directories where backups will be stored.
    pub destinations: Vec<String>,

    /// Overwrite the registered destinations of an existing source.
    #[arg(short, long, conflicts_with = "add")]
    pub force: bool,

    /// Add destinations to an existing source instead of replacing them.
    #[arg(short, long)]
    pub add: bool,
}

#[derive(Args, Debug, PartialEq, Eq)]
pub struct CommitArgs {
    /// Source directory to commit.  Omit to use the only registered source,
    /// or to choose one interactively.
    #[arg(value_parser = existing_dir)]
    pub source: Option<String>,
}

fn existing_dir(raw: &str) -> Result<String, String> {
    if std::path::Path::new(raw).is_dir() {
        Ok(raw.to_string())
    } else {
        Err(format!("directory '{raw}' does not exist"))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
