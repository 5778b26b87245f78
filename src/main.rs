//! `git-backup` — keep backup clones of a directory in sync through git.
//!
//! # Overview
//!
//! A *source* directory is a git repository; each of its *destinations* is a
//! clone whose `origin` is the source's `.git` directory.  `commit` records
//! every new file in the source and fast-forwards all destinations.  Which
//! destinations belong to which source is kept in a flat JSON file.
//!
//! # Usage
//!
//! ```text
//! git-backup init ./docs /mnt/a/docs /mnt/b/docs   # set up source + 2 destinations
//! git-backup init -a ./docs /mnt/c/docs            # add a third destination
//! git-backup init -f ./docs /mnt/d/docs            # replace the destination list
//! git-backup commit                                # commit + sync (prompts if several sources)
//! git-backup commit ./docs                         # commit + sync one source
//! git-backup info                                  # show sync state
//! ```
//!
//! # Module layout
//!
//! | Module                   | Responsibility                              |
//! |--------------------------|---------------------------------------------|
//! | [`cli`]                  | Argument types parsed by clap               |
//! | [`config`]               | `Settings` struct + TOML loader             |
//! | [`store`]                | JSON source → destinations mapping          |
//! | [`repo`]                 | git2 wrapper: init, commit, fetch, pull     |
//! | [`picker`]               | Choosing a source when none was given       |
//! | [`ui`]                   | Spinner, step lines, warnings               |
//! | [`commands::init`]       | `git-backup init` subcommand                |
//! | [`commands::commit`]     | `git-backup commit` subcommand              |
//! | [`commands::info`]       | `git-backup info` subcommand                |

mod cli;
mod commands;
mod config;
mod picker;
mod repo;
mod store;
mod ui;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Subcommand};
use commands::{commit::CommitOutcome, init::InitOutcome};
use picker::InteractivePicker;
use store::Store;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config::load_merged(&cli.config)?;

    let store_path = cli.store.clone().unwrap_or_else(|| settings.store.clone());
    let store = Store::open(store_path)?;

    match &cli.command {
        Subcommand::Init(args) => {
            if let InitOutcome::Completed { skipped } =
                commands::init::run(args, &settings, &store)?
            {
                if !skipped.is_empty() {
                    ui::note(format!("Left unmanaged: {}", skipped.join(", ")));
                }
                ui::finish("Setup complete!");
            }
        },
        Subcommand::Commit(args) => {
            let outcome =
                commands::commit::run(args.source.as_deref(), &settings, &store, &InteractivePicker)?;
            if let CommitOutcome::Synced {
                source,
                added,
                updated,
            } = outcome
            {
                ui::finish(format!(
                    "Backup committed and synced! {source}: {added} new file(s), \
                     {updated} destination(s) updated."
                ));
            }
        },
        Subcommand::Info => {
            commands::info::run(&store)?;
        },
    }

    Ok(())
}
