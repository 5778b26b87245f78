//! `git-backup commit [SOURCE]`
//!
//! Commits every untracked file in the source with a timestamped message,
//! then pulls each registered destination.  Tracked files with local
//! modifications are not staged.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::{
    config::Settings,
    picker::SourcePicker,
    repo::BackupRepo,
    store::{Mapping, Store},
    ui,
};

/// How `commit` ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Source committed and every destination pulled.
    Synced {
        source: String,
        /// Number of files newly added by the commit.
        added: usize,
        /// Destinations whose HEAD moved.
        updated: usize,
    },
    /// No source is registered at all.
    NoSources,
    /// The requested (or picked) source is not registered.
    UnknownSource(String),
}

pub fn run(
    source: Option<&str>,
    settings: &Settings,
    store: &Store,
    picker: &dyn SourcePicker,
) -> Result<CommitOutcome> {
    let mapping = store.load()?;

    let Some(source) = resolve_source(source, &mapping, picker)? else {
        ui::error("No source directory found in config!");
        return Ok(CommitOutcome::NoSources);
    };

    let Some(destinations) = mapping.destinations(&source) else {
        ui::error(format!("No destinations found for source directory: {source}!"));
        return Ok(CommitOutcome::UnknownSource(source));
    };

    let repo = BackupRepo::open(Path::new(&source))
        .with_context(|| format!("opening source repository {source}"))?;

    let message = commit_message(&settings.commit.message_prefix, Local::now());
    let untracked = repo
        .untracked_files()
        .with_context(|| format!("listing new files in {source}"))?;
    for nested in &untracked.nested_repos {
        ui::warn(format!(
            "{} is a separate Git repository and will not be backed up.",
            Path::new(&source).join(nested).display()
        ));
    }

    let added = ui::step(format!("Commit {source}"), || {
        repo.commit_paths(&untracked.files, &message, &settings.identity)
            .map(|_| untracked.files.len())
    })
    .with_context(|| format!("committing {source}"))?;

    let mut updated = 0;
    for dest in destinations {
        let moved = ui::step(format!("Pull {dest}"), || {
            BackupRepo::open(Path::new(dest))?.pull()
        })
        .with_context(|| format!("pulling into {dest}"))?;
        if moved {
            updated += 1;
        }
    }

    Ok(CommitOutcome::Synced {
        source,
        added,
        updated,
    })
}

/// Which source to operate on.  `None` only when nothing is registered.
///
/// An explicit `source` is returned as-is, registered or not, so the caller
/// can report it.
fn resolve_source(
    source: Option<&str>,
    mapping: &Mapping,
    picker: &dyn SourcePicker,
) -> Result<Option<String>> {
    if mapping.is_empty() {
        return Ok(None);
    }
    if let Some(source) = source {
        return Ok(Some(source.to_string()));
    }

    let sources: Vec<String> = mapping.sources().map(str::to_string).collect();
    match sources.as_slice() {
        [only] => Ok(Some(only.clone())),
        _ => picker.pick(&sources).map(Some),
    }
}

/// `<prefix>: YYYY-MM-DD HH:MM:SS`
pub fn commit_message(prefix: &str, at: DateTime<Local>) -> String {
    format!("{prefix}: {}", at.format("%Y-%m-%d %H:%M:%S"))
}

// ─── Tests ────────────────────────────────────────────────────────────────────
