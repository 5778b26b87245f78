//! `git-backup info` — read-only overview of the mapping.
//!
//! For each registered source the current branch and latest commit are
//! shown, followed by one line per destination saying whether its HEAD
//! matches the source, trails it, or has commits the source lacks.

use std::path::Path;

use anyhow::Result;
use console::style;

use crate::{
    repo::{self, BackupRepo, HeadInfo},
    store::{Mapping, Store},
    ui,
};

/// Where a destination stands relative to its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestState {
    InSync,
    /// HEAD is an ancestor of the source's HEAD; the next commit catches up.
    Behind,
    /// HEAD holds commits the source does not have.  Pulls will fail.
    Diverged,
    NotARepository,
    Missing,
}

impl std::fmt::Display for DestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::InSync => "in sync",
            Self::Behind => "behind",
            Self::Diverged => "diverged",
            Self::NotARepository => "not a repository",
            Self::Missing => "missing",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub source: String,
    /// `None` when the source directory is not (or no longer) a repository.
    pub head: Option<HeadInfo>,
    pub destinations: Vec<(String, DestState)>,
}

/// Collect one report per registered source.
pub fn collect(mapping: &Mapping) -> Result<Vec<SourceReport>> {
    mapping
        .iter()
        .map(|(source, dests)| {
            let source_repo = BackupRepo::open(Path::new(source)).ok();
            let head = source_repo.as_ref().map(BackupRepo::head_info).transpose()?;
            let source_head = source_repo
                .as_ref()
                .zip(head.as_ref().and_then(|h| h.commit));

            let destinations = dests
                .iter()
                .map(|d| (d.clone(), dest_state(Path::new(d), source_head)))
                .collect();

            Ok::<_, anyhow::Error>(SourceReport {
                source: source.to_string(),
                head,
                destinations,
            })
        })
        .collect()
}

fn dest_state(path: &Path, source: Option<(&BackupRepo, git2::Oid)>) -> DestState {
    if !path.exists() {
        return DestState::Missing;
    }
    if !repo::is_repo(path) {
        return DestState::NotARepository;
    }
    let dest_commit = BackupRepo::open(path)
        .and_then(|r| r.head_info())
        .ok()
        .and_then(|h| h.commit);

    match (dest_commit, source) {
        (Some(dest), Some((_, head))) if dest == head => DestState::InSync,
        (Some(dest), Some((source, head))) => match source.contains(head, dest) {
            Ok(true) => DestState::Behind,
            Ok(false) | Err(_) => DestState::Diverged,
        },
        _ => DestState::Behind,
    }
}

pub fn run(store: &Store) -> Result<Vec<SourceReport>> {
    let mapping = store.load()?;
    let reports = collect(&mapping)?;

    ui::note(format!(
        "{} {} ({} source(s))",
        style("Mapping file:").bold(),
        store.path().display(),
        mapping.len()
    ));

    if reports.is_empty() {
        ui::warn("no source directories registered. Run `git-backup init` first.");
        return Ok(reports);
    }

    for report in &reports {
        println!();
        println!("{}", style(&report.source).cyan().bold());
        match &report.head {
            Some(head) => {
                let commit = head
                    .commit
                    .map(|c| c.to_string()[..7].to_string())
                    .unwrap_or_else(|| "no commits".into());
                println!(
                    "  branch {}  {}  {}",
                    head.branch.as_deref().unwrap_or("(detached)"),
                    style(commit).yellow(),
                    head.summary.as_deref().unwrap_or("")
                );
            },
            None => println!("  {}", style("not a repository").red()),
        }

        if report.destinations.is_empty() {
            println!("  {}", style("no destinations").dim());
        }
        for (dest, state) in &report.destinations {
            let state = match state {
                DestState::InSync => style(state.to_string()).green(),
                DestState::Behind => style(state.to_string()).yellow(),
                DestState::Diverged => style(state.to_string()).magenta(),
                DestState::NotARepository | DestState::Missing => style(state.to_string()).red(),
            };
            println!("  → {dest}  {state}");
        }
    }
    println!();

    Ok(reports)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use super::*;
    use crate::{
        cli::InitArgs,
        commands::init,
        config::{Identity, Settings},
    };

    fn setup(root: &Path, dests: &[&str]) -> (Store, String) {
        let store = Store::open(root.join("m.json")).unwrap();
        let source = root.join("source").to_string_lossy().into_owned();
        let args = InitArgs {
            source: source.clone(),
            destinations: dests
                .iter()
                .map(|d| root.join(d).to_string_lossy().into_owned())
                .collect(),
            force: false,
            add: false,
        };
        init::run(&args, &Settings::default(), &store).unwrap();
        (store, source)
    }

    #[test]
    fn empty_mapping_yields_no_reports() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("m.json")).unwrap();
        assert!(run(&store).unwrap().is_empty());
    }

    #[test]
    fn fresh_destinations_are_in_sync() {
        let dir = tempfile::tempdir().unwrap();
        let (store, source) = setup(dir.path(), &["d1", "d2"]);

        let reports = collect(&store.load().unwrap()).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].source, source);
        assert_eq!(
            reports[0].head.as_ref().unwrap().summary.as_deref(),
            Some("Initial Backup Commit")
        );
        assert!(
            reports[0]
                .destinations
                .iter()
                .all(|(_, s)| *s == DestState::InSync)
        );
    }

    #[test]
    fn unpulled_commit_shows_behind() {
        let dir = tempfile::tempdir().unwrap();
        let (store, source) = setup(dir.path(), &["d1"]);
        BackupRepo::open(Path::new(&source))
            .unwrap()
            .commit_paths(&[], "later", &Identity::default())
            .unwrap();

        let reports = collect(&store.load().unwrap()).unwrap();
        assert_eq!(reports[0].destinations[0].1, DestState::Behind);
    }

    #[test]
    fn local_commit_in_destination_shows_diverged() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = setup(dir.path(), &["d1"]);
        let d1 = dir.path().join("d1");
        fs::write(d1.join("local.txt"), "hand edit").unwrap();
        BackupRepo::open(&d1)
            .unwrap()
            .commit_paths(&[PathBuf::from("local.txt")], "local", &Identity::default())
            .unwrap();

        let reports = collect(&store.load().unwrap()).unwrap();
        assert_eq!(reports[0].destinations[0].1, DestState::Diverged);
    }

    #[test]
    fn missing_and_plain_destinations_are_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("m.json")).unwrap();
        let plain = dir.path().join("plain");
        fs::create_dir(&plain).unwrap();

        let mut m = Mapping::default();
        m.overwrite("./nowhere", &[
            plain.to_string_lossy().into_owned(),
            dir.path().join("gone").to_string_lossy().into_owned(),
        ]);
        store.save(&m).unwrap();

        let reports = run(&store).unwrap();
        assert!(reports[0].head.is_none());
        assert_eq!(reports[0].destinations[0].1, DestState::NotARepository);
        assert_eq!(reports[0].destinations[1].1, DestState::Missing);
    }

    #[test]
    fn dest_state_labels() {
        let labels: Vec<String> = [
            DestState::InSync,
            DestState::Behind,
            DestState::Diverged,
            DestState::NotARepository,
            DestState::Missing,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(labels, [
            "in sync",
            "behind",
            "diverged",
            "not a repository",
            "missing"
        ]);
    }
}
