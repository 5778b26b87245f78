//! `git-backup init SOURCE [DESTINATIONS...]`
//!
//! # Steps (in order)
//!
//! | # | Step                 | Skipped when                                   |
//! |---|----------------------|------------------------------------------------|
//! | 1 | Create source dir    | it exists                                      |
//! | 2 | Init source repo     | it is a repository (needs `-f` or `-a` then)   |
//! | 3 | Commit README        | source was already a repository                |
//! | 4 | Save mapping         | —                                              |
//! | 5 | Provision each dest  | the destination already is a repository        |
//!
//! The mapping is saved before any destination is touched.  Nothing is rolled
//! back: if a destination fails, the mapping already lists it and earlier
//! destinations stay provisioned.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::{
    cli::InitArgs,
    config::Settings,
    repo::{self, BackupRepo, ORIGIN},
    store::Store,
    ui,
};

const README: &str = "README.md";

/// README written into a new source when no template is configured.
const DEFAULT_README: &str = "\
# Backup source

Files in this directory are committed by `git-backup commit` and pulled into
every registered destination.  Only new (untracked) files are picked up.
";

/// How `init` ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// Mapping saved and destinations processed.
    Completed {
        /// Destinations skipped because they already were repositories.
        skipped: Vec<String>,
    },
    /// `--force` and `--add` were both given; nothing was touched.
    ConflictingFlags,
    /// The source already is a repository and neither flag was given.
    SourceAlreadyRepo,
}

pub fn run(args: &InitArgs, settings: &Settings, store: &Store) -> Result<InitOutcome> {
    if args.force && args.add {
        ui::error("cannot use -f and -a flags together!");
        return Ok(InitOutcome::ConflictingFlags);
    }

    ui::note(format!("Setting up backup repositories for {}...", args.source));

    let source = Path::new(&args.source);
    if !source.exists() {
        fs::create_dir_all(source)
            .with_context(|| format!("creating source directory {}", source.display()))?;
        ui::done_step(format!("Created source directory: {}", args.source));
    }

    if repo::is_repo(source) {
        if args.add {
            ui::warn(format!(
                "directory {} is already a Git repository. Adding new destinations.",
                args.source
            ));
        } else if args.force {
            ui::warn(format!(
                "directory {} is already a Git repository. Overwriting destinations.",
                args.source
            ));
        } else {
            ui::warn(format!(
                "directory {} is already a Git repository. Use -f to overwrite its destinations \
                 or -a to add new ones.",
                args.source
            ));
            return Ok(InitOutcome::SourceAlreadyRepo);
        }
    } else {
        init_source(source, settings)?;
    }

    let mut mapping = store.load()?;
    if args.add {
        mapping.extend(&args.source, &args.destinations);
    } else {
        mapping.overwrite(&args.source, &args.destinations);
    }
    store.save(&mapping)?;
    ui::done_step(format!("Recorded destinations in {}", store.path().display()));

    let source_repo = BackupRepo::open(source)
        .with_context(|| format!("opening source repository {}", source.display()))?;

    let mut skipped = Vec::new();
    for dest in &args.destinations {
        if !provision_destination(&source_repo, dest)? {
            skipped.push(dest.clone());
        }
    }

    Ok(InitOutcome::Completed { skipped })
}

/// Initialise `source`, make sure it has a README, and commit it.
fn init_source(source: &Path, settings: &Settings) -> Result<()> {
    let repo = BackupRepo::init(source)
        .with_context(|| format!("initialising repository in {}", source.display()))?;

    let readme = source.join(README);
    if !readme.exists() {
        write_readme(&readme, settings.readme_template.as_deref())?;
    }

    repo.commit_paths(
        &[PathBuf::from(README)],
        &settings.commit.initial_message,
        &settings.identity,
    )
    .with_context(|| format!("committing README in {}", source.display()))?;

    ui::done_step(format!(
        "Initialized Git repository in source directory: {}",
        source.display()
    ));
    Ok(())
}

/// Copy the template if there is one on disk, otherwise write the default.
fn write_readme(dest: &Path, template: Option<&Path>) -> Result<()> {
    match template.filter(|t| t.is_file()) {
        Some(t) => {
            fs::copy(t, dest)
                .with_context(|| format!("copying {} to {}", t.display(), dest.display()))?;
        },
        None => {
            fs::write(dest, DEFAULT_README)
                .with_context(|| format!("writing {}", dest.display()))?;
        },
    }
    Ok(())
}

/// Turn `dest` into a clone tracking `source`.
///
/// Returns `false` when `dest` already was a repository and was left alone.
fn provision_destination(source: &BackupRepo, dest: &str) -> Result<bool> {
    let path = Path::new(dest);
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("creating destination directory {dest}"))?;
        ui::done_step(format!("Created destination directory: {dest}"));
    }

    if repo::is_repo(path) {
        ui::warn(format!(
            "directory {dest} is already a Git repository. This destination will be ignored!"
        ));
        return Ok(false);
    }

    let repo = BackupRepo::init(path)
        .with_context(|| format!("initialising repository in {dest}"))?;

    let url = source.file_url()?;
    let branch = source
        .current_branch()
        .with_context(|| format!("reading current branch of {}", source.path().display()))?;

    ui::step(format!("Fetch {url} into {dest}"), || {
        repo.add_remote_and_fetch(ORIGIN, &url)
    })
    .with_context(|| format!("fetching source into {dest}"))?;

    ui::step(format!("Track {ORIGIN}/{branch} in {dest}"), || {
        repo.checkout_tracking(ORIGIN, &branch)
    })
    .with_context(|| format!("checking out {ORIGIN}/{branch} in {dest}"))?;

    ui::step(format!("Pull {dest}"), || repo.pull())
        .with_context(|| format!("pulling into {dest}"))?;

    Ok(true)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
