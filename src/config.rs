//! Settings types and loading logic.
//!
//! Settings are optional.  Running `git-backup` without any settings file
//! falls back to defaults: the mapping lives next to the executable, the
//! built-in README is used for new sources, and commits are signed with a
//! placeholder identity when git has none configured.
//!
//! # File format
//!
//! ```toml
//! store           = "/var/lib/backup/backup_config.json"
//! readme_template = "README.md"
//!
//! [identity]
//! name  = "backup"
//! email = "backup@localhost"
//!
//! [commit]
//! initial_message = "Initial Backup Commit"
//! message_prefix  = "Backup"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// File name of the mapping when no location is configured.
pub const STORE_FILE_NAME: &str = "backup_config.json";

// ─── Resolved settings ────────────────────────────────────────────────────────

/// Fully-resolved settings, every field populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Location of the JSON source → destinations mapping.
    pub store: PathBuf,

    /// README copied into a freshly initialised source.  `None` (or a path
    /// that does not exist) means the built-in README is written instead.
    pub readme_template: Option<PathBuf>,

    /// Identity used when git has no `user.name` / `user.email`.
    pub identity: Identity,

    /// Commit messages.
    pub commit: CommitSettings,
}

impl Default for Settings {
    fn default() -> Self {
        PartialSettings::default().resolve()
    }
}

/// Author and committer used for backup commits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            name: "backup".into(),
            email: "backup@localhost".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSettings {
    /// Message of the commit that adds the README to a new source.
    pub initial_message: String,

    /// Prefix of every `commit` message; the local timestamp follows it.
    pub message_prefix: String,
}

impl Default for CommitSettings {
    fn default() -> Self {
        Self {
            initial_message: "Initial Backup Commit".into(),
            message_prefix: "Backup".into(),
        }
    }
}

// ─── Partial settings (one file) ──────────────────────────────────────────────

/// Settings as read from one file; every field optional so two files can be
/// layered on top of each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PartialSettings {
    #[serde(default)]
    pub store: Option<PathBuf>,

    #[serde(default)]
    pub readme_template: Option<PathBuf>,

    #[serde(default)]
    pub identity: Option<Identity>,

    #[serde(default)]
    pub commit: PartialCommit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PartialCommit {
    #[serde(default)]
    pub initial_message: Option<String>,

    #[serde(default)]
    pub message_prefix: Option<String>,
}

impl PartialSettings {
    /// Layer `other` on top of `self`; fields set in `other` win.
    pub fn merge(self, other: Self) -> Self {
        Self {
            store: other.store.or(self.store),
            readme_template: other.readme_template.or(self.readme_template),
            identity: other.identity.or(self.identity),
            commit: PartialCommit {
                initial_message: other.commit.initial_message.or(self.commit.initial_message),
                message_prefix: other.commit.message_prefix.or(self.commit.message_prefix),
            },
        }
    }

    /// Fill every unset field with its default.
    pub fn resolve(self) -> Settings {
        let commit = CommitSettings::default();
        Settings {
            store: self.store.unwrap_or_else(default_store),
            readme_template: self.readme_template,
            identity: self.identity.unwrap_or_default(),
            commit: CommitSettings {
                initial_message: self.commit.initial_message.unwrap_or(commit.initial_message),
                message_prefix: self.commit.message_prefix.unwrap_or(commit.message_prefix),
            },
        }
    }
}

/// `backup_config.json` in the executable's directory, or in the working
/// directory when that cannot be determined.
pub fn default_store() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(STORE_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(STORE_FILE_NAME))
}

// ─── Loader ───────────────────────────────────────────────────────────────────

/// Read one settings file.
///
/// Returns `Ok(None)` when the file does not exist, and an error when it
/// exists but cannot be read or is not valid TOML.
pub fn parse_partial(path: &Path) -> Result<Option<PartialSettings>> {
    if !path.exists() {
        return Ok(None);
    }

    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    toml::from_str(&text)
        .map(Some)
        .with_context(|| format!("parsing {}", path.display()))
}

/// Load settings from two sources and merge them.
///
/// 1. `<config_dir>/git-backup/config.toml` — global defaults
/// 2. `local_path` (default: `./backup.toml`) — per-invocation overrides
///
/// Local values win on a per-field basis.  Either file may be absent; an
/// unreadable global file is ignored, an unreadable local file is an error.
pub fn load_merged(local_path: &Path) -> Result<Settings> {
    let global: PartialSettings = global_path()
        .as_deref()
        .and_then(|p| parse_partial(p).ok().flatten())
        .unwrap_or_default();

    let local = parse_partial(local_path)?.unwrap_or_default();

    Ok(global.merge(local).resolve())
}

fn global_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|d| d.join("git-backup").join("config.toml"))
}

// ─── Tests ────────────────────────────────────────────────────────────────────
