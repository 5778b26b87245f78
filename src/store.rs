//! The source → destinations mapping, persisted as a flat JSON object.
//!
//! ```json
//! {
//!   "./source": ["./destination1", "./destination2"]
//! }
//! ```
//!
//! Keys are source paths exactly as given on the command line; they are not
//! normalised, so `./source` and `/home/alice/source` are different sources.
//! The whole file is read and rewritten on every change.  There is no
//! locking: two concurrent invocations race and the last write wins.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot access mapping file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("mapping file {path} is not a JSON object of path lists: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ─── Mapping ──────────────────────────────────────────────────────────────────

/// Registered sources and the destinations that back each of them up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mapping(BTreeMap<String, Vec<String>>);

impl Mapping {
    /// Replace the destinations of `source`.
    pub fn overwrite(&mut self, source: &str, destinations: &[String]) {
        self.0.insert(source.to_string(), destinations.to_vec());
    }

    /// Append `destinations` after the ones already registered for `source`.
    /// Duplicates are kept.
    pub fn extend(&mut self, source: &str, destinations: &[String]) {
        self.0
            .entry(source.to_string())
            .or_default()
            .extend_from_slice(destinations);
    }

    pub fn destinations(&self, source: &str) -> Option<&[String]> {
        self.0.get(source).map(Vec::as_slice)
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ─── Store ────────────────────────────────────────────────────────────────────

/// Handle on the mapping file.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Open the mapping at `path`, creating it (and its parent directory)
    /// with an empty object if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self { path: path.into() };

        if !store.path.exists() {
            if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| store.io(e))?;
            }
            fs::write(&store.path, "{}").map_err(|e| store.io(e))?;
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Mapping, StoreError> {
        let text = fs::read_to_string(&self.path).map_err(|e| self.io(e))?;
        serde_json::from_str(&text).map_err(|source| StoreError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, mapping: &Mapping) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(mapping).map_err(|source| {
            StoreError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, text).map_err(|e| self.io(e))
    }

    fn io(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
