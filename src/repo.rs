//! Thin wrapper around `git2` exposing exactly the operations the backup
//! commands need.
//!
//! A source is an ordinary (non-bare) repository.  A destination is a
//! repository whose `origin` remote points at the source's `.git` directory
//! through a `file://` URL, with one local branch tracking the source's
//! current branch.  Pulling only ever fast-forwards: destinations never
//! commit on their own, so anything else means someone touched them by hand.

use std::path::{Path, PathBuf};

use git2::{
    BranchType, ErrorCode, Repository, Signature, Status, StatusOptions,
    build::CheckoutBuilder,
};
use thiserror::Error;

use crate::config::Identity;

/// Name of the remote a destination tracks its source through.
pub const ORIGIN: &str = "origin";

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("HEAD of {0} is not on a branch")]
    DetachedHead(PathBuf),

    #[error("branch {branch} has no upstream in {repo}")]
    NoUpstream { repo: PathBuf, branch: String },

    #[error("{0} has diverged from its upstream; refusing to merge")]
    NotFastForward(PathBuf),

    #[error("Git2 error: {0}")]
    Git2(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// HEAD summary used by `info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadInfo {
    /// Branch name, `None` when HEAD is unborn or detached.
    pub branch: Option<String>,
    /// Full commit id, `None` when HEAD is unborn.
    pub commit: Option<git2::Oid>,
    /// First line of the commit message.
    pub summary: Option<String>,
}

/// Returns `true` if `path` itself is the root of a git repository.
///
/// Parent directories are not searched, so a plain directory inside some
/// other work tree is still "not a repository".
pub fn is_repo(path: &Path) -> bool {
    Repository::open(path).is_ok()
}

/// Untracked content found in a work tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Untracked {
    /// Work-tree relative paths of new files, ready to stage.
    pub files: Vec<PathBuf>,
    /// Untracked directories holding their own repository.  git stages
    /// these as gitlinks, not as content, so they are left out.
    pub nested_repos: Vec<PathBuf>,
}

/// A repository opened or created by the backup commands.
pub struct BackupRepo {
    repo: Repository,
    path: PathBuf,
}

impl std::fmt::Debug for BackupRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupRepo")
            .field("path", &self.path)
            .field("repo", &"<git2::Repository>")
            .finish()
    }
}

impl BackupRepo {
    pub fn open(path: &Path) -> Result<Self, RepoError> {
        Ok(Self {
            repo: Repository::open(path)?,
            path: path.to_path_buf(),
        })
    }

    /// Create an empty repository at `path`.  The directory must exist.
    pub fn init(path: &Path) -> Result<Self, RepoError> {
        Ok(Self {
            repo: Repository::init(path)?,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `file://` URL of this repository's `.git` directory, suitable as a
    /// remote for another local repository.
    pub fn file_url(&self) -> Result<String, RepoError> {
        let git_dir = std::fs::canonicalize(self.repo.path())?;
        Ok(format!("file://{}", git_dir.display()))
    }

    /// Every untracked, non-ignored file, including files inside untracked
    /// directories.  File names need not be valid UTF-8.
    pub fn untracked_files(&self) -> Result<Untracked, RepoError> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        let mut untracked = Untracked::default();
        for entry in statuses.iter() {
            if !entry.status().contains(Status::WT_NEW) {
                continue;
            }
            let bytes = entry.path_bytes();
            match bytes.strip_suffix(b"/") {
                Some(dir) => untracked.nested_repos.push(path_from_bytes(dir)),
                None => untracked.files.push(path_from_bytes(bytes)),
            }
        }
        Ok(untracked)
    }

    /// `true` if `ancestor` is `commit` or part of its history.  A commit
    /// this repository does not have is never an ancestor.
    pub fn contains(&self, commit: git2::Oid, ancestor: git2::Oid) -> Result<bool, RepoError> {
        if commit == ancestor {
            return Ok(true);
        }
        if self.repo.find_commit(ancestor).is_err() {
            return Ok(false);
        }
        Ok(self.repo.graph_descendant_of(commit, ancestor)?)
    }

    /// Stage `paths` (relative to the work tree) and commit the resulting
    /// index on top of HEAD.  Files already tracked but not listed keep
    /// whatever version the index holds.  The commit is made even when
    /// `paths` is empty.
    pub fn commit_paths(
        &self,
        paths: &[PathBuf],
        message: &str,
        identity: &Identity,
    ) -> Result<git2::Oid, RepoError> {
        let mut index = self.repo.index()?;
        for path in paths {
            index.add_path(path)?;
        }
        index.write()?;

        let tree = self.repo.find_tree(index.write_tree()?)?;
        let signature = self.signature(identity)?;
        let parent = self.head_commit()?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        Ok(self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?)
    }

    /// Name of the branch HEAD points at.  Works on an unborn HEAD too.
    pub fn current_branch(&self) -> Result<String, RepoError> {
        let head = self.repo.find_reference("HEAD")?;
        head.symbolic_target()
            .and_then(|target| target.strip_prefix("refs/heads/"))
            .map(str::to_string)
            .ok_or_else(|| RepoError::DetachedHead(self.path.clone()))
    }

    /// Add remote `name` pointing at `url` and fetch it.
    pub fn add_remote_and_fetch(&self, name: &str, url: &str) -> Result<(), RepoError> {
        let mut remote = self.repo.remote(name, url)?;
        let refspecs: [&str; 0] = [];
        remote.fetch(&refspecs, None, None)?;
        Ok(())
    }

    /// Create local `branch` at `<remote>/<branch>`, make it track that
    /// remote branch, and check it out.
    pub fn checkout_tracking(&self, remote: &str, branch: &str) -> Result<(), RepoError> {
        let upstream = format!("{remote}/{branch}");
        let commit = self
            .repo
            .find_branch(&upstream, BranchType::Remote)?
            .get()
            .peel_to_commit()?;

        let mut local = self.repo.branch(branch, &commit, false)?;
        local.set_upstream(Some(upstream.as_str()))?;

        self.repo.set_head(&format!("refs/heads/{branch}"))?;
        self.repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
        Ok(())
    }

    /// Fetch the current branch's upstream remote and fast-forward to it.
    ///
    /// Returns `true` if HEAD moved.
    pub fn pull(&self) -> Result<bool, RepoError> {
        let branch = self.current_branch()?;
        let local_ref = format!("refs/heads/{branch}");

        let remote_name = self
            .repo
            .branch_upstream_remote(&local_ref)
            .ok()
            .and_then(|buf| buf.as_str().map(str::to_string))
            .ok_or_else(|| RepoError::NoUpstream {
                repo: self.path.clone(),
                branch: branch.clone(),
            })?;

        let mut remote = self.repo.find_remote(&remote_name)?;
        let refspecs: [&str; 0] = [];
        remote.fetch(&refspecs, None, None)?;

        let upstream = self.repo.find_branch(&branch, BranchType::Local)?.upstream()?;
        let target = self.repo.reference_to_annotated_commit(upstream.get())?;

        let (analysis, _) = self.repo.merge_analysis(&[&target])?;
        if analysis.is_up_to_date() {
            return Ok(false);
        }
        if !analysis.is_fast_forward() {
            return Err(RepoError::NotFastForward(self.path.clone()));
        }

        self.repo
            .find_reference(&local_ref)?
            .set_target(target.id(), "pull: fast-forward")?;
        self.repo.set_head(&local_ref)?;
        self.repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
        Ok(true)
    }

    pub fn head_info(&self) -> Result<HeadInfo, RepoError> {
        let branch = self.current_branch().ok();
        let commit = self.head_commit()?;
        Ok(HeadInfo {
            branch,
            commit: commit.as_ref().map(git2::Commit::id),
            summary: commit
                .as_ref()
                .and_then(|c| c.summary().map(str::to_string)),
        })
    }

    fn head_commit(&self) -> Result<Option<git2::Commit<'_>>, RepoError> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                Ok(None)
            },
            Err(e) => Err(e.into()),
        }
    }

    /// git's configured identity, or the fallback from settings.
    fn signature(&self, fallback: &Identity) -> Result<Signature<'static>, RepoError> {
        match self.repo.signature() {
            Ok(sig) => Ok(sig),
            Err(_) => Ok(Signature::now(&fallback.name, &fallback.email)?),
        }
    }
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(bytes))
}

// libgit2 stores UTF-8 paths on Windows.
#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn source_with_readme(dir: &Path) -> BackupRepo {
        let repo = BackupRepo::init(dir).unwrap();
        fs::write(dir.join("README.md"), "# backup\n").unwrap();
        repo.commit_paths(&[PathBuf::from("README.md")], "init", &Identity::default())
            .unwrap();
        repo
    }

    fn destination_of(source: &BackupRepo, dir: &Path) -> BackupRepo {
        let dest = BackupRepo::init(dir).unwrap();
        dest.add_remote_and_fetch(ORIGIN, &source.file_url().unwrap())
            .unwrap();
        dest.checkout_tracking(ORIGIN, &source.current_branch().unwrap())
            .unwrap();
        dest
    }

    #[test]
    fn is_repo_detects_only_repository_roots() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_repo(dir.path()));

        BackupRepo::init(dir.path()).unwrap();
        assert!(is_repo(dir.path()));

        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        assert!(!is_repo(&nested));
    }

    #[test]
    fn file_url_points_at_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        let repo = BackupRepo::init(dir.path()).unwrap();
        let url = repo.file_url().unwrap();
        assert!(url.starts_with("file:///"), "{url}");
        assert!(url.trim_end_matches('/').ends_with(".git"), "{url}");
    }

    #[test]
    fn untracked_files_recurse_and_skip_tracked() {
        let dir = tempfile::tempdir().unwrap();
        let repo = source_with_readme(dir.path());
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("README.md"), "changed").unwrap();

        let mut files = repo.untracked_files().unwrap().files;
        files.sort();
        assert_eq!(files, vec![PathBuf::from("b.txt"), PathBuf::from("sub/a.txt")]);
    }

    #[test]
    fn untracked_files_honour_gitignore() {
        let dir = tempfile::tempdir().unwrap();
        let repo = source_with_readme(dir.path());
        fs::write(dir.path().join(".gitignore"), "*.log\n").unwrap();
        fs::write(dir.path().join("noise.log"), "x").unwrap();

        let files = repo.untracked_files().unwrap().files;
        assert_eq!(files, vec![PathBuf::from(".gitignore")]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_file_names_are_backed_up() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let source = source_with_readme(src.path());
        let dest = destination_of(&source, dst.path());

        let name = OsStr::from_bytes(b"caf\xe9.txt");
        fs::write(src.path().join(name), "latin-1").unwrap();
        fs::write(src.path().join("ok.txt"), "ok").unwrap();

        let untracked = source.untracked_files().unwrap();
        assert_eq!(untracked.files.len(), 2);
        assert!(untracked.files.contains(&PathBuf::from(name)));

        source
            .commit_paths(&untracked.files, "add", &Identity::default())
            .unwrap();
        dest.pull().unwrap();
        assert_eq!(fs::read_to_string(dst.path().join(name)).unwrap(), "latin-1");
    }

    #[test]
    fn nested_repository_is_set_aside() {
        let dir = tempfile::tempdir().unwrap();
        let repo = source_with_readme(dir.path());
        let vendor = dir.path().join("vendor");
        fs::create_dir(&vendor).unwrap();
        git2::Repository::init(&vendor).unwrap();
        fs::write(vendor.join("lib.txt"), "inner").unwrap();
        fs::write(dir.path().join("ok.txt"), "ok").unwrap();

        let untracked = repo.untracked_files().unwrap();
        assert_eq!(untracked.files, vec![PathBuf::from("ok.txt")]);
        assert_eq!(untracked.nested_repos, vec![PathBuf::from("vendor")]);

        repo.commit_paths(&untracked.files, "add", &Identity::default())
            .unwrap();
    }

    #[test]
    fn contains_follows_history() {
        let dir = tempfile::tempdir().unwrap();
        let repo = source_with_readme(dir.path());
        let first = repo.head_info().unwrap().commit.unwrap();
        let second = repo.commit_paths(&[], "next", &Identity::default()).unwrap();

        assert!(repo.contains(second, first).unwrap());
        assert!(repo.contains(second, second).unwrap());
        assert!(!repo.contains(first, second).unwrap());

        let other = tempfile::tempdir().unwrap();
        let foreign = BackupRepo::init(other.path()).unwrap();
        fs::write(other.path().join("foreign.txt"), "elsewhere").unwrap();
        let unrelated = foreign
            .commit_paths(&[PathBuf::from("foreign.txt")], "foreign", &Identity::default())
            .unwrap();
        assert!(!repo.contains(second, unrelated).unwrap());
    }

    #[test]
    fn first_commit_has_no_parent_and_second_has_one() {
        let dir = tempfile::tempdir().unwrap();
        let repo = source_with_readme(dir.path());
        let first = repo.head_info().unwrap().commit.unwrap();

        let second = repo.commit_paths(&[], "empty", &Identity::default()).unwrap();
        let commit = repo.repo.find_commit(second).unwrap();
        assert_eq!(commit.parent_count(), 1);
        assert_eq!(commit.parent_id(0).unwrap(), first);
    }

    #[test]
    fn current_branch_works_on_unborn_head() {
        let dir = tempfile::tempdir().unwrap();
        let repo = BackupRepo::init(dir.path()).unwrap();
        assert!(!repo.current_branch().unwrap().is_empty());
        assert_eq!(repo.head_info().unwrap().commit, None);
    }

    #[test]
    fn destination_checks_out_source_content() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let source = source_with_readme(src.path());

        let dest = destination_of(&source, dst.path());

        assert_eq!(
            fs::read_to_string(dst.path().join("README.md")).unwrap(),
            "# backup\n"
        );
        assert_eq!(dest.current_branch().unwrap(), source.current_branch().unwrap());
        assert!(!dest.pull().unwrap(), "fresh destination is up to date");
    }

    #[test]
    fn pull_fast_forwards_new_commits() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let source = source_with_readme(src.path());
        let dest = destination_of(&source, dst.path());

        fs::write(src.path().join("new.txt"), "fresh").unwrap();
        let files = source.untracked_files().unwrap().files;
        source.commit_paths(&files, "add", &Identity::default()).unwrap();

        assert!(dest.pull().unwrap());
        assert_eq!(fs::read_to_string(dst.path().join("new.txt")).unwrap(), "fresh");
        assert_eq!(
            dest.head_info().unwrap().commit,
            source.head_info().unwrap().commit
        );
    }

    #[test]
    fn pull_refuses_diverged_destination() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let source = source_with_readme(src.path());
        let dest = destination_of(&source, dst.path());

        fs::write(dst.path().join("local.txt"), "local").unwrap();
        dest.commit_paths(&[PathBuf::from("local.txt")], "local", &Identity::default())
            .unwrap();
        source.commit_paths(&[], "remote", &Identity::default()).unwrap();

        let err = dest.pull().unwrap_err();
        assert!(matches!(err, RepoError::NotFastForward(_)), "{err}");
    }

    #[test]
    fn pull_without_upstream_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = source_with_readme(dir.path());
        assert!(matches!(repo.pull().unwrap_err(), RepoError::NoUpstream { .. }));
    }
}
