//! Local Git repository operations via `git2`.

use std::path::Path;

use git2::{Oid, Repository, Sort};
use tracing::{debug, info, instrument};

use crate::errors::GitError;
use crate::models::CommitMeta;

/// High-level Git client wrapping a `git2::Repository`.
///
/// forksync only reads history: the client clones/opens a local repository,
/// manages the two remotes, and walks commit ranges. It never mutates the
/// repository beyond fetching.
pub struct GitClient {
    repo: Repository,
}

impl GitClient {
    /// Open an existing Git repository at `repo_path`.
    pub fn open<P: AsRef<Path>>(repo_path: P) -> Result<Self, GitError> {
        let path = repo_path.as_ref();
        info!(path = %path.display(), "opening git repository");
        let repo = Repository::open(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
        Ok(Self { repo })
    }

    /// Open the repository at `local_dir`, cloning it from `url` first if the
    /// directory does not exist. Either way the named remote ends up present
    /// and pointing at `url`.
    #[instrument(skip(url), fields(path = %local_dir.display()))]
    pub fn open_or_clone(local_dir: &Path, url: &str, remote_name: &str) -> Result<Self, GitError> {
        if local_dir.exists() {
            // If this fails, the directory is used by something else.
            let client = Self::open(local_dir)?;
            client.add_remote(remote_name, url)?;
            return Ok(client);
        }

        info!(url, remote = remote_name, "cloning repository");
        let name = remote_name.to_string();
        let mut builder = git2::build::RepoBuilder::new();
        builder.remote_create(move |repo, _default, url| repo.remote(&name, url));
        let repo = builder.clone(url, local_dir)?;
        info!("clone completed");
        Ok(Self { repo })
    }

    /// Ensure a remote named `name` exists and points at `url`, fetching it
    /// on first creation. An existing remote with a different URL is an
    /// error.
    pub fn add_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        match self.repo.find_remote(name) {
            Ok(remote) => {
                let existing = remote.url().unwrap_or("");
                if existing != url {
                    return Err(GitError::RemoteUrlMismatch {
                        remote: name.to_string(),
                        existing: existing.to_string(),
                        requested: url.to_string(),
                    });
                }
                Ok(())
            }
            Err(_) => {
                info!(remote = name, url, "adding remote");
                self.repo.remote(name, url)?;
                self.fetch(name)
            }
        }
    }

    /// Fetch a named remote's default refspecs.
    #[instrument(skip(self))]
    pub fn fetch(&self, remote_name: &str) -> Result<(), GitError> {
        info!(remote = remote_name, "fetching");
        let mut remote = self.repo.find_remote(remote_name)?;
        remote.fetch(&[] as &[&str], None, None)?;
        debug!("fetch completed");
        Ok(())
    }

    /// The most recent commit common to both revspecs.
    pub fn merge_base(&self, a: &str, b: &str) -> Result<String, GitError> {
        let a_oid = self.resolve(a)?;
        let b_oid = self.resolve(b)?;
        let base = self
            .repo
            .merge_base(a_oid, b_oid)
            .map_err(|_| GitError::NoMergeBase {
                a: a.to_string(),
                b: b.to_string(),
            })?;
        debug!(a, b, base = %base, "resolved merge base");
        Ok(base.to_string())
    }

    /// Resolve a single revspec to its commit metadata.
    pub fn commit_meta(&self, revspec: &str) -> Result<CommitMeta, GitError> {
        let oid = self.resolve(revspec)?;
        let commit = self.repo.find_commit(oid)?;
        Ok(to_meta(&commit))
    }

    /// Walk the commits reachable from `tip` but not from `base`
    /// (newest-first), mapping each to its metadata.
    #[instrument(skip(self))]
    pub fn commits_between(&self, base: &str, tip: &str) -> Result<Vec<CommitMeta>, GitError> {
        let base_oid = self.resolve(base)?;
        let tip_oid = self.resolve(tip)?;

        let mut revwalk = self.repo.revwalk()?;
        revwalk.push(tip_oid)?;
        revwalk.hide(base_oid)?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

        let mut commits = Vec::new();
        for oid_result in revwalk {
            let oid = oid_result?;
            let commit = self.repo.find_commit(oid)?;
            commits.push(to_meta(&commit));
        }

        debug!(count = commits.len(), "collected commits");
        Ok(commits)
    }

    fn resolve(&self, revspec: &str) -> Result<Oid, GitError> {
        let object = self
            .repo
            .revparse_single(revspec)
            .map_err(|_| GitError::RefNotFound(revspec.to_string()))?;
        let commit = object
            .peel_to_commit()
            .map_err(|_| GitError::RefNotFound(revspec.to_string()))?;
        Ok(commit.id())
    }
}

fn to_meta(commit: &git2::Commit) -> CommitMeta {
    CommitMeta {
        sha: commit.id().to_string(),
        message: commit.message().unwrap_or("").to_string(),
        author_name: commit.author().name().unwrap_or("").to_string(),
        authored_at: commit.author().when().seconds(),
        committed_at: commit.time().seconds(),
    }
}
