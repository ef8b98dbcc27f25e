//! Repository handle.
//!
//! Every gateway operation starts here. A handle wraps a freshly opened
//! `git2::Repository` for the duration of one call and is dropped when the
//! call returns; nothing is cached between calls.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use git2::{ErrorCode, Repository, RepositoryState, Signature};
use tracing::debug;

use crate::gateway::error::{GatewayError, GatewayResult};
use crate::gateway::types::{to_git_time, CommitId, ConflictEntry, HeadState, RepositoryInfo};

/// An opened repository, valid for one gateway call.
pub struct RepositoryHandle {
    repo: Repository,
    path: PathBuf,
}

impl RepositoryHandle {
    /// Open an existing repository.
    ///
    /// The path must itself be a working directory or git directory; parent
    /// directories are not searched. Any failure is reported as
    /// `RepositoryNotFound`.
    pub fn open(path: impl AsRef<Path>) -> GatewayResult<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|e| {
            debug!(path = %path.display(), error = %e, "failed to open repository");
            GatewayError::RepositoryNotFound(path.to_path_buf())
        })?;

        debug!(path = %path.display(), "opened repository");
        Ok(Self {
            repo,
            path: path.to_path_buf(),
        })
    }

    /// The path this handle was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The underlying git2 repository.
    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Key used to serialize writers: the canonical git directory.
    pub fn lock_key(&self) -> PathBuf {
        let git_dir = self.repo.path();
        std::fs::canonicalize(git_dir).unwrap_or_else(|_| git_dir.to_path_buf())
    }

    /// Working directory and HEAD state.
    pub fn info(&self) -> GatewayResult<RepositoryInfo> {
        Ok(RepositoryInfo {
            workdir: self.repo.workdir().map(Path::to_path_buf),
            git_dir: self.repo.path().to_path_buf(),
            bare: self.repo.is_bare(),
            head: self.head_state()?,
        })
    }

    /// Where HEAD points, without failing on unborn or detached HEAD.
    pub fn head_state(&self) -> GatewayResult<HeadState> {
        match self.repo.head() {
            Ok(head) => {
                if head.is_branch() {
                    let name = head.shorthand().unwrap_or("HEAD").to_string();
                    Ok(HeadState::Branch(name))
                } else {
                    let commit = head.peel_to_commit()?;
                    Ok(HeadState::Detached(CommitId::new(commit.id())))
                }
            }
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                let head = self.repo.find_reference("HEAD")?;
                let target = head.symbolic_target().unwrap_or("HEAD");
                let name = target.strip_prefix("refs/heads/").unwrap_or(target);
                Ok(HeadState::Unborn(name.to_string()))
            }
            Err(e) => Err(GatewayError::Git(e)),
        }
    }

    /// The commit HEAD points to, or `None` on an unborn branch.
    pub fn head_commit(&self) -> GatewayResult<Option<git2::Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(e) if e.code() == ErrorCode::UnbornBranch => Ok(None),
            Err(e) => Err(GatewayError::Git(e)),
        }
    }

    /// The tree at HEAD, or `None` on an unborn branch.
    pub fn head_tree(&self) -> GatewayResult<Option<git2::Tree<'_>>> {
        match self.head_commit()? {
            Some(commit) => Ok(Some(commit.tree()?)),
            None => Ok(None),
        }
    }

    /// Build a signature from `user.name` and `user.email`.
    ///
    /// Uses `when` when given, the current time otherwise.
    pub fn signature(&self, when: Option<&DateTime<FixedOffset>>) -> GatewayResult<Signature<'static>> {
        let config = self.repo.config()?.snapshot()?;
        let name = config_value(&config, "user.name")?;
        let email = config_value(&config, "user.email")?;

        let signature = match when {
            Some(when) => Signature::new(&name, &email, &to_git_time(when))?,
            None => Signature::now(&name, &email)?,
        };
        Ok(signature)
    }

    /// Conflicts recorded in the index, one entry per path.
    pub fn conflict_entries(&self) -> GatewayResult<Vec<ConflictEntry>> {
        let index = self.repo.index()?;
        if !index.has_conflicts() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for conflict in index.conflicts()? {
            let conflict = conflict?;
            let side = conflict
                .our
                .as_ref()
                .or(conflict.their.as_ref())
                .or(conflict.ancestor.as_ref());
            if let Some(side) = side {
                entries.push(ConflictEntry {
                    path: PathBuf::from(String::from_utf8_lossy(&side.path).into_owned()),
                    ours: conflict.our.as_ref().map(|e| e.id.to_string()),
                });
            }
        }
        Ok(entries)
    }

    /// Paths currently conflicted in the index.
    pub fn conflicted_paths(&self) -> GatewayResult<Vec<PathBuf>> {
        Ok(self
            .conflict_entries()?
            .into_iter()
            .map(|entry| entry.path)
            .collect())
    }

    /// Check whether a cherry-pick is in progress.
    pub fn cherry_pick_in_progress(&self) -> bool {
        matches!(
            self.repo.state(),
            RepositoryState::CherryPick | RepositoryState::CherryPickSequence
        )
    }
}

fn config_value(config: &git2::Config, key: &str) -> GatewayResult<String> {
    config.get_string(key).map_err(|e| {
        if e.code() == ErrorCode::NotFound {
            GatewayError::Unexpected(format!("{} is not configured", key))
        } else {
            GatewayError::Git(e)
        }
    })
}
