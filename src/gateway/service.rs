//! Gateway facade over the inspection and mutation operations.

use std::path::Path;

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::config::GatewayConfig;
use crate::gateway::error::GatewayResult;
use crate::gateway::handle::RepositoryHandle;
use crate::gateway::lock::RepoLocks;
use crate::gateway::types::{
    AbortOutcome, CherryPickOutcome, CommitId, CommitSummary, DiffSummary, HeadState,
    PushOutcome, RepositoryInfo, WorkingTreeChange,
};
use crate::gateway::{inspect, mutate};

/// Entry point for repository operations.
///
/// Every call opens the repository afresh; nothing is cached between calls.
/// Mutations hold the per-repository lock while `serialize_mutations` is on.
#[derive(Clone, Default)]
pub struct Gateway {
    config: GatewayConfig,
    locks: RepoLocks,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            locks: RepoLocks::new(),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn repository_info(&self, repo: impl AsRef<Path>) -> GatewayResult<RepositoryInfo> {
        RepositoryHandle::open(repo)?.info()
    }

    pub fn list_branches(&self, repo: impl AsRef<Path>) -> GatewayResult<Vec<String>> {
        inspect::list_branches(&RepositoryHandle::open(repo)?)
    }

    pub fn current_branch(&self, repo: impl AsRef<Path>) -> GatewayResult<HeadState> {
        inspect::current_branch(&RepositoryHandle::open(repo)?)
    }

    pub fn diff(&self, repo: impl AsRef<Path>, target: &str) -> GatewayResult<DiffSummary> {
        inspect::diff(&RepositoryHandle::open(repo)?, target)
    }

    pub fn current_file_changes(
        &self,
        repo: impl AsRef<Path>,
    ) -> GatewayResult<Vec<WorkingTreeChange>> {
        inspect::current_file_changes(
            &RepositoryHandle::open(repo)?,
            self.config.include_untracked,
        )
    }

    pub fn file_change_content(
        &self,
        repo: impl AsRef<Path>,
        path: impl AsRef<Path>,
    ) -> GatewayResult<String> {
        inspect::file_change_content(&RepositoryHandle::open(repo)?, path.as_ref())
    }

    pub fn commits(
        &self,
        repo: impl AsRef<Path>,
        branch: &str,
    ) -> GatewayResult<Vec<CommitSummary>> {
        inspect::commits(
            &RepositoryHandle::open(repo)?,
            branch,
            self.config.commit_limit,
        )
    }

    pub fn commit(&self, repo: impl AsRef<Path>, message: &str) -> GatewayResult<CommitId> {
        let handle = RepositoryHandle::open(repo)?;
        self.mutating(&handle, || mutate::commit_all(&handle, message))
    }

    pub fn cherry_pick(
        &self,
        repo: impl AsRef<Path>,
        commit_sha: &str,
        when: Option<&DateTime<FixedOffset>>,
    ) -> GatewayResult<CherryPickOutcome> {
        let handle = RepositoryHandle::open(repo)?;
        self.mutating(&handle, || mutate::cherry_pick(&handle, commit_sha, when))
    }

    pub fn abort_cherry_pick(&self, repo: impl AsRef<Path>) -> GatewayResult<AbortOutcome> {
        let handle = RepositoryHandle::open(repo)?;
        self.mutating(&handle, || mutate::abort_cherry_pick(&handle))
    }

    pub fn push(&self, repo: impl AsRef<Path>) -> GatewayResult<PushOutcome> {
        let handle = RepositoryHandle::open(repo)?;
        self.mutating(&handle, || mutate::push(&handle))
    }

    fn mutating<T, F>(&self, handle: &RepositoryHandle, f: F) -> GatewayResult<T>
    where
        F: FnOnce() -> GatewayResult<T>,
    {
        if !self.config.serialize_mutations {
            return f();
        }
        let key = handle.lock_key();
        debug!(repo = %key.display(), "acquiring repository lock");
        self.locks.with_lock(&key, f)
    }
}
