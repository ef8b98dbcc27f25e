//! Operations that change repository state.
//!
//! None of these retry, and none roll back on failure: whatever libgit2 left
//! behind stays for the caller to inspect. Callers that may run concurrently
//! against the same repository must hold the lock from [`RepoLocks`] for the
//! duration of the call; [`Gateway`] does that.
//!
//! [`RepoLocks`]: crate::gateway::RepoLocks
//! [`Gateway`]: crate::gateway::Gateway

use std::cell::RefCell;

use chrono::{DateTime, FixedOffset};
use git2::build::CheckoutBuilder;
use git2::{CherrypickOptions, IndexAddOption, PushOptions, RemoteCallbacks, ResetType};
use tracing::{info, warn};

use crate::gateway::error::{GatewayError, GatewayResult};
use crate::gateway::handle::RepositoryHandle;
use crate::gateway::types::{
    AbortOutcome, BranchName, CherryPickOutcome, CommitId, HeadState, PushOutcome,
};

/// name of the only remote the gateway pushes to
pub const DEFAULT_REMOTE: &str = "origin";

/// Stage every change in the working tree and commit it on HEAD.
///
/// Staging is unscoped: tracked and untracked files are added, deletions are
/// recorded, ignored files are left alone. Staging a resolved file clears its
/// conflict entries, so committing after resolving a stopped cherry-pick
/// finishes it and clears the in-progress state. Author and committer both
/// come from `user.name` and `user.email`.
pub fn commit_all(handle: &RepositoryHandle, message: &str) -> GatewayResult<CommitId> {
    let repo = handle.repo();

    let mut index = repo.index()?;
    index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
    index.update_all(["*"], None)?;
    index.write()?;

    let conflicts = handle.conflicted_paths()?;
    if !conflicts.is_empty() {
        return Err(GatewayError::Conflicts { paths: conflicts });
    }

    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;

    let parent = handle.head_commit()?;
    if let Some(parent) = &parent {
        if parent.tree_id() == tree_id {
            return Err(GatewayError::NothingToCommit);
        }
    }

    let signature = handle.signature(None)?;
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
    let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;

    if handle.cherry_pick_in_progress() {
        repo.cleanup_state()?;
        info!(path = %handle.path().display(), "finished stopped cherry-pick");
    }

    let id = CommitId::new(oid);
    info!(path = %handle.path().display(), commit = %id.short(), "committed working tree");
    Ok(id)
}

/// Apply the change introduced by `commit_sha` onto HEAD.
///
/// The picked commit's author and message are kept; the committer is built
/// from configuration, stamped with `when` if given. Conflicts are left in
/// the index for the caller to resolve or abort.
pub fn cherry_pick(
    handle: &RepositoryHandle,
    commit_sha: &str,
    when: Option<&DateTime<FixedOffset>>,
) -> GatewayResult<CherryPickOutcome> {
    let repo = handle.repo();

    let commit = repo
        .revparse_single(commit_sha)
        .and_then(|object| object.peel_to_commit())
        .map_err(|_| GatewayError::CommitNotFound(commit_sha.to_string()))?;

    let committer = handle.signature(when)?;

    let conflicts = handle.conflicted_paths()?;
    if !conflicts.is_empty() {
        return Err(GatewayError::Conflicts { paths: conflicts });
    }

    let head = handle
        .head_commit()?
        .ok_or_else(|| GatewayError::Unexpected("cannot cherry-pick onto an unborn branch".into()))?;

    let mut opts = CherrypickOptions::new();
    repo.cherrypick(&commit, Some(&mut opts))?;

    let mut index = repo.index()?;
    if index.has_conflicts() {
        let entries = handle.conflict_entries()?;
        warn!(
            commit = %commit.id(),
            conflicts = entries.len(),
            "cherry-pick stopped with conflicts"
        );
        return Ok(CherryPickOutcome::Conflicts { entries });
    }

    let tree_id = index.write_tree()?;
    if tree_id == head.tree_id() {
        repo.cleanup_state()?;
        info!(commit = %commit.id(), "cherry-pick produced no changes");
        return Ok(CherryPickOutcome::Other {
            status: "empty: changes already present on HEAD".to_string(),
        });
    }

    let tree = repo.find_tree(tree_id)?;
    let author = commit.author();
    let message = commit.message().unwrap_or("");
    let oid = repo.commit(Some("HEAD"), &author, &committer, message, &tree, &[&head])?;
    repo.cleanup_state()?;

    let id = CommitId::new(oid);
    info!(picked = %commit.id(), commit = %id.short(), "cherry-pick committed");
    Ok(CherryPickOutcome::CherryPicked { commit: id })
}

/// Drop an in-progress cherry-pick and restore index and working tree to HEAD.
///
/// Local modifications are discarded. Does nothing when no cherry-pick is in
/// progress.
pub fn abort_cherry_pick(handle: &RepositoryHandle) -> GatewayResult<AbortOutcome> {
    if !handle.cherry_pick_in_progress() {
        return Ok(AbortOutcome::NotInProgress);
    }

    let repo = handle.repo();
    let head = handle
        .head_commit()?
        .ok_or_else(|| GatewayError::Unexpected("HEAD has no commit to reset to".into()))?;

    let mut checkout = CheckoutBuilder::new();
    checkout.force();
    repo.reset(head.as_object(), ResetType::Hard, Some(&mut checkout))?;
    repo.cleanup_state()?;

    let id = CommitId::new(head.id());
    info!(head = %id.short(), "cherry-pick aborted");
    Ok(AbortOutcome::Aborted { head: id })
}

/// Push the current branch to the same-named branch on `origin`.
pub fn push(handle: &RepositoryHandle) -> GatewayResult<PushOutcome> {
    let repo = handle.repo();

    let mut remote = repo
        .find_remote(DEFAULT_REMOTE)
        .map_err(|_| GatewayError::RemoteNotFound(DEFAULT_REMOTE.to_string()))?;

    let branch = match handle.head_state()? {
        HeadState::Branch(name) => name,
        HeadState::Unborn(name) => {
            return Err(GatewayError::Unexpected(format!(
                "branch '{}' has no commits to push",
                name
            )))
        }
        HeadState::Detached(id) => {
            return Err(GatewayError::Unexpected(format!(
                "HEAD is detached at {}, nothing to push",
                id.short()
            )))
        }
    };

    let refname = BranchName::new(branch.as_str())
        .map_err(|e| GatewayError::Unexpected(format!("cannot push '{}': {}", branch, e)))?
        .as_ref_path();
    let refspec = format!("{}:{}", refname, refname);

    let rejection: RefCell<Option<(String, String)>> = RefCell::new(None);
    let push_result = {
        let mut callbacks = RemoteCallbacks::new();
        callbacks.push_update_reference(|reference, status| {
            if let Some(reason) = status {
                rejection.replace(Some((reference.to_string(), reason.to_string())));
            }
            Ok(())
        });

        let mut opts = PushOptions::new();
        opts.remote_callbacks(callbacks);
        remote.push(&[refspec.as_str()], Some(&mut opts))
    };

    if let Err(e) = push_result {
        warn!(remote = DEFAULT_REMOTE, branch = %branch, error = %e, "push failed");
        return Err(GatewayError::Transport {
            remote: DEFAULT_REMOTE.to_string(),
            message: e.message().to_string(),
        });
    }

    if let Some((reference, reason)) = rejection.into_inner() {
        warn!(remote = DEFAULT_REMOTE, reference = %reference, reason = %reason, "push rejected");
        return Err(GatewayError::PushRejected {
            remote: DEFAULT_REMOTE.to_string(),
            reference,
            reason,
        });
    }

    info!(remote = DEFAULT_REMOTE, branch = %branch, "pushed branch");
    Ok(PushOutcome {
        remote: DEFAULT_REMOTE.to_string(),
        branch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::inspect;
    use crate::gateway::test_support::{
        checkout_branch, checkout_new_branch, commit_file, init_bare_remote, init_repo,
        read_file, write_file,
    };
    use std::path::{Path, PathBuf};

    fn open(dir: &tempfile::TempDir) -> RepositoryHandle {
        RepositoryHandle::open(dir.path()).unwrap()
    }

    #[test]
    fn test_commit_then_history() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "a.txt", "one\n", "first");
        write_file(&repo, "a.txt", "two\n");
        write_file(&repo, "b.txt", "new\n");

        let handle = open(&dir);
        let id = commit_all(&handle, "msg").unwrap();

        let history = inspect::commits(&handle, "main", None).unwrap();
        assert_eq!(history[0].id, id);
        assert_eq!(history[0].summary, "msg");

        let commit = repo.find_commit(id.raw()).unwrap();
        let tree = commit.tree().unwrap();
        assert!(tree.get_path(Path::new("b.txt")).is_ok());
        assert!(inspect::current_file_changes(&handle, true).unwrap().is_empty());
    }

    #[test]
    fn test_commit_records_removals() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "a.txt", "one\n", "first");
        commit_file(&repo, "b.txt", "two\n", "second");
        std::fs::remove_file(dir.path().join("b.txt")).unwrap();

        let id = commit_all(&open(&dir), "remove b").unwrap();
        let tree = repo.find_commit(id.raw()).unwrap().tree().unwrap();
        assert!(tree.get_path(Path::new("b.txt")).is_err());
        assert!(tree.get_path(Path::new("a.txt")).is_ok());
    }

    #[test]
    fn test_first_commit_in_empty_repository() {
        let (dir, repo) = init_repo();
        write_file(&repo, "readme.md", "hello\n");

        let id = commit_all(&open(&dir), "initial").unwrap();
        let commit = repo.find_commit(id.raw()).unwrap();
        assert_eq!(commit.parent_count(), 0);
        assert_eq!(repo.head().unwrap().shorthand(), Some("main"));
    }

    #[test]
    fn test_commit_without_changes() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "a.txt", "one\n", "first");

        let result = commit_all(&open(&dir), "nothing");
        assert!(matches!(result, Err(GatewayError::NothingToCommit)));
    }

    fn diverged_repo() -> (tempfile::TempDir, git2::Repository, git2::Oid) {
        let (dir, repo) = init_repo();
        let base = commit_file(&repo, "shared.txt", "line\n", "base");
        checkout_new_branch(&repo, "feature", base);
        let picked = commit_file(&repo, "shared.txt", "feature edit\n", "edit on feature");
        checkout_branch(&repo, "main");
        (dir, repo, picked)
    }

    #[test]
    fn test_cherry_pick_disjoint_change() {
        let (dir, repo) = init_repo();
        let base = commit_file(&repo, "a.txt", "one\n", "base");
        checkout_new_branch(&repo, "feature", base);
        let picked = commit_file(&repo, "b.txt", "from feature\n", "add b");
        checkout_branch(&repo, "main");
        commit_file(&repo, "c.txt", "main only\n", "add c");

        let handle = open(&dir);
        let when = DateTime::parse_from_rfc3339("2022-01-02T03:04:05+00:00").unwrap();
        let outcome = cherry_pick(&handle, &picked.to_string(), Some(&when)).unwrap();

        let new_id = match outcome {
            CherryPickOutcome::CherryPicked { commit } => commit,
            other => panic!("unexpected outcome: {:?}", other),
        };
        let commit = repo.find_commit(new_id.raw()).unwrap();
        assert_eq!(commit.summary(), Some("add b"));
        assert_eq!(commit.committer().when().seconds(), when.timestamp());
        assert_eq!(read_file(&repo, "b.txt"), "from feature\n");
        assert_eq!(repo.state(), git2::RepositoryState::Clean);
        assert_eq!(repo.head().unwrap().target(), Some(new_id.raw()));
    }

    /// Index state as stored on disk, bypassing any cached index.
    fn index_has_conflicts(dir: &tempfile::TempDir) -> bool {
        git2::Repository::open(dir.path())
            .unwrap()
            .index()
            .unwrap()
            .has_conflicts()
    }

    #[test]
    fn test_cherry_pick_conflict() {
        let (dir, repo, picked) = diverged_repo();
        let head_before = commit_file(&repo, "shared.txt", "main edit\n", "edit on main");

        let handle = open(&dir);
        let outcome = cherry_pick(&handle, &picked.to_string(), None).unwrap();

        match outcome {
            CherryPickOutcome::Conflicts { entries } => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].path, PathBuf::from("shared.txt"));
                assert!(entries[0].ours.is_some());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(repo.head().unwrap().target(), Some(head_before));
        assert!(index_has_conflicts(&dir));
        assert_eq!(
            open(&dir).conflicted_paths().unwrap(),
            vec![PathBuf::from("shared.txt")]
        );

        // a second pick is refused while conflicts remain
        let again = cherry_pick(&open(&dir), &picked.to_string(), None);
        assert!(matches!(again, Err(GatewayError::Conflicts { .. })));
        assert_eq!(repo.head().unwrap().target(), Some(head_before));
    }

    #[test]
    fn test_commit_finishes_resolved_cherry_pick() {
        let (dir, repo, picked) = diverged_repo();
        let head_before = commit_file(&repo, "shared.txt", "main edit\n", "edit on main");

        let outcome = cherry_pick(&open(&dir), &picked.to_string(), None).unwrap();
        assert!(matches!(outcome, CherryPickOutcome::Conflicts { .. }));

        write_file(&repo, "shared.txt", "resolved\n");
        let id = commit_all(&open(&dir), "resolve shared.txt").unwrap();

        assert_eq!(repo.state(), git2::RepositoryState::Clean);
        assert!(!index_has_conflicts(&dir));
        let commit = repo.find_commit(id.raw()).unwrap();
        assert_eq!(commit.parent_id(0).unwrap(), head_before);
        let blob = commit
            .tree()
            .unwrap()
            .get_path(Path::new("shared.txt"))
            .unwrap()
            .to_object(&repo)
            .unwrap()
            .peel_to_blob()
            .unwrap();
        assert_eq!(blob.content(), b"resolved\n");

        // later edits survive because nothing is left to abort
        write_file(&repo, "shared.txt", "new edit after commit\n");
        assert_eq!(
            abort_cherry_pick(&open(&dir)).unwrap(),
            AbortOutcome::NotInProgress
        );
        assert_eq!(read_file(&repo, "shared.txt"), "new edit after commit\n");
    }

    #[test]
    fn test_abort_cherry_pick() {
        let (dir, repo, picked) = diverged_repo();
        let head_before = commit_file(&repo, "shared.txt", "main edit\n", "edit on main");

        cherry_pick(&open(&dir), &picked.to_string(), None).unwrap();
        assert!(open(&dir).cherry_pick_in_progress());
        assert!(index_has_conflicts(&dir));

        let outcome = abort_cherry_pick(&open(&dir)).unwrap();
        assert_eq!(
            outcome,
            AbortOutcome::Aborted {
                head: CommitId::new(head_before)
            }
        );
        assert!(!index_has_conflicts(&dir));
        assert_eq!(repo.state(), git2::RepositoryState::Clean);
        assert_eq!(read_file(&repo, "shared.txt"), "main edit\n");

        assert_eq!(
            abort_cherry_pick(&open(&dir)).unwrap(),
            AbortOutcome::NotInProgress
        );
    }

    #[test]
    fn test_cherry_pick_already_applied() {
        let (dir, repo) = init_repo();
        let base = commit_file(&repo, "a.txt", "one\n", "base");
        checkout_new_branch(&repo, "feature", base);
        let picked = commit_file(&repo, "b.txt", "same\n", "add b");
        checkout_branch(&repo, "main");
        commit_file(&repo, "b.txt", "same\n", "add b on main too");

        let outcome = cherry_pick(&open(&dir), &picked.to_string(), None).unwrap();
        assert!(matches!(outcome, CherryPickOutcome::Other { .. }));
        assert_eq!(repo.state(), git2::RepositoryState::Clean);
    }

    #[test]
    fn test_cherry_pick_unknown_commit() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "a.txt", "one\n", "base");

        let result = cherry_pick(&open(&dir), "deadbeefdeadbeefdeadbeefdeadbeefdeadbeef", None);
        assert!(matches!(result, Err(GatewayError::CommitNotFound(_))));

        let result = cherry_pick(&open(&dir), "not-a-sha", None);
        assert!(matches!(result, Err(GatewayError::CommitNotFound(_))));
    }

    #[test]
    fn test_push_without_origin() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "a.txt", "one\n", "base");

        let result = push(&open(&dir));
        assert!(matches!(result, Err(GatewayError::RemoteNotFound(name)) if name == "origin"));
    }

    #[test]
    fn test_push_to_bare_origin() {
        let (dir, repo) = init_repo();
        let tip = commit_file(&repo, "a.txt", "one\n", "base");
        let (remote_dir, remote_repo) = init_bare_remote();
        repo.remote(DEFAULT_REMOTE, remote_dir.path().to_str().unwrap())
            .unwrap();

        let outcome = push(&open(&dir)).unwrap();
        assert_eq!(outcome.remote, "origin");
        assert_eq!(outcome.branch, "main");

        let pushed = remote_repo.find_reference("refs/heads/main").unwrap();
        assert_eq!(pushed.target(), Some(tip));
    }

    #[test]
    fn test_push_detached_head() {
        let (dir, repo) = init_repo();
        let tip = commit_file(&repo, "a.txt", "one\n", "base");
        let (remote_dir, _remote_repo) = init_bare_remote();
        repo.remote(DEFAULT_REMOTE, remote_dir.path().to_str().unwrap())
            .unwrap();
        repo.set_head_detached(tip).unwrap();

        let result = push(&open(&dir));
        assert!(matches!(result, Err(GatewayError::Unexpected(_))));
    }

    #[test]
    fn test_push_transport_failure() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "a.txt", "one\n", "base");
        let missing = dir.path().join("no-such-remote");
        repo.remote(DEFAULT_REMOTE, missing.to_str().unwrap()).unwrap();

        let result = push(&open(&dir));
        assert!(matches!(result, Err(GatewayError::Transport { .. })));
    }
}
