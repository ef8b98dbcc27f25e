//! Read-only repository queries.
//!
//! Nothing here writes to the repository, so these run without taking the
//! per-repository lock.

use std::path::{Path, PathBuf};

use git2::{Delta, Diff, ErrorCode, Repository, Revwalk, Sort, Status, StatusOptions};
use tracing::debug;

use crate::gateway::error::{GatewayError, GatewayResult};
use crate::gateway::handle::RepositoryHandle;
use crate::gateway::refs::RefManager;
use crate::gateway::types::{
    ChangeKind, ChangeStatus, CommitSummary, DiffSummary, HeadState, TreeChange,
    WorkingTreeChange,
};

const ADDED: Status = Status::INDEX_NEW;
const MODIFIED: Status = Status::INDEX_MODIFIED
    .union(Status::WT_MODIFIED)
    .union(Status::INDEX_TYPECHANGE)
    .union(Status::WT_TYPECHANGE);
const REMOVED: Status = Status::INDEX_DELETED.union(Status::WT_DELETED);

/// All branch names, local then remote-tracking, in ref-store order.
pub fn list_branches(handle: &RepositoryHandle) -> GatewayResult<Vec<String>> {
    RefManager::list_branches(handle.repo())
}

/// The branch HEAD points to, or the detached commit.
pub fn current_branch(handle: &RepositoryHandle) -> GatewayResult<HeadState> {
    handle.head_state()
}

/// Compare the HEAD tree with the tip tree of `target`.
///
/// Only committed trees take part; uncommitted changes are ignored.
pub fn diff(handle: &RepositoryHandle, target: &str) -> GatewayResult<DiffSummary> {
    let repo = handle.repo();
    let target_commit = RefManager::resolve_branch(repo, target)?;
    let target_tree = target_commit.tree()?;

    let head_tree = handle.head_tree()?;
    let from = handle.head_state()?.to_string();

    let diff = repo.diff_tree_to_tree(head_tree.as_ref(), Some(&target_tree), None)?;
    let changes = extract_changes_from_diff(&diff);
    debug!(from = %from, to = %target, changes = changes.len(), "compared trees");

    Ok(DiffSummary {
        from,
        to: target.to_string(),
        changes,
    })
}

/// compute changes from a diff
fn extract_changes_from_diff(diff: &Diff<'_>) -> Vec<TreeChange> {
    diff.deltas()
        .map(|delta| {
            let path = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .map(PathBuf::from)
                .unwrap_or_default();

            let status = match delta.status() {
                Delta::Added => ChangeStatus::Added,
                Delta::Deleted => ChangeStatus::Deleted,
                Delta::Modified => ChangeStatus::Modified,
                Delta::Renamed => ChangeStatus::Renamed,
                Delta::Copied => ChangeStatus::Copied,
                _ => ChangeStatus::Other,
            };

            TreeChange { path, status }
        })
        .collect()
}

/// Pending changes relative to HEAD: added, then modified, then removed.
///
/// Untracked files only count as added when `include_untracked` is set.
pub fn current_file_changes(
    handle: &RepositoryHandle,
    include_untracked: bool,
) -> GatewayResult<Vec<WorkingTreeChange>> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(include_untracked)
        .recurse_untracked_dirs(include_untracked)
        .include_ignored(false)
        .include_unmodified(false);

    let statuses = handle.repo().statuses(Some(&mut opts))?;

    let added = if include_untracked {
        ADDED | Status::WT_NEW
    } else {
        ADDED
    };

    let mut changes = Vec::new();
    for (kind, mask) in [
        (ChangeKind::Added, added),
        (ChangeKind::Modified, MODIFIED),
        (ChangeKind::Removed, REMOVED),
    ] {
        for entry in statuses.iter() {
            if !entry.status().intersects(mask) {
                continue;
            }
            if let Some(path) = entry.path() {
                changes.push(WorkingTreeChange {
                    path: PathBuf::from(path),
                    kind,
                });
            }
        }
    }

    Ok(changes)
}

/// Text of `path` as committed at HEAD, provided the path is currently changed.
pub fn file_change_content(handle: &RepositoryHandle, path: &Path) -> GatewayResult<String> {
    let repo = handle.repo();

    let status = match repo.status_file(path) {
        Ok(status) => status,
        Err(e) if e.code() == ErrorCode::NotFound => {
            return Err(GatewayError::FileNotChanged(path.to_path_buf()))
        }
        Err(e) => return Err(GatewayError::Git(e)),
    };
    if status.is_empty() || status == Status::IGNORED {
        return Err(GatewayError::FileNotChanged(path.to_path_buf()));
    }

    let tree = handle
        .head_tree()?
        .ok_or_else(|| GatewayError::FileNotFound(path.to_path_buf()))?;
    let entry = tree
        .get_path(path)
        .map_err(|_| GatewayError::FileNotFound(path.to_path_buf()))?;
    let blob = entry
        .to_object(repo)?
        .peel_to_blob()
        .map_err(|_| GatewayError::FileNotFound(path.to_path_buf()))?;

    if blob.is_binary() {
        return Err(GatewayError::BinaryContent(path.to_path_buf()));
    }
    String::from_utf8(blob.content().to_vec())
        .map_err(|_| GatewayError::BinaryContent(path.to_path_buf()))
}

/// Every commit reachable from `branch`, newest first.
pub fn commits(
    handle: &RepositoryHandle,
    branch: &str,
    limit: Option<usize>,
) -> GatewayResult<Vec<CommitSummary>> {
    let repo = handle.repo();
    let tip = RefManager::resolve_branch(repo, branch)?;

    let iter = HistoryIterator::new(repo, tip.id())?;
    match limit {
        Some(n) => iter.take(n).collect(),
        None => iter.collect(),
    }
}

/// iterate over commit history starting from a commit
pub struct HistoryIterator<'repo> {
    repo: &'repo Repository,
    revwalk: Revwalk<'repo>,
}

impl<'repo> HistoryIterator<'repo> {
    /// create a new history iterator
    pub fn new(repo: &'repo Repository, start: git2::Oid) -> GatewayResult<Self> {
        let mut revwalk = repo.revwalk()?;
        revwalk.push(start)?;
        revwalk.set_sorting(Sort::TIME | Sort::TOPOLOGICAL)?;

        Ok(Self { repo, revwalk })
    }
}

impl<'repo> Iterator for HistoryIterator<'repo> {
    type Item = GatewayResult<CommitSummary>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.revwalk.next()? {
            Ok(oid) => match self.repo.find_commit(oid) {
                Ok(commit) => Some(Ok(CommitSummary::from_git2(&commit))),
                Err(e) => Some(Err(GatewayError::Git(e))),
            },
            Err(e) => Some(Err(GatewayError::Git(e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::test_support::{
        checkout_branch, checkout_new_branch, commit_file, init_repo, write_file,
    };

    fn open(dir: &tempfile::TempDir) -> RepositoryHandle {
        RepositoryHandle::open(dir.path()).unwrap()
    }

    #[test]
    fn test_current_branch_is_listed() {
        let (dir, repo) = init_repo();
        let tip = commit_file(&repo, "a.txt", "one\n", "first");
        checkout_new_branch(&repo, "feature", tip);

        let handle = open(&dir);
        let branches = list_branches(&handle).unwrap();
        let head = current_branch(&handle).unwrap();

        assert_eq!(head, HeadState::Branch("feature".into()));
        assert!(branches.iter().any(|b| Some(b.as_str()) == head.branch()));
    }

    #[test]
    fn test_diff_against_self_is_empty() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "a.txt", "one\n", "first");

        let summary = diff(&open(&dir), "main").unwrap();
        assert!(summary.is_empty());
        assert_eq!(summary.from, "main");
    }

    #[test]
    fn test_diff_reports_added_file_on_feature() {
        let (dir, repo) = init_repo();
        let base = commit_file(&repo, "a.txt", "one\n", "first");
        checkout_new_branch(&repo, "feature", base);
        commit_file(&repo, "b.txt", "new\n", "add b");
        checkout_branch(&repo, "main");

        // uncommitted edits do not take part
        write_file(&repo, "a.txt", "dirty\n");

        let summary = diff(&open(&dir), "feature").unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary.changes[0].path, PathBuf::from("b.txt"));
        assert_eq!(summary.changes[0].status, ChangeStatus::Added);
    }

    #[test]
    fn test_diff_unknown_branch() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "a.txt", "one\n", "first");

        let result = diff(&open(&dir), "ghost");
        assert!(matches!(result, Err(GatewayError::BranchNotFound(_))));
    }

    #[test]
    fn test_diff_from_unborn_head() {
        let (dir, repo) = init_repo();
        let tip = commit_file(&repo, "a.txt", "one\n", "first");
        let commit = repo.find_commit(tip).unwrap();
        repo.branch("feature", &commit, false).unwrap();
        repo.set_head("refs/heads/orphan").unwrap();

        let summary = diff(&open(&dir), "feature").unwrap();
        assert_eq!(summary.from, "orphan");
        assert_eq!(summary.len(), 1);
    }

    #[test]
    fn test_file_changes_grouped_in_order() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "keep.txt", "keep\n", "first");
        commit_file(&repo, "gone.txt", "bye\n", "second");

        write_file(&repo, "keep.txt", "changed\n");
        std::fs::remove_file(dir.path().join("gone.txt")).unwrap();
        write_file(&repo, "staged.txt", "staged\n");
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("staged.txt")).unwrap();
        index.write().unwrap();
        write_file(&repo, "untracked.txt", "loose\n");

        let changes = current_file_changes(&open(&dir), false).unwrap();
        let summary: Vec<_> = changes
            .iter()
            .map(|c| (c.kind, c.path.to_string_lossy().into_owned()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (ChangeKind::Added, "staged.txt".to_string()),
                (ChangeKind::Modified, "keep.txt".to_string()),
                (ChangeKind::Removed, "gone.txt".to_string()),
            ]
        );
    }

    #[test]
    fn test_file_changes_with_untracked() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "a.txt", "one\n", "first");
        write_file(&repo, "new.txt", "loose\n");

        let changes = current_file_changes(&open(&dir), true).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Added);
        assert_eq!(changes[0].path, PathBuf::from("new.txt"));
    }

    #[test]
    fn test_file_change_content_returns_head_text() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "notes.txt", "committed\n", "first");
        write_file(&repo, "notes.txt", "working copy\n");

        let content = file_change_content(&open(&dir), Path::new("notes.txt")).unwrap();
        assert_eq!(content, "committed\n");
    }

    #[test]
    fn test_file_change_content_unchanged_file() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "notes.txt", "committed\n", "first");

        let result = file_change_content(&open(&dir), Path::new("notes.txt"));
        assert!(matches!(result, Err(GatewayError::FileNotChanged(_))));

        let result = file_change_content(&open(&dir), Path::new("nowhere.txt"));
        assert!(matches!(result, Err(GatewayError::FileNotChanged(_))));
    }

    #[test]
    fn test_file_change_content_new_file() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "a.txt", "one\n", "first");
        write_file(&repo, "fresh.txt", "brand new\n");

        let result = file_change_content(&open(&dir), Path::new("fresh.txt"));
        assert!(matches!(result, Err(GatewayError::FileNotFound(_))));
    }

    #[test]
    fn test_file_change_content_binary() {
        let (dir, repo) = init_repo();
        let bytes = [0u8, 159, 146, 150, 0, 1, 2];
        std::fs::write(dir.path().join("blob.bin"), bytes).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("blob.bin")).unwrap();
        index.write().unwrap();
        crate::gateway::test_support::commit_index(&repo, "binary");
        std::fs::write(dir.path().join("blob.bin"), b"text now").unwrap();

        let result = file_change_content(&open(&dir), Path::new("blob.bin"));
        assert!(matches!(result, Err(GatewayError::BinaryContent(_))));
    }

    #[test]
    fn test_commits_newest_first() {
        let (dir, repo) = init_repo();
        let c1 = commit_file(&repo, "a.txt", "1\n", "first");
        let c2 = commit_file(&repo, "a.txt", "2\n", "second");
        let c3 = commit_file(&repo, "a.txt", "3\n", "third\n\nbody text");

        let history = commits(&open(&dir), "main", None).unwrap();
        let ids: Vec<_> = history.iter().map(|c| c.id.raw()).collect();
        assert_eq!(ids, vec![c3, c2, c1]);
        assert_eq!(history[0].summary, "third");
        assert_eq!(history[0].author_name, "Test User");

        let limited = commits(&open(&dir), "main", Some(2)).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_commits_unknown_branch() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "a.txt", "1\n", "first");

        let result = commits(&open(&dir), "missing", None);
        assert!(matches!(result, Err(GatewayError::BranchNotFound(_))));
    }
}
