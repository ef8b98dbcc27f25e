//! core type-safe wrappers around git primitives used by the gateway.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use git2::Oid;

/// This makes sure we don't accidentally pass a blob ID where a commit ID
/// is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommitId(pub(crate) Oid);

impl CommitId {
    pub(crate) fn new(oid: Oid) -> Self {
        Self(oid)
    }

    /// raw Oid (for internal use only)
    pub(crate) fn raw(&self) -> Oid {
        self.0
    }

    /// parse CommitId from a full hex string
    pub fn from_hex(hex: &str) -> Result<Self, git2::Error> {
        Oid::from_str(hex).map(CommitId)
    }

    /// short form of the commit ID
    pub fn short(&self) -> String {
        format!("{:.7}", self.0)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// a validated branch name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchName(String);

impl BranchName {
    /// create a new BranchName
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidNameError> {
        let name = name.into();
        // git is more permissive, this only rejects what can never resolve
        if name.is_empty() {
            return Err(InvalidNameError::Empty);
        }
        if name.contains("..") || name.ends_with('/') || name.starts_with('/') {
            return Err(InvalidNameError::InvalidPath(name));
        }
        Ok(Self(name))
    }

    /// get the full local ref path (e.g., "refs/heads/main")
    pub fn as_ref_path(&self) -> String {
        format!("refs/heads/{}", self.0)
    }

    /// get the short name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// error type for invalid names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidNameError {
    Empty,
    InvalidPath(String),
}

impl fmt::Display for InvalidNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "name cannot be empty"),
            Self::InvalidPath(path) => write!(f, "invalid path: '{}'", path),
        }
    }
}

impl std::error::Error for InvalidNameError {}

/// where HEAD currently points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadState {
    /// HEAD is attached to a branch with at least one commit
    Branch(String),
    /// HEAD names a branch that has no commits yet
    Unborn(String),
    /// HEAD points straight at a commit
    Detached(CommitId),
}

impl HeadState {
    /// branch name, if HEAD is attached
    pub fn branch(&self) -> Option<&str> {
        match self {
            HeadState::Branch(name) | HeadState::Unborn(name) => Some(name),
            HeadState::Detached(_) => None,
        }
    }
}

impl fmt::Display for HeadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeadState::Branch(name) | HeadState::Unborn(name) => write!(f, "{}", name),
            HeadState::Detached(id) => write!(f, "{}", id.short()),
        }
    }
}

/// what the gateway knows about an opened repository
#[derive(Debug, Clone)]
pub struct RepositoryInfo {
    pub workdir: Option<PathBuf>,
    pub git_dir: PathBuf,
    pub bare: bool,
    pub head: HeadState,
}

/// kind of a working tree change relative to HEAD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeKind::Added => "Added",
            ChangeKind::Modified => "Modified",
            ChangeKind::Removed => "Removed",
        };
        f.write_str(label)
    }
}

/// a pending change in the working tree or index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingTreeChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// the type of change in a diff between trees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Added,
    Deleted,
    Modified,
    Renamed,
    Copied,
    Other,
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeStatus::Added => "Added",
            ChangeStatus::Deleted => "Deleted",
            ChangeStatus::Modified => "Modified",
            ChangeStatus::Renamed => "Renamed",
            ChangeStatus::Copied => "Copied",
            ChangeStatus::Other => "Other",
        };
        f.write_str(label)
    }
}

/// represents a change in a diff between two trees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeChange {
    pub path: PathBuf,
    pub status: ChangeStatus,
}

/// tree-to-tree comparison between HEAD and a branch tip
#[derive(Debug, Clone)]
pub struct DiffSummary {
    pub from: String,
    pub to: String,
    pub changes: Vec<TreeChange>,
}

impl DiffSummary {
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// one entry of a branch history
#[derive(Debug, Clone)]
pub struct CommitSummary {
    pub id: CommitId,
    pub summary: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<FixedOffset>,
}

impl CommitSummary {
    /// create CommitSummary from a git2::Commit
    pub(crate) fn from_git2(commit: &git2::Commit<'_>) -> Self {
        let author = commit.author();
        let timestamp = to_datetime(author.when());

        Self {
            id: CommitId::new(commit.id()),
            summary: commit.summary().unwrap_or("").to_string(),
            author_name: author.name().unwrap_or("Unknown").to_string(),
            author_email: author.email().unwrap_or("unknown@unknown").to_string(),
            timestamp,
        }
    }
}

/// convert a git timestamp keeping its UTC offset
pub(crate) fn to_datetime(time: git2::Time) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(time.offset_minutes() * 60)
        .and_then(|tz| tz.timestamp_opt(time.seconds(), 0).single())
        .unwrap_or_else(|| Utc::now().fixed_offset())
}

/// convert a timestamp into git's representation
pub(crate) fn to_git_time(when: &DateTime<FixedOffset>) -> git2::Time {
    git2::Time::new(when.timestamp(), when.offset().local_minus_utc() / 60)
}

/// a path left conflicted in the index by a cherry-pick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictEntry {
    pub path: PathBuf,
    /// blob id of our side, absent when our side deleted the file
    pub ours: Option<String>,
}

/// result of a cherry-pick
#[derive(Debug, Clone)]
pub enum CherryPickOutcome {
    /// applied cleanly and committed on the current branch
    CherryPicked { commit: CommitId },
    /// conflicts remain in the index, no commit was created
    Conflicts { entries: Vec<ConflictEntry> },
    /// any other status, echoed verbatim
    Other { status: String },
}

/// result of aborting an in-progress cherry-pick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortOutcome {
    Aborted { head: CommitId },
    NotInProgress,
}

/// what was pushed where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutcome {
    pub remote: String,
    pub branch: String,
}
