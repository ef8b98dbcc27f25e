//! Gateway error types
//!
//! Every failure a gateway operation can produce is one of these variants.
//! Nothing escapes the gateway boundary as a panic: callers receive either a
//! typed result or one of the kinds below, which the formatter turns into text.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// the closed set of failures reported by gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    /// the path does not resolve to a repository
    #[error("Repository not found: {}", .0.display())]
    RepositoryNotFound(PathBuf),

    /// no local or remote-tracking branch with this name
    #[error("Branch '{0}' not found.")]
    BranchNotFound(String),

    /// the hash does not resolve to a commit
    #[error("Commit '{0}' not found.")]
    CommitNotFound(String),

    /// no remote with this name is configured
    #[error("Remote '{0}' not found.")]
    RemoteNotFound(String),

    /// content was requested for a path with no pending change
    #[error("File '{}' is not changed or does not exist in the repository.", .0.display())]
    FileNotChanged(PathBuf),

    /// the path has no entry in the HEAD tree
    #[error("File '{}' not found at HEAD.", .0.display())]
    FileNotFound(PathBuf),

    /// the blob at HEAD cannot be shown as text
    #[error("File '{}' has binary content.", .0.display())]
    BinaryContent(PathBuf),

    /// the index holds unresolved conflicts
    #[error("Unresolved conflicts in: {}", paths_display(.paths))]
    Conflicts { paths: Vec<PathBuf> },

    /// the staged tree is identical to HEAD
    #[error("Nothing to commit, working tree clean.")]
    NothingToCommit,

    /// the remote refused the pushed ref
    #[error("Push to '{remote}' rejected for {reference}: {reason}")]
    PushRejected {
        remote: String,
        reference: String,
        reason: String,
    },

    /// the network operation did not succeed
    #[error("Push to '{remote}' failed: {message}")]
    Transport { remote: String, message: String },

    /// error from the underlying Git library
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// anything else, with its message
    #[error("{0}")]
    Unexpected(String),
}

fn paths_display(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Precedence buckets, lowest first.
///
/// Repository resolution is checked before refs, refs before objects and
/// content, and operation outcomes come last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorClass {
    Repository,
    Reference,
    Object,
    Operation,
    Unexpected,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorClass::Repository => "repository",
            ErrorClass::Reference => "reference",
            ErrorClass::Object => "object",
            ErrorClass::Operation => "operation",
            ErrorClass::Unexpected => "unexpected",
        };
        f.write_str(name)
    }
}

impl GatewayError {
    /// the precedence bucket this error belongs to
    pub fn class(&self) -> ErrorClass {
        match self {
            GatewayError::RepositoryNotFound(_) => ErrorClass::Repository,
            GatewayError::BranchNotFound(_) | GatewayError::RemoteNotFound(_) => {
                ErrorClass::Reference
            }
            GatewayError::CommitNotFound(_)
            | GatewayError::FileNotChanged(_)
            | GatewayError::FileNotFound(_)
            | GatewayError::BinaryContent(_) => ErrorClass::Object,
            GatewayError::Conflicts { .. }
            | GatewayError::NothingToCommit
            | GatewayError::PushRejected { .. }
            | GatewayError::Transport { .. } => ErrorClass::Operation,
            GatewayError::Git(_) | GatewayError::Unexpected(_) => ErrorClass::Unexpected,
        }
    }

    /// stable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::RepositoryNotFound(_) => "RepositoryNotFound",
            GatewayError::BranchNotFound(_) => "BranchNotFound",
            GatewayError::CommitNotFound(_) => "CommitNotFound",
            GatewayError::RemoteNotFound(_) => "RemoteNotFound",
            GatewayError::FileNotChanged(_) => "FileNotChanged",
            GatewayError::FileNotFound(_) => "FileNotFound",
            GatewayError::BinaryContent(_) => "BinaryContent",
            GatewayError::Conflicts { .. } => "Conflicts",
            GatewayError::NothingToCommit => "NothingToCommit",
            GatewayError::PushRejected { .. } => "PushRejected",
            GatewayError::Transport { .. } => "Transport",
            GatewayError::Git(_) | GatewayError::Unexpected(_) => "Unexpected",
        }
    }
}

/// result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
