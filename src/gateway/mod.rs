//! Repository command gateway.
//!
//! Opens a repository by path and runs one inspection or mutation against
//! it. Results come back as typed values which render to stable text through
//! [`Render`]; failures are classified by [`GatewayError::class`].
//!
//! Inspection (`list_branches`, `diff`, `commits`, ...) never writes. Mutation
//! (`commit`, `cherry_pick`, `abort_cherry_pick`, `push`) runs under a
//! per-repository lock when the [`Gateway`] is configured to serialize.

mod error;
mod format;
mod handle;
pub mod inspect;
mod lock;
pub mod mutate;
mod refs;
mod service;
mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ErrorClass, GatewayError, GatewayResult};
pub use format::{
    render_error, render_result, Render, NO_BRANCHES, NO_COMMITS, NO_DIFF_CHANGES,
    NO_FILE_CHANGES,
};
pub use handle::RepositoryHandle;
pub use lock::RepoLocks;
pub use mutate::DEFAULT_REMOTE;
pub use refs::RefManager;
pub use service::Gateway;
pub use types::{
    AbortOutcome, BranchName, ChangeKind, ChangeStatus, CherryPickOutcome, CommitId,
    CommitSummary, ConflictEntry, DiffSummary, HeadState, InvalidNameError, PushOutcome,
    RepositoryInfo, TreeChange, WorkingTreeChange,
};
