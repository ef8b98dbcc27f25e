//! Text rendering of gateway results.
//!
//! List results render one line per element with a fixed field order. An
//! empty list renders as an explicit sentinel, never as an empty string, so
//! "nothing found" can't be mistaken for a failure or lost output.

use std::fmt::Write;

use tracing::debug;

use crate::gateway::error::{ErrorClass, GatewayError, GatewayResult};
use crate::gateway::types::{
    AbortOutcome, CherryPickOutcome, CommitId, CommitSummary, DiffSummary, HeadState,
    PushOutcome, RepositoryInfo, WorkingTreeChange,
};

pub const NO_BRANCHES: &str = "No branches found.";
pub const NO_FILE_CHANGES: &str = "No file changes found.";
pub const NO_COMMITS: &str = "No commits found.";
pub const NO_DIFF_CHANGES: &str = "No changes found.";

/// Stable text form of a gateway result.
pub trait Render {
    fn render(&self) -> String;
}

/// Render either side of a gateway result.
pub fn render_result<T: Render>(result: &GatewayResult<T>) -> String {
    match result {
        Ok(value) => value.render(),
        Err(e) => render_error(e),
    }
}

/// Render an error. Only unexpected failures carry the `Error:` prefix.
pub fn render_error(error: &GatewayError) -> String {
    debug!(kind = error.kind(), class = %error.class(), "operation failed");
    match error.class() {
        ErrorClass::Unexpected => format!("Error: {}", error),
        _ => error.to_string(),
    }
}

fn lines<I, F, T>(items: I, sentinel: &str, mut line: F) -> String
where
    I: IntoIterator<Item = T>,
    F: FnMut(&mut String, T),
{
    let mut out = String::new();
    for item in items {
        line(&mut out, item);
        out.push('\n');
    }
    if out.is_empty() {
        sentinel.to_string()
    } else {
        out
    }
}

/// branch list
impl Render for Vec<String> {
    fn render(&self) -> String {
        lines(self, NO_BRANCHES, |out, name| out.push_str(name))
    }
}

impl Render for HeadState {
    fn render(&self) -> String {
        match self {
            HeadState::Branch(name) => format!("Current branch: {}", name),
            HeadState::Unborn(name) => format!("Current branch: {} (no commits yet)", name),
            HeadState::Detached(id) => format!("Current branch: (detached at {})", id.short()),
        }
    }
}

impl Render for RepositoryInfo {
    fn render(&self) -> String {
        let location = self.workdir.as_ref().unwrap_or(&self.git_dir);
        let mut out = format!("Git repo from path: {}", location.display());
        if self.bare {
            out.push_str(" (bare)");
        }
        let _ = write!(out, "\nHEAD: {}", self.head);
        out
    }
}

impl Render for DiffSummary {
    fn render(&self) -> String {
        let mut out = format!(
            "Diff between '{}' and '{}': {} changes.\n",
            self.from,
            self.to,
            self.changes.len()
        );
        out.push_str(&lines(&self.changes, NO_DIFF_CHANGES, |out, change| {
            let _ = write!(out, "{}: {}", change.status, change.path.display());
        }));
        out
    }
}

impl Render for Vec<WorkingTreeChange> {
    fn render(&self) -> String {
        lines(self, NO_FILE_CHANGES, |out, change| {
            let _ = write!(out, "{}: {}", change.kind, change.path.display());
        })
    }
}

impl Render for Vec<CommitSummary> {
    fn render(&self) -> String {
        lines(self, NO_COMMITS, |out, commit| {
            let _ = write!(
                out,
                "{}: {} by {} on {}",
                commit.id,
                commit.summary,
                commit.author_name,
                commit.timestamp.format("%Y-%m-%d %H:%M:%S %:z")
            );
        })
    }
}

/// file content is returned verbatim
impl Render for String {
    fn render(&self) -> String {
        self.clone()
    }
}

impl Render for CherryPickOutcome {
    fn render(&self) -> String {
        match self {
            CherryPickOutcome::CherryPicked { commit } => {
                format!("Cherry-pick completed successfully.\nNew commit: {}\n", commit)
            }
            CherryPickOutcome::Conflicts { entries } => {
                let mut out =
                    String::from("Cherry-pick resulted in conflicts. Resolve them manually.\n");
                for entry in entries {
                    let _ = writeln!(out, "Conflict in file: {}", entry.path.display());
                }
                out
            }
            CherryPickOutcome::Other { status } => format!("Cherry-pick status: {}\n", status),
        }
    }
}

/// result of a commit
impl Render for CommitId {
    fn render(&self) -> String {
        format!("Changes committed with SHA: {}", self)
    }
}

impl Render for AbortOutcome {
    fn render(&self) -> String {
        match self {
            AbortOutcome::Aborted { head } => {
                format!("Cherry-pick aborted. Working tree reset to {}.", head.short())
            }
            AbortOutcome::NotInProgress => "No cherry-pick in progress.".to_string(),
        }
    }
}

impl Render for PushOutcome {
    fn render(&self) -> String {
        format!(
            "Changes pushed to remote '{}' on branch '{}'.",
            self.remote, self.branch
        )
    }
}
