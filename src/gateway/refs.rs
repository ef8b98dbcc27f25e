//! Branch and reference lookups.
//!
//! Branch names given by callers are resolved against local branches first
//! and remote-tracking branches second, so both `feature` and
//! `origin/feature` work.

use git2::{Branch, BranchType, Repository};

use crate::gateway::error::{GatewayError, GatewayResult};
use crate::gateway::types::BranchName;

/// Reference lookups used by the gateway operations.
pub struct RefManager;

impl RefManager {
    /// Find a branch by name, local first, then remote-tracking.
    pub fn find_branch<'repo>(repo: &'repo Repository, name: &str) -> GatewayResult<Branch<'repo>> {
        let branch = BranchName::new(name).map_err(|_| GatewayError::BranchNotFound(name.to_string()))?;

        repo.find_branch(branch.as_str(), BranchType::Local)
            .or_else(|_| repo.find_branch(branch.as_str(), BranchType::Remote))
            .map_err(|_| GatewayError::BranchNotFound(name.to_string()))
    }

    /// Resolve a branch name to the commit at its tip.
    pub fn resolve_branch<'repo>(repo: &'repo Repository, name: &str) -> GatewayResult<git2::Commit<'repo>> {
        let branch = Self::find_branch(repo, name)?;
        branch
            .get()
            .peel_to_commit()
            .map_err(|_| GatewayError::BranchNotFound(name.to_string()))
    }

    /// List local and remote-tracking branches in ref-store order.
    pub fn list_branches(repo: &Repository) -> GatewayResult<Vec<String>> {
        let branches = repo.branches(None)?;

        let mut result = Vec::new();
        for branch_result in branches {
            let (branch, _) = branch_result?;
            if let Some(name) = branch.name()? {
                result.push(name.to_string());
            }
        }

        Ok(result)
    }
}
