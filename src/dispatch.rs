//! Call dispatch.
//!
//! One entry point for every repository and query operation, addressed by
//! tool name. A call always produces text: results and failures alike are
//! rendered before they leave this module.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::gateway::{render_result, Gateway};
use crate::query::{
    run_modify, run_select, QueryResult, SqlValue, SqliteExecutor, Statement,
    TabularQueryExecutor,
};

/// A tool call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum Request {
    RepositoryInfo {
        repo_path: PathBuf,
    },
    ListBranches {
        repo_path: PathBuf,
    },
    CurrentBranch {
        repo_path: PathBuf,
    },
    Diff {
        repo_path: PathBuf,
        target_branch: String,
    },
    CurrentFileChanges {
        repo_path: PathBuf,
    },
    FileChangeContent {
        repo_path: PathBuf,
        file_path: PathBuf,
    },
    Commits {
        repo_path: PathBuf,
        branch: String,
    },
    Commit {
        repo_path: PathBuf,
        message: String,
    },
    CherryPick {
        repo_path: PathBuf,
        commit_sha: String,
        #[serde(default)]
        timestamp: Option<DateTime<FixedOffset>>,
    },
    AbortCherryPick {
        repo_path: PathBuf,
    },
    Push {
        repo_path: PathBuf,
    },
    Select {
        sql: String,
        #[serde(default)]
        params: BTreeMap<String, SqlValue>,
    },
    Modify {
        sql: String,
        #[serde(default)]
        params: BTreeMap<String, SqlValue>,
    },
}

impl Request {
    /// Parse a JSON tool call such as `{"tool": "list_branches", "repo_path": "."}`.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            Request::RepositoryInfo { .. } => "repository_info",
            Request::ListBranches { .. } => "list_branches",
            Request::CurrentBranch { .. } => "current_branch",
            Request::Diff { .. } => "diff",
            Request::CurrentFileChanges { .. } => "current_file_changes",
            Request::FileChangeContent { .. } => "file_change_content",
            Request::Commits { .. } => "commits",
            Request::Commit { .. } => "commit",
            Request::CherryPick { .. } => "cherry_pick",
            Request::AbortCherryPick { .. } => "abort_cherry_pick",
            Request::Push { .. } => "push",
            Request::Select { .. } => "select",
            Request::Modify { .. } => "modify",
        }
    }
}

fn statement(sql: &str, params: &BTreeMap<String, SqlValue>) -> Statement {
    params
        .iter()
        .fold(Statement::new(sql), |stmt, (name, value)| {
            stmt.bind(name.as_str(), value.clone())
        })
}

/// Routes requests to the gateway or the query executor.
pub struct Dispatcher {
    gateway: Gateway,
    executor: Option<Box<dyn TabularQueryExecutor>>,
    max_rows: Option<usize>,
}

impl Dispatcher {
    /// Dispatcher with no query executor.
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            executor: None,
            max_rows: None,
        }
    }

    /// Build from configuration, opening the SQLite database if one is set.
    pub fn from_config(config: &Config) -> QueryResult<Self> {
        let mut dispatcher = Self::new(Gateway::new(config.gateway.clone()));
        dispatcher.max_rows = config.query.max_rows;
        if let Some(path) = &config.query.database {
            dispatcher.executor = Some(Box::new(SqliteExecutor::open(path)?));
        }
        Ok(dispatcher)
    }

    /// Attach a query executor.
    pub fn with_executor(mut self, executor: impl TabularQueryExecutor + 'static) -> Self {
        self.executor = Some(Box::new(executor));
        self
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Parse and run a JSON tool call.
    pub fn call_json(&self, text: &str) -> String {
        match Request::from_json(text) {
            Ok(request) => self.call(&request),
            Err(e) => format!("Error: invalid request: {}", e),
        }
    }

    /// Run a request and render its outcome.
    pub fn call(&self, request: &Request) -> String {
        debug!(tool = request.tool_name(), "dispatching");
        let gw = &self.gateway;

        match request {
            Request::RepositoryInfo { repo_path } => render_result(&gw.repository_info(repo_path)),
            Request::ListBranches { repo_path } => render_result(&gw.list_branches(repo_path)),
            Request::CurrentBranch { repo_path } => render_result(&gw.current_branch(repo_path)),
            Request::Diff {
                repo_path,
                target_branch,
            } => render_result(&gw.diff(repo_path, target_branch)),
            Request::CurrentFileChanges { repo_path } => {
                render_result(&gw.current_file_changes(repo_path))
            }
            Request::FileChangeContent {
                repo_path,
                file_path,
            } => render_result(&gw.file_change_content(repo_path, file_path)),
            Request::Commits { repo_path, branch } => render_result(&gw.commits(repo_path, branch)),
            Request::Commit { repo_path, message } => render_result(&gw.commit(repo_path, message)),
            Request::CherryPick {
                repo_path,
                commit_sha,
                timestamp,
            } => render_result(&gw.cherry_pick(repo_path, commit_sha, timestamp.as_ref())),
            Request::AbortCherryPick { repo_path } => {
                render_result(&gw.abort_cherry_pick(repo_path))
            }
            Request::Push { repo_path } => render_result(&gw.push(repo_path)),
            Request::Select { sql, params } => match &self.executor {
                Some(executor) => run_select(executor.as_ref(), &statement(sql, params), self.max_rows),
                None => NO_EXECUTOR.to_string(),
            },
            Request::Modify { sql, params } => match &self.executor {
                Some(executor) => run_modify(executor.as_ref(), &statement(sql, params)),
                None => NO_EXECUTOR.to_string(),
            },
        }
    }
}

const NO_EXECUTOR: &str = "Error: no query executor configured";
