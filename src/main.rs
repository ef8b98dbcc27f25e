//! repogate - repository command gateway
//!
//! Command-line front end. Every subcommand is turned into a tool call and
//! run through the dispatcher; the rendered result goes to stdout.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, FixedOffset};
use clap::{Parser, Subcommand};

use repogate::config::Config;
use repogate::dispatch::{Dispatcher, Request};
use repogate::logging;

#[derive(Parser)]
#[command(name = "repogate", version, about = "Inspect and mutate git repositories by path")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show where the repository lives and what HEAD points at
    Info { repo: PathBuf },
    /// List local and remote-tracking branches
    Branches { repo: PathBuf },
    /// Show the checked-out branch
    CurrentBranch { repo: PathBuf },
    /// Diff HEAD against another branch
    Diff { repo: PathBuf, target: String },
    /// List uncommitted changes
    Status { repo: PathBuf },
    /// Show the committed content of a changed file
    Show { repo: PathBuf, file: PathBuf },
    /// List commits on a branch, newest first
    Log { repo: PathBuf, branch: String },
    /// Stage everything and commit
    Commit {
        repo: PathBuf,
        #[arg(short, long)]
        message: String,
    },
    /// Apply a commit onto HEAD
    CherryPick {
        repo: PathBuf,
        commit: String,
        /// Committer timestamp (RFC 3339)
        #[arg(long)]
        date: Option<DateTime<FixedOffset>>,
    },
    /// Abandon an in-progress cherry-pick
    AbortCherryPick { repo: PathBuf },
    /// Push the current branch to origin
    Push { repo: PathBuf },
    /// Run a read-only SQL statement
    Select { sql: String },
    /// Run a SQL statement that changes data
    Modify { sql: String },
    /// Run a raw JSON tool call
    Call { json: String },
}

impl Command {
    fn into_request(self) -> Result<Request, String> {
        Ok(match self {
            Command::Info { repo } => Request::RepositoryInfo { repo_path: repo },
            Command::Branches { repo } => Request::ListBranches { repo_path: repo },
            Command::CurrentBranch { repo } => Request::CurrentBranch { repo_path: repo },
            Command::Diff { repo, target } => Request::Diff {
                repo_path: repo,
                target_branch: target,
            },
            Command::Status { repo } => Request::CurrentFileChanges { repo_path: repo },
            Command::Show { repo, file } => Request::FileChangeContent {
                repo_path: repo,
                file_path: file,
            },
            Command::Log { repo, branch } => Request::Commits {
                repo_path: repo,
                branch,
            },
            Command::Commit { repo, message } => Request::Commit {
                repo_path: repo,
                message,
            },
            Command::CherryPick { repo, commit, date } => Request::CherryPick {
                repo_path: repo,
                commit_sha: commit,
                timestamp: date,
            },
            Command::AbortCherryPick { repo } => Request::AbortCherryPick { repo_path: repo },
            Command::Push { repo } => Request::Push { repo_path: repo },
            Command::Select { sql } => Request::Select {
                sql,
                params: BTreeMap::new(),
            },
            Command::Modify { sql } => Request::Modify {
                sql,
                params: BTreeMap::new(),
            },
            Command::Call { json } => {
                Request::from_json(&json).map_err(|e| format!("invalid request: {}", e))?
            }
        })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("Failed to initialise logging: {}", e);
    }

    let config = match &cli.config {
        Some(path) => Config::load(path),
        None => Config::from_env(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let dispatcher = match Dispatcher::from_config(&config) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            eprintln!("Error opening query database: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let request = match cli.command.into_request() {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let output = dispatcher.call(&request);
    print!("{}", output);
    if !output.ends_with('\n') {
        println!();
    }
    ExitCode::SUCCESS
}
