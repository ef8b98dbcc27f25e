//! repogate - repository command gateway
//!
//! Runs inspection and mutation commands against git repositories named by
//! filesystem path and renders every outcome as plain text. A small SQL
//! executor sits next to the gateway behind the same dispatch layer.
//!
//! # Example
//!
//! ```no_run
//! use repogate::gateway::{render_result, Gateway};
//!
//! let gateway = Gateway::default();
//! println!("{}", render_result(&gateway.list_branches("./my_repo")));
//! println!("{}", render_result(&gateway.commit("./my_repo", "Update docs")));
//! ```

pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod logging;
pub mod query;
