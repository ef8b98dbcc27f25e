//! Tabular query executor.
//!
//! Runs a single parameterized SQL statement against a relational store and
//! renders returned rows as a markdown table. Statements are classified with
//! `sqlparser` before they reach the store, so a read request can never
//! modify data.

mod error;
mod executor;
mod statement;
mod table;

pub use error::{QueryError, QueryResult};
pub use executor::{render_query_error, run_modify, run_select, SqliteExecutor, TabularQueryExecutor};
pub use statement::{classify, SqlValue, Statement, StatementKind};
pub use table::{Table, NO_DATA};
