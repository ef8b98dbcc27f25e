//! Parameterized statements and read/write classification.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlparser::ast as sp;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser as SqlParser;

use super::error::{QueryError, QueryResult};

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// SQL text plus named parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<(String, SqlValue)>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Bind a named parameter. A bare name gets a `:` prefix.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        let name = name.into();
        let name = if name.starts_with([':', '@', '$']) {
            name
        } else {
            format!(":{}", name)
        };
        self.params.push((name, value.into()));
        self
    }

    pub fn kind(&self) -> QueryResult<StatementKind> {
        classify(&self.sql)
    }
}

/// Whether a statement only reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Read,
    Write,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Read => write!(f, "read"),
            StatementKind::Write => write!(f, "write"),
        }
    }
}

/// Parse `sql` and decide whether it reads or writes.
///
/// Exactly one statement is accepted.
pub fn classify(sql: &str) -> QueryResult<StatementKind> {
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(QueryError::EmptyQuery);
    }

    let dialect = GenericDialect {};
    let statements = SqlParser::parse_sql(&dialect, sql)?;

    match statements.as_slice() {
        [] => Err(QueryError::EmptyQuery),
        [statement] => Ok(match statement {
            sp::Statement::Query(_)
            | sp::Statement::Explain { .. }
            | sp::Statement::ExplainTable { .. } => StatementKind::Read,
            _ => StatementKind::Write,
        }),
        _ => Err(QueryError::MultipleStatements),
    }
}

/// First keyword of `sql`, uppercased, for error messages.
pub(crate) fn leading_keyword(sql: &str) -> String {
    sql.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_uppercase()
}
