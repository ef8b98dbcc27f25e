//! Tabular query errors.

use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Query errors.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("empty query")]
    EmptyQuery,

    #[error("syntax error: {0}")]
    Parse(String),

    #[error("multiple statements not supported")]
    MultipleStatements,

    #[error("expected a read statement, got: {0}")]
    NotARead(String),

    #[error("expected a write statement, got: {0}")]
    NotAWrite(String),

    #[error("{0}")]
    Database(#[from] rusqlite::Error),
}

impl From<sqlparser::parser::ParserError> for QueryError {
    fn from(e: sqlparser::parser::ParserError) -> Self {
        QueryError::Parse(e.to_string())
    }
}
