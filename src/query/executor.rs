//! Statement execution against a relational store.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::Connection;
use tracing::{debug, warn};

use super::error::{QueryError, QueryResult};
use super::statement::{leading_keyword, SqlValue, Statement, StatementKind};
use super::table::Table;

/// Executes parameterized statements and returns rows as text.
pub trait TabularQueryExecutor: Send + Sync {
    /// Run a statement that returns rows.
    fn query(&self, statement: &Statement) -> QueryResult<Table>;

    /// Run a statement that changes data, returning the affected row count.
    fn execute(&self, statement: &Statement) -> QueryResult<usize>;
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            SqlValue::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// SQLite backed executor.
pub struct SqliteExecutor {
    conn: Mutex<Connection>,
}

impl SqliteExecutor {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> QueryResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "opened sqlite database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory database.
    pub fn in_memory() -> QueryResult<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }
}

fn named(statement: &Statement) -> Vec<(&str, &dyn ToSql)> {
    statement
        .params
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect()
}

fn cell_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(v) => Some(v.to_string()),
        ValueRef::Real(v) => Some(v.to_string()),
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Some(format!("<{} bytes>", bytes.len())),
    }
}

impl TabularQueryExecutor for SqliteExecutor {
    fn query(&self, statement: &Statement) -> QueryResult<Table> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&statement.sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let params = named(statement);

        let mut table = Table::new(columns);
        let mut rows = stmt.query(params.as_slice())?;
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                cells.push(cell_text(row.get_ref(i)?));
            }
            table.push(cells);
        }

        debug!(rows = table.len(), "query returned");
        Ok(table)
    }

    fn execute(&self, statement: &Statement) -> QueryResult<usize> {
        let conn = self.conn.lock();
        let affected = conn.execute(&statement.sql, named(statement).as_slice())?;
        debug!(affected, "statement executed");
        Ok(affected)
    }
}

/// Run a read statement and render the rows.
pub fn run_select(
    executor: &dyn TabularQueryExecutor,
    statement: &Statement,
    max_rows: Option<usize>,
) -> String {
    let result = statement.kind().and_then(|kind| match kind {
        StatementKind::Read => executor.query(statement),
        StatementKind::Write => Err(QueryError::NotARead(leading_keyword(&statement.sql))),
    });

    match result {
        Ok(table) => table.to_markdown(max_rows),
        Err(e) => render_query_error(&e),
    }
}

/// Run a write statement and report how many rows it touched.
pub fn run_modify(executor: &dyn TabularQueryExecutor, statement: &Statement) -> String {
    let result = statement.kind().and_then(|kind| match kind {
        StatementKind::Write => executor.execute(statement),
        StatementKind::Read => Err(QueryError::NotAWrite(leading_keyword(&statement.sql))),
    });

    match result {
        Ok(n) => format!("{} record(s) affected", n),
        Err(e) => render_query_error(&e),
    }
}

pub fn render_query_error(error: &QueryError) -> String {
    warn!(error = %error, "query failed");
    format!("Error executing query: {}", error)
}
