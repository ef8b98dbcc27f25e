//! Row sets and their markdown rendering.

use std::fmt::Write;

/// Rendered when a query returns no rows.
pub const NO_DATA: &str = "No data found.";

/// A set of rows from a read statement.
///
/// Cells are already converted to text; `None` is SQL NULL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Option<String>>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as a markdown table, keeping at most `max_rows` rows.
    pub fn to_markdown(&self, max_rows: Option<usize>) -> String {
        if self.rows.is_empty() {
            return NO_DATA.to_string();
        }

        let mut out = String::new();
        out.push('|');
        for column in &self.columns {
            let _ = write!(out, " {} |", escape(column));
        }
        out.push_str("\n|");
        for _ in &self.columns {
            out.push_str("---|");
        }
        out.push('\n');

        let shown = max_rows.unwrap_or(self.rows.len()).min(self.rows.len());
        for row in &self.rows[..shown] {
            out.push('|');
            for cell in row {
                let _ = write!(out, " {} |", cell.as_deref().map(escape).unwrap_or_default());
            }
            out.push('\n');
        }

        if shown < self.rows.len() {
            let _ = writeln!(out, "({} of {} rows shown)", shown, self.rows.len());
        }
        out
    }
}

fn escape(cell: &str) -> String {
    cell.replace('|', "\\|").replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new(vec!["id".into(), "name".into()]);
        table.push(vec![Some("1".into()), Some("a|b".into())]);
        table.push(vec![Some("2".into()), None]);
        table
    }

    #[test]
    fn test_empty_table() {
        let table = Table::new(vec!["id".into()]);
        assert_eq!(table.to_markdown(None), NO_DATA);
    }

    #[test]
    fn test_markdown_layout() {
        assert_eq!(
            sample().to_markdown(None),
            "| id | name |\n|---|---|\n| 1 | a\\|b |\n| 2 |  |\n"
        );
    }

    #[test]
    fn test_truncation_note() {
        let text = sample().to_markdown(Some(1));
        assert!(text.contains("| 1 | a\\|b |"));
        assert!(!text.contains("| 2 |"));
        assert!(text.ends_with("(1 of 2 rows shown)\n"));
    }

    #[test]
    fn test_newlines_flattened() {
        let mut table = Table::new(vec!["note".into()]);
        table.push(vec![Some("line1\nline2".into())]);
        assert!(table.to_markdown(None).contains("| line1 line2 |"));
    }
}
