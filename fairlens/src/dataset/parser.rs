//! Line-oriented CSV splitting.
//!
//! The parser is deliberately naive: it splits on line breaks and commas and
//! removes double quotes from every cell. A comma inside a quoted field is not
//! protected and splits the field in two.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FairlensError, Result};

/// How rows whose cell count differs from the header are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowPolicy {
    /// Keep the row; missing cells read as empty strings and extra cells are ignored.
    #[default]
    Pad,
    /// Fail with [`FairlensError::MalformedRow`].
    Reject,
}

/// Headers and rows exactly as split from the input text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Number of header cells.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell at `(row, column)`, reading missing cells as `""`.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// All cells of a column in row order, missing cells as `""`.
    pub fn column(&self, column: usize) -> impl Iterator<Item = &str> + '_ {
        (0..self.rows.len()).map(move |row| self.cell(row, column))
    }
}

/// CSV parser with a configurable row policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvParser {
    row_policy: RowPolicy,
}

impl CsvParser {
    /// Creates a parser with the default [`RowPolicy::Pad`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the row policy.
    pub fn with_row_policy(mut self, row_policy: RowPolicy) -> Self {
        self.row_policy = row_policy;
        self
    }

    /// Returns the configured row policy.
    pub fn row_policy(&self) -> RowPolicy {
        self.row_policy
    }

    /// Splits `text` into a header row and data rows.
    ///
    /// # Errors
    ///
    /// Returns [`FairlensError::EmptyInput`] when the text has no non-blank
    /// line, and [`FairlensError::MalformedRow`] for mismatched rows under
    /// [`RowPolicy::Reject`].
    pub fn parse(&self, text: &str) -> Result<RawTable> {
        // Line numbers are 1-based positions in the original text, blank lines included.
        let mut lines = text
            .split('\n')
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let (_, header_line) = lines.next().ok_or(FairlensError::EmptyInput)?;
        let headers = split_line(header_line);

        let mut rows = Vec::new();
        for (index, line) in lines {
            let cells = split_line(line);
            if cells.len() != headers.len() {
                match self.row_policy {
                    RowPolicy::Reject => {
                        return Err(FairlensError::MalformedRow {
                            line: index + 1,
                            expected: headers.len(),
                            found: cells.len(),
                        });
                    }
                    RowPolicy::Pad => debug!(
                        line = index + 1,
                        expected = headers.len(),
                        found = cells.len(),
                        "Row cell count differs from header"
                    ),
                }
            }
            rows.push(cells);
        }

        Ok(RawTable { headers, rows })
    }
}

/// Parses `text` with the default row policy.
///
/// # Errors
///
/// Returns [`FairlensError::EmptyInput`] when the text has no non-blank line.
pub fn parse_csv(text: &str) -> Result<RawTable> {
    CsvParser::new().parse(text)
}

fn split_line(line: &str) -> Vec<String> {
    line.split(',').map(clean_cell).collect()
}

fn clean_cell(cell: &str) -> String {
    cell.trim().replace('"', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_table() {
        let table = parse_csv("name,age\nalice,30\nbob,41\n").unwrap();
        assert_eq!(table.headers, vec!["name", "age"]);
        assert_eq!(table.rows, vec![vec!["alice", "30"], vec!["bob", "41"]]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_blank_lines_are_dropped() {
        let table = parse_csv("\n\na,b\n\n1,2\n   \n3,4\n").unwrap();
        assert_eq!(table.headers, vec!["a", "b"]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_empty_and_blank_input_fail() {
        assert!(matches!(parse_csv(""), Err(FairlensError::EmptyInput)));
        assert!(matches!(
            parse_csv("  \n\t\n \r\n"),
            Err(FairlensError::EmptyInput)
        ));
    }

    #[test]
    fn test_cells_are_trimmed_and_unquoted() {
        let table = parse_csv("\"first name\" , \"city\"\n \"Ann\" ,Oslo\r\n").unwrap();
        assert_eq!(table.headers, vec!["first name", "city"]);
        assert_eq!(table.rows[0], vec!["Ann", "Oslo"]);
    }

    #[test]
    fn test_quoted_comma_is_not_protected() {
        let table = parse_csv("name,city\n\"Doe, Jane\",Paris").unwrap();
        assert_eq!(table.rows[0], vec!["Doe", "Jane", "Paris"]);
    }

    #[test]
    fn test_short_rows_read_as_empty_cells() {
        let table = parse_csv("a,b,c\n1\n4,5,6,7").unwrap();
        assert_eq!(table.cell(0, 0), "1");
        assert_eq!(table.cell(0, 2), "");
        assert_eq!(table.cell(1, 2), "6");
        assert_eq!(table.column(1).collect::<Vec<_>>(), vec!["", "5"]);
    }

    #[test]
    fn test_reject_policy_reports_line() {
        let parser = CsvParser::new().with_row_policy(RowPolicy::Reject);
        let err = parser.parse("a,b\n1,2\n\n3\n").unwrap_err();
        match err {
            FairlensError::MalformedRow {
                line,
                expected,
                found,
            } => {
                assert_eq!(line, 4);
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_header_only_input() {
        let table = parse_csv("a,b,c").unwrap();
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.row_count(), 0);
    }
}
