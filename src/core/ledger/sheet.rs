//! In-memory text table for one ledger sheet

use crate::core::columns::{find_any, find_col, pick_col};

/// One sheet of the ledger, every cell held as text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Build a sheet from string literals (handy for fixtures)
    pub fn from_strs(name: &str, headers: &[&str], rows: &[&[&str]]) -> Self {
        Self::new(
            name,
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    /// Resolve a column by preferred headers, then by spreadsheet letter
    pub fn col(&self, letter: &str, preferred: &[&str]) -> Option<usize> {
        pick_col(&self.headers, letter, preferred)
    }

    /// Resolve a column by exact header only
    pub fn named(&self, name: &str) -> Option<usize> {
        find_col(&self.headers, name)
    }

    /// First of several exact headers
    pub fn named_any(&self, names: &[&str]) -> Option<usize> {
        find_any(&self.headers, names)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Trimmed cell text; out-of-range cells read as empty
pub fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map(|s| s.trim()).unwrap_or("")
}

/// Cell text for an optional column
pub fn cell_opt(row: &[String], col: Option<usize>) -> &str {
    col.map(|c| cell(row, c)).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_out_of_range_is_empty() {
        let row = vec!["a".to_string(), " b ".to_string()];
        assert_eq!(cell(&row, 1), "b");
        assert_eq!(cell(&row, 5), "");
        assert_eq!(cell_opt(&row, None), "");
    }

    #[test]
    fn test_col_resolution() {
        let sheet = Sheet::from_strs("BOM", &["품목코드", "품명", "품번"], &[]);
        assert_eq!(sheet.col("C", &["품번"]), Some(2));
        assert_eq!(sheet.col("B", &["없음"]), Some(1));
        assert_eq!(sheet.named("품명"), Some(1));
        assert_eq!(sheet.named_any(&["x", "품목코드"]), Some(0));
    }
}
