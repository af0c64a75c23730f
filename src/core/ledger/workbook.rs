//! Spreadsheet ingestion via calamine
//!
//! Every cell is rendered to text up front; numeric interpretation happens
//! later through `safe_num`, so a stray string in a quantity column only
//! zeroes that one cell.

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use chrono::{NaiveDateTime, Timelike};
use std::io::Cursor;

use super::sheet::Sheet;
use super::LedgerError;
use crate::core::columns::normalize_headers;

/// Which row of a sheet holds the column headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRow {
    /// First row of the used range
    FirstUsed,
    /// Absolute 0-based row index (blank leading rows count)
    Absolute(usize),
}

/// An opened workbook
pub struct Workbook {
    inner: Sheets<Cursor<Vec<u8>>>,
}

impl Workbook {
    pub fn open(bytes: &[u8]) -> Result<Self, LedgerError> {
        let inner = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| LedgerError::Workbook(e.to_string()))?;
        Ok(Self { inner })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.inner.sheet_names().to_owned()
    }

    /// Read one sheet into a [`Sheet`]
    pub fn sheet(&mut self, name: &str, header: HeaderRow) -> Result<Sheet, LedgerError> {
        let range = self
            .inner
            .worksheet_range(name)
            .map_err(|e| LedgerError::Workbook(format!("sheet '{}': {}", name, e)))?;
        Ok(range_to_sheet(name, &range, header))
    }

    /// Read the named sheets that exist; the second value lists those that don't
    pub fn sheets(
        &mut self,
        names: &[&str],
        header: HeaderRow,
    ) -> Result<(Vec<Sheet>, Vec<String>), LedgerError> {
        let available = self.sheet_names();
        let mut found = Vec::new();
        let mut missing = Vec::new();
        for name in names {
            if available.iter().any(|s| s == name) {
                found.push(self.sheet(name, header)?);
            } else {
                missing.push(name.to_string());
            }
        }
        Ok((found, missing))
    }
}

fn range_to_sheet(name: &str, range: &Range<Data>, header: HeaderRow) -> Sheet {
    let (row_off, col_off) = range.start().unwrap_or((0, 0));
    let col_off = col_off as usize;

    let mut grid: Vec<Vec<String>> = Vec::new();
    if header != HeaderRow::FirstUsed {
        grid.extend((0..row_off).map(|_| Vec::new()));
    }
    for row in range.rows() {
        let mut cells = vec![String::new(); col_off];
        cells.extend(row.iter().map(cell_text));
        grid.push(cells);
    }

    let header_idx = match header {
        HeaderRow::FirstUsed => 0,
        HeaderRow::Absolute(n) => n,
    };
    if grid.len() <= header_idx {
        return Sheet::new(name, Vec::new(), Vec::new());
    }

    let mut data = grid.split_off(header_idx + 1);
    let raw_headers = grid.pop().unwrap_or_default();
    let width = data
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(raw_headers.len()))
        .max()
        .unwrap_or(0);

    let mut padded = raw_headers;
    padded.resize(width, String::new());
    let headers = normalize_headers(padded);

    data.retain(|r| r.iter().any(|c| !c.trim().is_empty()));
    for row in &mut data {
        row.resize(width, String::new());
    }

    Sheet::new(name, headers, data)
}

/// Render a cell as text
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => format_number(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        Data::Error(_) => String::new(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => format_datetime(ndt),
            None => format_number(dt.as_f64()),
        },
        other => other.to_string(),
    }
}

/// Integral floats render without a fractional part ("100", not "100.0")
pub fn format_number(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

fn format_datetime(dt: NaiveDateTime) -> String {
    if dt.time().num_seconds_from_midnight() == 0 {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook as XlsxWorkbook;

    fn sample_bytes() -> Vec<u8> {
        let mut wb = XlsxWorkbook::new();
        let ws = wb.add_worksheet();
        ws.set_name("입고").unwrap();
        ws.write_string(0, 0, "수주번호").unwrap();
        ws.write_string(0, 1, "수량").unwrap();
        ws.write_string(0, 2, "수량").unwrap();
        ws.write_string(1, 0, "SO-1").unwrap();
        ws.write_number(1, 1, 100.0).unwrap();
        ws.write_number(1, 2, 2.5).unwrap();
        let ws2 = wb.add_worksheet();
        ws2.set_name("기타").unwrap();
        ws2.write_string(0, 0, "x").unwrap();
        wb.save_to_buffer().unwrap()
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-3.0), "-3");
    }

    #[test]
    fn test_read_sheet_with_duplicate_headers() {
        let mut wb = Workbook::open(&sample_bytes()).unwrap();
        let sheet = wb.sheet("입고", HeaderRow::FirstUsed).unwrap();
        assert_eq!(sheet.headers, vec!["수주번호", "수량", "수량.1"]);
        assert_eq!(sheet.rows, vec![vec!["SO-1", "100", "2.5"]]);
    }

    #[test]
    fn test_sheets_reports_missing() {
        let mut wb = Workbook::open(&sample_bytes()).unwrap();
        let (found, missing) = wb.sheets(&["입고", "BOM"], HeaderRow::FirstUsed).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(missing, vec!["BOM".to_string()]);
    }

    #[test]
    fn test_open_rejects_garbage() {
        assert!(Workbook::open(b"definitely not a workbook").is_err());
    }
}
