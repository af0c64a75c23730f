//! Table formatting utilities for CLI list commands
//!
//! Every listing command builds [`TableRow`]s against a set of
//! [`ColumnDef`]s and hands them to [`TableFormatter::output`], which renders
//! the requested [`OutputFormat`]. Column widths are measured in terminal
//! columns so Hangul headers and values line up.

use chrono::NaiveDate;
use console::{measure_text_width, pad_str, style, Alignment};
use serde_json::{Map, Value};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{escape_csv, truncate_str};
use crate::cli::OutputFormat;
use crate::core::common_material::Recency;
use crate::core::ledger::{format_number, Sheet};

/// Configuration for table output
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Show summary line after table (e.g., "5 receipt(s) found")
    pub show_summary: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { show_summary: true }
    }
}

impl TableConfig {
    /// Create config optimized for piping (no summary)
    pub fn for_pipe() -> Self {
        Self {
            show_summary: false,
        }
    }
}

/// A typed cell value with semantic meaning for formatting
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Plain text, truncated to the column width
    Text(String),
    /// Part, order or work-order number (cyan)
    Code(String),
    /// Quantity, right-aligned
    Qty(f64),
    /// Expected stock; negative values are red
    Balance(f64),
    /// Calendar day ("-" when unknown)
    Date(Option<NaiveDate>),
    /// Check mark flag
    Flag(bool),
    /// Common-material recency bucket
    Recency(Option<Recency>),
    /// Empty/placeholder
    Empty,
}

impl CellValue {
    /// Raw string value (no styling)
    pub fn raw(&self) -> String {
        match self {
            CellValue::Text(s) | CellValue::Code(s) => s.clone(),
            CellValue::Qty(n) | CellValue::Balance(n) => format_number(*n),
            CellValue::Date(d) => d.map(|d| d.to_string()).unwrap_or_default(),
            CellValue::Flag(b) => (if *b { "✓" } else { "" }).to_string(),
            CellValue::Recency(r) => r.map(|r| r.to_string()).unwrap_or_default(),
            CellValue::Empty => String::new(),
        }
    }

    /// Format for aligned terminal output (with colors if terminal)
    pub fn format_aligned(&self, width: usize) -> String {
        let raw = self.raw();
        match self {
            CellValue::Text(_) => {
                pad_str(&truncate_str(&raw, width), width, Alignment::Left, None).into_owned()
            }
            CellValue::Code(_) => {
                let shown = truncate_str(&raw, width);
                pad_str(&style(shown).cyan().to_string(), width, Alignment::Left, None)
                    .into_owned()
            }
            CellValue::Qty(_) => pad_str(&raw, width, Alignment::Right, None).into_owned(),
            CellValue::Balance(n) => {
                let styled = if *n < 0.0 {
                    style(raw).red().bold().to_string()
                } else {
                    style(raw).green().to_string()
                };
                pad_str(&styled, width, Alignment::Right, None).into_owned()
            }
            CellValue::Date(None) | CellValue::Empty | CellValue::Recency(None) => {
                pad_str(&style("-").dim().to_string(), width, Alignment::Left, None).into_owned()
            }
            CellValue::Date(Some(_)) => pad_str(&raw, width, Alignment::Left, None).into_owned(),
            CellValue::Flag(b) => {
                let mark = if *b {
                    style("✓").green().to_string()
                } else {
                    String::new()
                };
                pad_str(&mark, width, Alignment::Left, None).into_owned()
            }
            CellValue::Recency(Some(r)) => {
                let styled = match r {
                    Recency::WithinOneWeek => style(raw).red().bold(),
                    Recency::WithinTwoWeeks => style(raw).yellow(),
                };
                pad_str(&styled.to_string(), width, Alignment::Left, None).into_owned()
            }
        }
    }

    /// Format for CSV output (RFC 4180, no colors)
    pub fn format_csv(&self) -> String {
        escape_csv(&self.raw())
    }

    /// Format for Markdown output (no colors, escaped pipes)
    pub fn format_md(&self) -> String {
        let raw = match self {
            CellValue::Empty | CellValue::Date(None) | CellValue::Recency(None) => "-".to_string(),
            _ => self.raw(),
        };
        raw.replace('|', "\\|")
    }

    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Qty(n) | CellValue::Balance(n) => serde_json::json!(n),
            CellValue::Flag(b) => Value::Bool(*b),
            CellValue::Date(None) | CellValue::Recency(None) | CellValue::Empty => Value::Null,
            _ => Value::String(self.raw()),
        }
    }

    /// Display width of this cell's content (for dynamic column sizing)
    pub fn display_width(&self) -> usize {
        match self {
            CellValue::Empty | CellValue::Date(None) | CellValue::Recency(None) => 1,
            _ => measure_text_width(&self.raw()),
        }
    }
}

/// Column definition with header label and maximum width
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub key: String,
    pub header: String,
    pub width: usize,
}

impl ColumnDef {
    pub fn new(key: &str, header: &str, width: usize) -> Self {
        Self {
            key: key.to_string(),
            header: header.to_string(),
            width,
        }
    }

    /// Columns keyed and titled by the same (Korean) header
    pub fn titled(headers: &[&str], width: usize) -> Vec<Self> {
        headers.iter().map(|h| Self::new(h, h, width)).collect()
    }
}

/// A row of cell values for table output
#[derive(Debug, Clone, Default)]
pub struct TableRow {
    pub cells: Vec<(String, CellValue)>,
}

impl TableRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell(mut self, key: &str, value: CellValue) -> Self {
        self.cells.push((key.to_string(), value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Columns and rows for a plain text [`Sheet`] view
pub fn sheet_rows(sheet: &Sheet) -> (Vec<ColumnDef>, Vec<TableRow>) {
    let headers: Vec<&str> = sheet.headers.iter().map(String::as_str).collect();
    let columns = ColumnDef::titled(&headers, 24);
    let rows = sheet
        .rows
        .iter()
        .map(|r| {
            sheet
                .headers
                .iter()
                .zip(r)
                .fold(TableRow::new(), |row, (h, v)| {
                    row.cell(h, CellValue::Text(v.clone()))
                })
        })
        .collect();
    (columns, rows)
}

/// Table formatter that outputs rows in various formats
pub struct TableFormatter<'a> {
    columns: &'a [ColumnDef],
    noun: &'static str,
    config: TableConfig,
}

impl<'a> TableFormatter<'a> {
    pub fn new(columns: &'a [ColumnDef], noun: &'static str) -> Self {
        Self {
            columns,
            noun,
            config: TableConfig::default(),
        }
    }

    /// Configure the formatter with custom settings
    pub fn with_config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    /// Output rows in the specified format
    pub fn output<I>(&self, rows: I, format: OutputFormat)
    where
        I: IntoIterator<Item = TableRow>,
    {
        let rows: Vec<TableRow> = rows.into_iter().collect();
        match format {
            OutputFormat::Auto if console::Term::stdout().is_term() => self.output_aligned(&rows),
            OutputFormat::Auto => self.output_tsv(&rows),
            OutputFormat::Table => self.output_table(&rows),
            OutputFormat::Tsv => self.output_tsv(&rows),
            OutputFormat::Csv => self.output_csv(&rows),
            OutputFormat::Json => self.output_json(&rows),
            OutputFormat::Md => self.output_md(&rows),
        }
    }

    /// Dynamic column widths, capped at each column's maximum
    fn calculate_widths(&self, rows: &[TableRow]) -> Vec<usize> {
        self.columns
            .iter()
            .map(|col| {
                let max_content = rows
                    .iter()
                    .filter_map(|r| r.get(&col.key))
                    .map(CellValue::display_width)
                    .max()
                    .unwrap_or(0);
                measure_text_width(&col.header)
                    .max(max_content)
                    .min(col.width.max(measure_text_width(&col.header)))
            })
            .collect()
    }

    fn value<'r>(&self, row: &'r TableRow, col: &ColumnDef) -> Option<&'r CellValue> {
        row.get(&col.key)
    }

    fn summary(&self, count: usize) {
        if self.config.show_summary {
            println!();
            println!("{} {}(s) found.", style(count).cyan(), self.noun);
        }
    }

    fn output_aligned(&self, rows: &[TableRow]) {
        let widths = self.calculate_widths(rows);

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(col, w)| {
                pad_str(&style(&col.header).bold().to_string(), *w, Alignment::Left, None)
                    .into_owned()
            })
            .collect();
        println!("{}", header.join("  "));

        let total_width: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        println!("{}", "-".repeat(total_width));

        for row in rows {
            let parts: Vec<String> = self
                .columns
                .iter()
                .zip(&widths)
                .map(|(col, w)| match self.value(row, col) {
                    Some(v) => v.format_aligned(*w),
                    None => CellValue::Empty.format_aligned(*w),
                })
                .collect();
            println!("{}", parts.join("  "));
        }

        self.summary(rows.len());
    }

    fn output_table(&self, rows: &[TableRow]) {
        let mut builder = Builder::default();
        builder.push_record(self.columns.iter().map(|c| c.header.clone()));
        for row in rows {
            builder.push_record(
                self.columns
                    .iter()
                    .map(|c| self.value(row, c).map(CellValue::raw).unwrap_or_default()),
            );
        }
        println!("{}", builder.build().with(Style::rounded()));
        self.summary(rows.len());
    }

    fn output_tsv(&self, rows: &[TableRow]) {
        let headers: Vec<&str> = self.columns.iter().map(|c| c.key.as_str()).collect();
        println!("{}", headers.join("\t"));
        for row in rows {
            let values: Vec<String> = self
                .columns
                .iter()
                .map(|c| {
                    self.value(row, c)
                        .map(|v| v.raw().replace(['\t', '\n'], " "))
                        .unwrap_or_default()
                })
                .collect();
            println!("{}", values.join("\t"));
        }
    }

    fn output_csv(&self, rows: &[TableRow]) {
        let headers: Vec<String> = self.columns.iter().map(|c| escape_csv(&c.key)).collect();
        println!("{}", headers.join(","));
        for row in rows {
            let values: Vec<String> = self
                .columns
                .iter()
                .map(|c| self.value(row, c).map(CellValue::format_csv).unwrap_or_default())
                .collect();
            println!("{}", values.join(","));
        }
    }

    fn output_md(&self, rows: &[TableRow]) {
        let headers: Vec<&str> = self.columns.iter().map(|c| c.header.as_str()).collect();
        println!("| {} |", headers.join(" | "));
        let separators: Vec<&str> = headers.iter().map(|_| "---").collect();
        println!("|{}|", separators.join("|"));
        for row in rows {
            let values: Vec<String> = self
                .columns
                .iter()
                .map(|c| {
                    self.value(row, c)
                        .map(CellValue::format_md)
                        .unwrap_or_else(|| "-".to_string())
                })
                .collect();
            println!("| {} |", values.join(" | "));
        }
    }

    fn output_json(&self, rows: &[TableRow]) {
        let items: Vec<Value> = rows
            .iter()
            .map(|row| {
                let mut obj = Map::new();
                for c in self.columns {
                    let v = self.value(row, c).map(CellValue::to_json).unwrap_or(Value::Null);
                    obj.insert(c.key.clone(), v);
                }
                Value::Object(obj)
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&items).unwrap_or_default()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_text_format() {
        let cell = CellValue::Text("Hello World".to_string());
        assert!(cell.format_aligned(20).contains("Hello World"));
        assert_eq!(cell.format_csv(), "Hello World");
        assert_eq!(cell.format_md(), "Hello World");
    }

    #[test]
    fn test_cell_value_quantities() {
        assert_eq!(CellValue::Qty(1500.0).raw(), "1500");
        assert_eq!(CellValue::Qty(2.5).raw(), "2.5");
        assert_eq!(CellValue::Balance(-3.0).to_json(), serde_json::json!(-3.0));
    }

    #[test]
    fn test_cell_value_placeholders() {
        assert_eq!(CellValue::Date(None).format_md(), "-");
        assert_eq!(CellValue::Date(None).to_json(), Value::Null);
        assert_eq!(CellValue::Flag(true).raw(), "✓");
        assert_eq!(CellValue::Flag(false).format_csv(), "");
        assert_eq!(
            CellValue::Recency(Some(Recency::WithinTwoWeeks)).raw(),
            "2주 이내"
        );
    }

    #[test]
    fn test_cell_value_md_escapes_pipes() {
        let cell = CellValue::Text("a|b|c".to_string());
        assert_eq!(cell.format_md(), "a\\|b\\|c");
    }

    #[test]
    fn test_display_width_counts_hangul_double() {
        assert_eq!(CellValue::Text("품번".into()).display_width(), 4);
        assert_eq!(CellValue::Code("P-1".into()).display_width(), 3);
    }

    #[test]
    fn test_table_row_builder() {
        let row = TableRow::new()
            .cell("part", CellValue::Code("P-1".to_string()))
            .cell("qty", CellValue::Qty(3.0));
        assert!(row.get("part").is_some());
        assert!(row.get("missing").is_none());
    }

    #[test]
    fn test_sheet_rows_keep_header_order() {
        let sheet = Sheet::from_strs("입고", &["품번", "품명"], &[&["P-1", "용기"]]);
        let (columns, rows) = sheet_rows(&sheet);
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[1].header, "품명");
        assert_eq!(rows[0].get("품명").map(CellValue::raw), Some("용기".to_string()));
    }

    #[test]
    fn test_widths_are_capped() {
        let columns = vec![ColumnDef::new("name", "NAME", 6)];
        let formatter = TableFormatter::new(&columns, "row");
        let rows = vec![TableRow::new().cell("name", CellValue::Text("a very long name".into()))];
        assert_eq!(formatter.calculate_widths(&rows), vec![6]);
    }

    #[test]
    fn test_table_config_for_pipe() {
        assert!(TableConfig::default().show_summary);
        assert!(!TableConfig::for_pipe().show_summary);
    }
}
