//! Column resolution for loosely-structured ledger sheets
//!
//! Ledger headers drift between plant versions, so every lookup names both a
//! list of acceptable headers and the spreadsheet letter the column usually
//! lives at. Headers win; the letter is the fallback.

use miette::Diagnostic;
use std::collections::HashMap;
use thiserror::Error;

/// A lookup that cannot proceed without columns the sheet does not have
#[derive(Debug, Error, Diagnostic)]
#[error("sheet '{sheet}' is missing required columns: {columns}")]
#[diagnostic(
    code(submat::columns::missing),
    help("check the header row of the uploaded workbook")
)]
pub struct MissingColumns {
    pub sheet: String,
    pub columns: String,
}

impl MissingColumns {
    pub fn new(sheet: &str, columns: &str) -> Self {
        Self {
            sheet: sheet.to_string(),
            columns: columns.to_string(),
        }
    }
}

/// Convert a spreadsheet column letter (`A`, `Z`, `AA`, `AH`, ...) to a 0-based index
///
/// Lowercase input is accepted and non-letter characters are skipped.
/// Returns `None` for an input with no letters at all.
pub fn excel_col_to_index(letter: &str) -> Option<usize> {
    let mut result = 0usize;
    let mut seen = false;
    for ch in letter.chars().map(|c| c.to_ascii_uppercase()) {
        if !ch.is_ascii_uppercase() {
            continue;
        }
        seen = true;
        result = result * 26 + (ch as usize - 'A' as usize + 1);
    }
    if seen {
        Some(result - 1)
    } else {
        None
    }
}

/// Resolve a column: first preferred header present, else the letter's position
pub fn pick_col(headers: &[String], letter: &str, preferred: &[&str]) -> Option<usize> {
    for name in preferred {
        if let Some(idx) = headers.iter().position(|h| h == name) {
            return Some(idx);
        }
    }
    let idx = excel_col_to_index(letter)?;
    if idx < headers.len() {
        tracing::debug!(letter, idx, header = %headers[idx], "column resolved by position");
        Some(idx)
    } else {
        None
    }
}

/// Exact header lookup with no positional fallback
pub fn find_col(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

/// First header among `candidates` that exists
pub fn find_any(headers: &[String], candidates: &[&str]) -> Option<usize> {
    candidates.iter().find_map(|name| find_col(headers, name))
}

/// Lenient numeric coercion used for every quantity cell
///
/// Blank, `NaN` and unparsable text become 0; thousands separators are ignored.
pub fn safe_num(text: &str) -> f64 {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return 0.0;
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Normalize raw header cells the way the ledger tooling always has
///
/// Headers are trimmed, blanks become `Unnamed: <i>`, and repeated names get
/// `.1`, `.2`, ... suffixes so that e.g. a second `불량유형` column is reachable
/// as `불량유형.1`.
pub fn normalize_headers<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::new();
    for (i, h) in raw.into_iter().enumerate() {
        let trimmed = h.as_ref().trim();
        let base = if trimmed.is_empty() {
            format!("Unnamed: {}", i)
        } else {
            trimmed.to_string()
        };
        let name = match seen.get_mut(&base) {
            Some(count) => {
                let name = format!("{}.{}", base, count);
                *count += 1;
                name
            }
            None => base.clone(),
        };
        seen.entry(base).or_insert(1);
        out.push(name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_excel_col_to_index() {
        assert_eq!(excel_col_to_index("A"), Some(0));
        assert_eq!(excel_col_to_index("z"), Some(25));
        assert_eq!(excel_col_to_index("AA"), Some(26));
        assert_eq!(excel_col_to_index("AG"), Some(32));
        assert_eq!(excel_col_to_index("AH"), Some(33));
        assert_eq!(excel_col_to_index("1"), None);
    }

    #[test]
    fn test_pick_col_prefers_named_header() {
        let h = headers(&["x", "y", "품번", "z"]);
        // Letter A would point at "x", but the preferred header exists
        assert_eq!(pick_col(&h, "A", &["품번"]), Some(2));
    }

    #[test]
    fn test_pick_col_falls_back_to_letter() {
        let h = headers(&["x", "y", "z"]);
        assert_eq!(pick_col(&h, "B", &["없는컬럼"]), Some(1));
        assert_eq!(pick_col(&h, "Q", &["없는컬럼"]), None);
    }

    #[test]
    fn test_pick_col_tries_preferred_in_order() {
        let h = headers(&["요청일", "요청날짜"]);
        assert_eq!(pick_col(&h, "K", &["요청날짜", "요청일"]), Some(1));
    }

    #[test]
    fn test_safe_num() {
        assert_eq!(safe_num("12"), 12.0);
        assert_eq!(safe_num(" 1,234.5 "), 1234.5);
        assert_eq!(safe_num(""), 0.0);
        assert_eq!(safe_num("NaN"), 0.0);
        assert_eq!(safe_num("abc"), 0.0);
        assert_eq!(safe_num("-3"), -3.0);
    }

    #[test]
    fn test_normalize_headers_dedupes_and_names_blanks() {
        let h = normalize_headers([" 불량유형", "", "불량유형", "불량유형", "수량 "]);
        assert_eq!(
            h,
            vec!["불량유형", "Unnamed: 1", "불량유형.1", "불량유형.2", "수량"]
        );
    }
}
