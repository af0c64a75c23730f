//! Date parsing for ledger cells

use chrono::{Datelike, NaiveDate, NaiveDateTime};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

/// Parse a ledger date cell; unparsable or blank cells yield `None`
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

/// Week-of-month label: days 1-7 are week 1, 8-14 week 2, and so on
pub fn week_of_month(date: NaiveDate) -> String {
    let week = (date.day() - 1) / 7 + 1;
    format!("{}월{}주차", date.month(), week)
}

/// Inclusive range check
pub fn within(date: NaiveDate, from: NaiveDate, to: NaiveDate) -> bool {
    date >= from && date <= to
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 11, 3);
        assert_eq!(parse_date("2025-11-03"), expected);
        assert_eq!(parse_date("2025-11-03 00:00:00"), expected);
        assert_eq!(parse_date("2025/11/03"), expected);
        assert_eq!(parse_date("2025.11.03"), expected);
        assert_eq!(parse_date(" 20251103 "), expected);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("미정"), None);
    }

    #[test]
    fn test_week_of_month() {
        let d = |day| NaiveDate::from_ymd_opt(2025, 11, day).unwrap();
        assert_eq!(week_of_month(d(1)), "11월1주차");
        assert_eq!(week_of_month(d(7)), "11월1주차");
        assert_eq!(week_of_month(d(8)), "11월2주차");
        assert_eq!(week_of_month(d(29)), "11월5주차");
    }
}
