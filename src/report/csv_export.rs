use std::collections::BTreeMap;

use super::ReportError;
use crate::core::reconcile::{consolidate, ExpectationRow, CSV_COLS};

/// Consolidated per-part CSV with a UTF-8 byte-order mark
pub fn export_csv(
    rows: &[ExpectationRow],
    primary_orders: &BTreeMap<String, String>,
) -> Result<Vec<u8>, ReportError> {
    if rows.is_empty() {
        return Err(ReportError::Empty);
    }
    let mut writer = csv::Writer::from_writer(b"\xEF\xBB\xBF".to_vec());
    writer.write_record(CSV_COLS)?;
    for row in consolidate(rows, primary_orders) {
        writer.write_record(row.values(&CSV_COLS))?;
    }
    writer
        .into_inner()
        .map_err(|e| ReportError::Csv(e.into_error().into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reconcile::tests::tracking_row;

    #[test]
    fn test_csv_is_consolidated_per_part() {
        let mut a = ExpectationRow::blank(tracking_row("SO-1", "WO-1", "P-1", 1.0));
        a.physical = 10.0;
        let mut b = ExpectationRow::blank(tracking_row("SO-2", "WO-2", "P-1", 1.0));
        b.physical = 5.0;
        let c = ExpectationRow::blank(tracking_row("SO-1", "WO-1", "P-2", 1.0));

        let mut primary = BTreeMap::new();
        primary.insert("P-1".to_string(), "SO-2".to_string());

        let bytes = export_csv(&[a, b, c], &primary).unwrap();
        assert!(bytes.starts_with(b"\xEF\xBB\xBF"));

        let mut reader = csv::Reader::from_reader(&bytes[3..]);
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), CSV_COLS.len());
        assert_eq!(&headers[0], "수주번호");

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "SO-2");
        assert_eq!(&records[0][10], "P-1");
        assert_eq!(&records[0][13], "15");
    }

    #[test]
    fn test_empty_session_is_error() {
        assert!(matches!(
            export_csv(&[], &BTreeMap::new()),
            Err(ReportError::Empty)
        ));
    }
}
