//! Receipt history lookups on the 입고 sheet

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::core::columns::MissingColumns;
use crate::core::dates::{parse_date, within};
use crate::core::ledger::{cell, Sheet};
use crate::core::reconcile::ExpectationRow;

/// Receipt lookup filter
#[derive(Debug, Clone)]
pub struct InboundQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Case-insensitive substring on the part name
    pub name: Option<String>,
}

impl InboundQuery {
    /// Yesterday through today
    pub fn default_for(today: NaiveDate) -> Self {
        Self {
            from: today - Duration::days(1),
            to: today,
            name: None,
        }
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Receipts requested within the query range, newest ledger rows first
///
/// Only the columns that resolve are returned; the view is a [`Sheet`] whose
/// headers are the canonical Korean names.
pub fn lookup(receipts: &Sheet, query: &InboundQuery) -> Result<Sheet, MissingColumns> {
    let date_col = receipts
        .col("K", &["요청날짜", "요청일"])
        .ok_or_else(|| MissingColumns::new(&receipts.name, "요청날짜(K)"))?;

    let wanted: [(&str, Option<usize>); 8] = [
        ("생산공정", receipts.col("J", &["생산공정"])),
        ("요청날짜", Some(date_col)),
        ("요청번호", receipts.col("L", &["요청번호"])),
        ("품번", receipts.col("M", &["품번"])),
        ("품명", receipts.col("O", &["품명"])),
        ("요청수량", receipts.col("P", &["요청수량"])),
        ("ERP불출수량", receipts.col("Q", &["ERP불출수량", "불출수량"])),
        ("현장실물입고", receipts.col("R", &["현장실물입고"])),
    ];
    let columns: Vec<(&str, usize)> = wanted
        .iter()
        .filter_map(|(label, col)| col.map(|c| (*label, c)))
        .collect();
    let name_col = wanted[4].1;

    let rows: Vec<Vec<String>> = receipts
        .rows
        .iter()
        .rev()
        .filter(|row| {
            parse_date(cell(row, date_col)).is_some_and(|d| within(d, query.from, query.to))
        })
        .filter(|row| match (&query.name, name_col) {
            (Some(needle), Some(c)) if !needle.is_empty() => contains_ci(cell(row, c), needle),
            _ => true,
        })
        .map(|row| {
            columns
                .iter()
                .map(|(label, c)| {
                    let text = cell(row, *c);
                    if *label == "요청날짜" {
                        parse_date(text).map(|d| d.to_string()).unwrap_or_default()
                    } else {
                        text.to_string()
                    }
                })
                .collect()
        })
        .collect();

    Ok(Sheet::new(
        receipts.name.clone(),
        columns.iter().map(|(label, _)| label.to_string()).collect(),
        rows,
    ))
}

/// A recent (order, work order) pair for a finished product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentOrder {
    pub date: Option<NaiveDate>,
    pub order: String,
    pub work_order: String,
    pub product: String,
}

/// Orders whose receipts in the last 30 days name a matching product
pub fn recent_orders_by_product(
    receipts: &Sheet,
    keyword: &str,
    today: NaiveDate,
) -> Result<Vec<RecentOrder>, MissingColumns> {
    let (Some(date_col), Some(product_col)) = (
        receipts.col("K", &["요청날짜", "요청일"]),
        receipts.col("E", &["제품명", "품명"]),
    ) else {
        return Err(MissingColumns::new(&receipts.name, "요청날짜(K), 제품명(E)"));
    };
    let order_col = receipts.col("B", &["수주번호"]);
    let wo_col = receipts.col("C", &["지시번호"]);
    let from = today - Duration::days(30);

    let mut out: Vec<RecentOrder> = Vec::new();
    for row in &receipts.rows {
        let Some(date) = parse_date(cell(row, date_col)) else {
            continue;
        };
        if !within(date, from, today) || !contains_ci(cell(row, product_col), keyword) {
            continue;
        }
        let order = order_col.map(|c| cell(row, c)).unwrap_or("");
        let work_order = wo_col.map(|c| cell(row, c)).unwrap_or("");
        if out.iter().any(|r| r.order == order && r.work_order == work_order) {
            continue;
        }
        out.push(RecentOrder {
            date: Some(date),
            order: order.to_string(),
            work_order: work_order.to_string(),
            product: cell(row, product_col).to_string(),
        });
    }
    Ok(out)
}

/// Receipt remark attached to a tracked component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptRemark {
    pub part: String,
    pub name: String,
    pub remark: String,
}

/// Non-empty receipt remarks for the tracked (order, work order, part) rows
pub fn receipt_remarks(
    receipts: &Sheet,
    rows: &[ExpectationRow],
) -> Result<Vec<ReceiptRemark>, MissingColumns> {
    let (Some(order_col), Some(wo_col), Some(part_col), Some(remark_col)) = (
        receipts.col("B", &["수주번호"]),
        receipts.col("C", &["지시번호"]),
        receipts.col("M", &["품번"]),
        receipts.col("V", &["비고", "비고2"]),
    ) else {
        return Err(MissingColumns::new(
            &receipts.name,
            "수주번호(B), 지시번호(C), 품번(M), 비고(V)",
        ));
    };

    let mut out: Vec<ReceiptRemark> = Vec::new();
    for tracked in rows {
        for row in &receipts.rows {
            let remark = cell(row, remark_col);
            if remark.is_empty()
                || cell(row, order_col) != tracked.row.order
                || cell(row, wo_col) != tracked.row.work_order
                || cell(row, part_col) != tracked.row.part
            {
                continue;
            }
            let entry = ReceiptRemark {
                part: tracked.row.part.clone(),
                name: tracked.row.part_name.clone(),
                remark: remark.to_string(),
            };
            if !out.contains(&entry) {
                out.push(entry);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reconcile::tests::tracking_row;

    fn receipts() -> Sheet {
        Sheet::from_strs(
            "입고",
            &[
                "수주번호", "지시번호", "제품명", "생산공정", "요청날짜", "요청번호", "품번", "품명",
                "요청수량", "ERP불출수량", "현장실물입고", "비고",
            ],
            &[
                &["SO-1", "WO-1", "수분크림", "5층 기초", "2025-05-30", "R1", "P-1", "크림용기", "10", "10", "9", ""],
                &["SO-1", "WO-1", "수분크림", "5층 기초", "2025-05-31 14:10:00", "R2", "P-2", "크림캡", "5", "5", "5", "파손 1"],
                &["SO-2", "WO-2", "앰플세트", "6층 스틱", "2025-06-01", "R3", "P-1", "크림용기", "1", "1", "1", ""],
                &["SO-3", "WO-3", "오래된크림", "6층 스틱", "2025-01-01", "R4", "P-9", "기타", "1", "1", "1", "메모"],
            ],
        )
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[test]
    fn test_lookup_default_range_newest_first() {
        let view = lookup(&receipts(), &InboundQuery::default_for(day(1))).unwrap();
        assert_eq!(view.headers[0], "생산공정");
        assert_eq!(view.headers.len(), 8);
        let nos: Vec<&str> = view.rows.iter().map(|r| r[2].as_str()).collect();
        assert_eq!(nos, vec!["R3", "R2"]);
        assert_eq!(view.rows[1][1], "2025-05-31");
    }

    #[test]
    fn test_lookup_name_filter_is_case_insensitive() {
        let mut sheet = receipts();
        sheet.rows[2][7] = "Cream Jar".to_string();
        let query = InboundQuery {
            from: day(1) - Duration::days(10),
            to: day(1),
            name: Some("cream".to_string()),
        };
        let view = lookup(&sheet, &query).unwrap();
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0][4], "Cream Jar");
    }

    #[test]
    fn test_recent_orders_dedupes_pairs() {
        let found = recent_orders_by_product(&receipts(), "크림", day(1)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].order, "SO-1");
        assert_eq!(found[0].work_order, "WO-1");
    }

    #[test]
    fn test_receipt_remarks_match_tracked_rows() {
        let ledger_rows = vec![
            crate::core::reconcile::ExpectationRow::blank(tracking_row("SO-1", "WO-1", "P-2", 1.0)),
            crate::core::reconcile::ExpectationRow::blank(tracking_row("SO-1", "WO-1", "P-1", 1.0)),
        ];
        let remarks = receipt_remarks(&receipts(), &ledger_rows).unwrap();
        assert_eq!(remarks.len(), 1);
        assert_eq!(remarks[0].part, "P-2");
        assert_eq!(remarks[0].remark, "파손 1");
    }

    #[test]
    fn test_lookup_without_date_column_fails() {
        let sheet = Sheet::from_strs("입고", &["A"], &[]);
        assert!(lookup(&sheet, &InboundQuery::default_for(day(1))).is_err());
    }
}
