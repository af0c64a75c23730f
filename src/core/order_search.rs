//! Trace a component part up the BOM to live sales orders
//!
//! Level 1 looks for sales orders on the finished items that use the part.
//! When none exist, level 2 climbs one BOM step and tries again. Level 3
//! climbs once more and returns every order it finds, newest due date first.
//! Levels 1 and 2 go through a fixed escalation of due-date windows around the
//! reference day and stop at the first window that matches anything.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::cmp::Reverse;
use std::fmt;
use tracing::debug;

use crate::core::columns::MissingColumns;
use crate::core::dates::{parse_date, within};
use crate::core::ledger::{cell, cell_opt, Ledger, Sheet};

/// Due-date window used to pick sales orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchWindow {
    NextMonth,
    NextYear,
    Past3Months,
    Past6Months,
    Past12Months,
    /// No date filter (level-3 results)
    Unbounded,
}

impl SearchWindow {
    /// Windows tried in order; a wider one is only searched when the narrower ones are empty
    pub const ESCALATION: [SearchWindow; 5] = [
        SearchWindow::NextMonth,
        SearchWindow::NextYear,
        SearchWindow::Past3Months,
        SearchWindow::Past6Months,
        SearchWindow::Past12Months,
    ];

    /// Inclusive bounds relative to `today`
    pub fn bounds(self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let days = Duration::days;
        match self {
            SearchWindow::NextMonth => Some((today, today + days(30))),
            SearchWindow::NextYear => Some((today, today + days(365))),
            SearchWindow::Past3Months => Some((today - days(90), today)),
            SearchWindow::Past6Months => Some((today - days(180), today)),
            SearchWindow::Past12Months => Some((today - days(365), today)),
            SearchWindow::Unbounded => None,
        }
    }
}

impl fmt::Display for SearchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SearchWindow::NextMonth => "1개월 이내",
            SearchWindow::NextYear => "1년 이내",
            SearchWindow::Past3Months => "과거 3개월",
            SearchWindow::Past6Months => "과거 6개월",
            SearchWindow::Past12Months => "과거 12개월",
            SearchWindow::Unbounded => "전체",
        };
        write!(f, "{}", label)
    }
}

/// One sales-order line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesOrderHit {
    pub part: String,
    pub name: String,
    pub order: String,
    pub due: Option<NaiveDate>,
    pub qty: String,
    pub customer: String,
}

/// Sales order mapped onto a work order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkOrderLink {
    pub order: String,
    pub work_order: String,
    pub date: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OrderSearch {
    pub part: String,
    /// Item codes per BOM level climbed (index 0 = level 1)
    pub item_codes: Vec<Vec<String>>,
    /// Level whose item codes produced the orders (0 when nothing matched)
    pub bom_level: u8,
    pub window: Option<SearchWindow>,
    pub orders: Vec<SalesOrderHit>,
    pub work_orders: Vec<WorkOrderLink>,
    pub warnings: Vec<String>,
}

struct BomCols {
    item: usize,
    component: usize,
}

fn bom_cols(bom: &Sheet) -> Result<BomCols, MissingColumns> {
    match (
        bom.col("A", &["품목코드"]),
        bom.col("B", &["품명"]),
        bom.col("C", &["품번"]),
    ) {
        (Some(item), Some(_), Some(component)) => Ok(BomCols { item, component }),
        _ => Err(MissingColumns::new(&bom.name, "품목코드(A), 품명(B), 품번(C)")),
    }
}

/// Distinct parent item codes of any of `components`, in sheet order
fn parents(bom: &Sheet, cols: &BomCols, components: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for row in &bom.rows {
        if !components.iter().any(|c| c == cell(row, cols.component)) {
            continue;
        }
        let item = cell(row, cols.item);
        if !item.is_empty() && !out.iter().any(|o| o == item) {
            out.push(item.to_string());
        }
    }
    out
}

fn sales_orders_for(
    sales: &Sheet,
    part_col: usize,
    due_col: usize,
    codes: &[String],
) -> Vec<SalesOrderHit> {
    let name = sales.named("품명");
    let order = sales.named("수주번호");
    let qty = sales.named("수량");
    let customer = sales.named("매출처");

    sales
        .rows
        .iter()
        .filter(|row| codes.iter().any(|c| c == cell(row, part_col)))
        .map(|row| SalesOrderHit {
            part: cell(row, part_col).to_string(),
            name: cell_opt(row, name).to_string(),
            order: cell_opt(row, order).to_string(),
            due: parse_date(cell(row, due_col)),
            qty: cell_opt(row, qty).to_string(),
            customer: cell_opt(row, customer).to_string(),
        })
        .collect()
}

fn sort_by_due_desc(hits: &mut [SalesOrderHit]) {
    // Stable: undated rows sink to the bottom, ties keep sheet order
    hits.sort_by_key(|h| (h.due.is_none(), Reverse(h.due)));
}

/// Narrow candidates to the first non-empty window
pub fn apply_windows(
    candidates: &[SalesOrderHit],
    today: NaiveDate,
) -> Option<(SearchWindow, Vec<SalesOrderHit>)> {
    for window in SearchWindow::ESCALATION {
        let Some((from, to)) = window.bounds(today) else {
            continue;
        };
        let mut hits: Vec<SalesOrderHit> = candidates
            .iter()
            .filter(|h| h.due.is_some_and(|d| within(d, from, to)))
            .cloned()
            .collect();
        debug!(window = %window, hits = hits.len(), "due-date window searched");
        if !hits.is_empty() {
            sort_by_due_desc(&mut hits);
            return Some((window, hits));
        }
    }
    None
}

/// Work orders for the found sales orders, newest first
pub fn map_work_orders(
    work_orders: &Sheet,
    orders: &[String],
) -> Result<Vec<WorkOrderLink>, MissingColumns> {
    let (Some(order_col), Some(wo_col), Some(name_col)) = (
        work_orders.col("A", &["수주번호"]),
        work_orders.col("B", &["지시번호"]),
        work_orders.col("L", &["품명", "완성품명"]),
    ) else {
        return Err(MissingColumns::new(
            &work_orders.name,
            "수주번호(A), 지시번호(B), 품명(L)",
        ));
    };
    let date_col = work_orders.col("I", &["지시일자", "작지일자"]);

    let mut links: Vec<WorkOrderLink> = Vec::new();
    for row in &work_orders.rows {
        let order = cell(row, order_col);
        if order.is_empty() || !orders.iter().any(|o| o == order) {
            continue;
        }
        let link = WorkOrderLink {
            order: order.to_string(),
            work_order: cell(row, wo_col).to_string(),
            date: cell_opt(row, date_col).to_string(),
            name: cell(row, name_col).to_string(),
        };
        if !links.contains(&link) {
            links.push(link);
        }
    }

    links.sort_by(|a, b| {
        let (da, db) = (parse_date(&a.date), parse_date(&b.date));
        da.is_none()
            .cmp(&db.is_none())
            .then_with(|| db.cmp(&da))
            .then_with(|| a.work_order.cmp(&b.work_order))
    });
    Ok(links)
}

/// Find the sales orders (and their work orders) that consume `part`
pub fn find_orders(
    ledger: &Ledger,
    part: &str,
    today: NaiveDate,
) -> Result<OrderSearch, MissingColumns> {
    let bom = &ledger.bom;
    let cols = bom_cols(bom)?;
    let sales = &ledger.sales_orders;
    let (Some(part_col), Some(due_col)) = (
        sales.col("J", &["품번"]),
        sales.col("G", &["조정납기일자"]),
    ) else {
        return Err(MissingColumns::new(&sales.name, "품번(J), 조정납기일자(G)"));
    };

    let mut search = OrderSearch {
        part: part.to_string(),
        ..Default::default()
    };

    let level1 = parents(bom, &cols, &[part.trim().to_string()]);
    if level1.is_empty() {
        return Ok(search);
    }
    search.item_codes.push(level1.clone());

    let mut level = 1;
    let mut candidates = sales_orders_for(sales, part_col, due_col, &level1);

    if candidates.is_empty() {
        let level2 = parents(bom, &cols, &level1);
        if level2.is_empty() {
            return Ok(search);
        }
        search.item_codes.push(level2.clone());
        level = 2;
        candidates = sales_orders_for(sales, part_col, due_col, &level2);

        if candidates.is_empty() {
            let level3 = parents(bom, &cols, &level2);
            if level3.is_empty() {
                return Ok(search);
            }
            search.item_codes.push(level3.clone());
            let mut hits = sales_orders_for(sales, part_col, due_col, &level3);
            if hits.is_empty() {
                return Ok(search);
            }
            sort_by_due_desc(&mut hits);
            search.bom_level = 3;
            search.window = Some(SearchWindow::Unbounded);
            search.orders = hits;
        }
    }

    if search.bom_level == 0 {
        if let Some((window, hits)) = apply_windows(&candidates, today) {
            search.bom_level = level;
            search.window = Some(window);
            search.orders = hits;
        }
    }

    if !search.orders.is_empty() {
        let mut orders: Vec<String> = Vec::new();
        for hit in &search.orders {
            if !hit.order.is_empty() && !orders.contains(&hit.order) {
                orders.push(hit.order.clone());
            }
        }
        match map_work_orders(&ledger.work_orders, &orders) {
            Ok(links) => search.work_orders = links,
            Err(e) => search.warnings.push(e.to_string()),
        }
    }

    debug!(
        part,
        level = search.bom_level,
        orders = search.orders.len(),
        work_orders = search.work_orders.len(),
        "order search finished"
    );
    Ok(search)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::SnapshotMeta;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ledger(bom: Sheet, sales: Sheet, work_orders: Sheet) -> Ledger {
        let empty = |name: &str| Sheet::from_strs(name, &["A"], &[]);
        Ledger::from_sheets(
            vec![
                empty("입고"),
                work_orders,
                sales,
                bom,
                empty("재고"),
                empty("생산실적"),
                empty("불량"),
            ],
            SnapshotMeta::new(),
        )
        .unwrap()
    }

    fn bom() -> Sheet {
        Sheet::from_strs(
            "BOM",
            &["품목코드", "품명", "품번", "단위수량"],
            &[
                &["FG-1", "크림", "LBL-1", "1"],
                &["SEMI-1", "반제품", "LBL-2", "1"],
                &["FG-2", "세트", "SEMI-1", "1"],
                &["SEMI-3", "반제품3", "LBL-3", "1"],
                &["SEMI-4", "반제품4", "SEMI-3", "1"],
                &["FG-3", "세트3", "SEMI-4", "1"],
            ],
        )
    }

    fn sales(rows: &[&[&str]]) -> Sheet {
        Sheet::from_strs("수주", &["수주번호", "품명", "조정납기일자", "수량", "매출처", "품번"], rows)
    }

    fn no_work_orders() -> Sheet {
        Sheet::from_strs("작업지시", &["수주번호", "지시번호", "지시일자", "품명"], &[])
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let today = day(2025, 6, 1);
        assert_eq!(
            SearchWindow::NextMonth.bounds(today),
            Some((today, day(2025, 7, 1)))
        );
        assert_eq!(
            SearchWindow::Past3Months.bounds(today),
            Some((day(2025, 3, 3), today))
        );
        assert_eq!(SearchWindow::Unbounded.bounds(today), None);
    }

    #[test]
    fn test_narrow_window_wins_over_wider() {
        let today = day(2025, 6, 1);
        let l = ledger(
            bom(),
            sales(&[
                &["SO-NEAR", "크림", "2025-06-20", "10", "A사", "FG-1"],
                &["SO-FAR", "크림", "2026-01-10", "10", "A사", "FG-1"],
                &["SO-PAST", "크림", "2025-05-01", "10", "A사", "FG-1"],
            ]),
            no_work_orders(),
        );
        let result = find_orders(&l, "LBL-1", today).unwrap();
        assert_eq!(result.bom_level, 1);
        assert_eq!(result.window, Some(SearchWindow::NextMonth));
        let orders: Vec<&str> = result.orders.iter().map(|o| o.order.as_str()).collect();
        assert_eq!(orders, vec!["SO-NEAR"]);
    }

    #[test]
    fn test_escalates_to_past_when_future_empty() {
        let today = day(2025, 6, 1);
        let l = ledger(
            bom(),
            sales(&[
                &["SO-OLD", "크림", "2024-12-01", "1", "", "FG-1"],
                &["SO-RECENT", "크림", "2025-04-15", "1", "", "FG-1"],
                &["SO-UNDATED", "크림", "", "1", "", "FG-1"],
            ]),
            no_work_orders(),
        );
        let result = find_orders(&l, "LBL-1", today).unwrap();
        assert_eq!(result.window, Some(SearchWindow::Past3Months));
        assert_eq!(result.orders.len(), 1);
        assert_eq!(result.orders[0].order, "SO-RECENT");
    }

    #[test]
    fn test_level_two_fallback() {
        let today = day(2025, 6, 1);
        let l = ledger(
            bom(),
            sales(&[&["SO-SET", "세트", "2025-06-02", "5", "B사", "FG-2"]]),
            no_work_orders(),
        );
        let result = find_orders(&l, "LBL-2", today).unwrap();
        assert_eq!(result.bom_level, 2);
        assert_eq!(result.item_codes, vec![vec!["SEMI-1"], vec!["FG-2"]]);
        assert_eq!(result.orders[0].customer, "B사");
    }

    #[test]
    fn test_level_three_returns_all_sorted() {
        let today = day(2025, 6, 1);
        let l = ledger(
            bom(),
            sales(&[
                &["SO-A", "세트3", "2019-01-01", "1", "", "FG-3"],
                &["SO-B", "세트3", "2030-01-01", "1", "", "FG-3"],
            ]),
            no_work_orders(),
        );
        let result = find_orders(&l, "LBL-3", today).unwrap();
        assert_eq!(result.bom_level, 3);
        assert_eq!(result.window, Some(SearchWindow::Unbounded));
        let orders: Vec<&str> = result.orders.iter().map(|o| o.order.as_str()).collect();
        assert_eq!(orders, vec!["SO-B", "SO-A"]);
    }

    #[test]
    fn test_unknown_part_finds_nothing() {
        let l = ledger(bom(), sales(&[]), no_work_orders());
        let result = find_orders(&l, "NOPE", day(2025, 6, 1)).unwrap();
        assert_eq!(result.bom_level, 0);
        assert!(result.item_codes.is_empty());
        assert!(result.orders.is_empty());
    }

    #[test]
    fn test_work_order_mapping_sorted_newest_first() {
        let today = day(2025, 6, 1);
        let l = ledger(
            bom(),
            sales(&[&["SO-1", "크림", "2025-06-10", "1", "", "FG-1"]]),
            Sheet::from_strs(
                "작업지시",
                &["수주번호", "지시번호", "지시일자", "품명"],
                &[
                    &["SO-1", "WO-2", "2025-05-01", "크림"],
                    &["SO-1", "WO-1", "2025-05-20", "크림"],
                    &["SO-1", "WO-1", "2025-05-20", "크림"],
                    &["SO-1", "WO-0", "2025-05-20", "크림"],
                    &["SO-9", "WO-9", "2025-05-30", "기타"],
                ],
            ),
        );
        let result = find_orders(&l, "LBL-1", today).unwrap();
        let wos: Vec<&str> = result.work_orders.iter().map(|w| w.work_order.as_str()).collect();
        assert_eq!(wos, vec!["WO-0", "WO-1", "WO-2"]);
    }

    #[test]
    fn test_missing_bom_columns_is_error() {
        let l = ledger(
            Sheet::from_strs("BOM", &["품목코드"], &[]),
            sales(&[]),
            no_work_orders(),
        );
        assert!(matches!(
            find_orders(&l, "X", day(2025, 1, 1)),
            Err(MissingColumns { .. })
        ));
    }
}
