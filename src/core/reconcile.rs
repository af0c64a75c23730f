//! Expected-stock reconciliation for return tracking
//!
//! `expected = physical − (produced + qc + other) × unit_qty − material_fault − process_fault`

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

use crate::core::aggregates::Aggregates;
use crate::core::dates::{parse_date, within};
use crate::core::ledger::{cell, format_number, Sheet};
use crate::entities::Process;

/// Columns shown in the on-screen reconciliation view
pub const VISIBLE_COLS: [&str; 15] = [
    "수주번호",
    "완성품번",
    "품번",
    "품명",
    "ERP불출수량",
    "현장실물입고",
    "지시수량",
    "생산수량",
    "QC샘플",
    "기타샘플",
    "단위수량",
    "원불",
    "작불",
    "예상재고",
    "ERP재고",
];

/// Columns of the consolidated CSV export, in order
pub const CSV_COLS: [&str; 23] = [
    "수주번호",
    "지시번호",
    "생산공정",
    "생산시작일",
    "생산종료일",
    "종료조건",
    "환입일",
    "환입주차",
    "완성품번",
    "완성품명",
    "품번",
    "품명",
    "ERP불출수량",
    "현장실물입고",
    "지시수량",
    "생산수량",
    "QC샘플",
    "기타샘플",
    "단위수량",
    "원불",
    "작불",
    "예상재고",
    "ERP재고",
];

/// One component of a finished item being returned, as entered by the operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnRow {
    pub order: String,
    pub work_order: String,
    pub process: Process,
    pub production_start: Option<NaiveDate>,
    pub production_end: Option<NaiveDate>,
    pub finish_condition: String,
    pub return_date: NaiveDate,
    pub return_week: String,
    pub finished_part: String,
    pub finished_name: String,
    pub part: String,
    pub part_name: String,
    pub unit_qty: f64,
}

impl ReturnRow {
    fn key(&self) -> (&str, &str, &str) {
        (&self.order, &self.work_order, &self.part)
    }
}

/// A tracking row joined against the rollups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationRow {
    pub row: ReturnRow,
    pub erp_issued: f64,
    pub physical: f64,
    pub ordered: f64,
    pub produced: f64,
    pub qc_sample: f64,
    pub other_sample: f64,
    pub material_fault: f64,
    pub process_fault: f64,
    pub expected: f64,
    pub erp_stock: f64,
    #[serde(default)]
    pub extra_orders: Vec<String>,
    #[serde(default)]
    pub common_material: bool,
    #[serde(default)]
    pub label_selected: bool,
}

impl ExpectationRow {
    /// A row with every figure at zero
    pub fn blank(row: ReturnRow) -> Self {
        Self {
            row,
            erp_issued: 0.0,
            physical: 0.0,
            ordered: 0.0,
            produced: 0.0,
            qc_sample: 0.0,
            other_sample: 0.0,
            material_fault: 0.0,
            process_fault: 0.0,
            expected: 0.0,
            erp_stock: 0.0,
            extra_orders: Vec::new(),
            common_material: false,
            label_selected: false,
        }
    }

    /// Re-evaluate the expected-stock formula from the current figures
    pub fn evaluate(&mut self) {
        self.expected = self.physical
            - (self.produced + self.qc_sample + self.other_sample) * self.row.unit_qty
            - self.material_fault
            - self.process_fault;
    }

    /// Cell text for a Korean column name; unknown columns are empty
    pub fn field(&self, column: &str) -> String {
        let date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
        match column {
            "수주번호" => self.row.order.clone(),
            "지시번호" => self.row.work_order.clone(),
            "생산공정" => self.row.process.to_string(),
            "생산시작일" => date(self.row.production_start),
            "생산종료일" => date(self.row.production_end),
            "종료조건" => self.row.finish_condition.clone(),
            "환입일" => self.row.return_date.to_string(),
            "환입주차" => self.row.return_week.clone(),
            "완성품번" => self.row.finished_part.clone(),
            "완성품명" => self.row.finished_name.clone(),
            "품번" => self.row.part.clone(),
            "품명" => self.row.part_name.clone(),
            "ERP불출수량" => format_number(self.erp_issued),
            "현장실물입고" => format_number(self.physical),
            "지시수량" => format_number(self.ordered),
            "생산수량" => format_number(self.produced),
            "QC샘플" => format_number(self.qc_sample),
            "기타샘플" => format_number(self.other_sample),
            "단위수량" => format_number(self.row.unit_qty),
            "원불" => format_number(self.material_fault),
            "작불" => format_number(self.process_fault),
            "예상재고" => format_number(self.expected),
            "ERP재고" => format_number(self.erp_stock),
            "추가수주" => self.extra_orders.join(", "),
            "공통부자재" => flag(self.common_material),
            "라벨선택" => flag(self.label_selected),
            _ => String::new(),
        }
    }

    pub fn values(&self, columns: &[&str]) -> Vec<String> {
        columns.iter().map(|c| self.field(c)).collect()
    }
}

fn flag(value: bool) -> String {
    let mark = if value { "✓" } else { "" };
    mark.to_string()
}

/// Drop duplicate (order, work order, part) rows, keeping the last occurrence
fn dedupe_keep_last(rows: &[ReturnRow]) -> Vec<&ReturnRow> {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    for r in rows.iter().rev() {
        if seen.insert(r.key()) {
            kept.push(r);
        }
    }
    kept.reverse();
    kept
}

/// Join tracking rows against the rollups and evaluate expected stock
pub fn recalc(rows: &[ReturnRow], aggs: &Aggregates) -> Vec<ExpectationRow> {
    let out: Vec<ExpectationRow> = dedupe_keep_last(rows)
        .into_iter()
        .map(|r| {
            let mut e = ExpectationRow::blank(r.clone());
            if let Some(rec) = aggs.receipt(&r.order, &r.work_order, &r.part) {
                e.erp_issued = rec.erp_issued;
                e.physical = rec.physical;
            }
            e.ordered = aggs.ordered_qty(&r.work_order);
            if let Some(p) = aggs.production_for(&r.order, &r.work_order) {
                e.produced = p.produced;
                e.qc_sample = p.qc_sample;
                e.other_sample = p.other_sample;
            }
            let d = aggs.defect(&r.work_order, &r.part);
            e.material_fault = d.material_fault;
            e.process_fault = d.process_fault;
            e.erp_stock = aggs.erp_stock(&r.part);
            e.evaluate();
            e
        })
        .collect();
    debug!(input = rows.len(), output = out.len(), "expectation recalculated");
    out
}

/// Split a free-text order list on spaces, commas, semicolons and slashes
pub fn parse_order_list(text: &str) -> Vec<String> {
    text.split(|c: char| matches!(c, ' ' | ',' | ';' | '/'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Distinct receipt orders for a part within a request-date range, excluding `base_order`
pub fn extra_orders_for(
    receipts: &Sheet,
    part: &str,
    base_order: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<String> {
    let (Some(date_col), Some(part_col), Some(order_col)) = (
        receipts.col("K", &["요청날짜", "요청일"]),
        receipts.col("M", &["품번"]),
        receipts.col("B", &["수주번호"]),
    ) else {
        return Vec::new();
    };

    let mut orders: Vec<String> = Vec::new();
    for row in &receipts.rows {
        if cell(row, part_col) != part {
            continue;
        }
        let Some(date) = parse_date(cell(row, date_col)) else {
            continue;
        };
        if !within(date, from, to) {
            continue;
        }
        let order = cell(row, order_col);
        if order.is_empty() || order == base_order || orders.iter().any(|o| o == order) {
            continue;
        }
        orders.push(order.to_string());
    }
    orders
}

/// Resum receipts and production over the base order plus its extra orders
///
/// Defects stay as they are. When no rollup entry matches, the current
/// figures are kept.
pub fn recompute_with_extra_orders(row: &mut ExpectationRow, aggs: &Aggregates) {
    if row.row.part.is_empty() || row.row.order.is_empty() {
        return;
    }
    let mut orders = vec![row.row.order.clone()];
    orders.extend(row.extra_orders.iter().cloned());

    if let Some(rec) = aggs.receipts_by_orders(&row.row.part, &orders) {
        row.erp_issued = rec.erp_issued;
        row.physical = rec.physical;
    }
    if let Some(p) = aggs.production_by_orders(&orders) {
        row.produced = p.produced;
        row.qc_sample = p.qc_sample;
        row.other_sample = p.other_sample;
    }
    row.evaluate();
}

/// Fill extra orders for rows flagged as common material, then recompute them
///
/// Returns how many rows gained at least one new order.
pub fn fill_extra_orders(
    rows: &mut [ExpectationRow],
    receipts: &Sheet,
    aggs: &Aggregates,
    from: NaiveDate,
    to: NaiveDate,
) -> usize {
    let mut changed = 0;
    for row in rows.iter_mut().filter(|r| r.common_material) {
        let found = extra_orders_for(receipts, &row.row.part, &row.row.order, from, to);
        if !found.is_empty() {
            let merged: BTreeSet<String> =
                row.extra_orders.iter().cloned().chain(found).collect();
            if merged.len() != row.extra_orders.len() {
                changed += 1;
            }
            row.extra_orders = merged.into_iter().collect();
        }
        recompute_with_extra_orders(row, aggs);
    }
    changed
}

/// Parts tracked under more than one order, with their (order, finished name) choices
pub fn parts_with_multiple_orders(rows: &[ExpectationRow]) -> BTreeMap<String, Vec<(String, String)>> {
    let mut by_part: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
    for r in rows {
        let choices = by_part.entry(r.row.part.clone()).or_default();
        let choice = (r.row.order.clone(), r.row.finished_name.clone());
        if !choices.contains(&choice) {
            choices.push(choice);
        }
    }
    by_part.retain(|_, choices| {
        let orders: HashSet<&str> = choices.iter().map(|(o, _)| o.as_str()).collect();
        orders.len() > 1
    });
    by_part
}

/// Collapse rows to one per part for export
///
/// Rows sharing (order, work order, part) are merged first by summing
/// ERP-issued and physical receipts. Then each part collapses onto a
/// representative row: the one whose order is named in `primary_orders`,
/// else the first. Quantities are summed; unit quantity and ERP stock come
/// from the representative.
pub fn consolidate(
    rows: &[ExpectationRow],
    primary_orders: &BTreeMap<String, String>,
) -> Vec<ExpectationRow> {
    let mut step1: BTreeMap<(String, String, String), ExpectationRow> = BTreeMap::new();
    for r in rows {
        let key = (
            r.row.order.clone(),
            r.row.work_order.clone(),
            r.row.part.clone(),
        );
        match step1.get_mut(&key) {
            Some(existing) => {
                existing.erp_issued += r.erp_issued;
                existing.physical += r.physical;
            }
            None => {
                step1.insert(key, r.clone());
            }
        }
    }

    let mut by_part: BTreeMap<String, Vec<ExpectationRow>> = BTreeMap::new();
    for r in step1.into_values() {
        by_part.entry(r.row.part.clone()).or_default().push(r);
    }

    by_part
        .into_iter()
        .filter_map(|(part, group)| {
            let header = primary_orders
                .get(&part)
                .and_then(|order| group.iter().find(|r| &r.row.order == order))
                .or_else(|| group.first())?;

            let mut out = header.clone();
            macro_rules! sum {
                ($($field:ident),*) => {
                    $( out.$field = group.iter().map(|r| r.$field).sum(); )*
                };
            }
            sum!(
                erp_issued,
                physical,
                ordered,
                produced,
                qc_sample,
                other_sample,
                material_fault,
                process_fault,
                expected
            );
            Some(out)
        })
        .collect()
}
