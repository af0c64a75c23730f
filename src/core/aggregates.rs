//! Rollups over the raw ledger sheets
//!
//! Five independent group-and-sum passes. Each one resolves its columns
//! through the header/letter fallback; when a required column cannot be
//! found the rollup is left empty and the reason is recorded in
//! [`Aggregates::warnings`].

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::core::columns::safe_num;
use crate::core::ledger::{cell, cell_opt, Ledger, Sheet};

/// Workstations whose stock counts as ERP stock
pub const ERP_WORKSTATIONS: [&str; 4] = ["WC501", "WC502", "WC503", "WC504"];

/// Header candidates for the produced (good) quantity, in priority order
pub const PRODUCED_HEADERS: [&str; 5] = ["양품", "양품수량", "양품수", "합격", "생산수량"];

const MATERIAL_FAULT_PREFIX: &str = "(원)";
const PROCESS_FAULT_PREFIX: &str = "(작)";

/// (order, work order, part)
pub type ReceiptKey = (String, String, String);
/// (work order, input part)
pub type DefectKey = (String, String);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReceiptTotals {
    pub erp_issued: f64,
    pub physical: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductionTotals {
    /// First order number seen for the group
    pub order: String,
    pub produced: f64,
    pub qc_sample: f64,
    pub other_sample: f64,
}

impl ProductionTotals {
    pub fn total(&self) -> f64 {
        self.produced + self.qc_sample + self.other_sample
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DefectTotals {
    pub material_fault: f64,
    pub process_fault: f64,
}

/// What the production rollup is keyed by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductionKey {
    #[default]
    WorkOrder,
    Order,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregates {
    pub receipts: BTreeMap<ReceiptKey, ReceiptTotals>,
    pub work_orders: BTreeMap<String, f64>,
    pub production: BTreeMap<String, ProductionTotals>,
    pub production_key: ProductionKey,
    pub defects: BTreeMap<DefectKey, DefectTotals>,
    pub inventory: BTreeMap<String, f64>,
    /// One line per rollup that came back empty because of missing columns
    pub warnings: Vec<String>,
}

impl Aggregates {
    pub fn build(ledger: &Ledger) -> Self {
        let mut aggs = Self::default();
        aggs.build_receipts(&ledger.receipts);
        aggs.build_work_orders(&ledger.work_orders);
        aggs.build_production(&ledger.production);
        aggs.build_defects(&ledger.defects);
        aggs.build_inventory(&ledger.inventory);

        debug!(
            receipts = aggs.receipts.len(),
            work_orders = aggs.work_orders.len(),
            production = aggs.production.len(),
            defects = aggs.defects.len(),
            inventory = aggs.inventory.len(),
            "aggregates built"
        );
        aggs
    }

    fn missing(&mut self, rollup: &str, sheet: &Sheet, what: &str) {
        let msg = format!("{} rollup skipped: sheet '{}' has no {} column", rollup, sheet.name, what);
        warn!("{}", msg);
        self.warnings.push(msg);
    }

    fn build_receipts(&mut self, sheet: &Sheet) {
        let cols = (
            sheet.col("B", &["수주번호"]),
            sheet.col("C", &["지시번호"]),
            sheet.col("M", &["품번"]),
            sheet.col("Q", &["ERP불출수량"]),
            sheet.col("R", &["현장실물입고"]),
        );
        let (Some(order), Some(wo), Some(part), Some(erp), Some(real)) = cols else {
            self.missing("receipt", sheet, "order/work-order/part/ERP/physical");
            return;
        };

        for row in &sheet.rows {
            let key = (cell(row, order), cell(row, wo), cell(row, part));
            if key.0.is_empty() || key.1.is_empty() || key.2.is_empty() {
                continue;
            }
            let entry = self
                .receipts
                .entry((key.0.to_string(), key.1.to_string(), key.2.to_string()))
                .or_default();
            entry.erp_issued += safe_num(cell(row, erp));
            entry.physical += safe_num(cell(row, real));
        }
    }

    fn build_work_orders(&mut self, sheet: &Sheet) {
        let wo = sheet.named("지시번호").or_else(|| sheet.col("F", &["지시번호"]));
        let qty = sheet.named("수량").or_else(|| sheet.col("R", &["수량", "지시수량"]));
        let (Some(wo), Some(qty)) = (wo, qty) else {
            self.missing("work-order", sheet, "work-order/quantity");
            return;
        };

        for row in &sheet.rows {
            let key = cell(row, wo);
            if key.is_empty() {
                continue;
            }
            *self.work_orders.entry(key.to_string()).or_default() += safe_num(cell(row, qty));
        }
    }

    fn build_production(&mut self, sheet: &Sheet) {
        let wo = sheet
            .named("작지번호")
            .or_else(|| sheet.col("A", &["작지번호", "지시번호"]));
        let order = sheet.named("수주번호").or_else(|| sheet.col("E", &["수주번호"]));
        let produced = sheet.named_any(&PRODUCED_HEADERS);
        let qc = sheet.col("AG", &["QC샘플"]);
        let other = sheet.col("AH", &["기타샘플"]);

        let (key_col, key_kind) = match (wo, order) {
            (Some(c), _) => (c, ProductionKey::WorkOrder),
            (None, Some(c)) => (c, ProductionKey::Order),
            (None, None) => {
                self.missing("production", sheet, "work-order/order");
                return;
            }
        };
        self.production_key = key_kind;

        for row in &sheet.rows {
            let key = cell(row, key_col);
            if key.is_empty() {
                continue;
            }
            let entry = self.production.entry(key.to_string()).or_default();
            if entry.order.is_empty() {
                entry.order = cell_opt(row, order).to_string();
            }
            entry.produced += safe_num(cell_opt(row, produced));
            entry.qc_sample += safe_num(cell_opt(row, qc));
            entry.other_sample += safe_num(cell_opt(row, other));
        }
    }

    fn build_defects(&mut self, sheet: &Sheet) {
        let wo = sheet.named("작지번호").or_else(|| sheet.col("C", &["작지번호"]));
        let part = sheet.named("투입품번").or_else(|| sheet.col("Q", &["투입품번"]));
        let qty = sheet.named("불량수량").or_else(|| sheet.col("W", &["불량수량"]));
        let kind = sheet
            .named("불량유형.1")
            .or_else(|| sheet.col("Z", &["불량유형.1", "불량유형"]));
        let (Some(wo), Some(part), Some(qty), Some(kind)) = (wo, part, qty, kind) else {
            self.missing("defect", sheet, "work-order/input-part/quantity/type");
            return;
        };

        for row in &sheet.rows {
            let kind = cell(row, kind);
            let material = kind.starts_with(MATERIAL_FAULT_PREFIX);
            if !material && !kind.starts_with(PROCESS_FAULT_PREFIX) {
                continue;
            }
            let key = (cell(row, wo), cell(row, part));
            if key.0.is_empty() || key.1.is_empty() {
                continue;
            }
            let entry = self
                .defects
                .entry((key.0.to_string(), key.1.to_string()))
                .or_default();
            let amount = safe_num(cell(row, qty));
            if material {
                entry.material_fault += amount;
            } else {
                entry.process_fault += amount;
            }
        }
    }

    fn build_inventory(&mut self, sheet: &Sheet) {
        let wc = sheet.col("A", &["작업장"]);
        let part = sheet.col("D", &["품번"]);
        let qty = sheet.named("실재고수량").or_else(|| sheet.col("N", &["실재고수량"]));
        let (Some(wc), Some(part), Some(qty)) = (wc, part, qty) else {
            self.missing("inventory", sheet, "workstation/part/stock");
            return;
        };

        for row in &sheet.rows {
            if !ERP_WORKSTATIONS.contains(&cell(row, wc)) {
                continue;
            }
            let key = cell(row, part);
            if key.is_empty() {
                continue;
            }
            *self.inventory.entry(key.to_string()).or_default() += safe_num(cell(row, qty));
        }
    }

    pub fn receipt(&self, order: &str, work_order: &str, part: &str) -> Option<ReceiptTotals> {
        self.receipts
            .get(&(order.to_string(), work_order.to_string(), part.to_string()))
            .copied()
    }

    /// Production totals for a row, joined the way the rollup is keyed
    pub fn production_for(&self, order: &str, work_order: &str) -> Option<&ProductionTotals> {
        match self.production_key {
            ProductionKey::WorkOrder => self.production.get(work_order),
            ProductionKey::Order => self.production.get(order),
        }
    }

    /// Production summed over every group belonging to one of `orders`
    pub fn production_by_orders(&self, orders: &[String]) -> Option<ProductionTotals> {
        let mut hit = false;
        let mut sum = ProductionTotals::default();
        for (key, totals) in &self.production {
            let order = match self.production_key {
                ProductionKey::WorkOrder => &totals.order,
                ProductionKey::Order => key,
            };
            if orders.iter().any(|o| o == order) {
                hit = true;
                sum.produced += totals.produced;
                sum.qc_sample += totals.qc_sample;
                sum.other_sample += totals.other_sample;
            }
        }
        if hit {
            sum.order = orders.first().cloned().unwrap_or_default();
            Some(sum)
        } else {
            None
        }
    }

    /// Receipts for one part summed over a set of orders (any work order)
    pub fn receipts_by_orders(&self, part: &str, orders: &[String]) -> Option<ReceiptTotals> {
        let mut hit = false;
        let mut sum = ReceiptTotals::default();
        for ((order, _, p), totals) in &self.receipts {
            if p == part && orders.iter().any(|o| o == order) {
                hit = true;
                sum.erp_issued += totals.erp_issued;
                sum.physical += totals.physical;
            }
        }
        hit.then_some(sum)
    }

    pub fn defect(&self, work_order: &str, part: &str) -> DefectTotals {
        self.defects
            .get(&(work_order.to_string(), part.to_string()))
            .copied()
            .unwrap_or_default()
    }

    pub fn erp_stock(&self, part: &str) -> f64 {
        self.inventory.get(part).copied().unwrap_or(0.0)
    }

    pub fn ordered_qty(&self, work_order: &str) -> f64 {
        self.work_orders.get(work_order).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::ledger::SnapshotMeta;

    /// Small but complete ledger shared by the reconcile and workflow tests
    pub(crate) fn fixture_ledger() -> Ledger {
        let sheets = vec![
            Sheet::from_strs(
                "입고",
                &["수주번호", "지시번호", "품번", "ERP불출수량", "현장실물입고", "요청날짜"],
                &[
                    &["SO-1", "WO-1", "P-100", "60", "50", "2025-03-01"],
                    &["SO-1", "WO-1", "P-100", "1,000", "50", "2025-03-02"],
                    &["SO-2", "WO-9", "P-100", "5", "7", "2025-03-03"],
                    &["", "WO-1", "P-100", "999", "999", "2025-03-03"],
                ],
            ),
            Sheet::from_strs(
                "작업지시",
                &["지시번호", "수량"],
                &[&["WO-1", "8"], &["WO-1", "4"], &["WO-9", "x"]],
            ),
            Sheet::from_strs("수주", &["품번"], &[]),
            Sheet::from_strs("BOM", &["품목코드"], &[]),
            Sheet::from_strs(
                "재고",
                &["작업장", "품번", "실재고수량"],
                &[
                    &["WC501", "P-100", "3"],
                    &["WC504", "P-100", "4"],
                    &["WC900", "P-100", "100"],
                ],
            ),
            Sheet::from_strs(
                "생산실적",
                &["작지번호", "수주번호", "생산수량", "QC샘플", "기타샘플"],
                &[
                    &["WO-1", "SO-1", "6", "1", "0"],
                    &["WO-1", "SO-X", "4", "1", "1"],
                    &["WO-9", "SO-2", "1", "0", "0"],
                ],
            ),
            Sheet::from_strs(
                "불량",
                &["작지번호", "투입품번", "불량수량", "불량유형", "불량유형.1"],
                &[
                    &["WO-1", "P-100", "3", "무시", "(원)찍힘"],
                    &["WO-1", "P-100", "2", "무시", "(작)오염"],
                    &["WO-1", "P-100", "50", "무시", "기타"],
                ],
            ),
        ];
        Ledger::from_sheets(sheets, SnapshotMeta::new()).unwrap()
    }

    #[test]
    fn test_receipt_rollup_sums_and_skips_blank_keys() {
        let ledger = fixture_ledger();
        let aggs = ledger.aggregates();
        let r = aggs.receipt("SO-1", "WO-1", "P-100").unwrap();
        assert_eq!(r.erp_issued, 1060.0);
        assert_eq!(r.physical, 100.0);
        assert_eq!(aggs.receipts.len(), 2);
    }

    #[test]
    fn test_work_order_rollup() {
        let ledger = fixture_ledger();
        let aggs = ledger.aggregates();
        assert_eq!(aggs.ordered_qty("WO-1"), 12.0);
        assert_eq!(aggs.ordered_qty("WO-9"), 0.0);
        assert_eq!(aggs.ordered_qty("missing"), 0.0);
    }

    #[test]
    fn test_production_keyed_by_work_order_keeps_first_order() {
        let ledger = fixture_ledger();
        let aggs = ledger.aggregates();
        assert_eq!(aggs.production_key, ProductionKey::WorkOrder);
        let p = aggs.production_for("ignored", "WO-1").unwrap();
        assert_eq!(p.order, "SO-1");
        assert_eq!(p.produced, 10.0);
        assert_eq!(p.total(), 13.0);
    }

    #[test]
    fn test_production_key_resolution() {
        let mut aggs = Aggregates::default();
        aggs.build_production(&Sheet::from_strs(
            "생산실적",
            &["수주번호", "양품"],
            &[&["SO-1", "2"], &["SO-1", "3"]],
        ));
        // "수주번호" sits in column A, so the positional work-order fallback wins
        assert_eq!(aggs.production_key, ProductionKey::WorkOrder);

        let mut aggs = Aggregates::default();
        aggs.build_production(&Sheet::new("생산실적", Vec::new(), Vec::new()));
        assert!(aggs.production.is_empty());
        assert_eq!(aggs.warnings.len(), 1);
    }

    #[test]
    fn test_defects_split_by_prefix() {
        let ledger = fixture_ledger();
        let d = ledger.aggregates().defect("WO-1", "P-100");
        assert_eq!(d.material_fault, 3.0);
        assert_eq!(d.process_fault, 2.0);
    }

    #[test]
    fn test_inventory_counts_only_erp_workstations() {
        let ledger = fixture_ledger();
        assert_eq!(ledger.aggregates().erp_stock("P-100"), 7.0);
    }

    #[test]
    fn test_missing_columns_leave_rollup_empty() {
        let mut aggs = Aggregates::default();
        aggs.build_inventory(&Sheet::from_strs("재고", &["작업장"], &[&["WC501"]]));
        assert!(aggs.inventory.is_empty());
        assert!(aggs.warnings[0].contains("inventory"));
    }

    #[test]
    fn test_orders_rollups() {
        let ledger = fixture_ledger();
        let aggs = ledger.aggregates();
        let orders = vec!["SO-1".to_string(), "SO-2".to_string()];
        let r = aggs.receipts_by_orders("P-100", &orders).unwrap();
        assert_eq!(r.physical, 107.0);
        let p = aggs.production_by_orders(&orders).unwrap();
        assert_eq!(p.produced, 11.0);
        assert!(aggs.receipts_by_orders("P-404", &orders).is_none());
    }
}
