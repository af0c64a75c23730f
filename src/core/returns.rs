//! Return-tracking workflow: build tracking rows for an order and keep them
//! between invocations in a session file

use chrono::NaiveDate;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::core::aggregates::ERP_WORKSTATIONS;
use crate::core::columns::safe_num;
use crate::core::dates::{parse_date, week_of_month};
use crate::core::ledger::{cell, cell_opt, Ledger, Sheet};
use crate::core::reconcile::{ExpectationRow, ReturnRow};
use crate::core::Project;
use crate::entities::Process;

pub const SESSION_FILE: &str = "returns.json";

#[derive(Debug, Error, Diagnostic)]
pub enum ReturnsError {
    #[error("sheet '{0}' has no '{1}' column")]
    #[diagnostic(code(submat::returns::columns))]
    MissingColumn(String, &'static str),

    #[error("no work orders at workstations WC501-WC504 for order {0}")]
    #[diagnostic(code(submat::returns::no_work_orders))]
    NoWorkOrders(String),

    #[error("order {order} has several finished parts: {options}")]
    #[diagnostic(
        code(submat::returns::ambiguous_finished),
        help("pick one with --finished <part>")
    )]
    AmbiguousFinishedPart { order: String, options: String },

    #[error("order {order} has several work orders: {options}")]
    #[diagnostic(
        code(submat::returns::ambiguous_work_order),
        help("pick one with --work-order <no>")
    )]
    AmbiguousWorkOrder { order: String, options: String },

    #[error("'{value}' is not one of the candidates for order {order}: {options}")]
    #[diagnostic(code(submat::returns::unknown_choice))]
    UnknownChoice {
        order: String,
        value: String,
        options: String,
    },

    #[error("BOM lists no components for finished part {0}")]
    #[diagnostic(code(submat::returns::no_components))]
    NoComponents(String),

    #[error("none of the selected parts are components of {0}")]
    #[diagnostic(
        code(submat::returns::no_selection),
        help("run 'submat returns load' without --part to see every component")
    )]
    EmptySelection(String),

    #[error("failed to access session file {path}")]
    #[diagnostic(code(submat::returns::session_io))]
    SessionIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session file {path} is corrupt")]
    #[diagnostic(
        code(submat::returns::session_json),
        help("run 'submat returns clear --yes' to start over")
    )]
    SessionJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Inputs for building tracking rows
#[derive(Debug, Clone)]
pub struct PrepareRequest {
    pub order: String,
    pub work_order: Option<String>,
    pub finished_part: Option<String>,
    pub process: Process,
    pub finish_condition: String,
    /// Restrict to these component parts; `None` keeps every component
    pub parts: Option<Vec<String>>,
    pub today: NaiveDate,
}

/// Component line of a finished item's BOM
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BomComponent {
    pub finished_part: String,
    pub part: String,
    pub name: String,
    pub unit_qty: f64,
}

fn distinct(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in values {
        if !v.is_empty() && !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

/// Column holding the second header that contains `needle`, else the first
fn second_containing(headers: &[String], needle: &str) -> Option<usize> {
    let hits: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.contains(needle))
        .map(|(i, _)| i)
        .collect();
    hits.get(1).or_else(|| hits.first()).copied()
}

fn bom_item_col(bom: &Sheet) -> Option<usize> {
    bom.named("품목코드")
        .or_else(|| (!bom.headers.is_empty()).then_some(0))
}

/// Components of a finished item, deduplicated on (part, name, unit quantity)
pub fn bom_components(bom: &Sheet, finished_part: &str) -> Vec<BomComponent> {
    let Some(item_col) = bom_item_col(bom) else {
        return Vec::new();
    };
    let part_col = second_containing(&bom.headers, "품번");
    let name_col = second_containing(&bom.headers, "품명");
    let unit_col = bom.named("단위수량");

    let mut out: Vec<BomComponent> = Vec::new();
    for row in &bom.rows {
        if cell(row, item_col) != finished_part {
            continue;
        }
        let component = BomComponent {
            finished_part: finished_part.to_string(),
            part: cell_opt(row, part_col).to_string(),
            name: cell_opt(row, name_col).to_string(),
            unit_qty: safe_num(cell_opt(row, unit_col)),
        };
        if !out.contains(&component) {
            out.push(component);
        }
    }
    out
}

/// Finished-item name from the BOM, else from the work order
fn finished_name(ledger: &Ledger, finished_part: &str, work_order: &str) -> String {
    let bom = &ledger.bom;
    if let Some(item_col) = bom_item_col(bom) {
        let name_col = bom
            .named("품명")
            .or_else(|| (bom.headers.len() > 1).then_some(1))
            .unwrap_or(item_col);
        if let Some(row) = bom.rows.iter().find(|r| cell(r, item_col) == finished_part) {
            return cell(row, name_col).to_string();
        }
    }
    let jobs = &ledger.work_orders;
    if let (Some(wo_col), Some(name_col)) = (jobs.named("지시번호"), jobs.named("품명")) {
        if let Some(row) = jobs.rows.iter().find(|r| cell(r, wo_col) == work_order) {
            return cell(row, name_col).to_string();
        }
    }
    String::new()
}

/// First and last production date recorded for an order
pub fn production_window(production: &Sheet, order: &str) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let (Some(order_col), Some(date_col)) = (production.named("수주번호"), production.named("생산일자"))
    else {
        return (None, None);
    };
    let dates: Vec<NaiveDate> = production
        .rows
        .iter()
        .filter(|r| cell(r, order_col) == order)
        .filter_map(|r| parse_date(cell(r, date_col)))
        .collect();
    (dates.iter().min().copied(), dates.iter().max().copied())
}

fn choose(
    order: &str,
    candidates: &[String],
    requested: Option<&str>,
    ambiguous: impl FnOnce(String) -> ReturnsError,
) -> Result<Option<String>, ReturnsError> {
    match requested {
        Some(value) if candidates.iter().any(|c| c == value) => Ok(Some(value.to_string())),
        Some(value) => Err(ReturnsError::UnknownChoice {
            order: order.to_string(),
            value: value.to_string(),
            options: candidates.join(", "),
        }),
        None if candidates.len() > 1 => Err(ambiguous(candidates.join(", "))),
        None => Ok(candidates.first().cloned()),
    }
}

/// Build the tracking rows for one order
pub fn prepare(ledger: &Ledger, req: &PrepareRequest) -> Result<Vec<ReturnRow>, ReturnsError> {
    let jobs = &ledger.work_orders;
    let order_col = jobs
        .named("수주번호")
        .ok_or_else(|| ReturnsError::MissingColumn(jobs.name.clone(), "수주번호"))?;
    let wc_col = jobs.col("X", &["작업장"]);
    let finished_col = jobs.named("품번");
    let wo_col = jobs
        .named("지시번호")
        .ok_or_else(|| ReturnsError::MissingColumn(jobs.name.clone(), "지시번호"))?;

    let mut rows: Vec<&Vec<String>> = jobs
        .rows
        .iter()
        .filter(|r| cell(r, order_col) == req.order)
        .filter(|r| wc_col.map_or(true, |c| ERP_WORKSTATIONS.contains(&cell(r, c))))
        .collect();
    if rows.is_empty() {
        return Err(ReturnsError::NoWorkOrders(req.order.clone()));
    }

    let finished_parts = distinct(rows.iter().map(|r| cell_opt(r, finished_col).to_string()));
    let mut finished = choose(&req.order, &finished_parts, req.finished_part.as_deref(), |options| {
        ReturnsError::AmbiguousFinishedPart {
            order: req.order.clone(),
            options,
        }
    })?;
    if let Some(fp) = &finished {
        rows.retain(|r| cell_opt(r, finished_col) == fp);
    }

    let work_orders = distinct(rows.iter().map(|r| cell(r, wo_col).to_string()));
    let work_order = choose(&req.order, &work_orders, req.work_order.as_deref(), |options| {
        ReturnsError::AmbiguousWorkOrder {
            order: req.order.clone(),
            options,
        }
    })?
    .ok_or_else(|| ReturnsError::NoWorkOrders(req.order.clone()))?;

    if finished.is_none() {
        finished = rows
            .iter()
            .find(|r| cell(r, wo_col) == work_order)
            .map(|r| cell_opt(r, finished_col).to_string())
            .filter(|s| !s.is_empty());
    }
    let finished = finished.ok_or_else(|| ReturnsError::MissingColumn(jobs.name.clone(), "품번"))?;

    let mut components = bom_components(&ledger.bom, &finished);
    if components.is_empty() {
        return Err(ReturnsError::NoComponents(finished));
    }
    if let Some(parts) = &req.parts {
        components.retain(|c| parts.contains(&c.part));
        if components.is_empty() {
            return Err(ReturnsError::EmptySelection(finished));
        }
    }

    let (start, end) = production_window(&ledger.production, &req.order);
    let name = finished_name(ledger, &finished, &work_order);
    debug!(order = %req.order, work_order = %work_order, components = components.len(), "tracking rows prepared");

    Ok(components
        .into_iter()
        .map(|c| ReturnRow {
            order: req.order.clone(),
            work_order: work_order.clone(),
            process: req.process,
            production_start: start,
            production_end: end,
            finish_condition: req.finish_condition.clone(),
            return_date: req.today,
            return_week: week_of_month(req.today),
            finished_part: finished.clone(),
            finished_name: name.clone(),
            part: c.part,
            part_name: c.name,
            unit_qty: c.unit_qty,
        })
        .collect())
}

/// Tracking rows and their computed expectations, persisted between runs
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Session {
    pub tracking: Vec<ReturnRow>,
    pub expectations: Vec<ExpectationRow>,
    /// Representative order per part for the consolidated export
    #[serde(default)]
    pub primary_orders: BTreeMap<String, String>,
}

impl Session {
    pub fn path_for(project: &Project) -> PathBuf {
        project.session_dir().join(SESSION_FILE)
    }

    /// Load a session; a missing file is an empty session
    pub fn load(path: &Path) -> Result<Self, ReturnsError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ReturnsError::SessionIo {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&text).map_err(|source| ReturnsError::SessionJson {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ReturnsError> {
        let io_err = |source| ReturnsError::SessionIo {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ReturnsError::SessionJson {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(io_err)
    }

    /// Start over with a fresh set of rows
    pub fn replace(&mut self, tracking: Vec<ReturnRow>, expectations: Vec<ExpectationRow>) {
        self.tracking = tracking;
        self.expectations = expectations;
        self.primary_orders.clear();
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.expectations.is_empty()
    }

    /// Expectation rows for one component part
    pub fn rows_for_part(&mut self, part: &str) -> impl Iterator<Item = &mut ExpectationRow> {
        let part = part.to_string();
        self.expectations.iter_mut().filter(move |r| r.row.part == part)
    }
}
