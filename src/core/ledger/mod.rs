//! The plant ledger: seven sheets read from a workbook or its SQLite snapshot

mod sheet;
mod snapshot;
mod workbook;

pub use sheet::{cell, cell_opt, Sheet};
pub use snapshot::{
    fingerprint, read_snapshot, write_snapshot, Snapshot, SnapshotMeta, META_CONVERTED_AT,
    META_SHA256,
};
pub use workbook::{cell_text, format_number, HeaderRow, Workbook};

use miette::Diagnostic;
use std::cell::OnceCell;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::aggregates::Aggregates;
use crate::core::store::{BlobStore, Store, StoreError};

pub const SHEET_RECEIPTS: &str = "입고";
pub const SHEET_WORK_ORDERS: &str = "작업지시";
pub const SHEET_SALES_ORDERS: &str = "수주";
pub const SHEET_BOM: &str = "BOM";
pub const SHEET_INVENTORY: &str = "재고";
pub const SHEET_PRODUCTION: &str = "생산실적";
pub const SHEET_DEFECTS: &str = "불량";

/// Sheets every ledger workbook must carry
pub const REQUIRED_SHEETS: [&str; 7] = [
    SHEET_RECEIPTS,
    SHEET_WORK_ORDERS,
    SHEET_SALES_ORDERS,
    SHEET_BOM,
    SHEET_INVENTORY,
    SHEET_PRODUCTION,
    SHEET_DEFECTS,
];

#[derive(Debug, Error, Diagnostic)]
pub enum LedgerError {
    #[error("could not read workbook: {0}")]
    #[diagnostic(
        code(submat::ledger::workbook),
        help("upload an .xlsx or .xlsm file")
    )]
    Workbook(String),

    #[error("ledger is missing sheets: {}", .0.join(", "))]
    #[diagnostic(
        code(submat::ledger::missing_tables),
        help("the workbook needs the sheets 입고, 작업지시, 수주, BOM, 재고, 생산실적, 불량")
    )]
    MissingTables(Vec<String>),

    #[error("no ledger data has been uploaded yet")]
    #[diagnostic(
        code(submat::ledger::no_data),
        help("run 'submat upload <workbook.xlsx>' first")
    )]
    NoData,

    #[error("snapshot database error")]
    #[diagnostic(code(submat::ledger::sqlite))]
    Sqlite(#[from] rusqlite::Error),

    #[error("scratch file error")]
    #[diagnostic(code(submat::ledger::io))]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of converting a workbook into a snapshot
#[derive(Debug, Clone, Default)]
pub struct ConversionReport {
    pub fingerprint: String,
    /// Sheets written, with their data-row counts
    pub tables: Vec<(String, usize)>,
    /// Required sheets the workbook did not have
    pub missing: Vec<String>,
}

/// Convert workbook bytes into snapshot bytes
///
/// Missing sheets are skipped and listed in the report rather than failing,
/// so a partial workbook can still be inspected with `status`.
pub fn workbook_to_snapshot(bytes: &[u8]) -> Result<(Vec<u8>, ConversionReport), LedgerError> {
    let mut workbook = Workbook::open(bytes)?;
    let (sheets, missing) = workbook.sheets(&REQUIRED_SHEETS, HeaderRow::FirstUsed)?;
    let fingerprint = fingerprint(bytes);

    let snapshot = write_snapshot(&sheets, &fingerprint)?;
    let report = ConversionReport {
        fingerprint,
        tables: sheets.iter().map(|s| (s.name.clone(), s.len())).collect(),
        missing,
    };
    info!(
        tables = report.tables.len(),
        missing = report.missing.len(),
        "workbook converted to snapshot"
    );
    Ok((snapshot, report))
}

/// The seven ledger sheets plus lazily built rollups
#[derive(Debug, Default)]
pub struct Ledger {
    pub receipts: Sheet,
    pub work_orders: Sheet,
    pub sales_orders: Sheet,
    pub bom: Sheet,
    pub inventory: Sheet,
    pub production: Sheet,
    pub defects: Sheet,
    pub meta: SnapshotMeta,
    aggregates: OnceCell<Aggregates>,
}

impl Ledger {
    /// Assemble a ledger; every required sheet must be present
    pub fn from_sheets(sheets: Vec<Sheet>, meta: SnapshotMeta) -> Result<Self, LedgerError> {
        let mut snapshot = Snapshot { sheets, meta };

        let missing: Vec<String> = REQUIRED_SHEETS
            .iter()
            .filter(|name| snapshot.sheet(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(LedgerError::MissingTables(missing));
        }

        let mut take = |name: &str| snapshot.take(name).unwrap_or_default();
        let ledger = Self {
            receipts: take(SHEET_RECEIPTS),
            work_orders: take(SHEET_WORK_ORDERS),
            sales_orders: take(SHEET_SALES_ORDERS),
            bom: take(SHEET_BOM),
            inventory: take(SHEET_INVENTORY),
            production: take(SHEET_PRODUCTION),
            defects: take(SHEET_DEFECTS),
            meta: std::mem::take(&mut snapshot.meta),
            aggregates: OnceCell::new(),
        };
        Ok(ledger)
    }

    pub fn from_snapshot(bytes: &[u8]) -> Result<Self, LedgerError> {
        let snapshot = read_snapshot(bytes)?;
        Self::from_sheets(snapshot.sheets, snapshot.meta)
    }

    pub fn from_workbook(bytes: &[u8]) -> Result<Self, LedgerError> {
        let mut workbook = Workbook::open(bytes)?;
        let (sheets, missing) = workbook.sheets(&REQUIRED_SHEETS, HeaderRow::FirstUsed)?;
        if !missing.is_empty() {
            return Err(LedgerError::MissingTables(missing));
        }
        let mut meta = SnapshotMeta::new();
        meta.insert(META_SHA256.to_string(), fingerprint(bytes));
        Self::from_sheets(sheets, meta)
    }

    /// Load from the store: snapshot first, then the raw workbook
    pub fn load<S: BlobStore>(store: &Store<S>) -> Result<Self, LedgerError> {
        if let Some(bytes) = store.load_snapshot()? {
            debug!(bytes = bytes.len(), "loading ledger from snapshot");
            return Self::from_snapshot(&bytes);
        }
        if let Some(bytes) = store.load_workbook()? {
            debug!(bytes = bytes.len(), "no snapshot, converting workbook");
            return Self::from_workbook(&bytes);
        }
        Err(LedgerError::NoData)
    }

    /// Rollups, built once on first use
    pub fn aggregates(&self) -> &Aggregates {
        self.aggregates.get_or_init(|| Aggregates::build(self))
    }

    pub fn sheets(&self) -> [&Sheet; 7] {
        [
            &self.receipts,
            &self.work_orders,
            &self.sales_orders,
            &self.bom,
            &self.inventory,
            &self.production,
            &self.defects,
        ]
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.meta.get(META_SHA256).map(String::as_str)
    }
}
