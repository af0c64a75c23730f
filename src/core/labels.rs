//! Label reference table and the roll-count calculator
//!
//! The table lives in the store as a UTF-8 CSV with a byte-order mark and
//! Korean headers, so it stays editable in a spreadsheet. It is seeded once
//! from the plant's calculator workbook and then maintained record by record.

use miette::Diagnostic;
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, XlsxError};
use std::collections::HashMap;
use std::f64::consts::PI;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::columns::safe_num;
use crate::core::ledger::{cell, format_number, HeaderRow, LedgerError, Sheet, Workbook};
use crate::core::store::{BlobStore, Store, StoreError};
use crate::entities::{LabelCategory, LabelRecord};

pub const LABEL_HEADERS: [&str; 13] = [
    "샘플번호", "품번", "품명", "구분", "지관무게", "추정값", "오차", "외경", "내경", "높이",
    "1R무게", "기준샘플", "샘플무게",
];

/// Source header → table header, for the calculator workbook
const WORKBOOK_RENAMES: [(&str, &str); 13] = [
    ("No.", "샘플번호"),
    ("품번", "품번"),
    ("품명", "품명"),
    ("구분", "구분"),
    ("실무게", "지관무게"),
    ("추정값", "추정값"),
    ("오차", "오차"),
    ("외경", "외경"),
    ("내경", "내경"),
    ("높이", "높이"),
    ("1R무게", "1R무게"),
    ("기준샘플", "기준샘플"),
    ("샘플무게", "샘플무게"),
];

/// 0-based row of the calculator workbook's header
const WORKBOOK_HEADER_ROW: usize = 4;

const BOM_SEARCH_LIMIT: usize = 50;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error, Diagnostic)]
pub enum LabelError {
    #[error("label table already exists")]
    #[diagnostic(
        code(submat::labels::exists),
        help("use --force to replace it with the workbook contents")
    )]
    AlreadyExists,

    #[error("invalid label: {0}")]
    #[diagnostic(code(submat::labels::invalid))]
    Invalid(String),

    #[error("film weight {film} g must exceed core weight {core} g")]
    #[diagnostic(code(submat::labels::film_weight))]
    FilmNotHeavier { film: f64, core: f64 },

    #[error("no label with part number '{0}'")]
    #[diagnostic(code(submat::labels::not_found))]
    NotFound(String),

    #[error("label table CSV error")]
    #[diagnostic(code(submat::labels::csv))]
    Csv(#[from] csv::Error),

    #[error("failed to write label workbook")]
    #[diagnostic(code(submat::labels::xlsx))]
    Xlsx(#[from] XlsxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Workbook(#[from] LedgerError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

/// Paper-core weight estimated from its dimensions (mm → g)
pub fn estimate_core_weight(outer: f64, inner: f64, height: f64) -> f64 {
    if outer <= 0.0 || inner <= 0.0 || height <= 0.0 {
        return 0.0;
    }
    PI * height * (outer * outer - inner * inner) / 4.0 * 0.78
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sheets per reference sample: the first number in the text, else 1
pub fn sample_count(text: &str) -> f64 {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse::<f64>().unwrap_or(1.0)
}

/// Measured core weight, or the estimate when the core was never weighed
pub fn effective_core_weight(record: &LabelRecord) -> f64 {
    if record.core_weight > 0.0 {
        record.core_weight
    } else {
        record.estimated_weight
    }
}

/// Sheets left on a roll
///
/// `Ok(None)` while any input is still missing.
pub fn calculate_sheets(
    film: f64,
    core: f64,
    sample_weight: f64,
    count: f64,
) -> Result<Option<f64>, LabelError> {
    if film <= 0.0 || sample_weight <= 0.0 || count <= 0.0 {
        return Ok(None);
    }
    let net = film - core;
    if net <= 0.0 {
        return Err(LabelError::FilmNotHeavier { film, core });
    }
    Ok(Some(net / sample_weight * count))
}

/// Input for a hand-entered label
#[derive(Debug, Clone, Default)]
pub struct NewLabel {
    pub part: String,
    pub name: String,
    pub category: Option<LabelCategory>,
    pub outer_diameter: f64,
    pub inner_diameter: f64,
    pub height: f64,
    pub reference_sample: String,
    pub sample_weight: f64,
    /// Measured core weight; 0 when not weighed
    pub core_weight: f64,
}

impl NewLabel {
    fn validate(&self) -> Result<(), LabelError> {
        if self.part.trim().is_empty() || self.name.trim().is_empty() {
            return Err(LabelError::Invalid("part number and name are required".into()));
        }
        if self.outer_diameter <= 0.0 || self.inner_diameter <= 0.0 || self.height <= 0.0 {
            return Err(LabelError::Invalid(
                "outer diameter, inner diameter and height must be positive".into(),
            ));
        }
        if self.sample_weight <= 0.0 {
            return Err(LabelError::Invalid("sample weight must be positive".into()));
        }
        Ok(())
    }

    pub fn into_record(self) -> Result<LabelRecord, LabelError> {
        self.validate()?;
        let estimated = round2(estimate_core_weight(
            self.outer_diameter,
            self.inner_diameter,
            self.height,
        ));
        let measured = self.core_weight.max(0.0);
        Ok(LabelRecord {
            sample_no: String::new(),
            part: self.part.trim().to_string(),
            name: self.name.trim().to_string(),
            category: self.category,
            core_weight: measured,
            estimated_weight: estimated,
            error: if measured > 0.0 { estimated - measured } else { 0.0 },
            outer_diameter: self.outer_diameter,
            inner_diameter: self.inner_diameter,
            height: self.height,
            roll_weight: None,
            reference_sample: self.reference_sample.trim().to_string(),
            sample_weight: self.sample_weight,
        })
    }
}

fn record_from_columns(row: &[String], cols: &HashMap<&str, usize>) -> LabelRecord {
    let text = |name: &str| cols.get(name).map(|c| cell(row, *c)).unwrap_or("");
    let num = |name: &str| safe_num(text(name));
    let roll = text("1R무게");
    LabelRecord {
        sample_no: text("샘플번호").to_string(),
        part: text("품번").to_string(),
        name: text("품명").to_string(),
        category: text("구분").parse().ok(),
        core_weight: num("지관무게"),
        estimated_weight: num("추정값"),
        error: num("오차"),
        outer_diameter: num("외경"),
        inner_diameter: num("내경"),
        height: num("높이"),
        roll_weight: (!roll.is_empty()).then(|| safe_num(roll)),
        reference_sample: text("기준샘플").to_string(),
        sample_weight: num("샘플무게"),
    }
}

/// Pull the label table out of the plant's calculator workbook
pub fn parse_label_workbook(bytes: &[u8]) -> Result<Vec<LabelRecord>, LabelError> {
    let mut workbook = Workbook::open(bytes)?;
    let names = workbook.sheet_names();
    let sheet_name = names
        .iter()
        .find(|s| s.contains("라벨") && s.contains("스티커"))
        .or_else(|| names.first())
        .cloned()
        .ok_or_else(|| LabelError::Invalid("workbook has no sheets".into()))?;
    let sheet = workbook.sheet(&sheet_name, HeaderRow::Absolute(WORKBOOK_HEADER_ROW))?;

    let mut cols: HashMap<&str, usize> = HashMap::new();
    for (i, header) in sheet.headers.iter().enumerate() {
        let compact = header.replace(' ', "");
        if let Some((_, target)) = WORKBOOK_RENAMES
            .iter()
            .find(|(source, _)| *source == header.as_str() || *source == compact)
        {
            cols.entry(*target).or_insert(i);
        }
    }

    let records: Vec<LabelRecord> = sheet
        .rows
        .iter()
        .map(|row| record_from_columns(row, &cols))
        .filter(|r| r.category.is_some())
        .filter(|r| !(r.part.is_empty() && r.name.is_empty()))
        .collect();
    info!(sheet = %sheet_name, records = records.len(), "label workbook parsed");
    Ok(records)
}

/// BOM components that look like labels or emblems, by part substring
pub fn bom_search(bom: &Sheet, query: &str) -> Vec<(String, String)> {
    let Some(part_col) = bom.col("C", &["품번"]) else {
        return Vec::new();
    };
    // The component name is the second 품명 (D); B names the finished item
    let Some(name_col) = bom
        .named("품명.1")
        .or_else(|| bom.col("D", &[]))
        .or_else(|| bom.col("B", &["품명"]))
    else {
        return Vec::new();
    };

    let is_label_name = |name: &str| {
        name.split_once('_')
            .is_some_and(|(_, rest)| rest.contains("라벨") || rest.contains("엠블럼"))
    };

    let mut out: Vec<(String, String)> = Vec::new();
    for row in &bom.rows {
        let (part, name) = (cell(row, part_col), cell(row, name_col));
        if !part.contains(query) || !is_label_name(name) {
            continue;
        }
        let hit = (part.to_string(), name.to_string());
        if !out.contains(&hit) {
            out.push(hit);
            if out.len() == BOM_SEARCH_LIMIT {
                break;
            }
        }
    }
    out
}

/// The label reference table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelDb {
    pub records: Vec<LabelRecord>,
}

impl LabelDb {
    pub fn new(records: Vec<LabelRecord>) -> Self {
        Self { records }
    }

    pub fn from_csv(bytes: &[u8]) -> Result<Self, LabelError> {
        let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(body);

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let cols: HashMap<&str, usize> = LABEL_HEADERS
            .iter()
            .filter_map(|name| headers.iter().position(|h| h == name).map(|i| (*name, i)))
            .collect();

        let mut records = Vec::new();
        for result in reader.records() {
            let row: Vec<String> = result?.iter().map(str::to_string).collect();
            records.push(record_from_columns(&row, &cols));
        }
        Ok(Self { records })
    }

    pub fn to_csv(&self) -> Result<Vec<u8>, LabelError> {
        let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
        writer.write_record(LABEL_HEADERS)?;
        for r in &self.records {
            writer.write_record(Self::row(r))?;
        }
        writer
            .into_inner()
            .map_err(|e| LabelError::Csv(e.into_error().into()))
    }

    /// A record in [`LABEL_HEADERS`] order
    pub fn row(r: &LabelRecord) -> [String; 13] {
        [
            r.sample_no.clone(),
            r.part.clone(),
            r.name.clone(),
            r.category_label().to_string(),
            format_number(r.core_weight),
            format_number(r.estimated_weight),
            format_number(r.error),
            format_number(r.outer_diameter),
            format_number(r.inner_diameter),
            format_number(r.height),
            r.roll_weight.map(format_number).unwrap_or_default(),
            r.reference_sample.clone(),
            format_number(r.sample_weight),
        ]
    }

    /// Load from the store; an absent table is empty
    pub fn load<S: BlobStore>(store: &Store<S>) -> Result<Self, LabelError> {
        match store.load_labels()? {
            Some(bytes) => Self::from_csv(&bytes),
            None => Ok(Self::default()),
        }
    }

    pub fn save<S: BlobStore>(&self, store: &Store<S>) -> Result<(), LabelError> {
        store.save_labels(&self.to_csv()?)?;
        debug!(records = self.records.len(), "label table saved");
        Ok(())
    }

    /// Seed the store from the calculator workbook
    pub fn init<S: BlobStore>(
        store: &Store<S>,
        workbook: &[u8],
        force: bool,
    ) -> Result<Self, LabelError> {
        if !force && store.blobs().exists(&store.label_key)? {
            return Err(LabelError::AlreadyExists);
        }
        let db = Self::new(parse_label_workbook(workbook)?);
        db.save(store)?;
        Ok(db)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn add(&mut self, new: NewLabel) -> Result<&LabelRecord, LabelError> {
        let record = new.into_record()?;
        self.records.push(record);
        let idx = self.records.len() - 1;
        Ok(&self.records[idx])
    }

    /// Part or name substring match
    pub fn search(&self, query: &str) -> Vec<&LabelRecord> {
        self.records
            .iter()
            .filter(|r| r.part.contains(query) || r.name.contains(query))
            .collect()
    }

    /// Calculator lookup: matches the part on the text after the last '-'
    pub fn find(&self, query: &str) -> Vec<&LabelRecord> {
        let key = query.rsplit('-').next().unwrap_or(query).trim();
        if key.is_empty() {
            return Vec::new();
        }
        self.records.iter().filter(|r| r.part.contains(key)).collect()
    }

    /// Remove every record with this part number
    pub fn delete(&mut self, part: &str) -> Result<usize, LabelError> {
        let before = self.records.len();
        self.records.retain(|r| r.part != part);
        match before - self.records.len() {
            0 => Err(LabelError::NotFound(part.to_string())),
            n => Ok(n),
        }
    }

    pub fn to_xlsx(&self) -> Result<Vec<u8>, LabelError> {
        let mut workbook = XlsxWorkbook::new();
        let bold = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        sheet.set_name("라벨DB")?;

        for (c, header) in LABEL_HEADERS.iter().enumerate() {
            sheet.write_string_with_format(0, c as u16, *header, &bold)?;
        }
        for (r, record) in self.records.iter().enumerate() {
            let row = (r + 1) as u32;
            sheet.write_string(row, 0, &record.sample_no)?;
            sheet.write_string(row, 1, &record.part)?;
            sheet.write_string(row, 2, &record.name)?;
            sheet.write_string(row, 3, record.category_label())?;
            sheet.write_number(row, 4, record.core_weight)?;
            sheet.write_number(row, 5, record.estimated_weight)?;
            sheet.write_number(row, 6, record.error)?;
            sheet.write_number(row, 7, record.outer_diameter)?;
            sheet.write_number(row, 8, record.inner_diameter)?;
            sheet.write_number(row, 9, record.height)?;
            if let Some(roll) = record.roll_weight {
                sheet.write_number(row, 10, roll)?;
            }
            sheet.write_string(row, 11, &record.reference_sample)?;
            sheet.write_number(row, 12, record.sample_weight)?;
        }
        Ok(workbook.save_to_buffer()?)
    }
}
