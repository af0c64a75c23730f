//! `submat label` command - label reference table and roll calculator

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::{confirm, write_file, Workspace};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::labels::{
    bom_search, calculate_sheets, effective_core_weight, round2, sample_count, LabelDb, NewLabel,
    LABEL_HEADERS,
};
use crate::entities::{LabelCategory, LabelRecord};

#[derive(Subcommand, Debug)]
pub enum LabelCommands {
    /// Import the label table from the calculator workbook
    Init(InitArgs),

    /// List every label
    List,

    /// Search labels by part number or name
    Search(SearchArgs),

    /// Add a label measured by hand
    Add(AddArgs),

    /// Delete labels by part number
    Delete(DeleteArgs),

    /// Estimate how many labels remain on a roll from its weight
    Calc(CalcArgs),

    /// Write the label table to an xlsx file
    Export(ExportArgs),

    /// Find label and emblem components in the BOM
    BomSearch(SearchArgs),
}

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Calculator workbook (.xlsx)
    pub file: PathBuf,

    /// Replace an existing label table
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Part number or name substring
    pub query: String,
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Part number
    #[arg(long)]
    pub part: String,

    /// Part name
    #[arg(long)]
    pub name: String,

    /// Label category (e.g. 봉합라벨)
    #[arg(long)]
    pub category: Option<LabelCategory>,

    /// Core outer diameter (mm)
    #[arg(long)]
    pub outer: f64,

    /// Core inner diameter (mm)
    #[arg(long)]
    pub inner: f64,

    /// Core height (mm)
    #[arg(long)]
    pub height: f64,

    /// Reference sample, e.g. "2매(아이마크)"
    #[arg(long, default_value = "1매")]
    pub sample: String,

    /// Weight of the reference sample (g)
    #[arg(long)]
    pub sample_weight: f64,

    /// Measured core weight (g), when known
    #[arg(long, default_value_t = 0.0)]
    pub core_weight: f64,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Part number
    pub part: String,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct CalcArgs {
    /// Part number; the text after the last '-' is matched
    pub query: String,

    /// Weighed roll including its core (g)
    #[arg(long)]
    pub film: f64,

    /// Core weight override (g)
    #[arg(long)]
    pub core: Option<f64>,

    /// Sample weight override (g)
    #[arg(long)]
    pub sample_weight: Option<f64>,

    /// Labels per sample override
    #[arg(long)]
    pub count: Option<f64>,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Output file
    #[arg(default_value = "label_db.xlsx")]
    pub out: PathBuf,
}

pub fn run(cmd: LabelCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        LabelCommands::Init(args) => run_init(args, global),
        LabelCommands::List => run_list(global),
        LabelCommands::Search(args) => run_search(args, global),
        LabelCommands::Add(args) => run_add(args, global),
        LabelCommands::Delete(args) => run_delete(args, global),
        LabelCommands::Calc(args) => run_calc(args, global),
        LabelCommands::Export(args) => run_export(args, global),
        LabelCommands::BomSearch(args) => run_bom_search(args, global),
    }
}

fn output_records<'a>(
    records: impl IntoIterator<Item = &'a LabelRecord>,
    ws: &Workspace,
    global: &GlobalOpts,
) {
    let columns = ColumnDef::titled(&LABEL_HEADERS, 14);
    let rows = records.into_iter().map(|r| {
        LABEL_HEADERS
            .iter()
            .zip(LabelDb::row(r))
            .fold(TableRow::new(), |row, (h, v)| {
                let cell = match *h {
                    "품번" => CellValue::Code(v),
                    _ => CellValue::Text(v),
                };
                row.cell(h, cell)
            })
    });
    TableFormatter::new(&columns, "label").output(rows, ws.format(global));
}

fn run_init(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let bytes = std::fs::read(&args.file).into_diagnostic()?;
    let db = LabelDb::init(&ws.store, &bytes, args.force)?;
    if !global.quiet {
        println!(
            "{} Imported {} label(s) into {}",
            style("✓").green(),
            db.len(),
            style(&ws.store.label_key).cyan()
        );
    }
    Ok(())
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let db = LabelDb::load(&ws.store)?;
    output_records(&db.records, &ws, global);
    Ok(())
}

fn run_search(args: SearchArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let db = LabelDb::load(&ws.store)?;
    output_records(db.search(args.query.trim()), &ws, global);
    Ok(())
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let mut db = LabelDb::load(&ws.store)?;
    let new = NewLabel {
        part: args.part,
        name: args.name,
        category: args.category,
        outer_diameter: args.outer,
        inner_diameter: args.inner,
        height: args.height,
        reference_sample: args.sample,
        sample_weight: args.sample_weight,
        core_weight: args.core_weight,
    };
    let record = db.add(new)?.clone();
    db.save(&ws.store)?;

    if !global.quiet {
        println!(
            "{} Added {} {} (estimated core {} g)",
            style("✓").green(),
            style(&record.part).cyan(),
            record.name,
            record.estimated_weight
        );
    }
    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let mut db = LabelDb::load(&ws.store)?;
    if !args.yes && !confirm(&format!("Delete labels for {}?", args.part))? {
        println!("Cancelled");
        return Ok(());
    }
    let removed = db.delete(args.part.trim())?;
    db.save(&ws.store)?;
    if !global.quiet {
        println!(
            "{} Deleted {} label(s) for {}",
            style("✓").green(),
            removed,
            style(args.part.trim()).cyan()
        );
    }
    Ok(())
}

fn run_calc(args: CalcArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let db = LabelDb::load(&ws.store)?;
    let matches = db.find(&args.query);
    if matches.is_empty() {
        return Err(miette::miette!("no label matches '{}'", args.query));
    }

    let columns = vec![
        ColumnDef::new("part", "품번", 16),
        ColumnDef::new("name", "품명", 30),
        ColumnDef::new("core", "지관무게", 8),
        ColumnDef::new("sample_weight", "샘플무게", 8),
        ColumnDef::new("count", "샘플매수", 6),
        ColumnDef::new("sheets", "잔여매수", 10),
    ];
    let mut rows = Vec::new();
    for record in matches {
        let core = args.core.unwrap_or_else(|| effective_core_weight(record));
        let sample_weight = args.sample_weight.unwrap_or(record.sample_weight);
        let count = args
            .count
            .unwrap_or_else(|| sample_count(&record.reference_sample));
        let sheets = calculate_sheets(args.film, core, sample_weight, count)?;
        rows.push(
            TableRow::new()
                .cell("part", CellValue::Code(record.part.clone()))
                .cell("name", CellValue::Text(record.name.clone()))
                .cell("core", CellValue::Qty(round2(core)))
                .cell("sample_weight", CellValue::Qty(sample_weight))
                .cell("count", CellValue::Qty(count))
                .cell(
                    "sheets",
                    sheets
                        .map(|n| CellValue::Qty(n.round()))
                        .unwrap_or(CellValue::Empty),
                ),
        );
    }
    TableFormatter::new(&columns, "label").output(rows, ws.format(global));
    Ok(())
}

fn run_export(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let db = LabelDb::load(&ws.store)?;
    let bytes = db.to_xlsx()?;
    write_file(&args.out, &bytes)?;
    if ws.format(global) == OutputFormat::Json {
        println!(
            "{}",
            serde_json::json!({ "path": args.out.display().to_string(), "labels": db.len() })
        );
    } else if !global.quiet {
        println!(
            "{} Wrote {} label(s) to {}",
            style("✓").green(),
            db.len(),
            style(args.out.display()).cyan()
        );
    }
    Ok(())
}

fn run_bom_search(args: SearchArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let ledger = ws.ledger()?;
    let hits = bom_search(&ledger.bom, args.query.trim());
    let columns = vec![
        ColumnDef::new("part", "품번", 16),
        ColumnDef::new("name", "품명", 40),
    ];
    let rows = hits.into_iter().map(|(part, name)| {
        TableRow::new()
            .cell("part", CellValue::Code(part))
            .cell("name", CellValue::Text(name))
    });
    TableFormatter::new(&columns, "component").output(rows, ws.format(global));
    Ok(())
}
