//! `submat returns` command - return-stock tracking session

use chrono::{Duration, NaiveDate};
use clap::{Subcommand, ValueEnum};
use console::style;
use miette::Result;
use std::path::PathBuf;
use tracing::info;

use crate::cli::helpers::{confirm, parse_day, today, write_file, Workspace};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::inbound::{receipt_remarks, recent_orders_by_product};
use crate::core::reconcile::{
    consolidate, fill_extra_orders, parse_order_list, parts_with_multiple_orders, recalc,
    recompute_with_extra_orders, ExpectationRow, VISIBLE_COLS,
};
use crate::core::returns::{prepare, PrepareRequest};
use crate::entities::Process;
use crate::report::{barcode_labels, export_csv, manifest_pdf, LabelSheet};

#[derive(Subcommand, Debug)]
pub enum ReturnsCommands {
    /// Find recent orders by product name to start tracking from
    Search(SearchArgs),

    /// Build tracking rows for an order and compute expected stock
    Load(LoadArgs),

    /// Show the expected-stock table for the current session
    Show(ShowArgs),

    /// Flag a part as common material or for labels, or set its extra orders
    Edit(EditArgs),

    /// Collect extra orders for common-material rows from receipts
    FillExtra(FillExtraArgs),

    /// Pick the representative order for a part tracked under several orders
    Primary(PrimaryArgs),

    /// Show receipt remarks for the tracked parts
    Comments,

    /// Export the session as CSV, a PDF manifest or barcode labels
    Export(ExportArgs),

    /// Discard the current session
    Clear(ClearArgs),
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Product name keyword
    pub keyword: String,
}

#[derive(clap::Args, Debug)]
pub struct LoadArgs {
    /// Sales order number
    #[arg(long)]
    pub order: String,

    /// Work order, required when the order has several
    #[arg(long)]
    pub work_order: Option<String>,

    /// Finished part, required when the order has several
    #[arg(long)]
    pub finished: Option<String>,

    /// Production line (e.g. "4층 덕용")
    #[arg(long)]
    pub process: Process,

    /// How the run ended
    #[arg(long, default_value = "")]
    pub finish_condition: String,

    /// Track only these component parts
    #[arg(long = "part")]
    pub parts: Vec<String>,

    /// Add to the current session instead of replacing it
    #[arg(long)]
    pub append: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Only rows with a negative expected stock
    #[arg(long)]
    pub negative: bool,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Component part number
    pub part: String,

    /// Restrict to one order when the part is tracked under several
    #[arg(long)]
    pub order: Option<String>,

    /// Mark as common material
    #[arg(long, overrides_with = "no_common")]
    pub common: bool,

    /// Clear the common-material mark
    #[arg(long)]
    pub no_common: bool,

    /// Select for barcode labels
    #[arg(long, overrides_with = "no_label")]
    pub label: bool,

    /// Deselect for barcode labels
    #[arg(long)]
    pub no_label: bool,

    /// Extra orders whose receipts and production count toward this part ("" clears)
    #[arg(long)]
    pub extra: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct FillExtraArgs {
    /// First request date (default: 30 days ago)
    #[arg(long, value_parser = parse_day)]
    pub from: Option<NaiveDate>,

    /// Last request date (default: today)
    #[arg(long, value_parser = parse_day)]
    pub to: Option<NaiveDate>,
}

#[derive(clap::Args, Debug)]
pub struct PrimaryArgs {
    /// Component part number (omit to list parts with several orders)
    pub part: Option<String>,

    /// Order to represent the part in exports
    pub order: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportKind {
    /// Consolidated per-part CSV
    Csv,
    /// Landscape manifest for the floor
    Pdf,
    /// Barcode labels for the selected parts
    Labels,
}

impl ExportKind {
    fn default_file(self) -> &'static str {
        match self {
            ExportKind::Csv => "returns.csv",
            ExportKind::Pdf => "returns.pdf",
            ExportKind::Labels => "labels.pdf",
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    #[arg(value_enum)]
    pub kind: ExportKind,

    /// Output file
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,

    /// Memo printed under the manifest title
    #[arg(long)]
    pub memo: Option<String>,

    /// Request identifier encoded in the label barcode
    #[arg(long, required_if_eq("kind", "labels"))]
    pub identifier: Option<String>,

    /// Unit quantity printed on the labels
    #[arg(long, required_if_eq("kind", "labels"))]
    pub unit: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ClearArgs {
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run(cmd: ReturnsCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ReturnsCommands::Search(args) => run_search(args, global),
        ReturnsCommands::Load(args) => run_load(args, global),
        ReturnsCommands::Show(args) => run_show(args, global),
        ReturnsCommands::Edit(args) => run_edit(args, global),
        ReturnsCommands::FillExtra(args) => run_fill_extra(args, global),
        ReturnsCommands::Primary(args) => run_primary(args, global),
        ReturnsCommands::Comments => run_comments(global),
        ReturnsCommands::Export(args) => run_export(args, global),
        ReturnsCommands::Clear(args) => run_clear(args, global),
    }
}

fn run_search(args: SearchArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let ledger = ws.ledger()?;
    let orders = recent_orders_by_product(&ledger.receipts, &args.keyword, today(global))?;

    let columns = vec![
        ColumnDef::new("date", "요청날짜", 10),
        ColumnDef::new("order", "수주번호", 16),
        ColumnDef::new("work_order", "지시번호", 16),
        ColumnDef::new("product", "제품명", 40),
    ];
    let rows = orders.into_iter().map(|o| {
        TableRow::new()
            .cell("date", CellValue::Date(o.date))
            .cell("order", CellValue::Code(o.order))
            .cell("work_order", CellValue::Code(o.work_order))
            .cell("product", CellValue::Text(o.product))
    });
    TableFormatter::new(&columns, "order").output(rows, ws.format(global));
    Ok(())
}

fn same_key(a: &ExpectationRow, b: &ExpectationRow) -> bool {
    a.row.order == b.row.order && a.row.work_order == b.row.work_order && a.row.part == b.row.part
}

fn run_load(args: LoadArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let ledger = ws.ledger()?;
    let req = PrepareRequest {
        order: args.order.trim().to_string(),
        work_order: args.work_order,
        finished_part: args.finished,
        process: args.process,
        finish_condition: args.finish_condition,
        parts: (!args.parts.is_empty()).then_some(args.parts),
        today: today(global),
    };
    let tracking = prepare(&ledger, &req)?;
    let expectations = recalc(&tracking, ledger.aggregates());
    for warning in &ledger.aggregates().warnings {
        eprintln!("{} {}", style("!").yellow(), warning);
    }

    let mut session = ws.load_session()?;
    if args.append && !session.is_empty() {
        session
            .expectations
            .retain(|old| !expectations.iter().any(|new| same_key(old, new)));
        session.tracking.retain(|old| {
            !tracking.iter().any(|new| {
                old.order == new.order && old.work_order == new.work_order && old.part == new.part
            })
        });
        session.tracking.extend(tracking);
        session.expectations.extend(expectations);
    } else {
        session.replace(tracking, expectations);
    }
    ws.save_session(&session)?;
    info!(order = %req.order, rows = session.expectations.len(), "return session saved");

    if !global.quiet {
        let negative = session.expectations.iter().filter(|r| r.expected < 0.0).count();
        println!(
            "{} Tracking {} row(s) for order {}",
            style("✓").green(),
            session.expectations.len(),
            style(&req.order).cyan()
        );
        if negative > 0 {
            println!(
                "  {} {} row(s) have a negative expected stock",
                style("!").yellow(),
                negative
            );
        }
        println!(
            "  {} to review",
            style("submat returns show").yellow()
        );
    }
    Ok(())
}

fn expectation_cell(row: &ExpectationRow, column: &str) -> CellValue {
    match column {
        "수주번호" | "완성품번" | "품번" => CellValue::Code(row.field(column)),
        "품명" | "완성품명" | "추가수주" => CellValue::Text(row.field(column)),
        "예상재고" => CellValue::Balance(row.expected),
        "공통부자재" => CellValue::Flag(row.common_material),
        "라벨선택" => CellValue::Flag(row.label_selected),
        _ => CellValue::Qty(crate::core::columns::safe_num(&row.field(column))),
    }
}

fn expectation_columns() -> Vec<ColumnDef> {
    let mut columns = ColumnDef::titled(&VISIBLE_COLS, 12);
    for col in columns.iter_mut() {
        if col.key == "품명" {
            col.width = 24;
        }
    }
    columns.extend(ColumnDef::titled(&["공통부자재", "라벨선택"], 4));
    columns.push(ColumnDef::new("추가수주", "추가수주", 24));
    columns
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let session = ws.load_session()?;
    if session.is_empty() {
        println!(
            "{} No return session. Start one with {}",
            style("!").yellow(),
            style("submat returns load").yellow()
        );
        return Ok(());
    }

    let columns = expectation_columns();
    let rows = session
        .expectations
        .iter()
        .filter(|r| !args.negative || r.expected < 0.0)
        .map(|r| {
            columns.iter().fold(TableRow::new(), |row, c| {
                row.cell(&c.key, expectation_cell(r, &c.key))
            })
        });
    TableFormatter::new(&columns, "row").output(rows, ws.format(global));
    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let mut session = ws.load_session()?;
    let common = match (args.common, args.no_common) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };
    let label = match (args.label, args.no_label) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };
    let extra = args.extra.as_deref().map(parse_order_list);

    // Extra orders need the rollups; everything else is a flag flip
    let ledger = if extra.is_some() {
        Some(ws.ledger()?)
    } else {
        None
    };

    let mut touched = 0;
    for row in session.rows_for_part(&args.part) {
        if args.order.as_deref().is_some_and(|o| o != row.row.order) {
            continue;
        }
        if let Some(c) = common {
            row.common_material = c;
        }
        if let Some(l) = label {
            row.label_selected = l;
        }
        if let (Some(orders), Some(ledger)) = (&extra, &ledger) {
            row.extra_orders = orders
                .iter()
                .filter(|o| **o != row.row.order)
                .cloned()
                .collect();
            recompute_with_extra_orders(row, ledger.aggregates());
        }
        touched += 1;
    }
    if touched == 0 {
        return Err(miette::miette!(
            "part {} is not in the return session",
            args.part
        ));
    }
    ws.save_session(&session)?;

    if !global.quiet {
        println!(
            "{} Updated {} row(s) for {}",
            style("✓").green(),
            touched,
            style(&args.part).cyan()
        );
    }
    Ok(())
}

fn run_fill_extra(args: FillExtraArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let ledger = ws.ledger()?;
    let mut session = ws.load_session()?;
    let to = args.to.unwrap_or_else(|| today(global));
    let from = args.from.unwrap_or(to - Duration::days(30));

    let flagged = session.expectations.iter().filter(|r| r.common_material).count();
    if flagged == 0 {
        println!(
            "{} No rows are marked as common material. Use {}",
            style("!").yellow(),
            style("submat returns edit <part> --common").yellow()
        );
        return Ok(());
    }

    let changed = fill_extra_orders(
        &mut session.expectations,
        &ledger.receipts,
        ledger.aggregates(),
        from,
        to,
    );
    ws.save_session(&session)?;

    if !global.quiet {
        println!(
            "{} {} of {} common-material row(s) gained extra orders ({} ~ {})",
            style("✓").green(),
            changed,
            flagged,
            from,
            to
        );
    }
    Ok(())
}

fn run_primary(args: PrimaryArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let mut session = ws.load_session()?;
    let choices = parts_with_multiple_orders(&session.expectations);

    let (Some(part), Some(order)) = (args.part, args.order) else {
        let columns = vec![
            ColumnDef::new("part", "품번", 16),
            ColumnDef::new("order", "수주번호", 16),
            ColumnDef::new("name", "완성품명", 30),
            ColumnDef::new("primary", "대표", 4),
        ];
        let rows = choices.iter().flat_map(|(part, options)| {
            let chosen = session.primary_orders.get(part);
            options.iter().map(move |(order, name)| {
                TableRow::new()
                    .cell("part", CellValue::Code(part.clone()))
                    .cell("order", CellValue::Code(order.clone()))
                    .cell("name", CellValue::Text(name.clone()))
                    .cell("primary", CellValue::Flag(chosen == Some(order)))
            })
        });
        TableFormatter::new(&columns, "choice").output(rows, ws.format(global));
        return Ok(());
    };

    let Some(options) = choices.get(&part) else {
        return Err(miette::miette!(
            "part {} is not tracked under several orders",
            part
        ));
    };
    if !options.iter().any(|(o, _)| *o == order) {
        let listed: Vec<&str> = options.iter().map(|(o, _)| o.as_str()).collect();
        return Err(miette::miette!(
            "order {} does not track part {}. Use one of: {}",
            order,
            part,
            listed.join(", ")
        ));
    }
    session.primary_orders.insert(part.clone(), order.clone());
    ws.save_session(&session)?;

    if !global.quiet {
        println!(
            "{} {} exports under order {}",
            style("✓").green(),
            style(&part).cyan(),
            style(&order).cyan()
        );
    }
    Ok(())
}

fn run_comments(global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let ledger = ws.ledger()?;
    let session = ws.load_session()?;
    let remarks = receipt_remarks(&ledger.receipts, &session.expectations)?;

    let columns = vec![
        ColumnDef::new("part", "품번", 16),
        ColumnDef::new("name", "품명", 30),
        ColumnDef::new("remark", "비고", 50),
    ];
    let rows = remarks.into_iter().map(|r| {
        TableRow::new()
            .cell("part", CellValue::Code(r.part))
            .cell("name", CellValue::Text(r.name))
            .cell("remark", CellValue::Text(r.remark))
    });
    TableFormatter::new(&columns, "remark").output(rows, ws.format(global));
    Ok(())
}

fn run_export(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let session = ws.load_session()?;
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(args.kind.default_file()));

    let bytes = match args.kind {
        ExportKind::Csv => export_csv(&session.expectations, &session.primary_orders)?,
        ExportKind::Pdf => {
            let rows = consolidate(&session.expectations, &session.primary_orders);
            manifest_pdf(&rows, args.memo.as_deref(), ws.font_path())?
        }
        ExportKind::Labels => {
            let selected: Vec<&ExpectationRow> = session
                .expectations
                .iter()
                .filter(|r| r.label_selected)
                .collect();
            let sheet = LabelSheet {
                identifier: args.identifier.as_deref().unwrap_or(""),
                unit_qty: args.unit.as_deref().unwrap_or(""),
            };
            barcode_labels(&selected, &sheet, ws.font_path())?
        }
    };
    write_file(&out, &bytes)?;

    if ws.format(global) == OutputFormat::Json {
        println!(
            "{}",
            serde_json::json!({ "path": out.display().to_string(), "bytes": bytes.len() })
        );
    } else if !global.quiet {
        println!(
            "{} Wrote {} ({} bytes)",
            style("✓").green(),
            style(out.display()).cyan(),
            bytes.len()
        );
    }
    Ok(())
}

fn run_clear(args: ClearArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let mut session = ws.load_session()?;
    if session.is_empty() && session.tracking.is_empty() {
        if !global.quiet {
            println!("{} Return session is already empty", style("✓").green());
        }
        return Ok(());
    }
    if !args.yes
        && !confirm(&format!(
            "Discard {} tracked row(s)?",
            session.expectations.len()
        ))?
    {
        println!("Cancelled");
        return Ok(());
    }
    session.clear();
    ws.save_session(&session)?;
    if !global.quiet {
        println!("{} Return session cleared", style("✓").green());
    }
    Ok(())
}
