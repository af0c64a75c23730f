//! `submat common` command - common-material alert for a part

use console::style;
use miette::Result;

use crate::cli::helpers::{today, Workspace};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::common_material::common_usage;

#[derive(clap::Args, Debug)]
pub struct CommonArgs {
    /// Part number to check
    pub part: String,
}

pub fn run(args: CommonArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let ledger = ws.ledger()?;
    let format = ws.format(global);
    let usage = common_usage(&ledger, &args.part, today(global))?;

    if usage.is_empty() {
        println!(
            "{} Part {} has no parent items in the BOM",
            style("!").yellow(),
            style(&args.part).cyan()
        );
        return Ok(());
    }

    let recent = usage.iter().filter(|u| u.recency.is_some()).count();
    if usage.len() > 1 && recent > 0 && format == OutputFormat::Auto && !global.quiet {
        println!(
            "{} {} is shared by {} items; {} requested within two weeks",
            style("!").yellow(),
            style(&args.part).cyan(),
            usage.len(),
            recent
        );
        println!();
    }

    let columns = vec![
        ColumnDef::new("item", "품목코드", 16),
        ColumnDef::new("name", "품명", 30),
        ColumnDef::new("last_request", "최근요청일", 10),
        ColumnDef::new("days_since", "경과일", 6),
        ColumnDef::new("recency", "구분", 8),
    ];
    let rows = usage.into_iter().map(|u| {
        TableRow::new()
            .cell("item", CellValue::Code(u.item))
            .cell("name", CellValue::Text(u.name))
            .cell("last_request", CellValue::Date(u.last_request))
            .cell(
                "days_since",
                u.days_since
                    .map(|d| CellValue::Qty(d as f64))
                    .unwrap_or(CellValue::Empty),
            )
            .cell("recency", CellValue::Recency(u.recency))
    });
    TableFormatter::new(&columns, "parent item").output(rows, format);
    Ok(())
}
