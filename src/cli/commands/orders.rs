//! `submat orders` command - trace a part to its sales and work orders

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{today, Workspace};
use crate::cli::table::{CellValue, ColumnDef, TableConfig, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::order_search::find_orders;

#[derive(clap::Args, Debug)]
pub struct OrdersArgs {
    /// Part number to trace
    pub part: String,

    /// Skip the work-order table
    #[arg(long)]
    pub no_work_orders: bool,
}

pub fn run(args: OrdersArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let ledger = ws.ledger()?;
    let format = ws.format(global);
    let search = find_orders(&ledger, &args.part, today(global))?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&search).into_diagnostic()?);
        return Ok(());
    }

    for warning in &search.warnings {
        eprintln!("{} {}", style("!").yellow(), warning);
    }
    if search.orders.is_empty() {
        if search.item_codes.is_empty() {
            println!(
                "{} Part {} is not a component in the BOM",
                style("!").yellow(),
                style(&args.part).cyan()
            );
        } else {
            println!(
                "{} No sales orders reference the parent items of {}",
                style("!").yellow(),
                style(&args.part).cyan()
            );
        }
        return Ok(());
    }

    if !global.quiet {
        let window = search
            .window
            .map(|w| w.to_string())
            .unwrap_or_default();
        println!(
            "{} BOM level {} · {}",
            style("→").blue(),
            search.bom_level,
            style(window).cyan()
        );
        if let Some(codes) = search.item_codes.get(search.bom_level.saturating_sub(1) as usize) {
            println!("  품목코드: {}", codes.join(", "));
        }
        println!();
    }

    let order_cols = vec![
        ColumnDef::new("order", "수주번호", 16),
        ColumnDef::new("part", "품번", 16),
        ColumnDef::new("name", "품명", 30),
        ColumnDef::new("due", "조정납기일자", 12),
        ColumnDef::new("qty", "수주수량", 10),
        ColumnDef::new("customer", "거래처", 20),
    ];
    let rows = search.orders.iter().map(|o| {
        TableRow::new()
            .cell("order", CellValue::Code(o.order.clone()))
            .cell("part", CellValue::Code(o.part.clone()))
            .cell("name", CellValue::Text(o.name.clone()))
            .cell("due", CellValue::Date(o.due))
            .cell("qty", CellValue::Text(o.qty.clone()))
            .cell("customer", CellValue::Text(o.customer.clone()))
    });
    TableFormatter::new(&order_cols, "sales order").output(rows, format);

    if args.no_work_orders || search.work_orders.is_empty() {
        return Ok(());
    }
    if format == OutputFormat::Auto || format == OutputFormat::Table {
        println!();
    }
    let wo_cols = vec![
        ColumnDef::new("order", "수주번호", 16),
        ColumnDef::new("work_order", "지시번호", 16),
        ColumnDef::new("date", "지시일자", 12),
        ColumnDef::new("name", "품명", 30),
    ];
    let rows = search.work_orders.iter().map(|w| {
        TableRow::new()
            .cell("order", CellValue::Code(w.order.clone()))
            .cell("work_order", CellValue::Code(w.work_order.clone()))
            .cell("date", CellValue::Text(w.date.clone()))
            .cell("name", CellValue::Text(w.name.clone()))
    });
    let config = if global.quiet {
        TableConfig::for_pipe()
    } else {
        TableConfig::default()
    };
    TableFormatter::new(&wo_cols, "work order")
        .with_config(config)
        .output(rows, format);
    Ok(())
}
