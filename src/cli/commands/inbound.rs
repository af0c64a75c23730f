//! `submat inbound` command - receipt lookup by request date

use chrono::NaiveDate;
use console::style;
use miette::Result;

use crate::cli::helpers::{parse_day, today, Workspace};
use crate::cli::table::{sheet_rows, TableFormatter};
use crate::cli::GlobalOpts;
use crate::core::inbound::{lookup, InboundQuery};

#[derive(clap::Args, Debug)]
pub struct InboundArgs {
    /// First request date (default: yesterday)
    #[arg(long, value_parser = parse_day)]
    pub from: Option<NaiveDate>,

    /// Last request date (default: today)
    #[arg(long, value_parser = parse_day)]
    pub to: Option<NaiveDate>,

    /// Filter by part name (case-insensitive substring)
    #[arg(long, short = 'n')]
    pub name: Option<String>,
}

pub fn run(args: InboundArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let ledger = ws.ledger()?;
    let format = ws.format(global);
    let today = today(global);

    let mut query = InboundQuery::default_for(today);
    if let Some(from) = args.from {
        query.from = from;
    }
    if let Some(to) = args.to {
        query.to = to;
    }
    query.name = args.name.filter(|n| !n.trim().is_empty());
    if query.from > query.to {
        return Err(miette::miette!(
            "--from {} is after --to {}",
            query.from,
            query.to
        ));
    }

    let view = lookup(&ledger.receipts, &query)?;
    if view.is_empty() && !global.quiet {
        eprintln!(
            "{} No receipts requested between {} and {}",
            style("!").yellow(),
            query.from,
            query.to
        );
    }
    let (columns, rows) = sheet_rows(&view);
    TableFormatter::new(&columns, "receipt").output(rows, format);
    Ok(())
}
