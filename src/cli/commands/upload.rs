//! `submat upload` command - store the ledger workbook and its snapshot

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use tracing::info;

use crate::cli::helpers::Workspace;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::ledger::workbook_to_snapshot;

#[derive(clap::Args, Debug)]
pub struct UploadArgs {
    /// Ledger workbook (.xlsx)
    pub file: PathBuf,

    /// Store the workbook without building a snapshot
    #[arg(long)]
    pub no_snapshot: bool,
}

pub fn run(args: UploadArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let bytes = std::fs::read(&args.file).into_diagnostic()?;

    // Convert before storing so an unreadable file leaves the store untouched
    let converted = if args.no_snapshot {
        None
    } else {
        Some(workbook_to_snapshot(&bytes)?)
    };

    ws.store.save_workbook(&bytes)?;
    info!(file = %args.file.display(), bytes = bytes.len(), "workbook stored");

    let Some((snapshot, report)) = converted else {
        if !global.quiet {
            println!(
                "{} Stored {} ({} bytes)",
                style("✓").green(),
                style(&ws.store.workbook_key).cyan(),
                bytes.len()
            );
        }
        return Ok(());
    };
    ws.store.save_snapshot(&snapshot)?;

    if ws.format(global) == OutputFormat::Json {
        let tables: serde_json::Map<String, serde_json::Value> = report
            .tables
            .iter()
            .map(|(name, rows)| (name.clone(), serde_json::json!(rows)))
            .collect();
        let out = serde_json::json!({
            "workbook": ws.store.workbook_key,
            "snapshot": ws.store.snapshot_key,
            "sha256": report.fingerprint,
            "tables": tables,
            "missing": report.missing,
        });
        println!("{}", serde_json::to_string_pretty(&out).into_diagnostic()?);
        return Ok(());
    }

    if global.quiet {
        return Ok(());
    }
    println!(
        "{} Stored {} and {}",
        style("✓").green(),
        style(&ws.store.workbook_key).cyan(),
        style(&ws.store.snapshot_key).cyan()
    );
    for (name, rows) in &report.tables {
        println!("  {} {:<8} {} rows", style("→").blue(), name, rows);
    }
    for name in &report.missing {
        println!("  {} sheet '{}' not found", style("!").yellow(), name);
    }
    println!("  sha256 {}", style(&report.fingerprint[..12.min(report.fingerprint.len())]).dim());
    Ok(())
}
