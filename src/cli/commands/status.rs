//! `submat status` command - stored objects and ledger overview

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use crate::cli::helpers::Workspace;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::ledger::META_CONVERTED_AT;
use crate::core::BlobStore;

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Skip loading the ledger (object sizes only)
    #[arg(long)]
    pub objects_only: bool,
}

#[derive(Serialize)]
struct ObjectStatus {
    key: String,
    bytes: Option<u64>,
}

#[derive(Serialize)]
struct StatusReport {
    objects: Vec<ObjectStatus>,
    sheets: Vec<(String, usize)>,
    sha256: Option<String>,
    converted_at: Option<String>,
    ledger_error: Option<String>,
    session_rows: usize,
}

pub fn run(args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let blobs = ws.store.blobs();

    let mut objects = Vec::new();
    for key in [
        &ws.store.workbook_key,
        &ws.store.snapshot_key,
        &ws.store.label_key,
    ] {
        objects.push(ObjectStatus {
            key: key.clone(),
            bytes: blobs.size(key)?,
        });
    }

    let mut report = StatusReport {
        objects,
        sheets: Vec::new(),
        sha256: None,
        converted_at: None,
        ledger_error: None,
        session_rows: ws.load_session()?.expectations.len(),
    };

    if !args.objects_only {
        match ws.ledger() {
            Ok(ledger) => {
                report.sheets = ledger
                    .sheets()
                    .iter()
                    .map(|s| (s.name.clone(), s.len()))
                    .collect();
                report.sha256 = ledger.fingerprint().map(str::to_string);
                report.converted_at = ledger.meta.get(META_CONVERTED_AT).cloned();
            }
            Err(e) => report.ledger_error = Some(e.to_string()),
        }
    }

    if ws.format(global) == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        return Ok(());
    }

    println!("{}", style("Stored objects").bold());
    for obj in &report.objects {
        match obj.bytes {
            Some(bytes) => println!(
                "  {} {:<20} {} bytes",
                style("✓").green(),
                obj.key,
                bytes
            ),
            None => println!("  {} {:<20} {}", style("-").dim(), obj.key, style("missing").dim()),
        }
    }

    if !report.sheets.is_empty() {
        println!();
        println!("{}", style("Ledger sheets").bold());
        for (name, rows) in &report.sheets {
            println!("  {} {} rows", console::pad_str(name, 10, console::Alignment::Left, None), rows);
        }
        if let Some(sha) = &report.sha256 {
            println!("  sha256 {}", style(sha).dim());
        }
        if let Some(at) = &report.converted_at {
            println!("  converted {}", at);
        }
    }
    if let Some(err) = &report.ledger_error {
        println!();
        println!("{} ledger not loaded: {}", style("!").yellow(), err);
    }

    println!();
    println!(
        "Return session: {} row(s)",
        style(report.session_rows).cyan()
    );
    Ok(())
}
