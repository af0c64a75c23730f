//! CLI argument definitions using clap derive

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    common::CommonArgs, completions::CompletionsArgs, inbound::InboundArgs, init::InitArgs,
    label::LabelCommands, orders::OrdersArgs, returns::ReturnsCommands, status::StatusArgs,
    upload::UploadArgs,
};
use crate::cli::helpers::parse_day;

#[derive(Parser)]
#[command(name = "submat")]
#[command(author, version, about = "Submaterial ledger toolkit")]
#[command(long_about = "Inbound lookup, order tracing, return-stock reconciliation and label handling on a plant's packaging-material ledger workbook.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .submat/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    /// Reference day for date windows (default: today)
    #[arg(long, global = true, value_parser = parse_day, value_name = "DATE")]
    pub as_of: Option<NaiveDate>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new submat project
    Init(InitArgs),

    /// Store a ledger workbook and convert it to a snapshot
    Upload(UploadArgs),

    /// Show stored objects and ledger sheet sizes
    Status(StatusArgs),

    /// Look up receipts by request date and name
    Inbound(InboundArgs),

    /// Trace a part to the sales orders and work orders that consume it
    Orders(OrdersArgs),

    /// Return-stock tracking and reconciliation
    #[command(subcommand)]
    Returns(ReturnsCommands),

    /// Show how recently the parent items of a part were requested
    Common(CommonArgs),

    /// Label reference table and roll calculator
    #[command(subcommand)]
    Label(LabelCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned columns on a terminal
    #[default]
    Auto,
    /// Bordered table
    Table,
    /// Tab-separated values (for piping)
    Tsv,
    /// CSV format (for spreadsheets)
    Csv,
    /// JSON format (for programming)
    Json,
    /// Markdown tables
    Md,
}
