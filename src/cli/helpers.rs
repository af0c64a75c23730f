//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use chrono::{Local, NaiveDate};
use clap::ValueEnum;
use miette::{IntoDiagnostic, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::dates::parse_date;
use crate::core::returns::Session;
use crate::core::{Config, Ledger, Project, Store};

/// clap value parser for day arguments
pub fn parse_day(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(s).ok_or_else(|| format!("Invalid date: {}. Use YYYY-MM-DD", s))
}

/// The reference day: `--as-of` when given, else the local date
pub fn today(global: &GlobalOpts) -> NaiveDate {
    global.as_of.unwrap_or_else(|| Local::now().date_naive())
}

/// An opened project with its configuration and store
pub struct Workspace {
    pub project: Project,
    pub config: Config,
    pub store: Store,
}

impl Workspace {
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let project = Project::resolve(global.project.as_deref())
            .map_err(|e| miette::miette!("{}", e))?;
        let config = Config::load(Some(&project));
        let store = Store::from_config(&config, &project.store_dir());
        Ok(Self {
            project,
            config,
            store,
        })
    }

    pub fn ledger(&self) -> Result<Ledger> {
        Ok(Ledger::load(&self.store)?)
    }

    pub fn session_path(&self) -> PathBuf {
        Session::path_for(&self.project)
    }

    pub fn load_session(&self) -> Result<Session> {
        Ok(Session::load(&self.session_path())?)
    }

    pub fn save_session(&self, session: &Session) -> Result<()> {
        Ok(session.save(&self.session_path())?)
    }

    pub fn font_path(&self) -> Option<&Path> {
        self.config.font_path.as_deref()
    }

    /// `--format`, falling back to the configured default when left on auto
    pub fn format(&self, global: &GlobalOpts) -> OutputFormat {
        if global.format != OutputFormat::Auto {
            return global.format;
        }
        self.config
            .default_format
            .as_deref()
            .and_then(|f| OutputFormat::from_str(f, true).ok())
            .unwrap_or(OutputFormat::Auto)
    }
}

/// Ask a yes/no question on stdin; anything but "y" declines
pub fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush().into_diagnostic()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input).into_diagnostic()?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Write an export, creating parent directories
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).into_diagnostic()?;
    }
    std::fs::write(path, bytes).into_diagnostic()
}

/// Truncate to a display width, adding "..." if truncated
///
/// Width is measured in terminal columns, so Hangul counts double.
pub fn truncate_str(s: &str, max_width: usize) -> String {
    console::truncate_str(s, max_width, "...").into_owned()
}

/// Escape a string for CSV output
///
/// Handles commas, quotes, and newlines according to RFC 4180.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_day() {
        assert_eq!(parse_day("2025-06-09"), Ok(NaiveDate::from_ymd_opt(2025, 6, 9).unwrap()));
        assert_eq!(parse_day("2025/06/09"), Ok(NaiveDate::from_ymd_opt(2025, 6, 9).unwrap()));
        assert!(parse_day("next week").is_err());
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("용기라벨", 8), "용기라벨");
        let cut = truncate_str("용기전면라벨", 8);
        assert!(cut.ends_with("..."));
        assert!(console::measure_text_width(&cut) <= 8);
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
        assert_eq!(escape_csv("with\nnewline"), "\"with\nnewline\"");
    }
}
