//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::PathBuf;

use crate::core::Project;

pub const DEFAULT_WORKBOOK_KEY: &str = "bulk-ledger.xlsx";
pub const DEFAULT_SNAPSHOT_KEY: &str = "inout.db";
pub const DEFAULT_LABEL_KEY: &str = "label_db.csv";

/// Toolkit configuration with layered hierarchy
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Blob store directory (default: .submat/store)
    pub store_dir: Option<PathBuf>,

    /// TrueType font for PDF output (needed for Hangul glyphs)
    pub font_path: Option<PathBuf>,

    /// Object key of the uploaded ledger workbook
    pub workbook_key: Option<String>,

    /// Object key of the SQLite snapshot derived from the workbook
    pub snapshot_key: Option<String>,

    /// Object key of the label reference table
    pub label_key: Option<String>,

    /// Default output format
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/submat/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.submat/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.config_path()) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        if let Ok(dir) = std::env::var("SUBMAT_STORE_DIR") {
            if !dir.is_empty() {
                config.store_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(font) = std::env::var("SUBMAT_FONT") {
            if !font.is_empty() {
                config.font_path = Some(PathBuf::from(font));
            }
        }

        // Relative store paths are anchored at the project root
        if let (Some(project), Some(dir)) = (project, config.store_dir.as_ref()) {
            if dir.is_relative() {
                config.store_dir = Some(project.root().join(dir));
            }
        }

        config
    }

    fn read_file(path: &std::path::Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "submat")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.store_dir.is_some() {
            self.store_dir = other.store_dir;
        }
        if other.font_path.is_some() {
            self.font_path = other.font_path;
        }
        if other.workbook_key.is_some() {
            self.workbook_key = other.workbook_key;
        }
        if other.snapshot_key.is_some() {
            self.snapshot_key = other.snapshot_key;
        }
        if other.label_key.is_some() {
            self.label_key = other.label_key;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
    }

    pub fn workbook_key(&self) -> String {
        self.workbook_key
            .clone()
            .unwrap_or_else(|| DEFAULT_WORKBOOK_KEY.to_string())
    }

    pub fn snapshot_key(&self) -> String {
        self.snapshot_key
            .clone()
            .unwrap_or_else(|| DEFAULT_SNAPSHOT_KEY.to_string())
    }

    pub fn label_key(&self) -> String {
        self.label_key
            .clone()
            .unwrap_or_else(|| DEFAULT_LABEL_KEY.to_string())
    }
}
