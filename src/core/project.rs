//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-project metadata directory
pub const PROJECT_DIR: &str = ".submat";

/// Represents a submat project (a directory holding `.submat/`)
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of .submat/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current =
            std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Use `--project` when given, otherwise discover from the current directory
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ProjectError> {
        match explicit {
            Some(path) => Self::discover_from(path),
            None => Self::discover(),
        }
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        let meta_dir = root.join(PROJECT_DIR);
        if meta_dir.exists() {
            return Err(ProjectError::AlreadyExists(root.clone()));
        }

        Self::create_layout(&root)?;
        Ok(Self { root })
    }

    /// Force initialization even if .submat/ exists (keeps stored objects)
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::create_layout(&root)?;
        Ok(Self { root })
    }

    fn create_layout(root: &Path) -> Result<(), ProjectError> {
        let meta_dir = root.join(PROJECT_DIR);
        for dir in ["store", "session"] {
            std::fs::create_dir_all(meta_dir.join(dir))
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        let config_path = meta_dir.join("config.yaml");
        if !config_path.exists() {
            std::fs::write(&config_path, Self::default_config())
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }
        Ok(())
    }

    fn default_config() -> &'static str {
        r#"# submat project configuration

# Blob store directory (default: .submat/store)
# store_dir: ""

# TrueType font with Hangul glyphs for PDF manifests and labels
# font_path: "font/malgun.ttf"

# Object keys inside the store
# workbook_key: bulk-ledger.xlsx
# snapshot_key: inout.db
# label_key: label_db.csv

# Default output format (auto, table, tsv, csv, json, md)
# default_format: auto
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .submat metadata directory
    pub fn meta_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.meta_dir().join("config.yaml")
    }

    /// Default blob store directory
    pub fn store_dir(&self) -> PathBuf {
        self.meta_dir().join("store")
    }

    /// Directory holding per-user working state (the return-tracking session)
    pub fn session_dir(&self) -> PathBuf {
        self.meta_dir().join("session")
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a submat project (searched from {searched_from:?}). Run 'submat init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("submat project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
