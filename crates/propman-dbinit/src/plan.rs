//! Initialization plan.
//!
//! Which files are run, in which order, and which of them must exist. The
//! built-in default matches the layout of the application's `database/`
//! directory; a JSON file with the same shape can replace it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{InitError, Result};

/// A follow-up file applied after the main schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFile {
    /// Path relative to the plan's base directory (or absolute).
    pub path: PathBuf,
    /// Whether a missing file counts as a failure rather than a skip.
    #[serde(default)]
    pub required: bool,
}

impl PlanFile {
    /// Creates an optional plan file.
    pub fn optional(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            required: false,
        }
    }

    /// Creates a required plan file.
    pub fn required(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            required: true,
        }
    }
}

/// How a fallback file is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// The whole file is sent as one multi-statement execution.
    WholeFile,
    /// The file is split and each statement executed separately.
    PerStatement,
}

/// The files an initialization run uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitPlan {
    /// Directory relative paths are resolved against.
    pub base_dir: PathBuf,
    /// Root file with `SOURCE` directives. Preferred when present.
    pub root: PathBuf,
    /// Fallback schema file, run as a whole.
    pub schema: PathBuf,
    /// Fallback stored functions file.
    pub functions: PathBuf,
    /// Fallback stored procedures file.
    pub procedures: PathBuf,
    /// Fallback triggers file.
    pub triggers: PathBuf,
    /// Follow-up files, applied in order after either strategy.
    pub follow_ups: Vec<PlanFile>,
}

impl Default for InitPlan {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("database"),
            root: PathBuf::from("init.sql"),
            schema: PathBuf::from("schema.sql"),
            functions: PathBuf::from("functions.sql"),
            procedures: PathBuf::from("procedures.sql"),
            triggers: PathBuf::from("triggers.sql"),
            follow_ups: vec![
                PlanFile::optional("schema_update.sql"),
                PlanFile::optional("enhanced_schema_update.sql"),
                PlanFile::optional("add_owner_column.sql"),
                PlanFile::optional("link_owners.sql"),
                PlanFile::optional("assign_demo_data.sql"),
            ],
        }
    }
}

impl InitPlan {
    /// Creates the default plan rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Loads a plan from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| InitError::read_file(path, e))?;
        serde_json::from_str(&content).map_err(|e| InitError::Plan {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Replaces the base directory.
    #[must_use]
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Resolves a plan path against the base directory.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }

    /// Resolved root file path.
    #[must_use]
    pub fn root_path(&self) -> PathBuf {
        self.resolve(&self.root)
    }

    /// Resolved fallback files in execution order.
    #[must_use]
    pub fn fallback_steps(&self) -> Vec<(PathBuf, ExecutionMode)> {
        vec![
            (self.resolve(&self.schema), ExecutionMode::WholeFile),
            (self.resolve(&self.functions), ExecutionMode::PerStatement),
            (self.resolve(&self.procedures), ExecutionMode::PerStatement),
            (self.resolve(&self.triggers), ExecutionMode::PerStatement),
        ]
    }
}
