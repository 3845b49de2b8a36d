//! Execution outcomes.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::splitter::skip_leading_comments;

/// Maximum number of characters of SQL kept in a preview.
pub const PREVIEW_LEN: usize = 100;

/// Result of executing one statement or file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Executed successfully.
    Applied,
    /// Execution failed; the run continued.
    Failed {
        /// Error message.
        reason: String,
    },
    /// Not executed.
    Skipped {
        /// Why it was skipped.
        reason: String,
    },
}

/// Outcome of one step of a run.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    /// File the SQL came from.
    pub source: PathBuf,
    /// Starting line of the statement, `None` for whole-file steps.
    pub line: Option<usize>,
    /// Truncated SQL text.
    pub preview: String,
    /// What happened.
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl StepOutcome {
    /// Returns whether the step failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }
}

/// Which strategy a run used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// The root file was expanded and split.
    Root,
    /// The individual schema/functions/procedures/triggers files were used.
    Fallback,
}

/// Ordered record of everything a run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Strategy used for the main schema.
    pub strategy: Strategy,
    /// Outcomes in execution order.
    pub steps: Vec<StepOutcome>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Number of applied steps.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Applied))
    }

    /// Number of failed steps.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    /// Number of skipped steps.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped { .. }))
    }

    /// Failed steps in execution order.
    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| s.is_failed())
    }

    /// Renders the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.steps.iter().filter(|s| pred(&s.outcome)).count()
    }
}

/// Drops leading comments, collapses whitespace and truncates SQL for log
/// lines.
#[must_use]
pub fn preview(sql: &str) -> String {
    let collapsed = skip_leading_comments(sql)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if collapsed.chars().count() <= PREVIEW_LEN {
        return collapsed;
    }
    let mut truncated: String = collapsed.chars().take(PREVIEW_LEN).collect();
    truncated.push_str("...");
    truncated
}
