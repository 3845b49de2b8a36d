//! Initialization orchestrator.
//!
//! Runs the root file when present, otherwise the fallback files, then every
//! follow-up file. Individual statement and file failures are recorded in the
//! [`RunReport`] and never stop the run.

use std::path::Path;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::executor::SqlExecutor;
use crate::expander::expand_file;
use crate::plan::{ExecutionMode, InitPlan, PlanFile};
use crate::report::{Outcome, RunReport, StepOutcome, Strategy, preview};
use crate::splitter::{Statement, split_statements};

/// Applies an [`InitPlan`] through a [`SqlExecutor`].
#[derive(Debug, Clone)]
pub struct Initializer {
    plan: InitPlan,
}

impl Initializer {
    /// Creates a new initializer.
    #[must_use]
    pub const fn new(plan: InitPlan) -> Self {
        Self { plan }
    }

    /// Runs the whole plan.
    ///
    /// Only an unreadable root file is returned as an error; every other
    /// problem ends up in the report.
    pub async fn run<E: SqlExecutor>(&self, executor: &mut E) -> Result<RunReport> {
        let started_at = Utc::now();
        let mut steps = Vec::new();

        let root = self.plan.root_path();
        let strategy = if root.is_file() {
            info!(file = %root.display(), "Running root file");
            let expanded = expand_file(&root)?;
            let statements = split_statements(&expanded);
            info!(statements = statements.len(), "Root file expanded");
            execute_statements(executor, &root, &statements, false, &mut steps).await;
            Strategy::Root
        } else {
            info!(file = %root.display(), "Root file not found, using individual files");
            self.run_fallback(executor, &mut steps).await;
            Strategy::Fallback
        };

        for file in &self.plan.follow_ups {
            let path = self.plan.resolve(&file.path);
            steps.push(apply_follow_up(executor, &path, file).await);
        }

        let report = RunReport {
            strategy,
            steps,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            applied = report.applied(),
            failed = report.failed(),
            skipped = report.skipped(),
            "Initialization finished"
        );
        Ok(report)
    }

    async fn run_fallback<E: SqlExecutor>(&self, executor: &mut E, steps: &mut Vec<StepOutcome>) {
        for (path, mode) in self.plan.fallback_steps() {
            if !path.is_file() {
                info!(file = %path.display(), "File not found, skipping");
                steps.push(skipped_file(&path, "file not found"));
                continue;
            }

            let sql = match std::fs::read_to_string(&path) {
                Ok(sql) => sql,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Failed to read file");
                    steps.push(failed_file(&path, e.to_string()));
                    continue;
                }
            };

            match mode {
                ExecutionMode::WholeFile => {
                    info!(file = %path.display(), "Executing file");
                    steps.push(execute_whole_file(executor, &path, &sql).await);
                }
                ExecutionMode::PerStatement => {
                    let statements = split_statements(&sql);
                    info!(
                        file = %path.display(),
                        statements = statements.len(),
                        "Executing statements"
                    );
                    execute_statements(executor, &path, &statements, true, steps).await;
                }
            }
        }
    }
}

/// Executes statements one at a time, recording each outcome.
///
/// With `skip_database_selection`, `USE` statements are recorded as skipped
/// instead of executed.
pub async fn execute_statements<E: SqlExecutor>(
    executor: &mut E,
    source: &Path,
    statements: &[Statement],
    skip_database_selection: bool,
    steps: &mut Vec<StepOutcome>,
) {
    for statement in statements {
        let text = preview(&statement.sql);

        let outcome = if skip_database_selection && statement.is_database_selection() {
            debug!(file = %source.display(), line = statement.line, "Skipping database selection");
            Outcome::Skipped {
                reason: "database selection".to_string(),
            }
        } else {
            match executor.execute(&statement.sql).await {
                Ok(()) => {
                    debug!(
                        file = %source.display(),
                        line = statement.line,
                        sql = %text,
                        "Statement applied"
                    );
                    Outcome::Applied
                }
                Err(e) => {
                    warn!(
                        file = %source.display(),
                        line = statement.line,
                        sql = %text,
                        error = %e,
                        "Statement failed"
                    );
                    Outcome::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        };

        steps.push(StepOutcome {
            source: source.to_path_buf(),
            line: Some(statement.line),
            preview: text,
            outcome,
        });
    }
}

async fn apply_follow_up<E: SqlExecutor>(
    executor: &mut E,
    path: &Path,
    file: &PlanFile,
) -> StepOutcome {
    if !path.is_file() {
        if file.required {
            warn!(file = %path.display(), "Required follow-up file not found");
            return failed_file(path, "required file not found".to_string());
        }
        info!(file = %path.display(), "Optional follow-up file not found, skipping");
        return skipped_file(path, "file not found");
    }

    match std::fs::read_to_string(path) {
        Ok(sql) => {
            info!(file = %path.display(), "Applying follow-up file");
            execute_whole_file(executor, path, &sql).await
        }
        Err(e) => {
            warn!(file = %path.display(), error = %e, "Failed to read follow-up file");
            failed_file(path, e.to_string())
        }
    }
}

async fn execute_whole_file<E: SqlExecutor>(
    executor: &mut E,
    path: &Path,
    sql: &str,
) -> StepOutcome {
    let outcome = match executor.execute(sql).await {
        Ok(()) => Outcome::Applied,
        Err(e) => {
            warn!(file = %path.display(), error = %e, "File execution failed");
            Outcome::Failed {
                reason: e.to_string(),
            }
        }
    };
    StepOutcome {
        source: path.to_path_buf(),
        line: None,
        preview: preview(sql),
        outcome,
    }
}

fn skipped_file(path: &Path, reason: &str) -> StepOutcome {
    StepOutcome {
        source: path.to_path_buf(),
        line: None,
        preview: String::new(),
        outcome: Outcome::Skipped {
            reason: reason.to_string(),
        },
    }
}

fn failed_file(path: &Path, reason: String) -> StepOutcome {
    StepOutcome {
        source: path.to_path_buf(),
        line: None,
        preview: String::new(),
        outcome: Outcome::Failed { reason },
    }
}
