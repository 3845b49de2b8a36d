//! MySQL schema bootstrapper for the property-management application.
//!
//! `propman-dbinit` turns a directory of SQL files into a ready database:
//!
//! - **Expander** - inlines `SOURCE` directives into one document
//! - **Splitter** - cuts that document into statements, keeping `DELIMITER`
//!   blocks (procedures, functions, triggers) intact
//! - **Initializer** - runs the root file or the fallback files, then the
//!   follow-up migrations, recording every outcome instead of stopping
//!
//! # Example
//!
//! ```rust,ignore
//! use propman_dbinit::prelude::*;
//!
//! let settings = ConnectionSettings {
//!     host: "localhost".into(),
//!     port: 3306,
//!     user: "root".into(),
//!     password: String::new(),
//! };
//! let mut conn = settings.connect().await?;
//!
//! let report = Initializer::new(InitPlan::new("database")).run(&mut conn).await;
//! close(conn).await;
//! println!("{} statements failed", report?.failed());
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Initialize using DB_HOST / DB_USER / DB_PASSWORD
//! propman-dbinit
//!
//! # Print the statements without connecting
//! propman-dbinit run --dry-run
//!
//! # Show the flattened root file
//! propman-dbinit expand database/init.sql
//! ```

pub mod error;
pub mod executor;
pub mod expander;
pub mod orchestrator;
pub mod plan;
pub mod report;
pub mod splitter;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{InitError, Result};
    pub use crate::executor::{ConnectionSettings, DryRunExecutor, SqlExecutor, close};
    pub use crate::expander::expand_file;
    pub use crate::orchestrator::Initializer;
    pub use crate::plan::{ExecutionMode, InitPlan, PlanFile};
    pub use crate::report::{Outcome, RunReport, StepOutcome, Strategy};
    pub use crate::splitter::{Statement, split_statements};
}
