//! Statement executors.
//!
//! The orchestrator only needs to hand SQL text to something and learn whether
//! it succeeded. [`SqlExecutor`] is that seam: the real implementation runs
//! against a server-scoped MySQL connection, [`DryRunExecutor`] prints the SQL.

use std::io::{self, Stdout, Write};

use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};
use tracing::{debug, warn};

use crate::error::Result;

/// Something that can execute SQL text.
///
/// The text may hold several statements; implementations must accept that
/// for whole-file execution.
#[allow(async_fn_in_trait)]
pub trait SqlExecutor {
    /// Executes the SQL text.
    async fn execute(&mut self, sql: &str) -> Result<()>;
}

impl SqlExecutor for MySqlConnection {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        let result = sqlx::raw_sql(sql).execute(&mut *self).await?;
        debug!(rows = result.rows_affected(), "Executed SQL");
        Ok(())
    }
}

/// Server connection settings. No database is selected; the SQL is expected
/// to create and select its own schema.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Server host name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// User name.
    pub user: String,
    /// Password, empty for none.
    pub password: String,
}

impl ConnectionSettings {
    /// Opens a single connection at server scope.
    pub async fn connect(&self) -> Result<MySqlConnection> {
        let mut options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user);
        if !self.password.is_empty() {
            options = options.password(&self.password);
        }
        let conn = options.connect().await?;
        Ok(conn)
    }
}

/// Closes a connection, logging instead of failing when the server has
/// already gone away.
pub async fn close(conn: MySqlConnection) {
    if let Err(e) = conn.close().await {
        warn!(error = %e, "Failed to close connection cleanly");
    }
}

/// Prints SQL instead of executing it.
#[derive(Debug)]
pub struct DryRunExecutor<W = Stdout> {
    out: W,
    executed: usize,
}

impl DryRunExecutor {
    /// Creates a dry-run executor printing to stdout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for DryRunExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> DryRunExecutor<W> {
    /// Creates a dry-run executor printing to `out`.
    pub const fn with_writer(out: W) -> Self {
        Self { out, executed: 0 }
    }

    /// Number of SQL texts printed so far.
    #[must_use]
    pub const fn executed(&self) -> usize {
        self.executed
    }

    /// Consumes the executor, returning its writer.
    pub fn into_writer(self) -> W {
        self.out
    }
}

impl<W: Write> SqlExecutor for DryRunExecutor<W> {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.executed += 1;
        writeln!(self.out, "{}\n", sql.trim_end())?;
        Ok(())
    }
}
