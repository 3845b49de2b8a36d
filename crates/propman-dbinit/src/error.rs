//! Error types for the database initializer.

use std::path::PathBuf;

/// Errors that can occur while initializing the database.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// Database error while executing SQL or connecting.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error not tied to a specific file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to read a SQL file.
    #[error("Failed to read '{path}': {source}")]
    ReadFile {
        /// Path of the file.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Invalid initialization plan.
    #[error("Invalid plan '{path}': {message}")]
    Plan {
        /// Path to the plan file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Statement rejected by a non-database executor.
    #[error("Execution failed: {0}")]
    Execution(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl InitError {
    /// Wraps an IO error with the path that caused it.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }
}

/// Result type for initializer operations.
pub type Result<T> = std::result::Result<T, InitError>;
