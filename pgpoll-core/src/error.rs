//! Structured error types for pgpoll-core.
//!
//! Every variant is fatal for the run: the poller never retries. The binary
//! logs the error once and exits with [`PollError::exit_code`].

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PollError {
    /// The log file could not be opened for append
    #[error("failed to open log file {path:?}: {source}")]
    LogSink { path: PathBuf, source: io::Error },

    /// The interrupt listener could not be installed
    #[error("failed to install interrupt handler: {0}")]
    Signal(#[source] io::Error),

    /// Establishing the database connection failed
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// The statistics query failed to execute
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// Closing the database connection failed
    #[error("failed to close database connection: {0}")]
    Close(#[source] sqlx::Error),

    /// The statistics query returned no row
    #[error("no statistics row for database '{db_name}'")]
    NoRow { db_name: String },

    /// A result column could not be decoded as an integer
    #[error("failed to scan column '{column}': {source}")]
    Scan {
        column: &'static str,
        source: sqlx::Error,
    },
}

/// Result type alias for pgpoll-core operations
pub type Result<T> = std::result::Result<T, PollError>;

impl PollError {
    pub fn log_sink(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::LogSink {
            path: path.into(),
            source,
        }
    }

    pub fn no_row(db_name: impl Into<String>) -> Self {
        Self::NoRow {
            db_name: db_name.into(),
        }
    }

    pub fn scan(column: &'static str, source: sqlx::Error) -> Self {
        Self::Scan { column, source }
    }

    /// Process exit code for this failure.
    ///
    /// `2` is left to the argument parser.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            PollError::LogSink { .. } | PollError::Signal(_) => ExitCode::from(3),
            PollError::Connect(_) | PollError::Close(_) => ExitCode::from(4),
            PollError::Query(_) | PollError::NoRow { .. } | PollError::Scan { .. } => {
                ExitCode::from(5)
            }
        }
    }
}
