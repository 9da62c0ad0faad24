//! Runtime configuration for a polling session.
//!
//! Built once by the binary from command-line flags and never mutated
//! afterwards.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

/// Poll period used when `--interval` is not given.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Environment variable consulted for the connection string.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Where log records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    /// Opened in append mode, created if missing.
    File(PathBuf),
}

impl LogTarget {
    /// Interpret a `--log` argument; `-` means standard output.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            Self::Stdout
        } else {
            Self::File(PathBuf::from(arg))
        }
    }
}

impl fmt::Display for LogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogTarget::Stdout => f.write_str("-"),
            LogTarget::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Encoding of each log record.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    /// Labelled tab-separated values, one record per line.
    #[default]
    Ltsv,
    /// One JSON object per line.
    Json,
    /// Compact human-readable lines.
    Text,
}

/// Result schema requested from the server on every tick.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum QueryShape {
    /// Backend count of the named database only.
    Backends,
    /// Backend count plus the server-wide number of sessions in `pg_stat_activity`.
    #[default]
    Activity,
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub log_target: LogTarget,
    pub log_format: LogFormat,
    /// Empty means "use the libpq `PG*` environment defaults".
    pub database_url: String,
    pub database_name: String,
    pub interval: Duration,
    pub query: QueryShape,
}
