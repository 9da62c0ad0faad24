use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use pgpoll_core::{
    LogFormat, LogTarget, PollerConfig, QueryShape, DATABASE_URL_ENV, DEFAULT_INTERVAL,
};

#[derive(Parser, Debug)]
#[command(
    name = "pgpoll",
    author,
    version,
    about = "Poll PostgreSQL backend statistics and log them until interrupted."
)]
pub struct Cli {
    /// Log file name, or "-" for standard output. Files are appended to.
    #[arg(long, value_name = "PATH", default_value = "-")]
    pub log: String,

    /// Log record encoding.
    #[arg(long = "log-format", value_enum, default_value_t)]
    pub log_format: LogFormat,

    /// Database URL (can be set with DATABASE_URL environment variable).
    #[arg(
        long = "db-url",
        value_name = "URL",
        env = DATABASE_URL_ENV,
        default_value = "",
        hide_env_values = true
    )]
    pub db_url: String,

    /// Database name whose backends are counted.
    #[arg(long = "db-name", value_name = "NAME", default_value = "")]
    pub db_name: String,

    /// Query interval (e.g. 100ms, 1s, 2m) [default: 100ms].
    #[arg(long, value_name = "DURATION", value_parser = parse_interval)]
    pub interval: Option<Duration>,

    /// Columns to poll: backend count only, or backend count plus server-wide activity.
    #[arg(long, value_enum, default_value_t)]
    pub query: QueryShape,
}

impl Cli {
    pub fn into_config(self) -> PollerConfig {
        PollerConfig {
            log_target: LogTarget::from_arg(&self.log),
            log_format: self.log_format,
            database_url: self.db_url,
            database_name: self.db_name,
            interval: self.interval.unwrap_or(DEFAULT_INTERVAL),
            query: self.query,
        }
    }
}

fn parse_interval(value: &str) -> Result<Duration> {
    if value.trim() == "0" {
        return Ok(Duration::ZERO);
    }
    humantime::parse_duration(value)
        .with_context(|| format!("invalid interval '{value}' (expected e.g. 100ms, 1s, 2m)"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::path::PathBuf;

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn explicit_flags() {
        let cli = Cli::try_parse_from([
            "pgpoll",
            "--log",
            "/var/log/pgpoll.log",
            "--db-url",
            "postgres://localhost/app",
            "--db-name",
            "app",
            "--interval",
            "1s",
            "--query",
            "backends",
            "--log-format",
            "json",
        ])
        .unwrap();

        let config = cli.into_config();
        assert_eq!(
            config.log_target,
            LogTarget::File(PathBuf::from("/var/log/pgpoll.log"))
        );
        assert_eq!(config.database_url, "postgres://localhost/app");
        assert_eq!(config.database_name, "app");
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.query, QueryShape::Backends);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn defaults() {
        let config = Cli::try_parse_from(["pgpoll"]).unwrap().into_config();
        assert_eq!(config.log_target, LogTarget::Stdout);
        assert_eq!(config.log_format, LogFormat::Ltsv);
        assert_eq!(config.database_name, "");
        assert_eq!(config.interval, DEFAULT_INTERVAL);
        assert_eq!(config.query, QueryShape::Activity);
    }

    #[test]
    fn intervals() {
        assert_eq!(parse_interval("100ms").unwrap(), Duration::from_millis(100));
        assert_eq!(parse_interval("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_interval("1m 30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_interval("0").unwrap(), Duration::ZERO);
        assert!(parse_interval("soon").is_err());
        assert!(parse_interval("-1s").is_err());
    }

    #[test]
    fn unknown_query_shape_is_rejected() {
        let err = Cli::try_parse_from(["pgpoll", "--query", "everything"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn version_flag_short_circuits() {
        let err = Cli::try_parse_from(["pgpoll", "--version", "--interval", "1s"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
