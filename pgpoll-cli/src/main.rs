//! pgpoll - log PostgreSQL backend statistics on a fixed interval
//!
//! Connects once, queries `pg_stat_database` (and optionally
//! `pg_stat_activity`) every `--interval`, and writes one record per poll
//! until Ctrl+C. Any failure is logged as a single error record and ends the
//! process with a non-zero exit code.

use std::process::ExitCode;

use clap::Parser;
use pgpoll_core::logging;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error};

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    // `--version` and `--help` exit here, before any sink or connection is opened.
    let config = Cli::parse().into_config();

    let (dispatch, result) = match logging::open_sink(&config.log_target) {
        Ok(sink) => {
            let dispatch = logging::dispatch(config.log_format, logging::default_filter(), sink);
            let result = pgpoll_core::run(&config)
                .with_subscriber(dispatch.clone())
                .await;
            (dispatch, result)
        }
        // The configured sink is unusable; report on stdout instead.
        Err(err) => (
            logging::dispatch(
                config.log_format,
                logging::default_filter(),
                std::io::stdout,
            ),
            Err(err),
        ),
    };

    tracing::dispatcher::with_default(&dispatch, || match result {
        Ok(summary) => {
            debug!(iterations = summary.iterations, "shutdown complete");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(err = %err);
            err.exit_code()
        }
    })
}
