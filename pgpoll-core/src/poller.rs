//! The poll loop.
//!
//! Each iteration runs one query, logs the sample, then waits for whichever
//! comes first: the shutdown future or the interval timer. The timer is
//! armed only after the sample has been logged, so consecutive queries start
//! at least one full interval apart (query time is not compensated).

use std::future::Future;
use std::time::Duration;

use tokio::time;
use tracing::{debug, warn};

use crate::config::PollerConfig;
use crate::error::Result;
use crate::shutdown::Interrupt;
use crate::source::{PgStatSource, StatSource};

/// Outcome of a run that ended by shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    /// Completed (queried and logged) iterations.
    pub iterations: u64,
}

pub struct Poller<S> {
    source: S,
    database_name: String,
    interval: Duration,
}

impl<S: StatSource> Poller<S> {
    pub fn new(source: S, database_name: impl Into<String>, interval: Duration) -> Self {
        Self {
            source,
            database_name: database_name.into(),
            interval,
        }
    }

    /// Poll until `shutdown` resolves or a query fails.
    ///
    /// `shutdown` is only observed between iterations; an in-flight query
    /// always completes. The source is closed exactly once on either exit
    /// path. A failed close after a clean shutdown is logged, not returned.
    pub async fn run<F>(mut self, shutdown: F) -> Result<PollSummary>
    where
        F: Future<Output = ()>,
    {
        let mut shutdown = Box::pin(shutdown);
        let mut iterations = 0u64;

        let outcome = loop {
            let sample = match self.source.fetch(&self.database_name).await {
                Ok(sample) => sample,
                Err(err) => break Err(err),
            };
            sample.log();
            iterations += 1;

            tokio::select! {
                biased;
                _ = &mut shutdown => break Ok(()),
                _ = time::sleep(self.interval) => {}
            }
        };
        // Stop listening before tearing down the connection.
        drop(shutdown);

        let closed = self.source.close().await;
        debug!(iterations, "poller stopped");

        match (outcome, closed) {
            (Err(err), closed) => {
                if let Err(close_err) = closed {
                    warn!(err = %close_err);
                }
                Err(err)
            }
            (Ok(()), Err(close_err)) => {
                warn!(err = %close_err);
                Ok(PollSummary { iterations })
            }
            (Ok(()), Ok(())) => Ok(PollSummary { iterations }),
        }
    }
}

/// Connect and poll until interrupted.
///
/// The interrupt listener is installed before connecting so a Ctrl+C during
/// the first query is not lost. An interrupt while the connect is still
/// pending abandons it and returns a summary with no iterations.
pub async fn run(config: &PollerConfig) -> Result<PollSummary> {
    let mut interrupt = Interrupt::install()?;
    let source = tokio::select! {
        biased;
        _ = interrupt.triggered() => {
            debug!(database = %config.database_name, "interrupted while connecting");
            return Ok(PollSummary { iterations: 0 });
        }
        source = PgStatSource::connect(&config.database_url, config.query) => source?,
    };
    debug!(
        database = %config.database_name,
        log = %config.log_target,
        interval = ?config.interval,
        query = ?config.query,
        "polling started"
    );

    Poller::new(source, config.database_name.clone(), config.interval)
        .run(interrupt.recv())
        .await
}
