//! pgpoll-core: periodic PostgreSQL statistics poller
//!
//! Holds one connection, runs a fixed statistics query on a timer and logs
//! each result until interrupted. Every failure is fatal.

pub mod config;
pub mod error;
pub mod logging;
pub mod poller;
pub mod shutdown;
pub mod source;

pub use config::{
    LogFormat, LogTarget, PollerConfig, QueryShape, DATABASE_URL_ENV, DEFAULT_INTERVAL,
};
pub use error::{PollError, Result};
pub use poller::{run, PollSummary, Poller};
pub use shutdown::Interrupt;
pub use source::{PgStatSource, PollSample, StatSource};
