//! Interrupt handling.
//!
//! The listener is registered eagerly by [`Interrupt::install`], before the
//! first query runs, so an interrupt delivered mid-query is buffered and seen
//! at the next wait instead of killing the process.
//!
//! Tokio cannot hand SIGINT back to the default disposition. Once the
//! listener has been installed, later interrupts (for example a second
//! Ctrl+C while the connection is closing) are swallowed rather than
//! terminating the process.

use std::io;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};
#[cfg(windows)]
use tokio::signal::windows::{ctrl_c, CtrlC};

use crate::error::{PollError, Result};

/// Registered SIGINT (Ctrl+C) listener.
pub struct Interrupt {
    #[cfg(unix)]
    inner: Signal,
    #[cfg(windows)]
    inner: CtrlC,
}

impl Interrupt {
    /// Register the listener with the runtime's signal driver.
    pub fn install() -> Result<Self> {
        Self::register().map_err(PollError::Signal)
    }

    #[cfg(unix)]
    fn register() -> io::Result<Self> {
        Ok(Self {
            inner: signal(SignalKind::interrupt())?,
        })
    }

    #[cfg(windows)]
    fn register() -> io::Result<Self> {
        Ok(Self { inner: ctrl_c()? })
    }

    /// Wait for the next interrupt without giving up the listener.
    pub async fn triggered(&mut self) {
        if self.inner.recv().await.is_none() {
            // Signal driver gone; never treat that as an interrupt.
            std::future::pending::<()>().await;
        }
        tracing::info!("Received interrupt, shutting down");
    }

    /// Resolve on the first interrupt.
    ///
    /// Consumes the listener: once this future completes the registration is
    /// dropped and no further interrupts are delivered to it.
    pub async fn recv(mut self) {
        self.triggered().await;
    }
}
