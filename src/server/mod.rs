//! Single-threaded event loop serving connections.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──run()──▶ Running ──stop()──▶ Stopped
//! ```
//!
//! `Stopped` is terminal; a stopped server has to be bound again.

pub mod listener;

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use mio::Waker;

pub use listener::Server;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Server is already running")]
    AlreadyRunning,
    #[error("Server has been stopped")]
    Stopped,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Stops a running [`Server`] from another thread.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    waker: Arc<Waker>,
    shutdown: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub(crate) fn new(waker: Arc<Waker>, shutdown: Arc<AtomicBool>) -> Self {
        Self { waker, shutdown }
    }

    /// Requests shutdown and wakes the event loop. Idempotent.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Err(e) = self.waker.wake() {
            tracing::error!(error = %e, "Unable to wake event loop");
        }
    }
}
