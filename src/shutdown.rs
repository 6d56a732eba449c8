//! One-shot shutdown broadcast.
//!
//! The signal is a crossbeam channel that never carries a message: triggering
//! drops its only sender, so every cloned listener observes the disconnect at
//! once and no listener can consume the event away from the others.

use crate::error::Result;
use crate::observer::{PipelineEvent, PipelineObserver};
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// A broadcast-once termination event shared by every pipeline worker
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    trigger: Arc<Mutex<Option<Sender<()>>>>,
    listener: Receiver<()>,
}

impl ShutdownSignal {
    /// Create a new, untriggered signal
    pub fn new() -> Self {
        let (tx, rx) = channel::bounded(0);
        Self {
            trigger: Arc::new(Mutex::new(Some(tx))),
            listener: rx,
        }
    }

    /// Broadcast the shutdown.
    ///
    /// Returns `true` for the call that actually fired the signal; later
    /// calls are no-ops.
    pub fn trigger(&self) -> bool {
        self.trigger.lock().take().is_some()
    }

    /// Check whether the signal has fired
    pub fn is_triggered(&self) -> bool {
        self.trigger.lock().is_none()
    }

    /// Get a receiver that becomes ready (disconnected) once the signal fires.
    ///
    /// Intended for use inside `crossbeam::select!`.
    pub fn listener(&self) -> Receiver<()> {
        self.listener.clone()
    }

    /// Block until the signal fires
    pub fn wait(&self) {
        let _ = self.listener.recv();
    }

    /// Block until the signal fires or the timeout elapses.
    ///
    /// Returns `true` if the signal fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.listener.recv_timeout(timeout).is_err() && self.is_triggered()
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Install a process-wide SIGINT/SIGTERM handler that fires `signal`.
///
/// Only one handler can be installed per process.
pub fn install_interrupt_handler(
    signal: ShutdownSignal,
    observer: Arc<dyn PipelineObserver>,
) -> Result<()> {
    ctrlc::set_handler(move || {
        if signal.trigger() {
            observer.on_event(&PipelineEvent::ShutdownRequested);
        }
    })?;
    Ok(())
}
