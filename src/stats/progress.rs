//! Periodic progress output
//!
//! A background thread that prints the collector's running operation count
//! and rate at a fixed interval while a run is in flight. It only reads the
//! collector's atomics, so recording threads never wait on it.

use super::Collector;
use crossbeam::channel::{bounded, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Handle to a running progress thread
///
/// Dropping the handle stops the thread.
#[derive(Debug)]
pub struct ProgressReporter {
    stop_tx: Sender<()>,
    worker: Option<JoinHandle<u64>>,
}

impl ProgressReporter {
    /// Start printing progress every `interval`
    pub fn spawn(collector: Arc<Collector>, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        debug!("Starting progress reporter ({:?} interval)", interval);

        let worker = thread::spawn(move || {
            let mut updates = 0u64;
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        collector.print_progress(collector.total_ops());
                        updates += 1;
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            updates
        });

        Self {
            stop_tx,
            worker: Some(worker),
        }
    }

    /// Stop the thread and wait for it; returns the number of updates printed
    pub fn stop(&mut self) -> u64 {
        let Some(worker) = self.worker.take() else {
            return 0;
        };
        let _ = self.stop_tx.try_send(());
        match worker.join() {
            Ok(updates) => {
                debug!("Progress reporter stopped after {} updates", updates);
                updates
            }
            Err(_) => {
                warn!("Progress reporter thread panicked");
                0
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.stop();
    }
}
