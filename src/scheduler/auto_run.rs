//! Periodic polling loop.
//!
//! One batch per interval over the enabled registry targets. Stopping only
//! prevents future batches: a batch that is already running, and every probe
//! it dispatched, runs to completion.

use std::sync::{Arc, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{Scheduler, SchedulerError};

/// Handle to a running auto-run loop.
pub(crate) struct AutoRun {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Scheduler {
    /// Start polling every `interval`.
    ///
    /// Returns `Ok(false)` without changing anything if a loop is already running.
    pub fn start_auto_run(self: &Arc<Self>, interval: Duration) -> Result<bool, SchedulerError> {
        let mut slot = self.auto_run.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = slot.as_ref() {
            if !running.handle.is_finished() {
                tracing::debug!("Auto-run already active");
                return Ok(false);
            }
        }
        self.set_interval(interval)?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(Arc::downgrade(self), stop_rx));
        *slot = Some(AutoRun { stop_tx, handle });

        tracing::info!(interval_ms = interval.as_millis() as u64, "Auto-run started");
        Ok(true)
    }

    /// Stop scheduling new batches.
    ///
    /// Returns the loop's handle so callers can wait for the current batch
    /// to drain; `None` if nothing was running.
    pub fn stop_auto_run(&self) -> Option<JoinHandle<()>> {
        let running = self
            .auto_run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        let _ = running.stop_tx.send(true);
        tracing::info!("Auto-run stop requested");
        Some(running.handle)
    }

    pub fn is_auto_running(&self) -> bool {
        self.auto_run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }
}

async fn run_loop(scheduler: Weak<Scheduler>, mut stop_rx: watch::Receiver<bool>) {
    loop {
        if *stop_rx.borrow() {
            break;
        }
        let Some(this) = scheduler.upgrade() else {
            break;
        };

        let targets = this.registry.enabled();
        this.run_once(&targets).await;

        if *stop_rx.borrow() {
            break;
        }
        let interval = this.interval();
        drop(this);

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            res = stop_rx.changed() => {
                if res.is_err() {
                    break;
                }
            }
        }
    }
    tracing::info!("Auto-run stopped");
}
