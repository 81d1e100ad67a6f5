//! Ticker for scheduling a repeated action with cancellation support.
//!
//! Runs a callback after an initial delay and then on a fixed interval until
//! cancelled. At most one ticker task is alive per [`Ticker`]; starting a new
//! one cancels the previous task first.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Maximum time to wait for a ticker task to acknowledge cancellation.
pub const STOP_WAIT_TIMEOUT_MS: u64 = 50;

struct TickerEntry {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Single-slot ticker: schedules a closure after an initial delay and then on
/// each interval tick.
#[derive(Default)]
pub struct Ticker {
    entry: Mutex<Option<TickerEntry>>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start or replace the ticker with the given timings and `on_tick` closure.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<F>(&self, initial: Duration, interval: Duration, mut on_tick: F)
    where
        F: FnMut() + Send + 'static,
    {
        // Replace any existing ticker
        self.stop();

        let token = CancellationToken::new();
        let cancel = token.clone();

        let fut = async move {
            trace!(
                init_ms = initial.as_millis(),
                int_ms = interval.as_millis(),
                "ticker_start"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    trace!("ticker_cancelled_initial");
                    return;
                }
                _ = time::sleep(initial) => {}
            }

            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        trace!("ticker_cancelled");
                        return;
                    }
                    _ = ticker.tick() => {
                        on_tick();
                    }
                }
            }
        };

        let handle = tokio::spawn(fut);
        *self.entry.lock() = Some(TickerEntry { token, handle });
    }

    /// Stop the ticker if present (non-blocking). Returns true if one was running.
    pub fn stop(&self) -> bool {
        match self.entry.lock().take() {
            Some(entry) => {
                // Let the task exit through the token rather than aborting it mid-tick
                entry.token.cancel();
                trace!("ticker_stop");
                true
            }
            None => false,
        }
    }

    /// Stop the ticker and wait briefly for its task to finish.
    pub async fn stop_async(&self) {
        let entry = self.entry.lock().take();
        if let Some(entry) = entry {
            entry.token.cancel();
            match time::timeout(Duration::from_millis(STOP_WAIT_TIMEOUT_MS), entry.handle).await {
                Ok(Ok(())) => trace!("ticker_stop_async"),
                Ok(Err(e)) => trace!(error = %e, "ticker_task_join_failed"),
                Err(_) => trace!(
                    timeout_ms = STOP_WAIT_TIMEOUT_MS,
                    "ticker_stop_timeout"
                ),
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.get_mut().take() {
            entry.token.cancel();
        }
    }
}
