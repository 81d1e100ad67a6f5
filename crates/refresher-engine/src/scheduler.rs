//! Periodic effector scheduling driven by settings.
//!
//! [`Scheduler::apply`] is the only entry point that arms the repeating
//! effector. It always disarms first, so at most one repeating task exists no
//! matter how often settings change.

use std::{cmp, sync::Arc, time::Duration};

use parking_lot::Mutex;
use settings::Settings;
use tracing::{debug, trace};

use crate::ticker::Ticker;

/// Shortest period the scheduler will ever arm.
pub const MIN_PERIOD_MS: u64 = 1000;

/// The page action triggered on every tick.
pub trait Effector: Send + Sync {
    /// Perform the action once. Returns false when the target could not be
    /// found; that tick is then simply a no-op.
    fn activate(&self) -> bool;
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No repeating effector armed.
    Idle,
    /// Effector repeats at the given period.
    Armed(Duration),
}

/// Repeat period for `settings`: whole seconds, never below [`MIN_PERIOD_MS`].
pub fn period_for(settings: &Settings) -> Duration {
    let ms = u64::from(settings.interval_seconds()).saturating_mul(1000);
    Duration::from_millis(cmp::max(MIN_PERIOD_MS, ms))
}

/// Run the effector once, absorbing a missing target.
fn fire(effector: &dyn Effector) {
    if !effector.activate() {
        trace!("refresh_target_missing");
    }
}

/// Owns the repeating effector task for one agent context.
pub struct Scheduler {
    effector: Arc<dyn Effector>,
    ticker: Ticker,
    state: Mutex<SchedulerState>,
}

impl Scheduler {
    /// Create an idle scheduler for `effector`.
    pub fn new(effector: Arc<dyn Effector>) -> Self {
        Self {
            effector,
            ticker: Ticker::new(),
            state: Mutex::new(SchedulerState::Idle),
        }
    }

    /// Current state.
    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }

    /// Re-arm for `settings`.
    ///
    /// Disarms any existing timer. When enabled, fires the effector once
    /// immediately and then repeats it every [`period_for`] `settings`.
    pub fn apply(&self, settings: &Settings) {
        self.disarm();
        if !settings.enabled() {
            debug!("auto refresh paused");
            return;
        }

        fire(self.effector.as_ref());

        let period = period_for(settings);
        let effector = self.effector.clone();
        self.ticker
            .start(period, period, move || fire(effector.as_ref()));
        *self.state.lock() = SchedulerState::Armed(period);
        debug!(period_ms = period.as_millis(), "auto refresh armed");
    }

    /// Cancel the repeating effector, if any. Safe to call when idle.
    pub fn disarm(&self) {
        if self.ticker.stop() {
            trace!("scheduler_disarmed");
        }
        *self.state.lock() = SchedulerState::Idle;
    }

    /// Cancel the repeating effector and wait briefly for its task to exit.
    pub async fn shutdown(&self) {
        self.ticker.stop_async().await;
        *self.state.lock() = SchedulerState::Idle;
    }
}
