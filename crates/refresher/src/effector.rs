//! Stand-in page effector for local runs.

use std::sync::atomic::{AtomicU64, Ordering};

use refresher_engine::Effector;
use tracing::info;

/// Logs each refresh instead of clicking a page control.
#[derive(Debug, Default)]
pub struct LogEffector {
    /// Refreshes performed so far.
    ticks: AtomicU64,
}

impl Effector for LogEffector {
    fn activate(&self) -> bool {
        let n = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        info!(tick = n, "refresh");
        true
    }
}
