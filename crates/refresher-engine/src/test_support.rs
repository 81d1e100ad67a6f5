//! Test support utilities for refresher-engine unit and integration tests.
//! These helpers are public so integration tests and downstream crates can
//! share them; they are intended for use by test suites only.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::time::{Instant, sleep};

use crate::scheduler::Effector;

/// Effector that counts activations.
pub struct CountingEffector {
    hits: AtomicUsize,
    target_present: bool,
}

impl CountingEffector {
    /// An effector whose target is always found.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            hits: AtomicUsize::new(0),
            target_present: true,
        })
    }

    /// An effector whose target is never found.
    pub fn missing_target() -> Arc<Self> {
        Arc::new(Self {
            hits: AtomicUsize::new(0),
            target_present: false,
        })
    }

    /// Number of activations so far, found or not.
    pub fn count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Effector for CountingEffector {
    fn activate(&self) -> bool {
        self.hits.fetch_add(1, Ordering::SeqCst);
        self.target_present
    }
}

/// Await until `pred` holds, polling every couple of milliseconds, up to `timeout_ms`.
pub async fn wait_until<F>(timeout_ms: u64, mut pred: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if pred() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(2)).await;
    }
}
