//! Page agent: loads settings once, then follows change notifications.

use std::sync::Arc;

use refresher_protocol::{Message, ipc::Listener};
use settings::{Settings, SettingsStore, normalize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::scheduler::{Effector, Scheduler};

/// The long-lived page context: loads settings once, then follows change
/// notifications and keeps its [`Scheduler`] in step with them.
pub struct Agent {
    store: SettingsStore,
    scheduler: Scheduler,
    settings: Settings,
}

impl Agent {
    /// Create an agent; nothing runs until [`Agent::start`].
    pub fn new(store: SettingsStore, effector: Arc<dyn Effector>) -> Self {
        Self {
            store,
            scheduler: Scheduler::new(effector),
            settings: Settings::default(),
        }
    }

    /// Load settings (migrating legacy data if found) and arm the scheduler.
    ///
    /// Storage failures are logged and the defaults are applied instead.
    pub async fn start(&mut self) -> Settings {
        let settings = match self.store.load().await {
            Ok(loaded) => {
                if loaded.migrated {
                    info!("initialized settings record");
                }
                loaded.settings
            }
            Err(e) => {
                error!(error = %e, "unable to read settings, using defaults");
                Settings::default()
            }
        };
        self.apply(settings);
        settings
    }

    /// Settings currently in effect.
    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// The scheduler owned by this agent.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    fn apply(&mut self, settings: Settings) {
        self.settings = settings;
        self.scheduler.apply(&settings);
    }

    /// Apply a settings change notification. Returns true if `msg` was one.
    ///
    /// The carried settings are used as-is, without a storage round trip; they
    /// are normalized once more so a sloppy sender cannot arm a bad timer.
    pub fn handle_message(&mut self, msg: &Message) -> bool {
        let Some(settings) = msg.settings() else {
            debug!(?msg, "ignoring unrelated message");
            return false;
        };
        let settings = normalize(&settings.to_value());
        info!(
            enabled = settings.enabled(),
            interval = settings.interval_seconds(),
            "applying settings change"
        );
        self.apply(settings);
        true
    }

    /// Follow notifications from `listener` until the channel closes or
    /// `cancel` fires, then disarm.
    pub async fn run(&mut self, listener: &mut Listener, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                msg = listener.recv() => match msg {
                    Some(msg) => {
                        self.handle_message(&msg);
                    }
                    None => break,
                },
            }
        }
        self.scheduler.shutdown().await;
        debug!("agent stopped");
    }
}
