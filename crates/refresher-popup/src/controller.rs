//! Popup controller: load, validate, persist, and announce.

use refresher_engine::ChangeBroadcaster;
use settings::{
    Error, Result, Settings, SettingsPatch, SettingsStore, model::INTERVAL_INPUT_REJECTED,
    parse_interval_input,
};
use tracing::{error, warn};

use crate::view::{DEFAULTS_NOTICE, SAVE_FAILED, Status, View, status_line};

/// Drives the popup form against the settings store.
///
/// The view always mirrors the store's last known-good settings; a rejected
/// or failed edit reverts the form and leaves an error in the status line.
pub struct Controller {
    /// Persistent settings.
    store: SettingsStore,
    /// Notifies other contexts after a successful write.
    broadcaster: ChangeBroadcaster,
    /// Current form state.
    view: View,
}

impl Controller {
    /// Create a controller showing default settings until [`Self::start`].
    pub fn new(store: SettingsStore, broadcaster: ChangeBroadcaster) -> Self {
        let view = View::from_settings(&store.current());
        Self {
            store,
            broadcaster,
            view,
        }
    }

    /// Current form state.
    pub fn view(&self) -> &View {
        &self.view
    }

    /// Last known-good settings.
    pub fn settings(&self) -> Settings {
        self.store.current()
    }

    /// Load settings and reflect them in the view.
    ///
    /// A load failure is not surfaced as an error: the defaults are shown
    /// with a notice that saving may not work this session.
    pub async fn start(&mut self) {
        match self.store.load().await {
            Ok(_) => self.show_current(),
            Err(e) => {
                error!(error = %e, "unable to load settings");
                self.view.show_settings(&self.store.current());
                self.view.status = Status::Error(DEFAULTS_NOTICE.to_string());
            }
        }
    }

    /// The enabled toggle changed.
    pub async fn set_enabled(&mut self, enabled: bool) -> Result<Settings> {
        self.persist(SettingsPatch::enabled(enabled)).await
    }

    /// The interval input was committed with `text`.
    ///
    /// Input that is not a positive number is rejected here and never reaches
    /// the store.
    pub async fn submit_interval(&mut self, text: &str) -> Result<Settings> {
        match parse_interval_input(text) {
            Ok(secs) => self.persist(SettingsPatch::interval(secs)).await,
            Err(e) => {
                self.view.status = Status::Error(INTERVAL_INPUT_REJECTED.to_string());
                self.view.show_settings(&self.store.current());
                Err(e)
            }
        }
    }

    /// The user is typing in the interval input: clear a stale error.
    pub fn interval_input_changed(&mut self, text: &str) {
        self.view.interval_text = text.to_string();
        if self.view.status.is_error() {
            self.view.status = Status::Empty;
        }
    }

    /// Save `patch`, then update the view and announce the change.
    async fn persist(&mut self, patch: SettingsPatch) -> Result<Settings> {
        match self.store.save(patch).await {
            Ok(saved) => {
                self.show_current();
                if saved.written {
                    self.broadcaster.announce(saved.settings).await;
                }
                Ok(saved.settings)
            }
            Err(e) => {
                warn!(error = %e, "settings save failed");
                self.view.show_settings(&self.store.current());
                self.view.status = Status::Error(SAVE_FAILED.to_string());
                Err(e)
            }
        }
    }

    /// Reflect current settings and their status line.
    fn show_current(&mut self) {
        let current = self.store.current();
        self.view.show_settings(&current);
        self.view.status = Status::Info(status_line(&current));
    }
}

/// True when `err` came from local input validation rather than storage.
pub fn is_rejected_input(err: &Error) -> bool {
    matches!(err, Error::ValidationRejected(_))
}
