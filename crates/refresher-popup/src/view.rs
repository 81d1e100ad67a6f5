//! Popup view state: what the form currently shows.

use settings::Settings;

/// Shown when settings could not be loaded.
pub const DEFAULTS_NOTICE: &str = "Using default settings; saves are unavailable in this session.";
/// Shown when a save fails.
pub const SAVE_FAILED: &str = "Could not update the setting. Try again.";
/// Shown while auto refresh is disabled.
pub const PAUSED: &str = "Extension is paused.";

/// The status line under the form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    /// Nothing shown.
    #[default]
    Empty,
    /// Informational text.
    Info(String),
    /// Error text; stays until the next successful action or new input.
    Error(String),
}

impl Status {
    /// True when an error is displayed.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Displayed text, empty when nothing is shown.
    pub fn text(&self) -> &str {
        match self {
            Self::Empty => "",
            Self::Info(text) | Self::Error(text) => text,
        }
    }
}

/// Form state mirrored from the controller's settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    /// State of the enabled toggle.
    pub enabled: bool,
    /// Text in the interval input.
    pub interval_text: String,
    /// Status line.
    pub status: Status,
}

impl View {
    /// A view reflecting `settings` with no status yet.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            enabled: settings.enabled(),
            interval_text: settings.interval_seconds().to_string(),
            status: Status::Empty,
        }
    }

    /// Reset the form fields to `settings`, leaving the status alone.
    pub fn show_settings(&mut self, settings: &Settings) {
        self.enabled = settings.enabled();
        self.interval_text = settings.interval_seconds().to_string();
    }
}

/// Status text describing `settings`.
pub fn status_line(settings: &Settings) -> String {
    if !settings.enabled() {
        return PAUSED.to_string();
    }
    let secs = settings.interval_seconds();
    let unit = if secs == 1 { "second" } else { "seconds" };
    format!("Refreshing every {secs} {unit}.")
}
