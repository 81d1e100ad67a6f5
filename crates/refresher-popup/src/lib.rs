//! Popup-side settings controller.
//!
//! The popup is short-lived: it loads settings, mirrors them in a [`View`],
//! persists user edits through the settings store, and announces each
//! successful write so a running agent can re-arm without touching storage.

mod controller;
mod view;

pub use controller::{Controller, is_rejected_input};
pub use view::{DEFAULTS_NOTICE, PAUSED, SAVE_FAILED, Status, View, status_line};
