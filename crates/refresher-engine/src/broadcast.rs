//! Best-effort settings change notifications.

use std::sync::Arc;

use refresher_protocol::{Message, ipc::MessageSink};
use settings::Settings;
use tracing::debug;

/// Sends fire-and-forget settings change notifications to other contexts.
///
/// Delivery is best effort: when no listener is attached the failure is
/// logged and dropped. Receivers that miss a notification pick up the stored
/// settings on their next load.
#[derive(Clone)]
pub struct ChangeBroadcaster {
    sink: Arc<dyn MessageSink>,
}

impl ChangeBroadcaster {
    /// Create a broadcaster sending through `sink`.
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self { sink }
    }

    /// Announce newly persisted settings. Never fails.
    pub async fn announce(&self, settings: Settings) {
        match self.sink.send(Message::settings_changed(settings)).await {
            Ok(()) => debug!(
                enabled = settings.enabled(),
                interval = settings.interval_seconds(),
                "settings change announced"
            ),
            Err(e) => debug!(error = %e, "settings change not delivered"),
        }
    }
}
