//! Popup controller flows against an in-memory area.

use std::{sync::Arc, time::Duration};

use refresher_engine::ChangeBroadcaster;
use refresher_popup::{
    Controller, DEFAULTS_NOTICE, PAUSED, SAVE_FAILED, Status, is_rejected_input,
};
use refresher_protocol::{
    Message,
    ipc::{Bus, Listener},
};
use serde_json::json;
use settings::{
    MemoryArea, Op, Settings, SettingsStore, StorageGateway,
    model::{INTERVAL_INPUT_REJECTED, SETTINGS_KEY},
};

/// A controller over `area` plus a listener on its bus.
fn controller(area: &Arc<MemoryArea>) -> (Controller, Listener) {
    let bus = Bus::new();
    let listener = bus.subscribe();
    let store = SettingsStore::new(StorageGateway::default().with_area(area.clone()));
    (
        Controller::new(store, ChangeBroadcaster::new(Arc::new(bus))),
        listener,
    )
}

/// True when nothing arrives on `listener` shortly.
async fn no_message(listener: &mut Listener) -> bool {
    tokio::time::timeout(Duration::from_millis(20), listener.recv())
        .await
        .is_err()
}

#[tokio::test]
async fn start_reflects_stored_settings() {
    let area = Arc::new(MemoryArea::new("local"));
    area.insert(SETTINGS_KEY, json!({"enabled": true, "intervalSeconds": 1}));
    let (mut c, _rx) = controller(&area);
    c.start().await;

    assert!(c.view().enabled);
    assert_eq!(c.view().interval_text, "1");
    assert_eq!(
        c.view().status,
        Status::Info("Refreshing every 1 second.".into())
    );
}

#[tokio::test]
async fn start_failure_shows_defaults_notice() {
    let area = Arc::new(MemoryArea::new("local"));
    area.fail(Op::Get, true);
    let (mut c, _rx) = controller(&area);
    c.start().await;

    assert_eq!(c.settings(), Settings::default());
    assert_eq!(c.view().interval_text, "5");
    assert_eq!(c.view().status, Status::Error(DEFAULTS_NOTICE.into()));
}

#[tokio::test]
async fn toggle_persists_and_announces() {
    let area = Arc::new(MemoryArea::new("local"));
    let (mut c, mut rx) = controller(&area);
    c.start().await;

    let settings = c.set_enabled(false).await.unwrap();
    assert_eq!(settings, Settings::new(false, 5));
    assert!(!c.view().enabled);
    assert_eq!(c.view().status, Status::Info(PAUSED.into()));
    assert_eq!(
        area.snapshot()[SETTINGS_KEY],
        json!({"enabled": false, "intervalSeconds": 5})
    );
    assert_eq!(
        rx.recv().await,
        Some(Message::settings_changed(Settings::new(false, 5)))
    );
}

#[tokio::test]
async fn unchanged_value_neither_writes_nor_announces() {
    let area = Arc::new(MemoryArea::new("local"));
    let (mut c, mut rx) = controller(&area);
    c.start().await;
    let writes = area.set_calls();

    let settings = c.submit_interval("5").await.unwrap();
    assert_eq!(settings, Settings::default());
    assert_eq!(area.set_calls(), writes);
    assert!(no_message(&mut rx).await);
}

#[tokio::test]
async fn invalid_interval_is_rejected_locally() {
    let area = Arc::new(MemoryArea::new("local"));
    let (mut c, mut rx) = controller(&area);
    c.start().await;
    let writes = area.set_calls();

    c.interval_input_changed("-2");
    let err = c.submit_interval("-2").await.unwrap_err();
    assert!(is_rejected_input(&err));
    assert_eq!(c.view().status, Status::Error(INTERVAL_INPUT_REJECTED.into()));
    assert_eq!(c.view().interval_text, "5");
    assert_eq!(area.set_calls(), writes);
    assert!(no_message(&mut rx).await);

    // Typing again clears the error.
    c.interval_input_changed("8");
    assert_eq!(c.view().status, Status::Empty);
    assert_eq!(c.view().interval_text, "8");
}

#[tokio::test]
async fn failed_save_reverts_view_and_keeps_error() {
    let area = Arc::new(MemoryArea::new("local"));
    let (mut c, mut rx) = controller(&area);
    c.start().await;
    area.fail(Op::Set, true);

    c.interval_input_changed("12");
    let err = c.submit_interval("12").await.unwrap_err();
    assert!(!is_rejected_input(&err));
    assert_eq!(c.view().interval_text, "5");
    assert_eq!(c.view().status, Status::Error(SAVE_FAILED.into()));
    assert_eq!(c.settings(), Settings::default());
    assert!(no_message(&mut rx).await);

    // Recovery: the next successful save clears the error.
    area.fail(Op::Set, false);
    c.submit_interval("12").await.unwrap();
    assert_eq!(
        c.view().status,
        Status::Info("Refreshing every 12 seconds.".into())
    );
}
