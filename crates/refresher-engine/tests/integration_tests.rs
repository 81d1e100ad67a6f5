//! Agent startup and notification handling.

use std::{sync::Arc, time::Duration};

use refresher_engine::{
    Agent, ChangeBroadcaster, SchedulerState, test_support::CountingEffector,
    test_support::wait_until,
};
use refresher_protocol::{Message, ipc::Bus};
use serde_json::json;
use settings::{
    MemoryArea, Op, Settings, SettingsStore, StorageGateway,
    model::{LEGACY_ENABLED_KEY, LEGACY_INTERVAL_KEY, SETTINGS_KEY},
};
use tokio_util::sync::CancellationToken;

fn store_over(area: &Arc<MemoryArea>) -> SettingsStore {
    SettingsStore::new(StorageGateway::default().with_area(area.clone()))
}

#[tokio::test(start_paused = true)]
async fn start_migrates_legacy_and_arms() {
    let area = Arc::new(MemoryArea::new("local"));
    area.insert(LEGACY_ENABLED_KEY, json!(true));
    area.insert(LEGACY_INTERVAL_KEY, json!(7));
    let effector = CountingEffector::new();
    let mut agent = Agent::new(store_over(&area), effector.clone());

    let settings = agent.start().await;
    assert_eq!(settings, Settings::new(true, 7));
    assert_eq!(effector.count(), 1);
    assert_eq!(
        agent.scheduler().state(),
        SchedulerState::Armed(Duration::from_secs(7))
    );
    assert_eq!(
        area.snapshot()[SETTINGS_KEY],
        json!({"enabled": true, "intervalSeconds": 7})
    );
}

#[tokio::test(start_paused = true)]
async fn start_with_disabled_record_stays_idle() {
    let area = Arc::new(MemoryArea::new("local"));
    area.insert(SETTINGS_KEY, json!({"enabled": false, "intervalSeconds": 2}));
    let effector = CountingEffector::new();
    let mut agent = Agent::new(store_over(&area), effector.clone());

    agent.start().await;
    assert_eq!(agent.scheduler().state(), SchedulerState::Idle);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(effector.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn unreadable_storage_falls_back_to_defaults() {
    let area = Arc::new(MemoryArea::new("local"));
    area.fail(Op::Get, true);
    let effector = CountingEffector::new();
    let mut agent = Agent::new(store_over(&area), effector.clone());

    let settings = agent.start().await;
    assert_eq!(settings, Settings::default());
    assert_eq!(
        agent.scheduler().state(),
        SchedulerState::Armed(Duration::from_secs(5))
    );
    assert_eq!(area.set_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn no_storage_at_all_falls_back_to_defaults() {
    let effector = CountingEffector::new();
    let mut agent = Agent::new(
        SettingsStore::new(StorageGateway::default()),
        effector.clone(),
    );
    assert_eq!(agent.start().await, Settings::default());
    assert_eq!(effector.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn handle_message_applies_without_storage() {
    let area = Arc::new(MemoryArea::new("local"));
    let effector = CountingEffector::new();
    let mut agent = Agent::new(store_over(&area), effector.clone());
    agent.start().await;
    let gets = area.get_calls();

    assert!(agent.handle_message(&Message::settings_changed(Settings::new(true, 2))));
    assert_eq!(agent.settings(), Settings::new(true, 2));
    assert_eq!(
        agent.scheduler().state(),
        SchedulerState::Armed(Duration::from_secs(2))
    );

    assert!(!agent.handle_message(&Message::Unknown));
    assert_eq!(agent.settings(), Settings::new(true, 2));

    assert!(agent.handle_message(&Message::settings_changed(Settings::new(false, 2))));
    assert_eq!(agent.scheduler().state(), SchedulerState::Idle);
    assert_eq!(area.get_calls(), gets);
}

#[tokio::test]
async fn run_follows_bus_until_cancelled() {
    let area = Arc::new(MemoryArea::new("local"));
    let effector = CountingEffector::new();
    let mut agent = Agent::new(store_over(&area), effector.clone());
    agent.start().await;

    let bus = Bus::new();
    let mut listener = bus.subscribe();
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let task = tokio::spawn(async move {
        agent.run(&mut listener, token).await;
        agent
    });

    let broadcaster = ChangeBroadcaster::new(Arc::new(bus.clone()));
    broadcaster.announce(Settings::new(true, 30)).await;
    // Each applied change fires the effector once immediately.
    assert!(wait_until(1000, || effector.count() >= 2).await);

    cancel.cancel();
    let agent = task.await.unwrap();
    assert_eq!(agent.settings(), Settings::new(true, 30));
    assert_eq!(agent.scheduler().state(), SchedulerState::Idle);
}

#[tokio::test]
async fn run_ends_when_channel_closes() {
    let area = Arc::new(MemoryArea::new("local"));
    let mut agent = Agent::new(store_over(&area), CountingEffector::new());
    agent.start().await;

    let bus = Bus::new();
    let mut listener = bus.subscribe();
    drop(bus);
    agent.run(&mut listener, CancellationToken::new()).await;
    assert_eq!(agent.scheduler().state(), SchedulerState::Idle);
}
