//! End-to-end runtime flow over the real adapters: SQLite store, tokio
//! wake-up facility, and the core coordinator/ticker.

use std::sync::Arc;
use std::time::Duration;

use chime_core::{
    AlarmStore, CountdownTicker, RingingCoordinator, RingingHardware, TimerStore, TriggerScheduler,
};
use chime_domain::{
    AlarmState, Countdown, CoordinatorConfig, DatabaseConfig, ScheduledAlarm, TickerConfig,
};
use chime_infra::{LogNotifier, NullHardware, SqliteEventStore, StaticPermissions, TokioWakeupFacility};
use chrono::Utc;
use tempfile::TempDir;

async fn wait_for<F>(timeout: Duration, mut predicate: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if predicate() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn open_store(dir: &TempDir) -> Arc<SqliteEventStore> {
    let config = DatabaseConfig {
        path: dir.path().join("chime.db").to_string_lossy().into_owned(),
        pool_size: 2,
    };
    Arc::new(SqliteEventStore::open(&config).unwrap())
}

#[tokio::test(flavor = "multi_thread")]
async fn unanswered_alarm_rings_then_times_out_to_missed() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let id = store.save_alarm(ScheduledAlarm::new(6, 30).unwrap()).await.unwrap();

    let facility = Arc::new(TokioWakeupFacility::new());
    let mut events = facility.take_events().unwrap();
    let permissions = Arc::new(StaticPermissions::all_granted());
    let scheduler = Arc::new(TriggerScheduler::new(facility.clone(), permissions.clone()));
    let hardware = Arc::new(RingingHardware::new(Arc::new(NullHardware)));
    // Zero ring timeout: the missed demotion fires as soon as the wake-up
    // facility delivers it.
    let config = CoordinatorConfig { ring_timeout_secs: 0, ..CoordinatorConfig::default() };
    let coordinator = Arc::new(RingingCoordinator::new(
        store.clone() as Arc<dyn AlarmStore>,
        scheduler,
        Arc::new(LogNotifier),
        hardware,
        permissions,
        config,
    ));

    coordinator.start().await.unwrap();

    // Host-side drain of fired wake-ups into the coordinator handlers.
    let drain = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let _ = coordinator.handle_wakeup(event).await;
            }
        })
    };

    coordinator.on_trigger(id).await.unwrap();
    assert_eq!(store.alarm_by_id(id).await.unwrap().state, AlarmState::Ringing);

    let store_for_wait = store.clone();
    assert!(
        wait_for(Duration::from_secs(5), move || {
            let mut rx = AlarmStore::observe_alarms(store_for_wait.as_ref());
            let found = rx.borrow_and_update().iter().any(|a| a.id == id && a.state == AlarmState::Missed);
            found
        })
        .await,
        "ring timeout should demote the alarm to missed"
    );

    coordinator.stop().await.unwrap();
    drain.abort();
}

#[tokio::test(flavor = "multi_thread")]
async fn restored_running_timer_surfaces_as_completed() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    // Persisted as started 90s ago with a 60s target, as if the process
    // had been dead the whole time.
    let mut timer = Countdown::new("bread", 60_000).unwrap();
    timer.start(Utc::now() - chrono::Duration::seconds(90));
    let id = store.save_timer(timer).await.unwrap();

    let ticker = CountdownTicker::new(
        store.clone() as Arc<dyn TimerStore>,
        Arc::new(LogNotifier),
        TickerConfig { tick_interval_ms: 20 },
    );
    ticker.start().await.unwrap();

    let mut partitions = ticker.partitions();
    assert!(
        wait_for(Duration::from_secs(5), || {
            let parts = partitions.borrow_and_update();
            parts.completed.iter().any(|t| t.id == id && t.remaining_ms <= 0)
        })
        .await,
        "restored timer should project as completed"
    );

    ticker.stop().await.unwrap();
}
