//! Periodic tick and state machine tests
//!
//! Verifies that the sync pass drives registered managers while
//! playing, that the two tick streams stop on pause, and that the clock
//! auto-pauses and emits `Ended` at the presentation end. Paused tokio
//! time is driven in small sleep steps so the spawned ticker tasks are
//! actually polled between assertions.

use async_trait::async_trait;
use ensemble_clock::MasterClock;
use ensemble_core::traits::TrackManager;
use ensemble_core::types::{ClockEvent, ClockEventKind, SyncMetrics, TimelineItem, TrackKind};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

// ===== Test Helpers =====

static INIT: Once = Once::new();

/// Route tracing output to the test capture, once per binary.
fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// Advance paused time in small steps, yielding so spawned interval
/// and sleep tasks get polled as their deadlines pass.
async fn run_for(duration: Duration) {
    let step = Duration::from_millis(50);
    let mut remaining = duration;
    while remaining > Duration::ZERO {
        let chunk = remaining.min(step);
        tokio::time::sleep(chunk).await;
        remaining -= chunk;
    }
}

/// Mock manager that records every sync pass it receives.
#[derive(Default)]
struct SyncRecorder {
    syncs: Mutex<Vec<(f64, f64)>>,
    rates: Mutex<Vec<f64>>,
    pauses: AtomicUsize,
}

impl SyncRecorder {
    fn new() -> Arc<Self> {
        init_logging();
        Arc::new(Self::default())
    }

    fn sync_count(&self) -> usize {
        self.syncs.lock().unwrap().len()
    }
}

#[async_trait]
impl TrackManager for SyncRecorder {
    fn id(&self) -> &str {
        "recorder"
    }

    fn kind(&self) -> TrackKind {
        TrackKind::Audio
    }

    async fn load(&self, _items: Vec<TimelineItem>, _base_path: &Path) -> ensemble_core::Result<()> {
        Ok(())
    }

    fn sync(&self, master_time_ms: f64, rate: f64) {
        self.syncs.lock().unwrap().push((master_time_ms, rate));
    }

    async fn seek(&self, _time_ms: f64) -> bool {
        true
    }

    fn play(&self) {}

    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn set_playback_rate(&self, rate: f64) {
        self.rates.lock().unwrap().push(rate);
    }

    fn current_item(&self) -> Option<TimelineItem> {
        None
    }

    fn metrics(&self) -> SyncMetrics {
        SyncMetrics::default()
    }

    fn destroy(&self) {}
}

fn collect_events(clock: &MasterClock) -> (Arc<Mutex<Vec<ClockEvent>>>, ensemble_clock::Subscription) {
    init_logging();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let subscription = clock.subscribe(move |event| sink.lock().unwrap().push(event));
    (events, subscription)
}

// ===== Tests =====

#[tokio::test(start_paused = true)]
async fn sync_pass_drives_managers_while_playing() {
    let clock = MasterClock::new(600_000.0);
    let recorder = SyncRecorder::new();
    clock.register_manager(recorder.clone());

    clock.play();
    run_for(Duration::from_millis(1_100)).await;

    let syncs = recorder.syncs.lock().unwrap().clone();
    assert!(syncs.len() >= 2, "expected several sync passes, got {}", syncs.len());
    // Master time advances monotonically across passes.
    for pair in syncs.windows(2) {
        assert!(pair[0].0 <= pair[1].0);
    }
    assert!(syncs.iter().all(|(_, rate)| *rate == 1.0));
}

#[tokio::test(start_paused = true)]
async fn sync_pass_stops_on_pause() {
    let clock = MasterClock::new(600_000.0);
    let recorder = SyncRecorder::new();
    clock.register_manager(recorder.clone());

    clock.play();
    run_for(Duration::from_millis(1_100)).await;
    clock.pause();
    let at_pause = recorder.sync_count();

    run_for(Duration::from_secs(5)).await;
    assert_eq!(recorder.sync_count(), at_pause);
}

#[tokio::test(start_paused = true)]
async fn time_updates_are_emitted_while_playing() {
    let clock = MasterClock::new(600_000.0);
    let (events, _sub) = collect_events(&clock);

    clock.play();
    run_for(Duration::from_millis(1_000)).await;
    clock.pause();

    let updates: Vec<f64> = events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.kind == ClockEventKind::TimeUpdate)
        .map(|e| e.time_ms)
        .collect();
    assert!(updates.len() >= 3, "expected several TimeUpdates, got {}", updates.len());
    for pair in updates.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
}

#[tokio::test(start_paused = true)]
async fn reaching_duration_auto_pauses_and_emits_ended() {
    let clock = MasterClock::new(1_000.0);
    let (events, _sub) = collect_events(&clock);

    clock.play();
    run_for(Duration::from_millis(1_500)).await;

    assert!(!clock.is_playing());
    assert_eq!(clock.current_time_ms(), 1_000.0);

    let recorded = events.lock().unwrap();
    let ended_count = recorded
        .iter()
        .filter(|e| e.kind == ClockEventKind::Ended)
        .count();
    assert_eq!(ended_count, 1, "expected exactly one Ended event");
    let ended = recorded
        .iter()
        .find(|e| e.kind == ClockEventKind::Ended)
        .unwrap();
    assert_eq!(ended.time_ms, 1_000.0);
    assert!(!ended.is_playing);
}

#[tokio::test(start_paused = true)]
async fn reaching_duration_pauses_registered_managers() {
    let clock = MasterClock::new(1_000.0);
    let recorder = SyncRecorder::new();
    clock.register_manager(recorder.clone());

    clock.play();
    run_for(Duration::from_millis(1_500)).await;

    // Native sources whose media extends past the declared duration
    // must not keep playing after the presentation ends.
    assert!(!clock.is_playing());
    assert!(recorder.pauses.load(Ordering::SeqCst) >= 1);

    // And the tick streams are gone: no further sync passes arrive.
    let at_end = recorder.sync_count();
    run_for(Duration::from_secs(3)).await;
    assert_eq!(recorder.sync_count(), at_end);
}

#[tokio::test(start_paused = true)]
async fn rate_change_reaches_managers() {
    let clock = MasterClock::new(600_000.0);
    let recorder = SyncRecorder::new();
    clock.register_manager(recorder.clone());

    clock.set_playback_rate(1.5).unwrap();

    assert_eq!(recorder.rates.lock().unwrap().clone(), vec![1.5]);
}
