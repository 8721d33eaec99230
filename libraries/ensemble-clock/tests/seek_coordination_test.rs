//! Coordinated seek tests
//!
//! Verifies the failure-handling core of the clock: deduplication,
//! serialization, per-track timeouts, and the event ordering guarantees
//! around the fan-out. All tests run on paused tokio time, so timeout
//! windows elapse instantly and deterministically.

use async_trait::async_trait;
use ensemble_clock::{ClockConfig, MasterClock};
use ensemble_core::traits::TrackManager;
use ensemble_core::types::{ClockEvent, ClockEventKind, SyncMetrics, TimelineItem, TrackKind};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::time::Instant;

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

/// Mock track manager with a controllable seek behavior.
struct MockTrackManager {
    id: String,
    /// How long each seek takes; `None` means it never resolves
    seek_delay: Option<Duration>,
    seeks: Mutex<Vec<f64>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    plays: AtomicUsize,
    pauses: AtomicUsize,
}

impl MockTrackManager {
    fn new(id: &str, seek_delay: Option<Duration>) -> Arc<Self> {
        init_logging();
        Arc::new(Self {
            id: id.to_string(),
            seek_delay,
            seeks: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            plays: AtomicUsize::new(0),
            pauses: AtomicUsize::new(0),
        })
    }

    fn instant(id: &str) -> Arc<Self> {
        Self::new(id, Some(Duration::ZERO))
    }

    fn seek_targets(&self) -> Vec<f64> {
        self.seeks.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrackManager for MockTrackManager {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        TrackKind::Video
    }

    async fn load(&self, _items: Vec<TimelineItem>, _base_path: &Path) -> ensemble_core::Result<()> {
        Ok(())
    }

    fn sync(&self, _master_time_ms: f64, _rate: f64) {}

    async fn seek(&self, time_ms: f64) -> bool {
        self.seeks.lock().unwrap().push(time_ms);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        match self.seek_delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => std::future::pending::<()>().await,
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        true
    }

    fn play(&self) {
        self.plays.fetch_add(1, Ordering::SeqCst);
    }

    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn set_playback_rate(&self, _rate: f64) {}

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
async fn seek_fans_out_to_every_registered_manager() {
    let clock = MasterClock::new(120_000.0);
    let video = MockTrackManager::instant("video");
    let audio = MockTrackManager::instant("audio");
    let subs = MockTrackManager::instant("subs");
    clock.register_manager(video.clone());
    clock.register_manager(audio.clone());
    clock.register_manager(subs.clone());

    clock.seek(95_000.0).await;

    assert_eq!(video.seek_targets(), vec![95_000.0]);
    assert_eq!(audio.seek_targets(), vec![95_000.0]);
    assert_eq!(subs.seek_targets(), vec![95_000.0]);
    assert_eq!(clock.current_time_ms(), 95_000.0);
}

#[tokio::test(start_paused = true)]
async fn stuck_manager_cannot_block_the_aggregate() {
    let config = ClockConfig::default();
    let seek_timeout = config.seek_timeout;
    let clock = MasterClock::with_config(120_000.0, config);
    let healthy = MockTrackManager::instant("healthy");
    let stuck = MockTrackManager::new("stuck", None);
    clock.register_manager(healthy.clone());
    clock.register_manager(stuck.clone());

    let (events, _sub) = collect_events(&clock);

    let started = Instant::now();
    clock.seek(10_000.0).await;
    let elapsed = started.elapsed();

    // The aggregate settles within timeout + epsilon, not never.
    assert!(elapsed <= seek_timeout + Duration::from_millis(100));
    assert_eq!(healthy.seek_targets(), vec![10_000.0]);
    assert_eq!(clock.current_time_ms(), 10_000.0);

    let kinds: Vec<ClockEventKind> = events.lock().unwrap().iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&ClockEventKind::Seek));
}

#[tokio::test(start_paused = true)]
async fn duplicate_seek_within_debounce_is_dropped() {
    let clock = MasterClock::new(120_000.0);
    let manager = MockTrackManager::instant("video");
    clock.register_manager(manager.clone());

    clock.seek(42_000.0).await;
    clock.seek(42_000.0).await;

    assert_eq!(manager.seek_targets(), vec![42_000.0]);
}

#[tokio::test(start_paused = true)]
async fn same_target_after_debounce_window_seeks_again() {
    let clock = MasterClock::new(120_000.0);
    let manager = MockTrackManager::instant("video");
    clock.register_manager(manager.clone());

    clock.seek(42_000.0).await;
    tokio::time::advance(Duration::from_millis(300)).await;
    clock.seek(42_000.0).await;

    assert_eq!(manager.seek_targets(), vec![42_000.0, 42_000.0]);
}

#[tokio::test(start_paused = true)]
async fn concurrent_seeks_are_serialized_not_raced() {
    let clock = MasterClock::new(120_000.0);
    let slow = MockTrackManager::new("slow", Some(Duration::from_millis(100)));
    clock.register_manager(slow.clone());

    let a = clock.clone();
    let b = clock.clone();
    tokio::join!(a.seek(10_000.0), b.seek(20_000.0));

    assert_eq!(slow.seeks.lock().unwrap().len(), 2);
    assert_eq!(slow.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn seek_event_waits_for_the_fanout() {
    let clock = MasterClock::new(120_000.0);
    let slow = MockTrackManager::new("slow", Some(Duration::from_millis(150)));
    clock.register_manager(slow.clone());

    let seek_emitted_at = Arc::new(Mutex::new(None::<Instant>));
    let sink = seek_emitted_at.clone();
    let _sub = clock.subscribe(move |event| {
        if event.kind == ClockEventKind::Seek {
            *sink.lock().unwrap() = Some(Instant::now());
        }
    });

    let started = Instant::now();
    clock.seek(5_000.0).await;

    let emitted = seek_emitted_at.lock().unwrap().expect("Seek event emitted");
    assert!(emitted.duration_since(started) >= Duration::from_millis(150));
}

#[tokio::test(start_paused = true)]
async fn follow_up_time_update_after_seek() {
    let clock = MasterClock::new(120_000.0);
    let (events, _sub) = collect_events(&clock);

    clock.seek(30_000.0).await;
    // Sleeping (rather than advancing) lets the spawned nudge task run
    // when its deadline passes.
    tokio::time::sleep(Duration::from_millis(400)).await;

    let kinds: Vec<ClockEventKind> = events.lock().unwrap().iter().map(|e| e.kind).collect();
    let seek_pos = kinds.iter().position(|k| *k == ClockEventKind::Seek).unwrap();
    assert!(
        kinds[seek_pos + 1..].contains(&ClockEventKind::TimeUpdate),
        "expected a TimeUpdate after Seek, got {kinds:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn play_and_pause_fan_out_to_managers() {
    let clock = MasterClock::new(120_000.0);
    let manager = MockTrackManager::instant("video");
    clock.register_manager(manager.clone());

    clock.play();
    clock.pause();

    assert_eq!(manager.plays.load(Ordering::SeqCst), 1);
    assert_eq!(manager.pauses.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn unregistered_manager_stops_receiving_seeks() {
    let clock = MasterClock::new(120_000.0);
    let manager = MockTrackManager::instant("video");
    clock.register_manager(manager.clone());

    clock.seek(10_000.0).await;
    clock.unregister_manager("video");
    tokio::time::advance(Duration::from_millis(300)).await;
    clock.seek(20_000.0).await;

    assert_eq!(manager.seek_targets(), vec![10_000.0]);
}
