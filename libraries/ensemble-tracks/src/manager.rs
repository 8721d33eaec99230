//! Generic media track manager
//!
//! One implementation of the track-manager contract serves every media
//! kind: the kind only changes the drift tolerance and logging, while
//! everything media-specific lives behind the `MediaSource` seam. The
//! manager reconciles its source against the master clock's sync passes
//! and participates in coordinated seeks, degrading itself on failure
//! instead of ever failing the coordination.

use crate::drift::DriftMonitor;
use async_trait::async_trait;
use ensemble_clock::{MasterClock, WeakMasterClock};
use ensemble_core::error::{EnsembleError, Result};
use ensemble_core::traits::{MediaSource, TrackManager};
use ensemble_core::types::{SyncMetrics, TimelineItem, TrackKind};
use ensemble_timeline::{find_item_at_time, item_relative_secs};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Native rates closer to the master rate than this are left alone
const RATE_EPSILON: f64 = 0.01;

/// Minimum spacing between gentle-reload recovery attempts
const RECOVERY_BACKOFF: Duration = Duration::from_secs(5);

/// Cap on the retained fault ledger
const MAX_FAULTS: usize = 32;

/// One recorded failure on a track. Never fatal; a diagnostic surface
/// may display the accumulated list.
#[derive(Debug, Clone)]
pub struct TrackFault {
    /// Operation that failed (load, seek, drift-correction, ...)
    pub operation: String,
    /// Error description
    pub message: String,
}

struct TrackState {
    items: Vec<TimelineItem>,
    base_path: PathBuf,
    current: Option<TimelineItem>,
    /// Whether the caller wants this track playing (survives switches
    /// and seeks; native play/pause converge toward it)
    intent_playing: bool,
    /// A background item switch is in flight
    switching: bool,
    /// The current item failed natively; drift logic is suspended and
    /// rate-limited recovery takes over
    degraded: bool,
    last_recovery: Option<Instant>,
    faults: Vec<TrackFault>,
}

struct TrackInner {
    id: String,
    kind: TrackKind,
    source: Arc<dyn MediaSource>,
    state: Mutex<TrackState>,
    drift: Mutex<DriftMonitor>,
    clock: Mutex<Option<WeakMasterClock>>,
    destroyed: AtomicBool,
}

impl TrackInner {
    fn record_fault(&self, operation: &str, error: &EnsembleError) {
        let mut state = self.state.lock().unwrap();
        if state.faults.len() == MAX_FAULTS {
            state.faults.remove(0);
        }
        state.faults.push(TrackFault {
            operation: operation.to_string(),
            message: error.to_string(),
        });
    }

    async fn load_item(&self, item: &TimelineItem) -> Result<()> {
        let path = {
            let state = self.state.lock().unwrap();
            state.base_path.join(&item.src)
        };
        self.source.load(&path).await
    }

    /// Background switch to a newly active item. Loads, positions, and
    /// restores play intent without ever stalling the sync tick that
    /// requested it.
    async fn switch_to(self: Arc<Self>, item: TimelineItem, master_time_ms: f64, rate: f64) {
        debug!(
            track_id = %self.id,
            item_id = %item.id,
            "switching to newly active item"
        );
        match self.load_item(&item).await {
            Ok(()) => {
                let offset = item_relative_secs(&item, master_time_ms);
                let positioned = match self.source.seek_secs(offset).await {
                    Ok(()) => true,
                    Err(error) => {
                        self.record_fault("switch-position", &error);
                        false
                    }
                };
                if positioned && (self.source.rate() - rate).abs() > RATE_EPSILON {
                    let _ = self.source.set_rate(rate);
                }
                let intent_playing = {
                    let mut state = self.state.lock().unwrap();
                    state.current = Some(item);
                    // A loaded but mispositioned item counts as degraded
                    // so the rate-limited recovery reload owns it.
                    state.degraded = !positioned;
                    state.switching = false;
                    state.intent_playing
                };
                if positioned {
                    let _ = if intent_playing {
                        self.source.play()
                    } else {
                        self.source.pause()
                    };
                } else {
                    let _ = self.source.pause();
                }
            }
            Err(error) => {
                warn!(
                    track_id = %self.id,
                    item_id = %item.id,
                    %error,
                    "item failed to load; track degraded"
                );
                self.record_fault("load", &error);
                let mut state = self.state.lock().unwrap();
                state.current = Some(item);
                state.degraded = true;
                state.switching = false;
            }
        }
    }
}

/// Track manager over a native media source.
///
/// Construct per track with the kind-specific constructor, then
/// [`attach`](MediaTrackManager::attach) it to the master clock:
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use ensemble_clock::MasterClock;
/// # use ensemble_core::traits::MediaSource;
/// # use ensemble_tracks::MediaTrackManager;
/// # fn example(clock: &MasterClock, element: Arc<dyn MediaSource>) {
/// let video = MediaTrackManager::video("video-main", element);
/// video.attach(clock);
/// # }
/// ```
pub struct MediaTrackManager {
    inner: Arc<TrackInner>,
}

impl MediaTrackManager {
    /// Create a manager with an explicit drift tolerance.
    pub fn with_tolerance(
        id: impl Into<String>,
        kind: TrackKind,
        source: Arc<dyn MediaSource>,
        drift_tolerance_ms: f64,
    ) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(TrackInner {
                id: id.into(),
                kind,
                source,
                state: Mutex::new(TrackState {
                    items: Vec::new(),
                    base_path: PathBuf::new(),
                    current: None,
                    intent_playing: false,
                    switching: false,
                    degraded: false,
                    last_recovery: None,
                    faults: Vec::new(),
                }),
                drift: Mutex::new(DriftMonitor::new(drift_tolerance_ms)),
                clock: Mutex::new(None),
                destroyed: AtomicBool::new(false),
            }),
        })
    }

    /// Create a manager with the kind's default drift tolerance.
    pub fn new(id: impl Into<String>, kind: TrackKind, source: Arc<dyn MediaSource>) -> Arc<Self> {
        Self::with_tolerance(id, kind, source, kind.default_drift_tolerance_ms())
    }

    /// Video track manager
    pub fn video(id: impl Into<String>, source: Arc<dyn MediaSource>) -> Arc<Self> {
        Self::new(id, TrackKind::Video, source)
    }

    /// Audio track manager
    pub fn audio(id: impl Into<String>, source: Arc<dyn MediaSource>) -> Arc<Self> {
        Self::new(id, TrackKind::Audio, source)
    }

    /// Timed-text track manager
    pub fn subtitle(id: impl Into<String>, source: Arc<dyn MediaSource>) -> Arc<Self> {
        Self::new(id, TrackKind::Subtitle, source)
    }

    /// Auxiliary-content track manager
    pub fn aux(id: impl Into<String>, source: Arc<dyn MediaSource>) -> Arc<Self> {
        Self::new(id, TrackKind::Aux, source)
    }

    /// Register with the master clock, keeping a weak handle so
    /// [`destroy`](TrackManager::destroy) can unregister later.
    pub fn attach(self: &Arc<Self>, clock: &MasterClock) {
        *self.inner.clock.lock().unwrap() = Some(clock.downgrade());
        clock.register_manager(self.clone());
    }

    /// Accumulated fault ledger for diagnostics.
    pub fn faults(&self) -> Vec<TrackFault> {
        self.inner.state.lock().unwrap().faults.clone()
    }

    fn destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackManager for MediaTrackManager {
    fn id(&self) -> &str {
        &self.inner.id
    }

    fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    async fn load(&self, items: Vec<TimelineItem>, base_path: &Path) -> Result<()> {
        if self.destroyed() {
            return Ok(());
        }
        let initial = find_item_at_time(&items, 0.0).cloned();
        {
            let mut state = self.inner.state.lock().unwrap();
            state.items = items;
            state.base_path = base_path.to_path_buf();
            state.current = None;
            state.intent_playing = false;
            state.switching = false;
            state.degraded = false;
            state.last_recovery = None;
            state.faults.clear();
        }
        self.inner.drift.lock().unwrap().reset();

        if let Some(item) = initial {
            match self.inner.load_item(&item).await {
                Ok(()) => {
                    self.inner.state.lock().unwrap().current = Some(item);
                }
                Err(error) => {
                    // One bad asset must not block the other tracks:
                    // record it and stay idle.
                    warn!(
                        track_id = %self.inner.id,
                        item_id = %item.id,
                        %error,
                        "initial item failed to load; track continues idle"
                    );
                    self.inner.record_fault("load", &error);
                    let mut state = self.inner.state.lock().unwrap();
                    state.current = Some(item);
                    state.degraded = true;
                }
            }
        }
        Ok(())
    }

    fn sync(&self, master_time_ms: f64, rate: f64) {
        if self.destroyed() {
            return;
        }

        let (active, current, switching, degraded, recovery_due) = {
            let mut state = self.inner.state.lock().unwrap();
            let active = find_item_at_time(&state.items, master_time_ms).cloned();
            let recovery_due = state.degraded
                && state
                    .last_recovery
                    .map_or(true, |at| at.elapsed() >= RECOVERY_BACKOFF);
            if recovery_due {
                state.last_recovery = Some(Instant::now());
            }
            (
                active,
                state.current.clone(),
                state.switching,
                state.degraded,
                recovery_due,
            )
        };

        let Some(active) = active else {
            // Gap or past the end: nothing should be active.
            if current.is_some() {
                self.inner.state.lock().unwrap().current = None;
                let _ = self.inner.source.pause();
            }
            return;
        };

        if current.as_ref() != Some(&active) {
            if !switching {
                self.inner.state.lock().unwrap().switching = true;
                let inner = Arc::clone(&self.inner);
                tokio::spawn(inner.switch_to(active, master_time_ms, rate));
            }
            return;
        }

        if degraded {
            // Gentle reload, at most once per backoff window; beyond
            // that the track stays degraded-but-alive.
            if recovery_due {
                debug!(track_id = %self.inner.id, "attempting recovery reload");
                let inner = Arc::clone(&self.inner);
                tokio::spawn(inner.switch_to(active, master_time_ms, rate));
            }
            return;
        }

        // Healthy steady state: measure drift, correct when due.
        let expected_secs = item_relative_secs(&active, master_time_ms);
        let drift_ms = (self.inner.source.position_secs() - expected_secs) * 1000.0;
        let correcting = {
            let mut drift = self.inner.drift.lock().unwrap();
            drift.record(drift_ms);
            let now = Instant::now();
            let due = drift.correction_due(now);
            if due {
                drift.note_correction(now);
            }
            due
        };
        if correcting {
            debug!(
                track_id = %self.inner.id,
                drift_ms,
                "drift beyond tolerance; issuing correction"
            );
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                if let Err(error) = inner.source.seek_secs(expected_secs).await {
                    inner.record_fault("drift-correction", &error);
                    inner.state.lock().unwrap().degraded = true;
                }
            });
        }

        if (self.inner.source.rate() - rate).abs() > RATE_EPSILON {
            let _ = self.inner.source.set_rate(rate);
        }
    }

    async fn seek(&self, time_ms: f64) -> bool {
        if self.destroyed() {
            return true;
        }

        let (target, intent_playing) = {
            let state = self.inner.state.lock().unwrap();
            (
                find_item_at_time(&state.items, time_ms).cloned(),
                state.intent_playing,
            )
        };

        let Some(item) = target else {
            // Nothing should be active at the target: park the source.
            let _ = self.inner.source.pause();
            self.inner.state.lock().unwrap().current = None;
            return true;
        };

        let needs_load = {
            let state = self.inner.state.lock().unwrap();
            state.current.as_ref() != Some(&item) || state.degraded
        };
        if needs_load {
            if let Err(error) = self.inner.load_item(&item).await {
                warn!(
                    track_id = %self.inner.id,
                    item_id = %item.id,
                    %error,
                    "seek load failed; track degraded"
                );
                self.inner.record_fault("seek-load", &error);
                let mut state = self.inner.state.lock().unwrap();
                state.current = Some(item);
                state.degraded = true;
                return false;
            }
            let mut state = self.inner.state.lock().unwrap();
            state.current = Some(item.clone());
            state.degraded = false;
        }

        let offset = item_relative_secs(&item, time_ms);
        if let Err(error) = self.inner.source.seek_secs(offset).await {
            self.inner.record_fault("seek", &error);
            self.inner.state.lock().unwrap().degraded = true;
            return false;
        }

        // Restore the prior play/pause intent.
        let result = if intent_playing {
            self.inner.source.play()
        } else {
            self.inner.source.pause()
        };
        if let Err(error) = result {
            debug!(track_id = %self.inner.id, %error, "intent restore after seek failed");
        }
        true
    }

    fn play(&self) {
        if self.destroyed() {
            return;
        }
        self.inner.state.lock().unwrap().intent_playing = true;
        if let Err(error) = self.inner.source.play() {
            // Competing play/pause on native elements is expected.
            debug!(track_id = %self.inner.id, %error, "native play refused");
        }
    }

    fn pause(&self) {
        if self.destroyed() {
            return;
        }
        self.inner.state.lock().unwrap().intent_playing = false;
        if let Err(error) = self.inner.source.pause() {
            debug!(track_id = %self.inner.id, %error, "native pause refused");
        }
    }

    fn set_playback_rate(&self, rate: f64) {
        if self.destroyed() {
            return;
        }
        if (self.inner.source.rate() - rate).abs() > RATE_EPSILON {
            if let Err(error) = self.inner.source.set_rate(rate) {
                debug!(track_id = %self.inner.id, %error, "native rate change refused");
            }
        }
    }

    fn current_item(&self) -> Option<TimelineItem> {
        self.inner.state.lock().unwrap().current.clone()
    }

    fn metrics(&self) -> SyncMetrics {
        self.inner.drift.lock().unwrap().metrics()
    }

    fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.inner.source.pause();
        let weak = self.inner.clock.lock().unwrap().take();
        if let Some(clock) = weak.and_then(|weak| weak.upgrade()) {
            clock.unregister_manager(&self.inner.id);
        }
        debug!(track_id = %self.inner.id, "track manager destroyed");
    }
}
