//! Master clock - owner of the global timeline
//!
//! The clock is the sole owner of position, rate, and play/pause state.
//! It advances position either by wall-clock extrapolation or by
//! ingesting reports from one explicitly designated authority source,
//! runs the periodic sync pass over registered track managers, and owns
//! the coordinated, timeout-bounded, partial-failure-tolerant seek.

use crate::config::ClockConfig;
use crate::events::{ListenerRegistry, Subscription};
use ensemble_core::error::{EnsembleError, Result};
use ensemble_core::traits::TrackManager;
use ensemble_core::types::{ClockEvent, ClockEventKind, ClockState};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{interval, sleep, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Upper bound of the accepted playback rate range (0, 4]
pub const MAX_PLAYBACK_RATE: f64 = 4.0;

/// Seek targets closer than this are the same seek for deduplication
const SEEK_TARGET_EPSILON_MS: f64 = 1.0;

/// Extrapolation base: position at a known instant, advanced by
/// `elapsed * rate` while playing. Re-based on play, seek, rate change,
/// and every accepted authority report.
struct Anchor {
    base_time_ms: f64,
    started_at: Instant,
}

struct ClockCore {
    state: ClockState,
    anchor: Option<Anchor>,
    /// Designated time-authority track, if any
    authority: Option<String>,
    last_authority_report: Option<Instant>,
    last_suspect_jump: Option<Instant>,
    /// Target and instant of the last applied coordinated seek
    last_seek: Option<(f64, Instant)>,
    /// Bumped whenever ticking must stop; running tick tasks exit when
    /// their generation is stale
    tick_generation: u64,
}

impl ClockCore {
    /// Current global position.
    ///
    /// While a designated authority is reporting freshly, the last
    /// adopted report is the position. Otherwise (self-driven mode, or
    /// a stale authority) the anchor extrapolates, so the presentation
    /// never stalls because the authority source is lagging.
    fn position_ms(&self, config: &ClockConfig, now: Instant) -> f64 {
        if !self.state.is_playing {
            return self.state.current_time_ms;
        }
        if self.authority.is_some() {
            if let Some(at) = self.last_authority_report {
                if now.duration_since(at) < config.authority_staleness {
                    return self.state.current_time_ms;
                }
            }
        }
        match &self.anchor {
            Some(anchor) => {
                let elapsed_ms = now.duration_since(anchor.started_at).as_secs_f64() * 1000.0;
                (anchor.base_time_ms + elapsed_ms * self.state.playback_rate)
                    .min(self.state.duration_ms)
            }
            None => self.state.current_time_ms,
        }
    }

    /// Adopt `time_ms` as the position and restart extrapolation there.
    fn rebase(&mut self, time_ms: f64, now: Instant) {
        self.state.current_time_ms = time_ms;
        if self.state.is_playing {
            self.anchor = Some(Anchor {
                base_time_ms: time_ms,
                started_at: now,
            });
        }
    }
}

struct ClockShared {
    config: ClockConfig,
    core: Mutex<ClockCore>,
    managers: Mutex<Vec<Arc<dyn TrackManager>>>,
    listeners: Arc<ListenerRegistry>,
    /// Serializes coordinated seeks: no two fan-outs in flight at once
    seek_gate: AsyncMutex<()>,
}

/// Cheaply cloneable handle to the master clock.
///
/// All collaborators hold clones of one clock; there is no ambient
/// global. Registered managers are driven through the periodic sync
/// pass and the coordinated seek; UI-level consumers observe the typed
/// event stream via [`MasterClock::subscribe`].
///
/// # Example
///
/// ```rust
/// use ensemble_clock::MasterClock;
/// use ensemble_core::types::ClockEventKind;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let clock = MasterClock::new(120_000.0);
/// let _sub = clock.subscribe(|event| {
///     if event.kind == ClockEventKind::Seek {
///         println!("seeked to {}ms", event.time_ms);
///     }
/// });
///
/// clock.seek(95_000.0).await;
/// assert_eq!(clock.current_time_ms(), 95_000.0);
/// # }
/// ```
#[derive(Clone)]
pub struct MasterClock {
    shared: Arc<ClockShared>,
}

/// Weak clock handle, used by managers to unregister on teardown
/// without keeping the clock alive.
#[derive(Clone)]
pub struct WeakMasterClock {
    shared: Weak<ClockShared>,
}

impl WeakMasterClock {
    /// Upgrade back to a full handle if the clock still exists.
    pub fn upgrade(&self) -> Option<MasterClock> {
        self.shared.upgrade().map(|shared| MasterClock { shared })
    }
}

impl MasterClock {
    /// Create a clock for a presentation of the given duration.
    pub fn new(duration_ms: f64) -> Self {
        Self::with_config(duration_ms, ClockConfig::default())
    }

    /// Create a clock with explicit tuning.
    pub fn with_config(duration_ms: f64, config: ClockConfig) -> Self {
        Self {
            shared: Arc::new(ClockShared {
                config,
                core: Mutex::new(ClockCore {
                    state: ClockState::new(duration_ms),
                    anchor: None,
                    authority: None,
                    last_authority_report: None,
                    last_suspect_jump: None,
                    last_seek: None,
                    tick_generation: 0,
                }),
                managers: Mutex::new(Vec::new()),
                listeners: Arc::new(ListenerRegistry::default()),
                seek_gate: AsyncMutex::new(()),
            }),
        }
    }

    /// Downgrade to a weak handle.
    pub fn downgrade(&self) -> WeakMasterClock {
        WeakMasterClock {
            shared: Arc::downgrade(&self.shared),
        }
    }

    // ===== State access =====

    /// Snapshot of the clock state with a live position.
    pub fn state(&self) -> ClockState {
        let core = self.shared.core.lock().unwrap();
        let mut state = core.state;
        state.current_time_ms = core.position_ms(&self.shared.config, Instant::now());
        state
    }

    /// Current global timeline position.
    pub fn current_time_ms(&self) -> f64 {
        self.state().current_time_ms
    }

    /// Presentation duration.
    pub fn duration_ms(&self) -> f64 {
        self.shared.core.lock().unwrap().state.duration_ms
    }

    /// Whether the position is advancing.
    pub fn is_playing(&self) -> bool {
        self.shared.core.lock().unwrap().state.is_playing
    }

    /// Current playback rate.
    pub fn playback_rate(&self) -> f64 {
        self.shared.core.lock().unwrap().state.playback_rate
    }

    // ===== Registration and subscription =====

    /// Register a track manager for clock coordination.
    ///
    /// A manager with the same id replaces the previous registration.
    pub fn register_manager(&self, manager: Arc<dyn TrackManager>) {
        let mut managers = self.shared.managers.lock().unwrap();
        managers.retain(|existing| existing.id() != manager.id());
        debug!(track_id = manager.id(), "track manager registered");
        managers.push(manager);
    }

    /// Remove a track manager from clock coordination.
    pub fn unregister_manager(&self, id: &str) {
        let mut managers = self.shared.managers.lock().unwrap();
        let before = managers.len();
        managers.retain(|existing| existing.id() != id);
        if managers.len() != before {
            debug!(track_id = id, "track manager unregistered");
        }
    }

    /// Subscribe to the clock event stream.
    ///
    /// Dropping the returned handle removes the listener.
    pub fn subscribe(
        &self,
        listener: impl Fn(ClockEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.shared.listeners.subscribe(Box::new(listener));
        Subscription::new(id, Arc::downgrade(&self.shared.listeners))
    }

    fn manager_snapshot(&self) -> Vec<Arc<dyn TrackManager>> {
        self.shared.managers.lock().unwrap().clone()
    }

    // ===== Playback control =====

    /// Start or resume playback.
    ///
    /// Must be called within a tokio runtime: the periodic time-update
    /// and sync ticks are spawned tasks.
    pub fn play(&self) {
        let event = {
            let mut core = self.shared.core.lock().unwrap();
            if core.state.is_playing {
                return;
            }
            let now = Instant::now();
            core.state.is_playing = true;
            core.anchor = Some(Anchor {
                base_time_ms: core.state.current_time_ms,
                started_at: now,
            });
            core.tick_generation += 1;
            self.spawn_ticks(core.tick_generation);
            ClockEvent::from_state(ClockEventKind::Play, &core.state)
        };
        info!(time_ms = event.time_ms, "playback started");
        for manager in self.manager_snapshot() {
            manager.play();
        }
        self.shared.listeners.emit(event);
    }

    /// Pause playback, freezing the current position.
    pub fn pause(&self) {
        let event = {
            let mut core = self.shared.core.lock().unwrap();
            if !core.state.is_playing {
                return;
            }
            let position = core.position_ms(&self.shared.config, Instant::now());
            core.state.current_time_ms = position;
            core.state.is_playing = false;
            core.anchor = None;
            core.tick_generation += 1;
            ClockEvent::from_state(ClockEventKind::Pause, &core.state)
        };
        info!(time_ms = event.time_ms, "playback paused");
        for manager in self.manager_snapshot() {
            manager.pause();
        }
        self.shared.listeners.emit(event);
    }

    /// Change the playback rate.
    ///
    /// The extrapolated position is frozen before the rate is applied,
    /// so a rate change never retroactively alters already-elapsed
    /// displayed time.
    ///
    /// # Errors
    /// Rejects rates outside (0, `MAX_PLAYBACK_RATE`].
    pub fn set_playback_rate(&self, rate: f64) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 || rate > MAX_PLAYBACK_RATE {
            return Err(EnsembleError::InvalidRate(rate));
        }
        let event = {
            let mut core = self.shared.core.lock().unwrap();
            let now = Instant::now();
            let position = core.position_ms(&self.shared.config, now);
            core.state.current_time_ms = position;
            core.state.playback_rate = rate;
            if core.state.is_playing {
                core.anchor = Some(Anchor {
                    base_time_ms: position,
                    started_at: now,
                });
            }
            ClockEvent::from_state(ClockEventKind::RateChange, &core.state)
        };
        info!(rate, "playback rate changed");
        for manager in self.manager_snapshot() {
            manager.set_playback_rate(rate);
        }
        self.shared.listeners.emit(event);
        Ok(())
    }

    // ===== Coordinated seek =====

    /// Seek all registered tracks to `time_ms` as one coordinated,
    /// partial-failure-tolerant operation.
    ///
    /// Duplicate targets within the debounce window are dropped.
    /// Overlapping calls are serialized, never raced. Each manager gets
    /// an individual timeout; one stuck source cannot block the
    /// aggregate. The clock position changes and `Seek` is emitted only
    /// after the fan-out settles, followed by a delayed `TimeUpdate`
    /// for managers whose switch finished slightly late.
    pub async fn seek(&self, time_ms: f64) {
        let Some(target) = self.admit_seek(time_ms) else {
            return;
        };

        let _gate = self.shared.seek_gate.lock().await;

        // The seek we waited on may have applied this very target.
        let Some(target) = self.admit_seek(target) else {
            return;
        };

        let managers = self.manager_snapshot();
        debug!(
            target_ms = target,
            tracks = managers.len(),
            "coordinated seek fan-out"
        );

        let mut joins = Vec::with_capacity(managers.len());
        for manager in managers {
            let track_id = manager.id().to_string();
            let track_timeout = self.shared.config.seek_timeout;
            let handle =
                tokio::spawn(async move { timeout(track_timeout, manager.seek(target)).await });
            joins.push((track_id, handle));
        }
        for (track_id, handle) in joins {
            match handle.await {
                Ok(Ok(true)) => {}
                Ok(Ok(false)) => {
                    warn!(track_id, target_ms = target, "track degraded during seek");
                }
                Ok(Err(_elapsed)) => {
                    warn!(
                        track_id,
                        target_ms = target,
                        "track seek timed out; treated as resolved-with-failure"
                    );
                }
                Err(join_error) => {
                    warn!(track_id, error = %join_error, "track seek task failed");
                }
            }
        }

        let event = {
            let mut core = self.shared.core.lock().unwrap();
            let now = Instant::now();
            core.rebase(target, now);
            core.last_seek = Some((target, now));
            ClockEvent::from_state(ClockEventKind::Seek, &core.state)
        };
        info!(time_ms = target, "coordinated seek settled");
        self.shared.listeners.emit(event);

        let weak = Arc::downgrade(&self.shared);
        let nudge = self.shared.config.post_seek_nudge;
        tokio::spawn(async move {
            sleep(nudge).await;
            if let Some(shared) = weak.upgrade() {
                let event = {
                    let mut core = shared.core.lock().unwrap();
                    let position = core.position_ms(&shared.config, Instant::now());
                    core.state.current_time_ms = position;
                    ClockEvent::from_state(ClockEventKind::TimeUpdate, &core.state)
                };
                shared.listeners.emit(event);
            }
        });
    }

    /// Clamp a seek target and apply the debounce rule.
    ///
    /// Returns `None` when the target duplicates the last applied seek
    /// within the debounce window.
    fn admit_seek(&self, time_ms: f64) -> Option<f64> {
        let core = self.shared.core.lock().unwrap();
        let target = time_ms.clamp(0.0, core.state.duration_ms);
        if let Some((last_target, at)) = core.last_seek {
            if (last_target - target).abs() < SEEK_TARGET_EPSILON_MS
                && at.elapsed() < self.shared.config.seek_debounce
            {
                debug!(target_ms = target, "duplicate seek dropped");
                return None;
            }
        }
        Some(target)
    }

    // ===== Source-driven time authority =====

    /// Designate (or clear) the track whose position reports drive the
    /// clock. Reports from any other source are ignored; with no
    /// authority the clock is purely self-driven.
    pub fn set_time_authority(&self, track_id: Option<String>) {
        let mut core = self.shared.core.lock().unwrap();
        info!(authority = ?track_id, "time authority changed");
        core.authority = track_id;
        core.last_authority_report = None;
    }

    /// Ingest a position report from a media source.
    ///
    /// This is the single point of concurrent ingestion into the clock,
    /// so all sanity checks live here: out-of-bounds reports and
    /// anomalous resets to 0 are rejected, large jumps are rate-limited
    /// to damp feedback oscillation with the source's own drift
    /// correction.
    pub fn report_source_time(&self, source_id: &str, time_ms: f64) {
        let config = &self.shared.config;
        let mut core = self.shared.core.lock().unwrap();

        match &core.authority {
            None => {
                debug!(source_id, "time report ignored: no designated authority");
                return;
            }
            Some(authority) if authority != source_id => {
                debug!(source_id, "time report ignored: not the designated authority");
                return;
            }
            Some(_) => {}
        }

        let now = Instant::now();
        if !(0.0..=core.state.duration_ms + config.duration_slack_ms).contains(&time_ms) {
            warn!(source_id, time_ms, "authority report out of bounds; rejected");
            return;
        }

        let current = core.position_ms(config, now);
        if time_ms == 0.0 && current > config.zero_reset_guard_ms {
            warn!(
                source_id,
                current_ms = current,
                "authority reported an anomalous reset to 0; rejected"
            );
            return;
        }

        let delta = time_ms - current;
        let suspect = delta > config.max_forward_jump_ms || -delta > config.max_backward_jump_ms;
        if suspect {
            if let Some(at) = core.last_suspect_jump {
                if now.duration_since(at) < config.suspect_jump_spacing {
                    debug!(source_id, delta_ms = delta, "suspect jump rate-limited; ignored");
                    return;
                }
            }
            core.last_suspect_jump = Some(now);
            warn!(source_id, delta_ms = delta, "accepting suspect jump from authority");
        }

        core.last_authority_report = Some(now);
        core.rebase(time_ms, now);
    }

    // ===== Periodic ticks =====

    fn spawn_ticks(&self, generation: u64) {
        let weak = Arc::downgrade(&self.shared);
        let period = self.shared.config.time_update_interval;
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(shared) = weak.upgrade() else { break };
                if !Self::time_update_tick(&shared, generation) {
                    break;
                }
            }
        });

        let weak = Arc::downgrade(&self.shared);
        let period = self.shared.config.sync_interval;
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(shared) = weak.upgrade() else { break };
                if !Self::sync_tick(&shared, generation) {
                    break;
                }
            }
        });
    }

    /// One lightweight position tick. Returns false when the task
    /// should exit (pause, supersession, or presentation end).
    fn time_update_tick(shared: &Arc<ClockShared>, generation: u64) -> bool {
        let (event, ended) = {
            let mut core = shared.core.lock().unwrap();
            if core.tick_generation != generation || !core.state.is_playing {
                return false;
            }
            let position = core.position_ms(&shared.config, Instant::now());
            if position >= core.state.duration_ms {
                core.state.current_time_ms = core.state.duration_ms;
                core.state.is_playing = false;
                core.anchor = None;
                core.tick_generation += 1;
                (
                    ClockEvent::from_state(ClockEventKind::Ended, &core.state),
                    true,
                )
            } else {
                core.state.current_time_ms = position;
                (
                    ClockEvent::from_state(ClockEventKind::TimeUpdate, &core.state),
                    false,
                )
            }
        };
        if ended {
            info!("playback reached presentation end");
            // The clock state is already paused; native sources must
            // stop too, exactly as in an explicit pause.
            let managers: Vec<Arc<dyn TrackManager>> = shared.managers.lock().unwrap().clone();
            for manager in &managers {
                manager.pause();
            }
        }
        shared.listeners.emit(event);
        !ended
    }

    /// One synchronization pass: drives every manager's drift logic and
    /// emits `Sync` for observers. Managers must not block here.
    fn sync_tick(shared: &Arc<ClockShared>, generation: u64) -> bool {
        let (event, position, rate) = {
            let mut core = shared.core.lock().unwrap();
            if core.tick_generation != generation || !core.state.is_playing {
                return false;
            }
            let position = core.position_ms(&shared.config, Instant::now());
            core.state.current_time_ms = position;
            (
                ClockEvent::from_state(ClockEventKind::Sync, &core.state),
                position,
                core.state.playback_rate,
            )
        };
        let managers: Vec<Arc<dyn TrackManager>> = shared.managers.lock().unwrap().clone();
        for manager in &managers {
            manager.sync(position, rate);
        }
        shared.listeners.emit(event);
        true
    }
}
