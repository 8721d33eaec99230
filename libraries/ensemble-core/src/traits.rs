/// Core traits for Ensemble Player
use crate::error::Result;
use crate::types::{SyncMetrics, TimelineItem, TrackKind};
use async_trait::async_trait;
use std::path::Path;

/// Track manager contract
///
/// Every media source joins clock coordination through this trait,
/// regardless of kind. Managers are registered with the master clock as
/// `Arc<dyn TrackManager>` handles, so the trait must stay object-safe.
///
/// Contract rules the clock relies on:
/// - `sync` must never block or suspend the caller; expensive work
///   (item switches, native seeks) happens in background tasks.
/// - `seek` must resolve even on internal failure. A failed seek
///   degrades that one track, never the coordination, which is why it
///   reports `bool` instead of `Result`.
/// - `play`/`pause` are best-effort; competing calls on browser-like
///   media primitives are expected and swallowed, not surfaced.
#[async_trait]
pub trait TrackManager: Send + Sync {
    /// Unique identifier of this track
    fn id(&self) -> &str;

    /// Media kind of this track
    fn kind(&self) -> TrackKind;

    /// Load a new item sequence, resetting position and metrics.
    ///
    /// Loads whichever item is active at time 0, if any. A missing or
    /// corrupt individual media file must not fail the load: the fault
    /// is recorded and the manager continues in an idle state so other
    /// tracks are unaffected.
    ///
    /// # Errors
    /// Returns an error only for structurally unusable input, never for
    /// per-item media failures.
    async fn load(&self, items: Vec<TimelineItem>, base_path: &Path) -> Result<()>;

    /// Periodic synchronization pass. Must not block.
    ///
    /// Looks up the active item for `master_time_ms`, switches in the
    /// background when it changed, otherwise measures drift and applies
    /// a correction when one is due. Also reconciles the native playback
    /// rate against `rate`.
    fn sync(&self, master_time_ms: f64, rate: f64);

    /// Converge the native position to the timeline-relative position
    /// implied by `time_ms`, restoring the prior play/pause intent.
    ///
    /// Returns `false` when the native source could not complete the
    /// seek; the coordination proceeds regardless.
    async fn seek(&self, time_ms: f64) -> bool;

    /// Best-effort native play
    fn play(&self);

    /// Best-effort native pause
    fn pause(&self);

    /// Propagate a playback rate to the native source
    fn set_playback_rate(&self, rate: f64);

    /// The item currently loaded, if any
    fn current_item(&self) -> Option<TimelineItem>;

    /// Current drift bookkeeping snapshot
    fn metrics(&self) -> SyncMetrics;

    /// Idempotent teardown. Further calls on the manager are no-ops.
    fn destroy(&self);
}

/// Native media source seam
///
/// Implemented by the external collaborator that owns actual decoding,
/// rendering, fetching, and DSP for one track. The track manager drives
/// it and never sees its internals.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Load a playable resource by reference.
    ///
    /// # Errors
    /// Returns an error if the resource cannot be retrieved or opened.
    async fn load(&self, src: &Path) -> Result<()>;

    /// Start or resume native playback.
    ///
    /// # Errors
    /// Returns an error if the underlying element refuses to start.
    fn play(&self) -> Result<()>;

    /// Pause native playback.
    ///
    /// # Errors
    /// Returns an error if the underlying element refuses to pause.
    fn pause(&self) -> Result<()>;

    /// Seek to a position relative to the start of the loaded resource.
    ///
    /// # Errors
    /// Returns an error if the position cannot be reached.
    async fn seek_secs(&self, position_secs: f64) -> Result<()>;

    /// Current native position relative to the loaded resource
    fn position_secs(&self) -> f64;

    /// Set the native playback rate.
    ///
    /// # Errors
    /// Returns an error if the rate is unsupported by the element.
    fn set_rate(&self, rate: f64) -> Result<()>;

    /// Current native playback rate
    fn rate(&self) -> f64;
}
