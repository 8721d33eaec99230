//! Clock configuration

use std::time::Duration;

/// Tuning knobs for the master clock.
///
/// The defaults implement the intended coordination policy; tests and
/// unusual deployments can tighten or relax individual windows.
#[derive(Debug, Clone)]
pub struct ClockConfig {
    /// Interval of the lightweight `TimeUpdate` tick (UI refresh only)
    pub time_update_interval: Duration,

    /// Interval of the `Sync` tick that drives per-track drift
    /// correction. Deliberately coarser than the time-update tick so
    /// corrections are never issued faster than a source can absorb
    /// them.
    pub sync_interval: Duration,

    /// Per-manager timeout for one coordinated-seek fan-out. A manager
    /// that neither resolves nor rejects within this window is treated
    /// as resolved-with-failure.
    pub seek_timeout: Duration,

    /// Window within which a repeated identical seek target is dropped
    pub seek_debounce: Duration,

    /// Delay before the follow-up `TimeUpdate` after a coordinated
    /// seek, catching managers whose switch completed slightly late
    pub post_seek_nudge: Duration,

    /// How long a time-authority report stays fresh before the clock
    /// falls back to self-driven extrapolation
    pub authority_staleness: Duration,

    /// Forward jump in an authority report treated as suspect
    pub max_forward_jump_ms: f64,

    /// Backward jump in an authority report treated as suspect
    pub max_backward_jump_ms: f64,

    /// Minimum spacing between accepted suspect jumps. Damps feedback
    /// oscillation between a source's own drift correction and the
    /// clock re-adopting the corrected value.
    pub suspect_jump_spacing: Duration,

    /// An authority report of exactly 0 is rejected outright once the
    /// clock is further than this past the start (decoder reset
    /// artifact, not a seek)
    pub zero_reset_guard_ms: f64,

    /// Slack past the declared duration still accepted from authority
    /// reports
    pub duration_slack_ms: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            time_update_interval: Duration::from_millis(200),
            sync_interval: Duration::from_millis(500),
            seek_timeout: Duration::from_secs(5),
            seek_debounce: Duration::from_millis(200),
            post_seek_nudge: Duration::from_millis(250),
            authority_staleness: Duration::from_millis(500),
            max_forward_jump_ms: 1000.0,
            max_backward_jump_ms: 500.0,
            suspect_jump_spacing: Duration::from_millis(1000),
            zero_reset_guard_ms: 1000.0,
            duration_slack_ms: 250.0,
        }
    }
}
