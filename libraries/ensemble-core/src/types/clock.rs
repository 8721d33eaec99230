//! Clock state and event types
//!
//! `ClockState` is the single authoritative playback state, owned
//! exclusively by the master clock and mutated only through its command
//! methods. `ClockEvent` is the immutable broadcast unit consumed by
//! track managers and UI listeners alike.

use serde::{Deserialize, Serialize};

/// Authoritative playback state of the global timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockState {
    /// Current position on the global timeline
    pub current_time_ms: f64,

    /// Total presentation duration
    pub duration_ms: f64,

    /// Playback rate, in (0, 4]
    pub playback_rate: f64,

    /// Whether the position is advancing
    pub is_playing: bool,
}

impl ClockState {
    /// Initial state for a presentation of the given duration.
    pub fn new(duration_ms: f64) -> Self {
        Self {
            current_time_ms: 0.0,
            duration_ms,
            playback_rate: 1.0,
            is_playing: false,
        }
    }
}

/// What a clock event announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockEventKind {
    /// Playback started or resumed
    Play,
    /// Playback paused
    Pause,
    /// A coordinated seek settled
    Seek,
    /// Playback rate changed
    RateChange,
    /// Lightweight position refresh (UI only, no drift correction)
    TimeUpdate,
    /// Position reached the presentation duration while playing
    Ended,
    /// Periodic synchronization pass (drives per-track drift correction)
    Sync,
}

/// Event broadcast by the master clock.
///
/// Constructed once per emission and cloned to every subscriber; no
/// per-listener mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockEvent {
    /// Event kind
    pub kind: ClockEventKind,

    /// Global timeline position at emission
    pub time_ms: f64,

    /// Playback rate at emission
    pub playback_rate: f64,

    /// Play/pause state at emission
    pub is_playing: bool,
}

impl ClockEvent {
    /// Build an event from the current clock state.
    pub fn from_state(kind: ClockEventKind, state: &ClockState) -> Self {
        Self {
            kind,
            time_ms: state.current_time_ms,
            playback_rate: state.playback_rate,
            is_playing: state.is_playing,
        }
    }
}
