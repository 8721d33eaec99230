//! Ensemble Player - Master Clock
//!
//! The master clock owns the global timeline: current position,
//! playback rate, and play/pause state. It can drive time itself by
//! wall-clock extrapolation or be driven by one explicitly designated
//! media source, runs the periodic synchronization pass over registered
//! track managers, and coordinates blocking seeks across all of them
//! with per-track timeouts so a single stuck source never freezes the
//! presentation.
//!
//! This crate provides:
//! - `MasterClock` - cloneable handle, the sole owner of `ClockState`
//! - Coordinated seek (deduplicated, serialized, timeout-bounded,
//!   partial-failure-tolerant)
//! - Source-driven time authority with anomaly rejection
//! - Typed event stream with per-listener panic isolation

#![forbid(unsafe_code)]

mod clock;
mod config;
mod events;

pub use clock::{MasterClock, WeakMasterClock, MAX_PLAYBACK_RATE};
pub use config::ClockConfig;
pub use events::Subscription;
