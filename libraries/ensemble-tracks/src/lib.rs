//! Ensemble Player - Track Management
//!
//! Track managers bind native media sources to the master clock. Each
//! manager implements the shared track-manager contract: it indexes its
//! item sequence against the global timeline, switches items in the
//! background as the clock advances, measures and conservatively
//! corrects drift, and participates in coordinated seeks without ever
//! being able to fail them.
//!
//! Media internals (decoding, rendering, fetching, DSP) live behind the
//! `MediaSource` trait from `ensemble-core`; this crate only drives
//! them.

#![forbid(unsafe_code)]

mod drift;
mod manager;

pub use drift::DriftMonitor;
pub use manager::{MediaTrackManager, TrackFault};
