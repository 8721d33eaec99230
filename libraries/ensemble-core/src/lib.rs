//! Ensemble Player Core
//!
//! Shared types, traits, and error handling for Ensemble Player, a
//! synchronization core that keeps heterogeneous media sources (video,
//! audio, timed text, auxiliary content) tracking one global timeline.
//!
//! This crate defines:
//! - **Domain Types**: `Manifest`, `TimelineItem`, `ClockState`,
//!   `ClockEvent`, `SyncMetrics`
//! - **Core Traits**: `TrackManager` (the contract every media source
//!   implements to join clock coordination) and `MediaSource` (the seam
//!   to the native playback element)
//! - **Error Handling**: unified `EnsembleError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use ensemble_core::types::Manifest;
//!
//! let manifest = Manifest::from_json(r#"{
//!     "duration_ms": 60000,
//!     "tracks": [
//!         {
//!             "id": "audio-main",
//!             "kind": "audio",
//!             "items": [
//!                 { "id": "a1", "src": "a1.flac", "start_ms": 0, "duration_ms": 60000 }
//!             ]
//!         }
//!     ]
//! }"#).unwrap();
//!
//! assert_eq!(manifest.tracks.len(), 1);
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{EnsembleError, Result};
pub use traits::{MediaSource, TrackManager};
pub use types::{
    ClockEvent, ClockEventKind, ClockState, Manifest, SyncMetrics, TimelineItem, TrackKind,
    TrackManifest,
};
