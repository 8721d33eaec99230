//! Domain types for Ensemble Player

mod clock;
mod manifest;
mod metrics;

pub use clock::{ClockEvent, ClockEventKind, ClockState};
pub use manifest::{Manifest, TimelineItem, TrackKind, TrackManifest};
pub use metrics::SyncMetrics;
