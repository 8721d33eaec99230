//! Manifest and timeline item types
//!
//! The manifest is the sole exchanged data format the core depends on:
//! an ordered set of tracks, each an ordered sequence of timeline items,
//! plus the total presentation duration.

use crate::error::{EnsembleError, Result};
use serde::{Deserialize, Serialize};

/// One scheduled entry on a track's timeline.
///
/// An item spans the half-open interval `[start_ms, effective_end_ms)`.
/// The effective end is `end_ms` when present, otherwise
/// `start_ms + duration_ms`, otherwise the item is open-ended and is
/// treated as never active by the timeline index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineItem {
    /// Unique item identifier within its track
    pub id: String,

    /// File reference resolved against the manifest base path
    pub src: String,

    /// Position on the global timeline where this item begins
    pub start_ms: u64,

    /// Item duration (used when `end_ms` is absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Explicit end position on the global timeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_ms: Option<u64>,
}

impl TimelineItem {
    /// Effective end of the item on the global timeline.
    ///
    /// `end_ms` wins over `start_ms + duration_ms`. Returns `None` for
    /// open-ended items.
    pub fn effective_end_ms(&self) -> Option<u64> {
        self.end_ms
            .or_else(|| self.duration_ms.map(|d| self.start_ms.saturating_add(d)))
    }

    /// Item duration in seconds, if an end boundary is known.
    pub fn duration_secs(&self) -> Option<f64> {
        self.effective_end_ms()
            .map(|end| (end.saturating_sub(self.start_ms)) as f64 / 1000.0)
    }
}

/// The finite set of media kinds a track can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Video frames
    Video,
    /// Audio samples
    Audio,
    /// Timed text (subtitles/captions)
    Subtitle,
    /// Timed auxiliary content
    Aux,
}

impl TrackKind {
    /// Default drift tolerance for this kind of media.
    ///
    /// How far a source's native position may wander from its expected
    /// position before a correction is worth the disruption of a native
    /// seek. Subtitles and auxiliary content tolerate far more than
    /// audio/video.
    pub fn default_drift_tolerance_ms(self) -> f64 {
        match self {
            TrackKind::Video => 120.0,
            TrackKind::Audio => 60.0,
            TrackKind::Subtitle => 250.0,
            TrackKind::Aux => 500.0,
        }
    }
}

/// One track in the manifest: an ordered item sequence of a single kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackManifest {
    /// Unique track identifier
    pub id: String,

    /// Media kind of every item on this track
    pub kind: TrackKind,

    /// Items sorted ascending by `start_ms`, ideally contiguous
    pub items: Vec<TimelineItem>,
}

/// Top-level presentation manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Total presentation duration
    pub duration_ms: u64,

    /// Ordered tracks
    pub tracks: Vec<TrackManifest>,
}

impl Manifest {
    /// Parse a manifest from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: Manifest = serde_json::from_str(json)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate manifest structure.
    ///
    /// Fatal to `load`: no partial clock initialization happens on a
    /// manifest that fails here. Checks that every track has a non-empty
    /// id and every item has a non-empty id and file reference.
    pub fn validate(&self) -> Result<()> {
        for track in &self.tracks {
            if track.id.is_empty() {
                return Err(EnsembleError::manifest("track with empty id"));
            }
            for item in &track.items {
                if item.id.is_empty() {
                    return Err(EnsembleError::manifest(format!(
                        "track '{}' has an item with empty id",
                        track.id
                    )));
                }
                if item.src.is_empty() {
                    return Err(EnsembleError::manifest(format!(
                        "item '{}' on track '{}' has no file reference",
                        item.id, track.id
                    )));
                }
            }
        }
        Ok(())
    }
}
