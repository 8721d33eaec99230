//! Per-track synchronization metrics

use serde::{Deserialize, Serialize};

/// Snapshot of one track's drift bookkeeping.
///
/// Reset when the track is loaded/reloaded, updated on every sync and
/// seek pass, read-only to external callers. The average is computed
/// over a bounded rolling window kept by the drift monitor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SyncMetrics {
    /// Most recently measured drift (native minus expected), signed
    pub drift_ms: f64,

    /// Number of corrections issued since the last reset
    pub corrections: u64,

    /// Mean absolute drift over the rolling window
    pub average_drift_ms: f64,

    /// Largest absolute drift observed since the last reset
    pub max_drift_ms: f64,
}
