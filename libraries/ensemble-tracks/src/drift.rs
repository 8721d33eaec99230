//! Per-track drift bookkeeping
//!
//! Measures the offset between a source's native position and the
//! position the timeline index says it should be at, and decides
//! whether a correction is worth issuing. Corrections are deliberately
//! conservative: a healthy track performs zero corrections, and even an
//! unhealthy one is corrected no faster than it can absorb the native
//! seek without visible disruption.

use ensemble_core::types::SyncMetrics;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Rolling window used for the average drift
const DRIFT_HISTORY_SAMPLES: usize = 100;

/// Minimum spacing between two corrections on the same track
const MIN_CORRECTION_SPACING: Duration = Duration::from_secs(2);

/// Drift monitor for one track manager.
pub struct DriftMonitor {
    tolerance_ms: f64,
    samples: VecDeque<f64>,
    metrics: SyncMetrics,
    last_correction: Option<Instant>,
}

impl DriftMonitor {
    /// Create a monitor with the given correction tolerance.
    pub fn new(tolerance_ms: f64) -> Self {
        Self {
            tolerance_ms,
            samples: VecDeque::with_capacity(DRIFT_HISTORY_SAMPLES),
            metrics: SyncMetrics::default(),
            last_correction: None,
        }
    }

    /// Correction tolerance in milliseconds.
    pub fn tolerance_ms(&self) -> f64 {
        self.tolerance_ms
    }

    /// Forget all samples and counters (manager constructed/reloaded).
    pub fn reset(&mut self) {
        self.samples.clear();
        self.metrics = SyncMetrics::default();
        self.last_correction = None;
    }

    /// Record one signed drift measurement (native minus expected).
    pub fn record(&mut self, drift_ms: f64) {
        if self.samples.len() == DRIFT_HISTORY_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back(drift_ms.abs());

        self.metrics.drift_ms = drift_ms;
        self.metrics.max_drift_ms = self.metrics.max_drift_ms.max(drift_ms.abs());
        self.metrics.average_drift_ms =
            self.samples.iter().sum::<f64>() / self.samples.len() as f64;
    }

    /// Whether the most recently recorded drift warrants a correction.
    pub fn correction_due(&self, now: Instant) -> bool {
        if self.metrics.drift_ms.abs() <= self.tolerance_ms {
            return false;
        }
        match self.last_correction {
            Some(at) => now.duration_since(at) >= MIN_CORRECTION_SPACING,
            None => true,
        }
    }

    /// Count a correction that was just issued.
    pub fn note_correction(&mut self, now: Instant) {
        self.metrics.corrections += 1;
        self.last_correction = Some(now);
    }

    /// Current metrics snapshot.
    pub fn metrics(&self) -> SyncMetrics {
        self.metrics
    }
}
