//! Advisory continuity diagnostics
//!
//! Items are expected to be contiguous and non-overlapping, but neither
//! condition is fatal. This scan reports where a sequence deviates so a
//! diagnostic surface can show it; playback behavior is never altered
//! by the result.

use ensemble_core::types::TimelineItem;
use serde::{Deserialize, Serialize};

/// One deviation found between a pair of adjacent items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContinuityIssue {
    /// The earlier item ends before the next one starts
    Gap {
        /// Index of the earlier item of the pair
        index: usize,
        /// Where the gap begins on the global timeline
        at_ms: u64,
        /// Gap length
        magnitude_ms: u64,
    },

    /// The earlier item ends after the next one starts
    Overlap {
        /// Index of the earlier item of the pair
        index: usize,
        /// Where the overlap begins on the global timeline
        at_ms: u64,
        /// Overlap length
        magnitude_ms: u64,
    },
}

/// Scan adjacent pairs and classify every gap and overlap.
///
/// Pairs whose earlier item is open-ended cannot be classified and are
/// skipped.
pub fn validate_continuity(items: &[TimelineItem]) -> Vec<ContinuityIssue> {
    let mut issues = Vec::new();
    for (index, pair) in items.windows(2).enumerate() {
        let Some(current_end) = pair[0].effective_end_ms() else {
            continue;
        };
        let next_start = pair[1].start_ms;
        if current_end < next_start {
            issues.push(ContinuityIssue::Gap {
                index,
                at_ms: current_end,
                magnitude_ms: next_start - current_end,
            });
        } else if current_end > next_start {
            issues.push(ContinuityIssue::Overlap {
                index,
                at_ms: next_start,
                magnitude_ms: current_end - next_start,
            });
        }
    }
    issues
}
