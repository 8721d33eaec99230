//! Active-item lookup over a track's item sequence
//!
//! Pure functions, polled frequently from every track manager's sync
//! pass, hence the binary search. Items are assumed sorted ascending by
//! `start_ms`; that invariant is the manifest author's responsibility
//! and is diagnosed (not enforced) by the continuity scan.

use ensemble_core::types::TimelineItem;

/// Find the item active at `time_ms`.
///
/// An item matches when `time_ms` falls in its half-open interval
/// `[start_ms, effective_end_ms)`, with one exception: the terminal
/// instant of the last item still matches, so the final position of a
/// presentation is never itemless. `time_ms` is clamped to ≥ 0.
///
/// Returns `None` when `time_ms` falls in a gap between items or past
/// the end of all items. Callers must treat that as "nothing should be
/// active", not as a failure. Open-ended items (no duration and no end)
/// never match.
pub fn find_item_at_time(items: &[TimelineItem], time_ms: f64) -> Option<&TimelineItem> {
    if items.is_empty() {
        return None;
    }
    let t = time_ms.max(0.0);

    // Last item whose start is <= t.
    let idx = items.partition_point(|item| (item.start_ms as f64) <= t);
    if idx == 0 {
        return None;
    }
    let candidate = &items[idx - 1];

    let end = candidate.effective_end_ms()? as f64;
    if t < end {
        return Some(candidate);
    }
    // Terminal instant: the last item's exact end still matches.
    if idx == items.len() && t == end {
        return Some(candidate);
    }
    None
}

/// Position within an item, in seconds, for a global time.
///
/// `(time_ms - start_ms) / 1000`, floored at 0 for times before the
/// item's start and clamped to the item duration when one is known.
/// Monotonically non-decreasing in `time_ms` across the item's span.
pub fn item_relative_secs(item: &TimelineItem, time_ms: f64) -> f64 {
    let rel = ((time_ms - item.start_ms as f64) / 1000.0).max(0.0);
    match item.duration_secs() {
        Some(duration) => rel.min(duration),
        None => rel,
    }
}
