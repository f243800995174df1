use std::ops::Range;

use log::debug;

use super::model::{is_descending, Series};

// ---------------------------------------------------------------------------
// Nearest-sample snapping
// ---------------------------------------------------------------------------

/// Index of the sample in `xs` closest to `value`.
///
/// `xs` must be sorted, ascending or descending. The insertion point is found
/// by binary search and compared with the element before it; on equal
/// distance the earlier index wins. Values outside the covered range clamp to
/// the first or last index. Returns `None` for an empty slice.
pub fn nearest_index(xs: &[f64], value: f64) -> Option<usize> {
    if xs.is_empty() {
        return None;
    }
    let idx = if is_descending(xs) {
        xs.partition_point(|&v| v > value)
    } else {
        xs.partition_point(|&v| v < value)
    };

    if idx == 0 {
        return Some(0);
    }
    if idx == xs.len() {
        return Some(xs.len() - 1);
    }
    let before = (value - xs[idx - 1]).abs();
    let after = (xs[idx] - value).abs();
    Some(if before <= after { idx - 1 } else { idx })
}

/// Sample indices covering the inclusive `[low, high]` window of x values,
/// as a half-open range ready for slicing.
///
/// Both bounds snap to their nearest sample, so the edge samples may lie
/// slightly outside the requested window. Swapped bounds are accepted. An
/// empty series yields `0..0`.
pub fn select_range(series: &Series, low: f64, high: f64) -> Range<usize> {
    let xs = series.x();
    let (low, high) = if low <= high { (low, high) } else { (high, low) };
    let (Some(a), Some(b)) = (nearest_index(xs, low), nearest_index(xs, high)) else {
        return 0..0;
    };
    // Descending series map the low bound to the later index.
    let (start, end) = (a.min(b), a.max(b));
    debug!(
        "window [{low}, {high}] snapped to x[{start}]={} .. x[{end}]={}",
        xs[start], xs[end]
    );
    start..end + 1
}
