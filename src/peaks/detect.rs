use std::ops::Range;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::data::model::Series;

/// Acceptance thresholds for a local maximum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakParams {
    /// Absolute floor on the peak's y value.
    pub min_height: f64,
    /// Floor on the drop to the higher of the two surrounding bases.
    pub min_prominence: f64,
}

impl PeakParams {
    /// Accept every local maximum.
    pub const NONE: PeakParams = PeakParams {
        min_height: f64::NEG_INFINITY,
        min_prominence: 0.0,
    };
}

/// One accepted local maximum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// Sample index into the series the peak was found in.
    pub index: usize,
    /// x at `index`.
    pub position: f64,
    /// y at `index`.
    pub height: f64,
    pub prominence: f64,
    /// Index of the lowest sample between the peak and the next higher
    /// sample (or the series start) on the left.
    pub left_base: usize,
    pub right_base: usize,
}

/// Peaks from a single evaluation, ordered by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeakSet {
    peaks: Vec<Peak>,
}

impl PeakSet {
    pub fn new(mut peaks: Vec<Peak>) -> Self {
        peaks.sort_by_key(|p| p.index);
        PeakSet { peaks }
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Peak> {
        self.peaks.iter()
    }

    pub fn as_slice(&self) -> &[Peak] {
        &self.peaks
    }

    pub fn max_height(&self) -> Option<f64> {
        self.peaks.iter().map(|p| p.height).reduce(f64::max)
    }
}

impl<'a> IntoIterator for &'a PeakSet {
    type Item = &'a Peak;
    type IntoIter = std::slice::Iter<'a, Peak>;

    fn into_iter(self) -> Self::IntoIter {
        self.peaks.iter()
    }
}

// ---------------------------------------------------------------------------
// Local maxima
// ---------------------------------------------------------------------------

/// Indices of all local maxima of `y`.
///
/// A sample is a maximum when its left neighbour is strictly lower and the
/// first following sample with a different value is strictly lower too. A
/// flat top is reported once, at its first index. The first and last samples
/// are never maxima, nor is a plateau that runs into the last sample.
pub fn local_maxima(y: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    if y.len() < 3 {
        return maxima;
    }
    let i_max = y.len() - 1;
    let mut i = 1;
    while i < i_max {
        if y[i - 1] < y[i] {
            let mut ahead = i + 1;
            while ahead < i_max && y[ahead] == y[i] {
                ahead += 1;
            }
            if y[ahead] < y[i] {
                maxima.push(i);
                i = ahead;
            }
        }
        i += 1;
    }
    maxima
}

/// Prominence of the sample at `peak` with its left and right base indices.
///
/// Each side is scanned outward while samples are not higher than the peak,
/// keeping the lowest value seen. The prominence is the peak height minus
/// the higher of the two minima.
pub fn prominence(y: &[f64], peak: usize) -> (f64, usize, usize) {
    let height = y[peak];

    let mut left_min = height;
    let mut left_base = peak;
    for i in (0..=peak).rev() {
        if y[i] > height {
            break;
        }
        if y[i] < left_min {
            left_min = y[i];
            left_base = i;
        }
    }

    let mut right_min = height;
    let mut right_base = peak;
    for (i, &v) in y.iter().enumerate().skip(peak) {
        if v > height {
            break;
        }
        if v < right_min {
            right_min = v;
            right_base = i;
        }
    }

    (height - left_min.max(right_min), left_base, right_base)
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Find the local maxima of `series` passing both thresholds.
pub fn extract_peaks(series: &Series, params: &PeakParams) -> PeakSet {
    let (x, y) = (series.x(), series.y());
    if y.len() < 3 {
        return PeakSet::default();
    }

    let candidates = local_maxima(y);
    let n_candidates = candidates.len();
    let peaks: Vec<Peak> = candidates
        .into_iter()
        .filter(|&i| y[i] >= params.min_height)
        .filter_map(|i| {
            let (prominence, left_base, right_base) = prominence(y, i);
            (prominence >= params.min_prominence).then_some(Peak {
                index: i,
                position: x[i],
                height: y[i],
                prominence,
                left_base,
                right_base,
            })
        })
        .collect();

    debug!(
        "{} of {n_candidates} local maxima pass height >= {} and prominence >= {}",
        peaks.len(),
        params.min_height,
        params.min_prominence
    );
    PeakSet { peaks }
}

/// Like [`extract_peaks`] on `series.window(range)`, with indices reported
/// relative to the full series. Prominences only see the window.
pub fn extract_peaks_in(series: &Series, range: Range<usize>, params: &PeakParams) -> PeakSet {
    let offset = range.start;
    let mut found = extract_peaks(&series.window(range), params);
    for peak in &mut found.peaks {
        peak.index += offset;
        peak.left_base += offset;
        peak.right_base += offset;
    }
    found
}
