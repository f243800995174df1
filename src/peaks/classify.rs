use std::fmt;

use serde::{Deserialize, Serialize};

use super::detect::PeakSet;
use crate::data::model::SortOrder;
use crate::error::{PeakError, PeakResult};

/// Upper inclusive bound of the normalised height for [`IntensityClass::Weak`].
pub const WEAK_MAX: f64 = 0.33;
/// Upper inclusive bound for [`IntensityClass::Medium`].
pub const MEDIUM_MAX: f64 = 0.66;

/// Qualitative band intensity as reported in publications (w / m / s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntensityClass {
    Weak,
    Medium,
    Strong,
}

impl IntensityClass {
    pub fn from_normalized(normalized_height: f64) -> Self {
        if normalized_height <= WEAK_MAX {
            IntensityClass::Weak
        } else if normalized_height <= MEDIUM_MAX {
            IntensityClass::Medium
        } else {
            IntensityClass::Strong
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IntensityClass::Weak => "weak",
            IntensityClass::Medium => "medium",
            IntensityClass::Strong => "strong",
        }
    }
}

impl fmt::Display for IntensityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A peak reduced to what goes into a publication table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedPeak {
    /// Wavenumber, m/z or wavelength.
    pub position: f64,
    /// Height over the tallest peak of the set, in `0..=1`, three decimals.
    pub normalized_height: f64,
    pub intensity_class: IntensityClass,
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Normalise, bucket and sort a peak set.
///
/// The class is decided on the unrounded ratio; the stored ratio is rounded
/// to three decimals. Peaks below zero clamp to a ratio of `0.0`.
pub fn classify(peaks: &PeakSet, order: SortOrder) -> PeakResult<Vec<ClassifiedPeak>> {
    let points: Vec<(f64, f64)> = peaks.iter().map(|p| (p.position, p.height)).collect();
    classify_heights(&points, order)
}

/// [`classify`] for bare `(position, height)` pairs, e.g. a peak list read
/// back from disk.
pub fn classify_heights(
    points: &[(f64, f64)],
    order: SortOrder,
) -> PeakResult<Vec<ClassifiedPeak>> {
    let max = points
        .iter()
        .map(|&(_, height)| height)
        .reduce(f64::max)
        .ok_or(PeakError::EmptyInput)?;
    if max <= 0.0 {
        return Err(PeakError::NonPositiveMaximum { max });
    }

    let mut classified: Vec<ClassifiedPeak> = points
        .iter()
        .map(|&(position, height)| {
            let ratio = (height / max).max(0.0);
            ClassifiedPeak {
                position,
                normalized_height: round_to(ratio, 3),
                intensity_class: IntensityClass::from_normalized(ratio),
            }
        })
        .collect();

    classified.sort_by(|a, b| match order {
        SortOrder::Ascending => a.position.total_cmp(&b.position),
        SortOrder::Descending => b.position.total_cmp(&a.position),
    });
    Ok(classified)
}

/// Number of peaks per intensity class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassSummary {
    pub strong: usize,
    pub medium: usize,
    pub weak: usize,
}

impl ClassSummary {
    pub fn of(peaks: &[ClassifiedPeak]) -> Self {
        peaks
            .iter()
            .fold(ClassSummary::default(), |mut acc, p| {
                match p.intensity_class {
                    IntensityClass::Strong => acc.strong += 1,
                    IntensityClass::Medium => acc.medium += 1,
                    IntensityClass::Weak => acc.weak += 1,
                }
                acc
            })
    }

    pub fn total(&self) -> usize {
        self.strong + self.medium + self.weak
    }
}

impl fmt::Display for ClassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} peaks: {} strong (>66%), {} medium (33-66%), {} weak (<=33%)",
            self.total(),
            self.strong,
            self.medium,
            self.weak
        )
    }
}
