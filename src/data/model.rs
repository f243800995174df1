use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Domain – which kind of instrument produced the spectrum
// ---------------------------------------------------------------------------

/// The spectroscopic technique a series comes from. Selects the default
/// input layout, sort direction, table column label and axis labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Domain {
    /// Infrared absorbance over wavenumber.
    Ir,
    /// Mass spectrum, intensity over m/z.
    Ms,
    /// UV-Vis absorbance over wavelength.
    #[value(name = "uv-vis")]
    UvVis,
}

impl Domain {
    /// Header of the independent-variable column in exported tables.
    pub fn column_label(self) -> &'static str {
        match self {
            Domain::Ir => "wavenumber",
            Domain::Ms => "mz",
            Domain::UvVis => "wavelength",
        }
    }

    /// Spectroscopic convention: IR and UV-Vis tables list the highest
    /// x first, mass lists the lowest m/z first.
    pub fn default_sort_order(self) -> SortOrder {
        match self {
            Domain::Ir | Domain::UvVis => SortOrder::Descending,
            Domain::Ms => SortOrder::Ascending,
        }
    }

    /// `(min_height, min_prominence)` used by the bench scripts this tool replaces.
    pub fn default_thresholds(self) -> (f64, f64) {
        match self {
            Domain::Ir => (0.01, 0.0075),
            Domain::Ms => (100.0, 50.0),
            Domain::UvVis => (0.015, 0.08),
        }
    }

    /// Window the peak search is restricted to when none is given.
    pub fn default_range(self) -> Option<[f64; 2]> {
        match self {
            Domain::Ir => None,
            Domain::Ms => Some([550.0, 570.0]),
            Domain::UvVis => Some([100.0, 1400.0]),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Ir => write!(f, "IR"),
            Domain::Ms => write!(f, "MS"),
            Domain::UvVis => write!(f, "UV-Vis"),
        }
    }
}

/// Direction in which classified peaks are listed by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[value(name = "asc")]
    Ascending,
    #[value(name = "desc")]
    Descending,
}

// ---------------------------------------------------------------------------
// Series – paired x / y samples
// ---------------------------------------------------------------------------

/// One measured spectrum: x (wavenumber, m/z, wavelength) and y samples of
/// equal length. Loaders never let a NaN through.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Series {
    /// # Panics
    /// If `x` and `y` differ in length.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        assert_eq!(
            x.len(),
            y.len(),
            "x has {} values but y has {}",
            x.len(),
            y.len()
        );
        Series { x, y }
    }

    pub fn from_points<I: IntoIterator<Item = (f64, f64)>>(points: I) -> Self {
        let (x, y) = points.into_iter().unzip();
        Series { x, y }
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Whether x runs from high to low, as IR exports usually store it.
    pub fn is_descending(&self) -> bool {
        is_descending(&self.x)
    }

    /// Copy of the samples in `range`.
    pub fn window(&self, range: Range<usize>) -> Series {
        Series {
            x: self.x[range.clone()].to_vec(),
            y: self.y[range].to_vec(),
        }
    }

    /// Largest y value, `None` for an empty series.
    pub fn max_y(&self) -> Option<f64> {
        self.y.iter().copied().reduce(f64::max)
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }
}

pub(crate) fn is_descending(xs: &[f64]) -> bool {
    matches!((xs.first(), xs.last()), (Some(first), Some(last)) if first > last)
}

// ---------------------------------------------------------------------------
// Metadata / LoadedSeries
// ---------------------------------------------------------------------------

/// Key/value pairs from an instrument file preamble. Read-only provenance.
pub type Metadata = BTreeMap<String, String>;

/// A series together with whatever provenance its file carried.
#[derive(Debug, Clone, Default)]
pub struct LoadedSeries {
    pub series: Series,
    /// Empty for formats without a preamble.
    pub metadata: Metadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_copies_both_axes() {
        let s = Series::new(vec![1.0, 2.0, 3.0, 4.0], vec![10.0, 20.0, 30.0, 40.0]);
        let w = s.window(1..3);
        assert_eq!(w.x(), &[2.0, 3.0]);
        assert_eq!(w.y(), &[20.0, 30.0]);
        assert_eq!(s.max_y(), Some(40.0));
    }

    #[test]
    fn descending_detection() {
        assert!(Series::from_points([(4000.0, 0.1), (3998.0, 0.2)]).is_descending());
        assert!(!Series::from_points([(550.0, 1.0), (551.0, 2.0)]).is_descending());
        assert!(!Series::default().is_descending());
    }

    #[test]
    #[should_panic]
    fn mismatched_lengths_panic() {
        Series::new(vec![1.0, 2.0], vec![1.0]);
    }

    #[test]
    fn domain_conventions() {
        assert_eq!(Domain::Ir.default_sort_order(), SortOrder::Descending);
        assert_eq!(Domain::Ms.default_sort_order(), SortOrder::Ascending);
        assert_eq!(Domain::Ms.column_label(), "mz");
        assert_eq!(serde_json::to_string(&Domain::UvVis).unwrap(), "\"uv-vis\"");
    }
}
