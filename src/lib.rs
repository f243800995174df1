//! Peak picking and intensity classification for laboratory spectra
//! (IR, mass spectrometry, UV-Vis).
//!
//! The [`pipeline`] module chains the stages; each stage is usable on its
//! own through [`data`] and [`peaks`].

pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod figure;
pub mod output;
pub mod peaks;
pub mod pipeline;

pub use config::PipelineConfig;
pub use data::model::{Domain, LoadedSeries, Metadata, Series, SortOrder};
pub use error::{PeakError, PeakResult};
pub use peaks::classify::{ClassifiedPeak, IntensityClass};
pub use peaks::detect::{extract_peaks, Peak, PeakParams, PeakSet};
