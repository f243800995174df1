use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Everything that can go wrong between reading a spectrum and writing its
/// peak table.
#[derive(Debug, Error)]
pub enum PeakError {
    /// The input does not have the structural shape its format promises.
    #[error("{}: unexpected format: {reason}", .path.display())]
    Format { path: PathBuf, reason: String },

    /// Classification was attempted on an empty peak set.
    #[error("no peaks to classify")]
    EmptyInput,

    /// The tallest peak is not above zero, so heights cannot be normalised.
    #[error("cannot normalise against a maximum peak height of {max}")]
    NonPositiveMaximum { max: f64 },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Refusing to replace an existing output file.
    #[error("{} already exists (pass --overwrite to replace it)", .path.display())]
    OutputExists { path: PathBuf },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type PeakResult<T> = Result<T, PeakError>;

impl PeakError {
    pub fn format(path: &Path, reason: impl Into<String>) -> Self {
        PeakError::Format {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn io(path: &Path, source: io::Error) -> Self {
        PeakError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn csv(path: &Path, source: csv::Error) -> Self {
        PeakError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}
