use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use super::classify::{ClassifiedPeak, IntensityClass};
use super::detect::PeakSet;
use crate::error::{PeakError, PeakResult};
use crate::output::{OverwritePolicy, StagedOutput};

/// Column separator of an exported table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    #[default]
    Csv,
    Tsv,
}

impl TableFormat {
    /// `.tsv` and `.txt` are tab separated, anything else is CSV.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "tsv" | "txt" => TableFormat::Tsv,
            _ => TableFormat::Csv,
        }
    }

    fn delimiter(self) -> u8 {
        match self {
            TableFormat::Csv => b',',
            TableFormat::Tsv => b'\t',
        }
    }
}

// ---------------------------------------------------------------------------
// Classified table:  <label>,normalized_height,intensity
// ---------------------------------------------------------------------------

/// Write the publication table. `column_label` heads the position column
/// (`wavenumber`, `mz`, ...).
pub fn write_classified(
    path: &Path,
    column_label: &str,
    peaks: &[ClassifiedPeak],
    format: TableFormat,
    policy: OverwritePolicy,
) -> PeakResult<()> {
    stage_classified(path, column_label, peaks, format, policy)?.commit()?;
    info!("wrote {} classified peaks to {}", peaks.len(), path.display());
    Ok(())
}

/// Like [`write_classified`], but leaves the table in a temporary file until
/// the caller commits it.
pub fn stage_classified(
    path: &Path,
    column_label: &str,
    peaks: &[ClassifiedPeak],
    format: TableFormat,
    policy: OverwritePolicy,
) -> PeakResult<StagedOutput> {
    StagedOutput::stage(path, policy, |file| {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(format.delimiter())
            .has_headers(false)
            .from_writer(file);
        writer
            .write_record([column_label, "normalized_height", "intensity"])
            .map_err(|e| PeakError::csv(path, e))?;
        for p in peaks {
            writer
                .serialize((p.position, p.normalized_height, p.intensity_class))
                .map_err(|e| PeakError::csv(path, e))?;
        }
        writer.flush().map_err(|e| PeakError::io(path, e))
    })
}

/// Read a table written by [`write_classified`]. Columns are taken by
/// position, so the label of the first one does not matter.
pub fn read_classified(path: &Path, format: TableFormat) -> PeakResult<Vec<ClassifiedPeak>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter())
        .from_path(path)
        .map_err(|e| PeakError::csv(path, e))?;
    reader
        .deserialize::<(f64, f64, IntensityClass)>()
        .map(|row| {
            let (position, normalized_height, intensity_class) =
                row.map_err(|e| PeakError::csv(path, e))?;
            Ok(ClassifiedPeak {
                position,
                normalized_height,
                intensity_class,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Raw peak list:  x,y,height,prominence
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct PeakListRow {
    x: f64,
    y: f64,
    #[serde(default)]
    height: Option<f64>,
    #[serde(default)]
    prominence: Option<f64>,
}

/// Write every detected peak with its height and prominence, before any
/// normalisation.
pub fn write_peak_list(
    path: &Path,
    peaks: &PeakSet,
    format: TableFormat,
    policy: OverwritePolicy,
) -> PeakResult<()> {
    stage_peak_list(path, peaks, format, policy)?.commit()?;
    info!("wrote {} raw peaks to {}", peaks.len(), path.display());
    Ok(())
}

/// Like [`write_peak_list`], but leaves the list in a temporary file.
pub fn stage_peak_list(
    path: &Path,
    peaks: &PeakSet,
    format: TableFormat,
    policy: OverwritePolicy,
) -> PeakResult<StagedOutput> {
    StagedOutput::stage(path, policy, |file| {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(format.delimiter())
            .from_writer(file);
        for p in peaks {
            writer
                .serialize(PeakListRow {
                    x: p.position,
                    y: p.height,
                    height: Some(p.height),
                    prominence: Some(p.prominence),
                })
                .map_err(|e| PeakError::csv(path, e))?;
        }
        writer.flush().map_err(|e| PeakError::io(path, e))
    })
}

/// Read `(x, y)` pairs back from a peak list. Only the `x` and `y` columns
/// are required.
pub fn read_peak_list(path: &Path, format: TableFormat) -> PeakResult<Vec<(f64, f64)>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter())
        .from_path(path)
        .map_err(|e| PeakError::csv(path, e))?;
    reader
        .deserialize::<PeakListRow>()
        .map(|row| {
            let row = row.map_err(|e| PeakError::csv(path, e))?;
            Ok((row.x, row.y))
        })
        .collect()
}
