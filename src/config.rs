use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::model::{Domain, SortOrder};
use crate::error::{PeakError, PeakResult};
use crate::output::OverwritePolicy;
use crate::peaks::detect::PeakParams;
use crate::peaks::export::TableFormat;

/// Everything one pipeline run needs. Nothing else is read from globals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub input_path: PathBuf,
    /// Classified peak table; `.tsv`/`.txt` selects tab separation.
    pub output_path: PathBuf,
    pub domain: Domain,
    /// Inclusive `[low, high]` x window searched for peaks.
    #[serde(default)]
    pub x_range: Option<[f64; 2]>,
    pub min_height: f64,
    pub min_prominence: f64,
    /// Defaults to the domain's convention.
    #[serde(default)]
    pub sort_order: Option<SortOrder>,
    #[serde(default)]
    pub save_plot: bool,
    /// Defaults to the output path with a `.png` extension.
    #[serde(default)]
    pub plot_path: Option<PathBuf>,
    #[serde(default)]
    pub overwrite: bool,
    /// Also write the unnormalised `x,y,height,prominence` list here.
    #[serde(default)]
    pub peak_list_path: Option<PathBuf>,
}

/// A config file holds either one run or a list of runs.
#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigFile {
    One(PipelineConfig),
    Many(Vec<PipelineConfig>),
}

impl PipelineConfig {
    /// A run with the thresholds and window the domain's bench script used.
    pub fn new(
        domain: Domain,
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        let (min_height, min_prominence) = domain.default_thresholds();
        PipelineConfig {
            input_path: input_path.into(),
            output_path: output_path.into(),
            domain,
            x_range: domain.default_range(),
            min_height,
            min_prominence,
            sort_order: None,
            save_plot: false,
            plot_path: None,
            overwrite: false,
            peak_list_path: None,
        }
    }

    /// Load one config object or an array of them from a JSON file.
    pub fn from_json_file(path: &Path) -> PeakResult<Vec<PipelineConfig>> {
        let text = std::fs::read_to_string(path).map_err(|e| PeakError::io(path, e))?;
        let parsed: ConfigFile = serde_json::from_str(&text)
            .map_err(|e| PeakError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Ok(match parsed {
            ConfigFile::One(config) => vec![config],
            ConfigFile::Many(configs) => configs,
        })
    }

    pub fn params(&self) -> PeakParams {
        PeakParams {
            min_height: self.min_height,
            min_prominence: self.min_prominence,
        }
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order.unwrap_or_else(|| self.domain.default_sort_order())
    }

    pub fn plot_path(&self) -> PathBuf {
        self.plot_path
            .clone()
            .unwrap_or_else(|| self.output_path.with_extension("png"))
    }

    pub fn overwrite_policy(&self) -> OverwritePolicy {
        OverwritePolicy::from_flag(self.overwrite)
    }

    pub fn table_format(&self) -> TableFormat {
        TableFormat::from_path(&self.output_path)
    }

    /// Every file this run would create.
    pub fn destinations(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.output_path.clone()];
        paths.extend(self.peak_list_path.clone());
        if self.save_plot {
            paths.push(self.plot_path());
        }
        paths
    }

    pub fn validate(&self) -> PeakResult<()> {
        if !self.min_height.is_finite() {
            return Err(PeakError::InvalidConfig(format!(
                "min_height must be finite, got {}",
                self.min_height
            )));
        }
        if !self.min_prominence.is_finite() || self.min_prominence < 0.0 {
            return Err(PeakError::InvalidConfig(format!(
                "min_prominence must be a finite value >= 0, got {}",
                self.min_prominence
            )));
        }
        if let Some([low, high]) = self.x_range {
            if !low.is_finite() || !high.is_finite() {
                return Err(PeakError::InvalidConfig(format!(
                    "x_range bounds must be finite, got [{low}, {high}]"
                )));
            }
        }
        let input = same_file_key(&self.input_path);
        let destinations = self.destinations();
        let keys: Vec<PathBuf> = destinations.iter().map(|p| same_file_key(p)).collect();
        if keys.contains(&input) {
            return Err(PeakError::InvalidConfig(format!(
                "{} is both input and output",
                self.input_path.display()
            )));
        }
        for (i, key) in keys.iter().enumerate() {
            if keys[i + 1..].contains(key) {
                return Err(PeakError::InvalidConfig(format!(
                    "{} is used for two outputs",
                    destinations[i].display()
                )));
            }
        }
        Ok(())
    }
}

/// Absolute form of `path` used to tell whether two paths name the same
/// file: `.` and `..` are resolved and, when the parent directory exists,
/// symlinks in it are followed.
fn same_file_key(path: &Path) -> PathBuf {
    let joined = match std::env::current_dir() {
        Ok(cwd) if path.is_relative() => cwd.join(path),
        _ => path.to_path_buf(),
    };
    let mut lexical = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                lexical.pop();
            }
            other => lexical.push(other),
        }
    }
    let canonical = match (lexical.parent(), lexical.file_name()) {
        (Some(parent), Some(name)) => parent.canonicalize().ok().map(|dir| dir.join(name)),
        _ => None,
    };
    canonical.unwrap_or(lexical)
}
