//! Load → window → detect → classify → export, once per input file.
//!
//! ```text
//!  instrument export
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  text → Series (+ Metadata)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  range    │  [low, high] → snapped index window
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  detect   │  local maxima ≥ height, ≥ prominence → PeakSet
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────────────┐
//!   │ classify / export │  normalise, bucket, sort → table (+ figure)
//!   └──────────────────┘
//! ```

use std::ops::Range;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::PipelineConfig;
use crate::data::loader::load_file;
use crate::data::model::{Domain, Metadata, SortOrder};
use crate::data::range::select_range;
use crate::error::PeakResult;
use crate::figure::{build_figure, stage_png};
use crate::output::{commit_all, OverwritePolicy};
use crate::peaks::classify::{classify, classify_heights, ClassSummary, ClassifiedPeak};
use crate::peaks::detect::{extract_peaks_in, PeakSet};
use crate::peaks::export::{
    read_peak_list, stage_classified, stage_peak_list, write_classified, TableFormat,
};

/// Figure size used when `save_plot` is set.
pub const PLOT_SIZE: (u32, u32) = (1200, 720);

/// What one run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub samples: usize,
    /// Sample indices the peak search covered.
    pub window: Range<usize>,
    pub metadata: Metadata,
    pub peaks: PeakSet,
    pub classified: Vec<ClassifiedPeak>,
    pub summary: ClassSummary,
    pub plot_path: Option<PathBuf>,
}

/// Run the whole pipeline for one input file.
///
/// Every destination is checked before anything is written. All outputs are
/// staged in temporary files and only moved into place once every one of
/// them has been produced, so a failing run leaves no new output behind.
pub fn run(config: &PipelineConfig) -> PeakResult<PipelineReport> {
    config.validate()?;
    for destination in config.destinations() {
        config.overwrite_policy().check(&destination)?;
    }

    let loaded = load_file(&config.input_path, config.domain)?;
    let series = &loaded.series;

    let window = match config.x_range {
        Some([low, high]) => select_range(series, low, high),
        None => 0..series.len(),
    };
    let peaks = extract_peaks_in(series, window.clone(), &config.params());
    if peaks.is_empty() {
        warn!(
            "{}: no peaks in samples {window:?} with height >= {} and prominence >= {}",
            config.input_path.display(),
            config.min_height,
            config.min_prominence
        );
    } else {
        info!(
            "{}: {} peaks in samples {window:?}",
            config.input_path.display(),
            peaks.len()
        );
    }

    let classified = classify(&peaks, config.sort_order())?;
    let summary = ClassSummary::of(&classified);
    info!("{}: {summary}", config.input_path.display());

    // Stage every file first; nothing reaches its final path unless all of
    // them could be produced.
    let policy = config.overwrite_policy();
    let mut staged = Vec::with_capacity(3);
    if let Some(peak_list) = &config.peak_list_path {
        staged.push(stage_peak_list(
            peak_list,
            &peaks,
            TableFormat::from_path(peak_list),
            policy,
        )?);
    }
    staged.push(stage_classified(
        &config.output_path,
        config.domain.column_label(),
        &classified,
        config.table_format(),
        policy,
    )?);
    let plot_path = if config.save_plot {
        let path = config.plot_path();
        let figure = build_figure(&series.window(window.clone()), &peaks, config.domain);
        staged.push(stage_png(&figure, &path, PLOT_SIZE.0, PLOT_SIZE.1, policy)?);
        Some(path)
    } else {
        None
    };
    for path in commit_all(staged)? {
        info!("{}: wrote {}", config.input_path.display(), path.display());
    }

    Ok(PipelineReport {
        input_path: config.input_path.clone(),
        output_path: config.output_path.clone(),
        samples: series.len(),
        window,
        metadata: loaded.metadata,
        peaks,
        classified,
        summary,
        plot_path,
    })
}

/// Run several configurations one after another. A failing file is reported
/// in its slot; the others still run.
pub fn run_batch(configs: &[PipelineConfig]) -> Vec<PeakResult<PipelineReport>> {
    configs.iter().map(run).collect()
}

/// Classify a peak list written earlier (`x,y[,height,prominence]`) into a
/// publication table.
pub fn reclassify(
    input: &Path,
    output: &Path,
    domain: Domain,
    order: SortOrder,
    policy: OverwritePolicy,
) -> PeakResult<Vec<ClassifiedPeak>> {
    policy.check(output)?;
    let points = read_peak_list(input, TableFormat::from_path(input))?;
    let classified = classify_heights(&points, order)?;
    info!("{}: {}", input.display(), ClassSummary::of(&classified));
    write_classified(
        output,
        domain.column_label(),
        &classified,
        TableFormat::from_path(output),
        policy,
    )?;
    Ok(classified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PeakError;
    use crate::peaks::classify::IntensityClass;
    use crate::peaks::export::read_classified;

    fn write_ir(dir: &Path) -> PathBuf {
        let path = dir.join("ir_raw_data.CSV");
        let mut text = String::from("cm-1,absorbance\n");
        for i in 0..200 {
            let x = 4000.0 - 17.5 * i as f64;
            let y = 0.7 * (-((x - 3400.0) / 40.0).powi(2)).exp()
                + 0.25 * (-((x - 1700.0) / 15.0).powi(2)).exp()
                + 0.9 * (-((x - 1100.0) / 25.0).powi(2)).exp();
            text.push_str(&format!("{x},{y}\n"));
        }
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn ir_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_ir(dir.path());
        let mut config = PipelineConfig::new(Domain::Ir, &input, dir.path().join("ir_pub.csv"));
        config.peak_list_path = Some(dir.path().join("ir_peak_list.csv"));
        config.save_plot = true;

        let report = run(&config).unwrap();
        assert_eq!(report.samples, 200);
        assert_eq!(report.window, 0..200);
        assert_eq!(report.classified.len(), 3);
        assert_eq!(report.summary.strong, 2);
        assert_eq!(report.summary.weak, 1);
        assert!(report.plot_path.as_ref().unwrap().exists());

        // Descending wavenumbers, tallest band normalised to 1.
        let back = read_classified(&config.output_path, TableFormat::Csv).unwrap();
        assert_eq!(back, report.classified);
        assert!(back.windows(2).all(|w| w[0].position > w[1].position));
        let top = back.iter().find(|p| p.normalized_height == 1.0).unwrap();
        assert_eq!(top.intensity_class, IntensityClass::Strong);
        assert!((top.position - 1100.0).abs() < 20.0);

        // Publication step from the raw list gives the same table.
        let again = reclassify(
            config.peak_list_path.as_ref().unwrap(),
            &dir.path().join("ir_pub_again.csv"),
            Domain::Ir,
            SortOrder::Descending,
            OverwritePolicy::Refuse,
        )
        .unwrap();
        assert_eq!(again, report.classified);
    }

    #[test]
    fn second_run_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_ir(dir.path());
        let mut config = PipelineConfig::new(Domain::Ir, &input, dir.path().join("ir_pub.csv"));
        run(&config).unwrap();

        let err = run(&config).unwrap_err();
        assert!(matches!(err, PeakError::OutputExists { .. }));

        config.overwrite = true;
        run(&config).unwrap();
    }

    #[test]
    fn windowed_ms_run() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("AE-157-MS.xy");
        let mut text = String::from("# m/z Intensity\n");
        for i in 0..400 {
            let mz = 540.0 + 0.1 * i as f64;
            let y = 1000.0 * (-((mz - 558.0) / 0.3).powi(2)).exp()
                + 400.0 * (-((mz - 562.0) / 0.3).powi(2)).exp()
                + 5000.0 * (-((mz - 545.0) / 0.3).powi(2)).exp();
            text.push_str(&format!("{mz:.4} {y:.6}\n"));
        }
        std::fs::write(&input, text).unwrap();

        let config = PipelineConfig::new(Domain::Ms, &input, dir.path().join("peaks.txt"));
        let report = run(&config).unwrap();

        // The m/z 545 peak lies outside the 550-570 window.
        let positions: Vec<f64> = report.classified.iter().map(|p| p.position).collect();
        assert_eq!(positions.len(), 2);
        assert!((positions[0] - 558.0).abs() < 0.05);
        assert!((positions[1] - 562.0).abs() < 0.05);
        assert_eq!(report.classified[1].intensity_class, IntensityClass::Medium);
        assert_eq!(report.classified[0].normalized_height, 1.0);
        for p in &report.peaks {
            assert!(report.window.contains(&p.index));
        }

        let back = read_classified(&config.output_path, TableFormat::Tsv).unwrap();
        assert_eq!(back, report.classified);
    }

    #[test]
    fn empty_peak_set_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_ir(dir.path());
        let mut config = PipelineConfig::new(Domain::Ir, &input, dir.path().join("ir_pub.csv"));
        config.min_height = 5.0;
        let err = run(&config).unwrap_err();
        assert!(matches!(err, PeakError::EmptyInput));
        assert!(!config.output_path.exists());
    }

    #[test]
    fn batch_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_ir(dir.path());
        let good = PipelineConfig::new(Domain::Ir, &input, dir.path().join("a.csv"));
        let missing =
            PipelineConfig::new(Domain::Ir, dir.path().join("nope.csv"), dir.path().join("b.csv"));
        let also_good = PipelineConfig::new(Domain::Ir, &input, dir.path().join("c.csv"));

        let results = run_batch(&[good, missing, also_good]);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(PeakError::Io { .. })));
        assert!(results[2].is_ok());
        assert!(dir.path().join("c.csv").exists());
        assert!(!dir.path().join("b.csv").exists());
    }

    #[test]
    fn late_failure_leaves_no_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_ir(dir.path());
        let mut config = PipelineConfig::new(Domain::Ir, &input, dir.path().join("pub.csv"));
        config.peak_list_path = Some(dir.path().join("raw.csv"));
        config.save_plot = true;
        // Passes the existence check, but the figure cannot be created.
        config.plot_path = Some(dir.path().join("no_such_dir").join("fig.png"));

        let err = run(&config).unwrap_err();
        assert!(matches!(err, PeakError::Io { .. }));
        assert!(!config.output_path.exists());
        assert!(!dir.path().join("raw.csv").exists());
        let left: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(left, vec![std::ffi::OsString::from("ir_raw_data.CSV")]);
    }
}
