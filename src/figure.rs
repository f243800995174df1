//! Peak figures, kept apart from the numeric pipeline.
//!
//! [`build_figure`] is pure: it turns a series and its peaks into a
//! [`RenderableFigure`] that any presentation layer can draw. [`render_png`]
//! is the one built in sink and rasterises the trace and the peak markers.

use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};
use log::info;

use crate::color::{class_color, trace_color, BACKGROUND, FRAME};
use crate::data::model::{Domain, Series};
use crate::error::{PeakError, PeakResult};
use crate::output::{OverwritePolicy, StagedOutput};
use crate::peaks::classify::IntensityClass;
use crate::peaks::detect::PeakSet;

/// Common IR window in cm^-1.
pub const IR_X_LIMITS: [f64; 2] = [480.0, 4000.0];

/// A labelled peak position on the figure.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakMarker {
    pub x: f64,
    pub y: f64,
    /// Position printed with one decimal.
    pub label: String,
    pub class: IntensityClass,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderableFigure {
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub trace: Vec<[f64; 2]>,
    pub markers: Vec<PeakMarker>,
    /// `[min, max]` of the visible x range.
    pub x_limits: [f64; 2],
    pub y_limits: [f64; 2],
    /// Draw x from high (left) to low (right), the IR convention.
    pub invert_x: bool,
}

fn axis_labels(domain: Domain) -> (&'static str, &'static str) {
    match domain {
        Domain::Ir => ("wavenumber / cm^-1", "absorbance / -"),
        Domain::Ms => ("m/z / -", "Intensity / a.u."),
        Domain::UvVis => ("wavelength / nm", "absorbance / -"),
    }
}

fn extent(values: impl Iterator<Item = f64>) -> Option<[f64; 2]> {
    values.fold(None, |acc, v| match acc {
        None => Some([v, v]),
        Some([lo, hi]) => Some([lo.min(v), hi.max(v)]),
    })
}

/// Guarantee a non-empty span so coordinates can be mapped.
fn widen(mut limits: [f64; 2]) -> [f64; 2] {
    if limits[1] <= limits[0] {
        limits[1] = limits[0] + 1.0;
    }
    limits
}

/// Describe the figure for `series` with `peaks` marked.
pub fn build_figure(series: &Series, peaks: &PeakSet, domain: Domain) -> RenderableFigure {
    let (x_label, y_label) = axis_labels(domain);
    let max_height = peaks.max_height().filter(|&m| m > 0.0);

    let markers = peaks
        .iter()
        .map(|p| PeakMarker {
            x: p.position,
            y: p.height,
            label: format!("{:.1}", p.position),
            class: max_height
                .map(|max| IntensityClass::from_normalized(p.height / max))
                .unwrap_or(IntensityClass::Weak),
        })
        .collect();

    let x_extent = extent(series.x().iter().copied()).unwrap_or([0.0, 1.0]);
    let y_extent = extent(series.y().iter().copied()).unwrap_or([0.0, 1.0]);
    let (x_limits, y_limits) = match domain {
        Domain::Ir => (IR_X_LIMITS, [0.0, y_extent[1] * 1.25]),
        Domain::Ms | Domain::UvVis => {
            let pad = (y_extent[1] - y_extent[0]) * 0.05;
            (x_extent, [y_extent[0].min(0.0), y_extent[1] + pad])
        }
    };

    RenderableFigure {
        x_label,
        y_label,
        trace: series.points().map(|(x, y)| [x, y]).collect(),
        markers,
        x_limits: widen(x_limits),
        y_limits: widen(y_limits),
        invert_x: domain == Domain::Ir,
    }
}

// ---------------------------------------------------------------------------
// PNG rasteriser
// ---------------------------------------------------------------------------

const MARGIN: i64 = 40;
const TICK_LENGTH: i64 = 14;

struct Canvas {
    image: RgbImage,
    x_limits: [f64; 2],
    y_limits: [f64; 2],
    invert_x: bool,
}

impl Canvas {
    fn plot_width(&self) -> f64 {
        (self.image.width() as i64 - 2 * MARGIN).max(1) as f64
    }

    fn plot_height(&self) -> f64 {
        (self.image.height() as i64 - 2 * MARGIN).max(1) as f64
    }

    fn to_pixel(&self, x: f64, y: f64) -> (i64, i64) {
        let mut fx = (x - self.x_limits[0]) / (self.x_limits[1] - self.x_limits[0]);
        if self.invert_x {
            fx = 1.0 - fx;
        }
        let fy = (y - self.y_limits[0]) / (self.y_limits[1] - self.y_limits[0]);
        let px = MARGIN as f64 + fx * self.plot_width();
        let py = MARGIN as f64 + (1.0 - fy) * self.plot_height();
        (px.round() as i64, py.round() as i64)
    }

    fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && x < self.image.width() as i64 && y < self.image.height() as i64 {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    /// Bresenham; pixels off the canvas are skipped.
    fn line(&mut self, (x0, y0): (i64, i64), (x1, y1): (i64, i64), color: Rgb<u8>) {
        let (dx, dy) = ((x1 - x0).abs(), -(y1 - y0).abs());
        let (sx, sy) = (if x0 < x1 { 1 } else { -1 }, if y0 < y1 { 1 } else { -1 });
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        // Lines far outside the canvas come from clipped data; bound the walk.
        let limit = 4 * (self.image.width() as i64 + self.image.height() as i64);
        for _ in 0..=limit {
            self.put(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn square(&mut self, (cx, cy): (i64, i64), half: i64, color: Rgb<u8>) {
        for x in cx - half..=cx + half {
            for y in cy - half..=cy + half {
                self.put(x, y, color);
            }
        }
    }
}

/// Rasterise `figure` to a PNG of `width` x `height` pixels at `path`.
///
/// Labels are not drawn; each peak gets a short vertical tick and a dot in
/// the colour of its intensity class.
pub fn render_png(
    figure: &RenderableFigure,
    path: &Path,
    width: u32,
    height: u32,
    policy: OverwritePolicy,
) -> PeakResult<()> {
    stage_png(figure, path, width, height, policy)?.commit()?;
    info!("saved {width}x{height} figure to {}", path.display());
    Ok(())
}

/// Rasterise like [`render_png`], but leave the PNG in a temporary file.
pub fn stage_png(
    figure: &RenderableFigure,
    path: &Path,
    width: u32,
    height: u32,
    policy: OverwritePolicy,
) -> PeakResult<StagedOutput> {
    let mut canvas = Canvas {
        image: RgbImage::from_pixel(width, height, BACKGROUND),
        x_limits: figure.x_limits,
        y_limits: figure.y_limits,
        invert_x: figure.invert_x,
    };

    let (left, right) = (MARGIN, width as i64 - MARGIN);
    let (top, bottom) = (MARGIN, height as i64 - MARGIN);
    canvas.line((left, top), (right, top), FRAME);
    canvas.line((right, top), (right, bottom), FRAME);
    canvas.line((right, bottom), (left, bottom), FRAME);
    canvas.line((left, bottom), (left, top), FRAME);

    let trace = trace_color();
    let pixels: Vec<(i64, i64)> = figure
        .trace
        .iter()
        .map(|&[x, y]| canvas.to_pixel(x, y))
        .collect();
    for pair in pixels.windows(2) {
        canvas.line(pair[0], pair[1], trace);
    }

    for marker in &figure.markers {
        let color = class_color(marker.class);
        let (px, py) = canvas.to_pixel(marker.x, marker.y);
        canvas.line((px, py - 3), (px, py - 3 - TICK_LENGTH), color);
        canvas.square((px, py), 2, color);
    }

    let image = canvas.image;
    StagedOutput::stage(path, policy, |file| {
        image
            .write_to(file.as_file_mut(), ImageFormat::Png)
            .map_err(|source| PeakError::Image {
                path: path.to_path_buf(),
                source,
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peaks::detect::{extract_peaks, PeakParams};

    fn spectrum() -> Series {
        Series::from_points((0..50).map(|i| {
            let x = 4000.0 - 60.0 * i as f64;
            let y = 0.8 * (-((i as f64 - 12.0) / 2.0).powi(2)).exp()
                + 0.3 * (-((i as f64 - 35.0) / 3.0).powi(2)).exp();
            (x, y)
        }))
    }

    #[test]
    fn ir_figure_conventions() {
        let series = spectrum();
        let peaks = extract_peaks(&series, &PeakParams::NONE);
        let figure = build_figure(&series, &peaks, Domain::Ir);

        assert!(figure.invert_x);
        assert_eq!(figure.x_limits, IR_X_LIMITS);
        assert_eq!(figure.y_limits[0], 0.0);
        assert!((figure.y_limits[1] - 1.25 * series.max_y().unwrap()).abs() < 1e-12);
        assert_eq!(figure.trace.len(), series.len());

        let labels: Vec<&str> = figure.markers.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["3280.0", "1900.0"]);
        assert_eq!(figure.markers[0].class, IntensityClass::Strong);
        assert_eq!(figure.markers[1].class, IntensityClass::Medium);
    }

    #[test]
    fn ms_figure_uses_data_extent() {
        let series = Series::new(vec![550.0, 551.0, 552.0], vec![10.0, 200.0, 20.0]);
        let figure = build_figure(&series, &PeakSet::default(), Domain::Ms);
        assert!(!figure.invert_x);
        assert_eq!(figure.x_limits, [550.0, 552.0]);
        assert_eq!(figure.x_label, "m/z / -");
        assert!(figure.markers.is_empty());
    }

    #[test]
    fn renders_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peaks.png");
        let series = spectrum();
        let peaks = extract_peaks(&series, &PeakParams::NONE);
        let figure = build_figure(&series, &peaks, Domain::Ir);
        render_png(&figure, &path, 320, 200, OverwritePolicy::Refuse).unwrap();

        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (320, 200));
        assert!(decoded.pixels().any(|p| *p == trace_color()));
    }
}
