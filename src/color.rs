use image::Rgb;
use palette::{Hsl, IntoColor, Srgb};

use crate::peaks::classify::IntensityClass;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> Rgb<u8> {
    let rgb: Srgb = Hsl::new(hue, saturation, lightness).into_color();
    Rgb([
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    ])
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb<u8>> {
    (0..n)
        .map(|i| hsl_to_rgb((i as f32 / n as f32) * 360.0, 0.75, 0.45))
        .collect()
}

// ---------------------------------------------------------------------------
// Figure colours
// ---------------------------------------------------------------------------

pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
pub const FRAME: Rgb<u8> = Rgb([90, 90, 90]);

/// Colour of the spectrum trace.
pub fn trace_color() -> Rgb<u8> {
    hsl_to_rgb(215.0, 0.70, 0.40)
}

/// Strong peaks red, medium green, weak blue.
pub fn class_color(class: IntensityClass) -> Rgb<u8> {
    let palette = generate_palette(3);
    match class {
        IntensityClass::Strong => palette[0],
        IntensityClass::Medium => palette[1],
        IntensityClass::Weak => palette[2],
    }
}
