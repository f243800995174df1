use std::borrow::Cow;
use std::path::Path;

use encoding_rs::{UTF_8, WINDOWS_1252};
use log::{debug, info};

use super::model::{Domain, LoadedSeries, Metadata, Series};
use crate::error::{PeakError, PeakResult};

// ---------------------------------------------------------------------------
// Format descriptors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Semicolon,
    Tab,
    /// Any run of spaces or tabs, as in `.xy` exports.
    Whitespace,
}

impl Delimiter {
    fn byte(self) -> Option<u8> {
        match self {
            Delimiter::Comma => Some(b','),
            Delimiter::Semicolon => Some(b';'),
            Delimiter::Tab => Some(b'\t'),
            Delimiter::Whitespace => None,
        }
    }
}

/// Character separating the integer and fractional part of a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalMark {
    Period,
    /// German/European locale exports (`1,23`).
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// What Windows instrument software writes when it is not UTF-8.
    Windows1252,
}

/// How the lines in front of the numeric block are structured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `skip_rows` lines are ignored, everything after is data.
    Plain,
    /// Metadata lines, a column header line containing `Wave` and a units
    /// line containing `[nm]`, then data. Columns are located by name.
    UvVisPreamble,
}

/// Everything needed to turn one instrument export into a [`Series`].
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesFormat {
    pub delimiter: Delimiter,
    pub decimal: DecimalMark,
    pub skip_rows: usize,
    /// Lines starting with this byte are ignored.
    pub comment: Option<u8>,
    pub encoding: TextEncoding,
    pub layout: Layout,
    pub x_column: usize,
    pub y_column: usize,
}

impl SeriesFormat {
    /// Two-column CSV with one header row.
    pub fn ir() -> Self {
        SeriesFormat {
            delimiter: Delimiter::Comma,
            decimal: DecimalMark::Period,
            skip_rows: 1,
            comment: None,
            encoding: TextEncoding::Utf8,
            layout: Layout::Plain,
            x_column: 0,
            y_column: 1,
        }
    }

    /// Whitespace separated m/z and intensity with `#` comment lines.
    pub fn ms() -> Self {
        SeriesFormat {
            delimiter: Delimiter::Whitespace,
            decimal: DecimalMark::Period,
            skip_rows: 0,
            comment: Some(b'#'),
            encoding: TextEncoding::Utf8,
            layout: Layout::Plain,
            x_column: 0,
            y_column: 1,
        }
    }

    /// Semicolon separated, comma decimal, with the spectrometer preamble.
    pub fn uv_vis() -> Self {
        SeriesFormat {
            delimiter: Delimiter::Semicolon,
            decimal: DecimalMark::Comma,
            skip_rows: 0,
            comment: None,
            encoding: TextEncoding::Utf8,
            layout: Layout::UvVisPreamble,
            x_column: 0,
            y_column: 1,
        }
    }

    pub fn for_domain(domain: Domain) -> Self {
        match domain {
            Domain::Ir => Self::ir(),
            Domain::Ms => Self::ms(),
            Domain::UvVis => Self::uv_vis(),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a series using the default layout for `domain`.
pub fn load_file(path: &Path, domain: Domain) -> PeakResult<LoadedSeries> {
    load_series(path, &SeriesFormat::for_domain(domain))
}

/// Read `path` completely, decode it and parse the x/y block.
pub fn load_series(path: &Path, format: &SeriesFormat) -> PeakResult<LoadedSeries> {
    let bytes = std::fs::read(path).map_err(|e| PeakError::io(path, e))?;
    let text = decode(&bytes, format.encoding);
    let loaded = parse_str(&text, format, path)?;
    info!(
        "loaded {} samples from {} ({} metadata entries)",
        loaded.series.len(),
        path.display(),
        loaded.metadata.len()
    );
    Ok(loaded)
}

/// Parse already decoded text. `origin` only labels errors.
pub fn parse_str(text: &str, format: &SeriesFormat, origin: &Path) -> PeakResult<LoadedSeries> {
    let (metadata, body, x_column, y_column) = match format.layout {
        Layout::Plain => (
            Metadata::new(),
            skip_lines(text, format.skip_rows),
            format.x_column,
            format.y_column,
        ),
        Layout::UvVisPreamble => {
            let preamble =
                split_preamble(text).map_err(|reason| PeakError::format(origin, reason))?;
            (
                preamble.metadata,
                preamble.body,
                preamble.x_column,
                preamble.y_column,
            )
        }
    };

    let (points, dropped) = read_columns(body, format, x_column, y_column)
        .map_err(|e| PeakError::csv(origin, e))?;
    if dropped > 0 {
        debug!("{}: dropped {dropped} non-numeric rows", origin.display());
    }
    if points.is_empty() {
        return Err(PeakError::format(
            origin,
            format!("no numeric rows in columns {x_column} and {y_column}"),
        ));
    }

    Ok(LoadedSeries {
        series: Series::from_points(points),
        metadata,
    })
}

/// Coerce one text cell to a finite number.
///
/// With [`DecimalMark::Comma`] every comma is taken as the decimal separator,
/// so the input is assumed to carry no thousands separators. Periods are
/// accepted in either mode. `NaN` and infinities count as failures.
pub fn parse_number(token: &str, decimal: DecimalMark) -> Option<f64> {
    let token = token.trim();
    let value = match decimal {
        DecimalMark::Period => token.parse::<f64>().ok()?,
        DecimalMark::Comma => token.replace(',', ".").parse::<f64>().ok()?,
    };
    value.is_finite().then_some(value)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn decode(bytes: &[u8], encoding: TextEncoding) -> Cow<'_, str> {
    match encoding {
        TextEncoding::Utf8 => UTF_8.decode_with_bom_removal(bytes).0,
        TextEncoding::Windows1252 => WINDOWS_1252.decode_without_bom_handling(bytes).0,
    }
}

fn skip_lines(text: &str, n: usize) -> &str {
    let mut rest = text;
    for _ in 0..n {
        match rest.find('\n') {
            Some(i) => rest = &rest[i + 1..],
            None => return "",
        }
    }
    rest
}

/// Returns the coerced `(x, y)` pairs and the number of rows dropped.
fn read_columns(
    body: &str,
    format: &SeriesFormat,
    x_column: usize,
    y_column: usize,
) -> Result<(Vec<(f64, f64)>, usize), csv::Error> {
    let coerce = |x: Option<&str>, y: Option<&str>| -> Option<(f64, f64)> {
        Some((
            parse_number(x?, format.decimal)?,
            parse_number(y?, format.decimal)?,
        ))
    };

    let mut points = Vec::new();
    let mut dropped = 0;

    match format.delimiter.byte() {
        Some(delimiter) => {
            let mut reader = csv::ReaderBuilder::new()
                .delimiter(delimiter)
                .has_headers(false)
                .flexible(true)
                .trim(csv::Trim::All)
                .comment(format.comment)
                .from_reader(body.as_bytes());
            for record in reader.records() {
                let record = record?;
                match coerce(record.get(x_column), record.get(y_column)) {
                    Some(point) => points.push(point),
                    None => dropped += 1,
                }
            }
        }
        None => {
            for line in body.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if let Some(c) = format.comment {
                    if line.as_bytes()[0] == c {
                        continue;
                    }
                }
                let fields: Vec<&str> = line.split_whitespace().collect();
                match coerce(
                    fields.get(x_column).copied(),
                    fields.get(y_column).copied(),
                ) {
                    Some(point) => points.push(point),
                    None => dropped += 1,
                }
            }
        }
    }

    Ok((points, dropped))
}

struct Preamble<'a> {
    metadata: Metadata,
    body: &'a str,
    x_column: usize,
    y_column: usize,
}

/// Walk the spectrometer header until the units line.
///
/// ```text
/// <info line>
/// Key: value          (any number)
/// Wave;Absorbance     (column names)
/// [nm];[A.U]          (units)
/// <data>
/// ```
fn split_preamble(text: &str) -> Result<Preamble<'_>, String> {
    let mut metadata = Metadata::new();
    let mut headers: Option<Vec<&str>> = None;
    let mut offset = 0;

    for (i, line) in text.split_inclusive('\n').enumerate() {
        offset += line.len();
        let trimmed = line.trim();
        if i == 0 {
            metadata.insert("Info".to_string(), trimmed.to_string());
        } else if let Some((key, value)) = trimmed.split_once(':') {
            metadata.insert(key.trim().to_string(), value.trim().to_string());
        } else if trimmed.contains("Wave") {
            headers = Some(trimmed.split(';').map(str::trim).collect());
        } else if trimmed.contains("[nm]") {
            let headers = headers.ok_or("no column header line containing 'Wave'")?;
            let columns: Vec<String> = headers
                .iter()
                .zip(trimmed.split(';').map(str::trim))
                .map(|(header, unit)| format!("{header} {unit}"))
                .collect();

            let x_column = columns
                .iter()
                .position(|c| c.contains("Wave"))
                .ok_or("no wavelength column")?;
            let y_column = columns
                .iter()
                .position(|c| c.contains("Absorbance") || c.contains("A.U"))
                .ok_or_else(|| format!("no absorbance column among {columns:?}"))?;
            debug!("UV-Vis columns {columns:?}, x={x_column} y={y_column}");

            return Ok(Preamble {
                metadata,
                body: &text[offset..],
                x_column,
                y_column,
            });
        }
    }

    Err(match headers {
        None => "no column header line containing 'Wave'".to_string(),
        Some(_) => "no units line containing '[nm]'".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const UV_VIS: &str = "\
Spectrum export v2
Sample: AE-512
Date: 2024-03-01 10:15
Operator: lab
Cuvette: 10 mm
Solvent: DMSO
Scans: 1
Mode: Absorbance
Wave;Absorbance
[nm];[A.U]
200,0;1,23
201,0;1,50
202,0;n/a
203,0;0,75
";

    fn origin() -> &'static Path {
        Path::new("test.txt")
    }

    #[test]
    fn comma_decimal_coercion() {
        assert_eq!(parse_number("1,23", DecimalMark::Comma), Some(1.23));
        assert_eq!(parse_number(" 4,5 ", DecimalMark::Comma), Some(4.5));
        assert_eq!(parse_number("2.5", DecimalMark::Comma), Some(2.5));
        assert_eq!(parse_number("1,23", DecimalMark::Period), None);
        assert_eq!(parse_number("NaN", DecimalMark::Period), None);
        assert_eq!(parse_number("inf", DecimalMark::Period), None);
        assert_eq!(parse_number("", DecimalMark::Period), None);
    }

    #[test]
    fn uv_vis_preamble_and_comma_decimals() {
        let loaded = parse_str(UV_VIS, &SeriesFormat::uv_vis(), origin()).unwrap();
        assert_eq!(loaded.series.x(), &[200.0, 201.0, 203.0]);
        assert_eq!(loaded.series.y(), &[1.23, 1.50, 0.75]);
        assert_eq!(loaded.metadata["Info"], "Spectrum export v2");
        assert_eq!(loaded.metadata["Sample"], "AE-512");
        assert_eq!(loaded.metadata["Date"], "2024-03-01 10:15");
    }

    #[test]
    fn uv_vis_columns_located_by_name() {
        let text = "info\nWave;Temp;Absorbance\n[nm];[C];[A.U]\n300,5;25;0,5\n";
        let loaded = parse_str(text, &SeriesFormat::uv_vis(), origin()).unwrap();
        assert_eq!(loaded.series.x(), &[300.5]);
        assert_eq!(loaded.series.y(), &[0.5]);
    }

    #[test]
    fn uv_vis_without_markers_is_format_error() {
        let err = parse_str("info\n1;2\n3;4\n", &SeriesFormat::uv_vis(), origin()).unwrap_err();
        assert!(matches!(err, PeakError::Format { ref reason, .. } if reason.contains("Wave")));

        let err = parse_str("info\nWave;Absorbance\n1;2\n", &SeriesFormat::uv_vis(), origin())
            .unwrap_err();
        assert!(matches!(err, PeakError::Format { ref reason, .. } if reason.contains("[nm]")));
    }

    #[test]
    fn ir_csv_skips_header_and_bad_rows() {
        let text = "cm-1,A\n4000.0,0.10\n3998.0,0.12\n3996.0,\nbad,0.3\n3994.0,0.11\n";
        let loaded = parse_str(text, &SeriesFormat::ir(), origin()).unwrap();
        assert_eq!(loaded.series.x(), &[4000.0, 3998.0, 3994.0]);
        assert_eq!(loaded.series.y(), &[0.10, 0.12, 0.11]);
        assert!(loaded.metadata.is_empty());
    }

    #[test]
    fn ms_whitespace_with_comments() {
        let text = "# m/z    Intensity\n550.1   120.0\n\n550.2\t 340.5\n# trailing\n550.3 90\n";
        let loaded = parse_str(text, &SeriesFormat::ms(), origin()).unwrap();
        assert_eq!(loaded.series.x(), &[550.1, 550.2, 550.3]);
        assert_eq!(loaded.series.y(), &[120.0, 340.5, 90.0]);
    }

    #[test]
    fn no_numeric_rows_is_format_error() {
        let err = parse_str("a,b\nc,d\n", &SeriesFormat::ir(), origin()).unwrap_err();
        assert!(matches!(err, PeakError::Format { .. }));
    }

    #[test]
    fn load_from_disk_and_missing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(UV_VIS.as_bytes()).unwrap();
        let loaded = load_file(file.path(), Domain::UvVis).unwrap();
        assert_eq!(loaded.series.len(), 3);

        let err = load_file(Path::new("does/not/exist.csv"), Domain::Ir).unwrap_err();
        assert!(matches!(err, PeakError::Io { .. }));
    }

    #[test]
    fn windows_1252_decoding() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // 0xB5 is MICRO SIGN in Windows-1252 and invalid on its own in UTF-8.
        file.write_all(b"info\nUnit: \xB5m\nWave;Absorbance\n[nm];[A.U]\n1,0;2,0\n")
            .unwrap();
        let mut format = SeriesFormat::uv_vis();
        format.encoding = TextEncoding::Windows1252;
        let loaded = load_series(file.path(), &format).unwrap();
        assert_eq!(loaded.metadata["Unit"], "\u{b5}m");
        assert_eq!(loaded.series.y(), &[2.0]);
    }
}
