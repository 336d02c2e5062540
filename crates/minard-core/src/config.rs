//! Run configuration: input files, required columns, output and geometry.
//!
//! Every field has a default reproducing the fixed behaviour of the chart;
//! a JSON file may override any subset of them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layout::MIN_PATTERN_LENGTH;
use crate::scale::{BAND_OFFSET, BAND_SPAN, MAX_LINEWIDTH, MIN_LINEWIDTH};

pub const DEFAULT_TROOPS_PATH: &str =
    "Data_from_Minard_s_famous_graphic_map_of_Napoleon_s_march_on_Moscow_900_85.csv";
pub const DEFAULT_TEMPERATURE_PATH: &str =
    "Data_from_Minard_s_famous_graphic_map_of_Napoleon_s_march_on_Moscow_899_95.csv";
pub const DEFAULT_CITIES_PATH: &str =
    "Data_from_Minard_s_famous_graphic_map_of_Napoleon_s_march_on_Moscow_898_15.csv";
pub const DEFAULT_OUTPUT: &str = "minard_combined_visualization_final.png";

pub const TROOPS_REQUIRED: &[&str] = &["long", "lat", "survivors"];
pub const TEMPERATURE_REQUIRED: &[&str] = &["long", "temp"];
pub const CITIES_REQUIRED: &[&str] = &["long", "lat", "city"];

/// One input table. An empty `path` or `required` list falls back to the
/// table's default when the configuration is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSpec {
    pub path: PathBuf,
    pub delimiter: char,
    pub required: Vec<String>,
}

impl Default for InputSpec {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            delimiter: ',',
            required: Vec::new(),
        }
    }
}

impl InputSpec {
    fn with_defaults(path: &str, required: &[&str]) -> Self {
        Self {
            path: PathBuf::from(path),
            required: required.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    fn fill(&mut self, path: &str, required: &[&str]) {
        if self.path.as_os_str().is_empty() {
            self.path = PathBuf::from(path);
        }
        if self.required.is_empty() {
            self.required = required.iter().map(|s| s.to_string()).collect();
        }
    }

    /// The delimiter as the single byte the csv reader expects.
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "delimiter {:?} is not a single ASCII character",
                    self.delimiter
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inputs {
    pub troops: InputSpec,
    pub temperature: InputSpec,
    pub cities: InputSpec,
}

impl Default for Inputs {
    fn default() -> Self {
        Self {
            troops: InputSpec::with_defaults(DEFAULT_TROOPS_PATH, TROOPS_REQUIRED),
            temperature: InputSpec::with_defaults(DEFAULT_TEMPERATURE_PATH, TEMPERATURE_REQUIRED),
            cities: InputSpec::with_defaults(DEFAULT_CITIES_PATH, CITIES_REQUIRED),
        }
    }
}

/// Padding (in data units) added around the route extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Padding {
    pub x: f64,
    pub below: f64,
    pub above: f64,
}

impl Default for Padding {
    fn default() -> Self {
        Self { x: 0.5, below: 0.5, above: 0.8 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub inputs: Inputs,
    pub output: PathBuf,
    pub dpi: u32,
    /// Figure width and height in inches.
    pub figure_size: (f64, f64),
    /// Stroke width range in points.
    pub linewidth_range: (f64, f64),
    pub band_offset: f64,
    pub band_span: f64,
    pub padding: Padding,
    /// Retreat dash and gap lengths, in longitude degrees.
    pub dash: (f64, f64),
    /// Temperature curve dot and gap lengths, in longitude degrees.
    pub dots: (f64, f64),
    /// Pixel offset of a city label from its marker (right, down).
    pub city_label_offset: (i32, i32),
    /// Pixel offset of a temperature label from its point (right, down).
    pub temperature_label_offset: (i32, i32),
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// TrueType fonts tried in order for chart text.
    pub font_paths: Vec<PathBuf>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            inputs: Inputs::default(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            dpi: 200,
            figure_size: (12.0, 6.0),
            linewidth_range: (MIN_LINEWIDTH, MAX_LINEWIDTH),
            band_offset: BAND_OFFSET,
            band_span: BAND_SPAN,
            padding: Padding::default(),
            dash: (0.12, 0.08),
            dots: (0.03, 0.07),
            city_label_offset: (14, -22),
            temperature_label_offset: (0, 18),
            title: "Napoleon's March on Moscow: Combined view (Troops + Cities + Temperature)"
                .to_string(),
            x_label: "Longitude".to_string(),
            y_label: "Latitude (temperature curve embedded below route)".to_string(),
            font_paths: default_font_paths(),
        }
    }
}

fn default_font_paths() -> Vec<PathBuf> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/Library/Fonts/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

impl ChartConfig {
    /// Parse a JSON configuration; absent fields keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(text)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.resolve();
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Replace empty input paths and required-column lists with the
    /// per-table defaults.
    pub fn resolve(&mut self) {
        self.inputs.troops.fill(DEFAULT_TROOPS_PATH, TROOPS_REQUIRED);
        self.inputs.temperature.fill(DEFAULT_TEMPERATURE_PATH, TEMPERATURE_REQUIRED);
        self.inputs.cities.fill(DEFAULT_CITIES_PATH, CITIES_REQUIRED);
    }

    /// Output size in pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        let (w, h) = self.figure_size;
        let dpi = self.dpi as f64;
        ((w * dpi).round() as u32, (h * dpi).round() as u32)
    }

    /// Convert a width in points to whole pixels at the configured DPI.
    pub fn points_to_pixels(&self, points: f64) -> u32 {
        ((points * self.dpi as f64 / 72.0).round() as u32).max(1)
    }

    /// Check the configuration before any input is read.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidConfig(msg));

        if self.dpi == 0 {
            return invalid("dpi must be positive".into());
        }
        let (w, h) = self.figure_size;
        if !(w > 0.0 && h > 0.0 && w.is_finite() && h.is_finite()) {
            return invalid(format!("figure size must be positive, got {w}x{h}"));
        }
        let (lo, hi) = self.linewidth_range;
        if !(lo.is_finite() && hi.is_finite() && lo >= 0.0 && lo < hi) {
            return invalid(format!(
                "linewidth range must satisfy 0 <= min < max, got [{lo}, {hi}]"
            ));
        }
        if !(self.band_span > 0.0 && self.band_span.is_finite() && self.band_offset.is_finite()) {
            return invalid("temperature band offset must be finite and span positive".into());
        }
        let p = self.padding;
        if ![p.x, p.below, p.above].iter().all(|v| v.is_finite() && *v >= 0.0) {
            return invalid("padding must be finite and non-negative".into());
        }
        for (name, (on, off)) in [("dash", self.dash), ("dots", self.dots)] {
            if !(on >= MIN_PATTERN_LENGTH && off >= 0.0 && on.is_finite() && off.is_finite()) {
                return invalid(format!(
                    "{name} length must be at least {MIN_PATTERN_LENGTH}, got {on}"
                ));
            }
        }
        for (table, input) in [
            ("troops", &self.inputs.troops),
            ("temperature", &self.inputs.temperature),
            ("cities", &self.inputs.cities),
        ] {
            if input.delimiter_byte().is_err() {
                return invalid(format!(
                    "{table} delimiter {:?} is not a single ASCII character",
                    input.delimiter
                ));
            }
            if input.required.is_empty() || input.required.iter().any(|c| c.trim().is_empty()) {
                return invalid(format!("{table} required columns must be non-empty names"));
            }
        }
        Ok(())
    }
}
