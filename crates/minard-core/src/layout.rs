//! Backend-independent chart layout.
//!
//! Everything the renderer draws is computed here in data coordinates:
//! route strokes with widths in points, city markers, the temperature track
//! and its labels, axis limits and legend entries. Pixel-space concerns
//! (label offsets, point → pixel conversion) stay with the renderer.

use serde::Serialize;
use tracing::debug;

use crate::config::ChartConfig;
use crate::error::{Error, Result};
use crate::records::{Direction, TemperatureRecord};
use crate::route::{self, Segment};
use crate::scale::{LinewidthScale, TemperatureBand};
use crate::Datasets;

pub type Point = (f64, f64);

/// Shortest dash or dot, in data units (degrees). Anything shorter would
/// produce a piece per float step along a segment.
pub const MIN_PATTERN_LENGTH: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeStyle {
    Solid,
    Dashed,
    Dotted,
}

impl From<Direction> for StrokeStyle {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Advance => StrokeStyle::Solid,
            Direction::Retreat => StrokeStyle::Dashed,
        }
    }
}

/// One route segment, already cut into dashes when its style asks for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStroke {
    /// Width in points.
    pub width: f64,
    pub style: StrokeStyle,
    pub pieces: Vec<[Point; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityMark {
    pub position: Point,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextLabel {
    pub anchor: Point,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureTrack {
    pub band: TemperatureBand,
    /// Mapped points, in sequence order, split wherever a value is missing.
    pub runs: Vec<Vec<Point>>,
    /// Dotted rendering of `runs`.
    pub dots: Vec<[Point; 2]>,
    pub labels: Vec<TextLabel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LegendSymbol {
    Line(StrokeStyle),
    Triangle,
    DottedWithMarker,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub symbol: LegendSymbol,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartLayout {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub linewidth: LinewidthScale,
    pub route: Vec<RouteStroke>,
    pub cities: Vec<CityMark>,
    pub temperature: TemperatureTrack,
    pub legend: Vec<LegendEntry>,
}

/// Compute the full layout. Fails with [`Error::NoRoute`] when no troop
/// position has finite coordinates, since the axis limits derive from them.
pub fn build_layout(data: &Datasets, config: &ChartConfig) -> Result<ChartLayout> {
    let (lon_min, lon_max) =
        finite_extent(data.troops.iter().map(|t| t.longitude)).ok_or(Error::NoRoute)?;
    let (lat_min, lat_max) =
        finite_extent(data.troops.iter().map(|t| t.latitude)).ok_or(Error::NoRoute)?;

    let (min_w, max_w) = config.linewidth_range;
    let max_survivors =
        LinewidthScale::from_survivors(data.troops.iter().map(|t| t.survivors)).max_survivors;
    let linewidth = LinewidthScale::new(min_w, max_w, max_survivors);

    let segments = route::segments(&data.troops, data.troops_grouped, &linewidth);
    let total = segments.len();
    let route: Vec<RouteStroke> = segments
        .into_iter()
        .filter(Segment::is_drawable)
        .map(|seg| stroke(&seg, config.dash))
        .collect();
    if route.len() < total {
        debug!(skipped = total - route.len(), "route segments with missing values skipped");
    }

    let cities = data
        .cities
        .iter()
        .filter(|c| c.longitude.is_finite() && c.latitude.is_finite())
        .map(|c| CityMark {
            position: (c.longitude, c.latitude),
            name: c.name.clone(),
        })
        .collect();

    let band = TemperatureBand::below(
        lat_min,
        config.band_offset,
        config.band_span,
        data.temperatures.iter().map(|t| t.temperature),
    );
    if band.is_degenerate() {
        debug!(t_min = band.t_min, "temperature range is flat; placing curve at band midpoint");
    }
    let temperature = temperature_track(&data.temperatures, band, config.dots);

    let pad = config.padding;
    Ok(ChartLayout {
        title: config.title.clone(),
        x_label: config.x_label.clone(),
        y_label: config.y_label.clone(),
        x_range: (lon_min - pad.x, lon_max + pad.x),
        y_range: (band.base - pad.below, lat_max + pad.above),
        linewidth,
        route,
        cities,
        temperature,
        legend: legend(),
    })
}

fn stroke(seg: &Segment, dash: (f64, f64)) -> RouteStroke {
    let style = StrokeStyle::from(seg.direction);
    let pieces = match style {
        StrokeStyle::Solid => vec![[seg.from, seg.to]],
        _ => dash_pattern(seg.from, seg.to, dash.0, dash.1),
    };
    RouteStroke {
        width: seg.width,
        style,
        pieces,
    }
}

fn temperature_track(
    records: &[TemperatureRecord],
    band: TemperatureBand,
    dots: (f64, f64),
) -> TemperatureTrack {
    let mut runs: Vec<Vec<Point>> = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    let mut labels = Vec::new();

    for r in records {
        let y = band.to_y(r.temperature);
        if !(r.longitude.is_finite() && y.is_finite()) {
            if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push((r.longitude, y));
        labels.push(TextLabel {
            anchor: (r.longitude, y),
            text: temperature_label(r.temperature, r.date.as_deref()),
        });
    }
    if !current.is_empty() {
        runs.push(current);
    }

    let dots = runs
        .iter()
        .flat_map(|run| run.windows(2).flat_map(|w| dash_pattern(w[0], w[1], dots.0, dots.1)))
        .collect();

    TemperatureTrack { band, runs, dots, labels }
}

/// `"-21° Nov14"`: the integer part of the temperature (truncated toward
/// zero) and the date when there is one.
pub fn temperature_label(temperature: f64, date: Option<&str>) -> String {
    let degrees = temperature.trunc() as i64;
    format!("{degrees}° {}", date.unwrap_or("")).trim().to_string()
}

/// Cut the line `from → to` into dashes `on` long separated by gaps `off`
/// long, measured in data units along the line. The last dash is clipped at
/// `to`. A zero-length line yields nothing; a dash shorter than
/// [`MIN_PATTERN_LENGTH`] or a missing gap draws the line solid.
pub fn dash_pattern(from: Point, to: Point, on: f64, off: f64) -> Vec<[Point; 2]> {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let len = dx.hypot(dy);
    if !(len > 0.0) {
        return Vec::new();
    }
    if !(on >= MIN_PATTERN_LENGTH) || !(off > 0.0) || !(on + off).is_finite() {
        return vec![[from, to]];
    }
    let at = |d: f64| (from.0 + dx * d / len, from.1 + dy * d / len);

    let mut pieces = Vec::with_capacity((len / (on + off)).ceil() as usize + 1);
    let mut start = 0.0;
    while start < len {
        let end = (start + on).min(len);
        pieces.push([at(start), if end == len { to } else { at(end) }]);
        start += on + off;
    }
    pieces
}

fn finite_extent(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn legend() -> Vec<LegendEntry> {
    vec![
        LegendEntry {
            label: "Advance (solid)".into(),
            symbol: LegendSymbol::Line(StrokeStyle::Solid),
        },
        LegendEntry {
            label: "Retreat (dashed)".into(),
            symbol: LegendSymbol::Line(StrokeStyle::Dashed),
        },
        LegendEntry {
            label: "Cities".into(),
            symbol: LegendSymbol::Triangle,
        },
        LegendEntry {
            label: "Temperature (dotted)".into(),
            symbol: LegendSymbol::DottedWithMarker,
        },
    ]
}
