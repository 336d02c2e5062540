//! plotters renderer for a [`ChartLayout`].
//!
//! All geometry arrives precomputed in data coordinates; this module only
//! converts points to pixels, applies pixel-space label offsets and talks
//! to the backend.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use minard_core::layout::{LegendSymbol, StrokeStyle};
use minard_core::{ChartConfig, ChartLayout};
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{register_font, FontDesc, FontFamily, FontStyle};
use tracing::{debug, info, warn};

/// Default matplotlib blue, shared by every series.
const SERIES_COLOR: RGBColor = RGBColor(31, 119, 180);
const ROUTE_ALPHA: f64 = 0.85;
const MARK_ALPHA: f64 = 0.95;

// Font sizes and marker sizes in points.
const TITLE_PT: f64 = 12.0;
const AXIS_PT: f64 = 10.0;
const CITY_LABEL_PT: f64 = 8.0;
const TEMP_LABEL_PT: f64 = 7.0;
const LEGEND_PT: f64 = 9.0;
const CITY_MARKER_PT: f64 = 4.0;
const TEMP_MARKER_PT: f64 = 3.0;
const TEMP_LINE_PT: f64 = 1.5;
const LEGEND_LINE_PT: f64 = 3.0;

type Chart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Png,
    Svg,
}

impl ChartKind {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("svg") => ChartKind::Svg,
            _ => ChartKind::Png,
        }
    }
}

/// Render `layout` to `config.output`.
pub fn render(layout: &ChartLayout, config: &ChartConfig) -> Result<()> {
    let text = prepare_font(&config.font_paths);
    if !text {
        warn!("no usable font found; drawing chart without text");
    }
    let size = config.pixel_size();
    let path = config.output.as_path();
    debug!(width = size.0, height = size.1, path = %path.display(), "rendering");

    match ChartKind::for_path(path) {
        ChartKind::Png => {
            RenderContext::new(BitMapBackend::new(path, size), config, text).draw(layout)
        }
        ChartKind::Svg => {
            RenderContext::new(SVGBackend::new(path, size), config, text).draw(layout)
        }
    }
}

/// Register the first readable font in `paths` as the sans-serif family.
///
/// plotters keeps registered fonts in process-global state, so the outcome
/// is cached per path list: calling again with the same list reuses it, a
/// different list searches again. An empty list disables text.
fn prepare_font(paths: &[PathBuf]) -> bool {
    static REGISTERED: Mutex<Option<(Vec<PathBuf>, Option<PathBuf>)>> = Mutex::new(None);
    if paths.is_empty() {
        return false;
    }
    let mut cached = REGISTERED.lock().unwrap_or_else(|e| e.into_inner());
    if let Some((searched, found)) = cached.as_ref() {
        if searched.as_slice() == paths {
            return found.is_some();
        }
    }
    let found = register_first_font(paths);
    let usable = found.is_some();
    *cached = Some((paths.to_vec(), found));
    usable
}

fn register_first_font(paths: &[PathBuf]) -> Option<PathBuf> {
    for path in paths {
        let Ok(bytes) = std::fs::read(path) else {
            continue;
        };
        // plotters requires font data that lives for the rest of the process.
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        match register_font("sans-serif", FontStyle::Normal, bytes) {
            Ok(()) => {
                info!("Using font: {}", path.display());
                return Some(path.clone());
            }
            Err(_) => warn!("unusable font {}", path.display()),
        }
    }
    None
}

/// Drawing state for one chart: the root area, the configuration and
/// whether text can be drawn. Consumed by [`draw`](Self::draw).
pub struct RenderContext<'c, DB: DrawingBackend> {
    root: DrawingArea<DB, Shift>,
    config: &'c ChartConfig,
    text: bool,
}

impl<'c, DB> RenderContext<'c, DB>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    pub fn new(backend: DB, config: &'c ChartConfig, text: bool) -> Self {
        Self {
            root: backend.into_drawing_area(),
            config,
            text,
        }
    }

    fn px(&self, points: f64) -> u32 {
        self.config.points_to_pixels(points)
    }

    fn font(&self, points: f64) -> FontDesc<'static> {
        FontDesc::new(FontFamily::SansSerif, self.px(points) as f64, FontStyle::Normal)
    }

    /// Draw every layer in order and flush the image.
    pub fn draw(self, layout: &ChartLayout) -> Result<()> {
        self.root.fill(&WHITE)?;

        let mut builder = ChartBuilder::on(&self.root);
        builder.margin(self.px(8.0));
        if self.text {
            builder
                .caption(&layout.title, self.font(TITLE_PT))
                .x_label_area_size(self.px(30.0))
                .y_label_area_size(self.px(40.0));
        }
        let mut chart = builder.build_cartesian_2d(
            layout.x_range.0..layout.x_range.1,
            layout.y_range.0..layout.y_range.1,
        )?;

        {
            let mut mesh = chart.configure_mesh();
            mesh.light_line_style(WHITE).bold_line_style(BLACK.mix(0.2));
            if self.text {
                mesh.x_desc(layout.x_label.as_str())
                    .y_desc(layout.y_label.as_str())
                    .label_style(self.font(AXIS_PT))
                    .axis_desc_style(self.font(AXIS_PT));
            }
            mesh.draw()?;
        }

        self.draw_legend_references(&mut chart, layout)?;
        self.draw_route(&mut chart, layout)?;
        self.draw_cities(&mut chart, layout)?;
        self.draw_temperature(&mut chart, layout)?;

        if self.text {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK.mix(0.3))
                .label_font(self.font(LEGEND_PT))
                .draw()?;
        }

        self.root.present()?;
        Ok(())
    }

    /// Empty series that only carry the advance/retreat legend styles.
    fn draw_legend_references<'a>(
        &self,
        chart: &mut Chart<'a, DB>,
        layout: &ChartLayout,
    ) -> Result<()>
    where
        DB: 'a,
    {
        let width = self.px(LEGEND_LINE_PT);
        let color = SERIES_COLOR.mix(ROUTE_ALPHA);
        for entry in &layout.legend {
            let LegendSymbol::Line(style) = entry.symbol else {
                continue;
            };
            let anno = chart.draw_series(LineSeries::new(
                std::iter::empty::<(f64, f64)>(),
                color.stroke_width(width),
            ))?;
            anno.label(entry.label.as_str());
            match style {
                StrokeStyle::Solid => {
                    anno.legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 30, y)], color.stroke_width(width))
                    });
                }
                _ => {
                    anno.legend(move |(x, y)| {
                        EmptyElement::at((x, y))
                            + PathElement::new(vec![(0, 0), (8, 0)], color.stroke_width(width))
                            + PathElement::new(vec![(11, 0), (19, 0)], color.stroke_width(width))
                            + PathElement::new(vec![(22, 0), (30, 0)], color.stroke_width(width))
                    });
                }
            }
        }
        Ok(())
    }

    fn draw_route<'a>(&self, chart: &mut Chart<'a, DB>, layout: &ChartLayout) -> Result<()>
    where
        DB: 'a,
    {
        let color = SERIES_COLOR.mix(ROUTE_ALPHA);
        for stroke in &layout.route {
            let width = self.px(stroke.width);
            chart.draw_series(
                stroke
                    .pieces
                    .iter()
                    .map(move |p| PathElement::new(vec![p[0], p[1]], color.stroke_width(width))),
            )?;
        }
        Ok(())
    }

    fn draw_cities<'a>(&self, chart: &mut Chart<'a, DB>, layout: &ChartLayout) -> Result<()>
    where
        DB: 'a,
    {
        let color = SERIES_COLOR.mix(MARK_ALPHA);
        let size = self.px(CITY_MARKER_PT);
        let anno = chart.draw_series(
            layout
                .cities
                .iter()
                .map(|c| TriangleMarker::new(c.position, size, color.filled())),
        )?;
        if let Some(label) = legend_label(layout, LegendSymbol::Triangle) {
            anno.label(label)
                .legend(move |(x, y)| TriangleMarker::new((x + 15, y), size, color.filled()));
        }

        if self.text {
            let font = self.font(CITY_LABEL_PT);
            let offset = self.config.city_label_offset;
            chart.draw_series(layout.cities.iter().map(|c| {
                EmptyElement::at(c.position) + Text::new(c.name.clone(), offset, font.clone())
            }))?;
        }
        Ok(())
    }

    fn draw_temperature<'a>(&self, chart: &mut Chart<'a, DB>, layout: &ChartLayout) -> Result<()>
    where
        DB: 'a,
    {
        let track = &layout.temperature;
        let color = SERIES_COLOR.mix(MARK_ALPHA);
        let width = self.px(TEMP_LINE_PT);
        let radius = self.px(TEMP_MARKER_PT);

        let anno = chart.draw_series(
            track
                .dots
                .iter()
                .map(move |p| PathElement::new(vec![p[0], p[1]], color.stroke_width(width))),
        )?;
        if let Some(label) = legend_label(layout, LegendSymbol::DottedWithMarker) {
            anno.label(label).legend(move |(x, y)| {
                EmptyElement::at((x, y))
                    + PathElement::new(vec![(0, 0), (3, 0)], color.stroke_width(width))
                    + PathElement::new(vec![(9, 0), (12, 0)], color.stroke_width(width))
                    + Circle::new((15, 0), radius, color.filled())
                    + PathElement::new(vec![(18, 0), (21, 0)], color.stroke_width(width))
                    + PathElement::new(vec![(27, 0), (30, 0)], color.stroke_width(width))
            });
        }

        chart.draw_series(
            track
                .runs
                .iter()
                .flatten()
                .map(|p| Circle::new(*p, radius, color.filled())),
        )?;

        if self.text {
            let style =
                TextStyle::from(self.font(TEMP_LABEL_PT)).pos(Pos::new(HPos::Center, VPos::Top));
            let offset = self.config.temperature_label_offset;
            chart.draw_series(track.labels.iter().map(|l| {
                EmptyElement::at(l.anchor) + Text::new(l.text.clone(), offset, style.clone())
            }))?;
        }
        Ok(())
    }
}

fn legend_label(layout: &ChartLayout, symbol: LegendSymbol) -> Option<&str> {
    layout
        .legend
        .iter()
        .find(|e| e.symbol == symbol)
        .map(|e| e.label.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use minard_core::layout::build_layout;
    use minard_core::records::{CityRecord, Direction, TemperatureRecord, TroopRecord};
    use minard_core::Datasets;
    use tempfile::TempDir;

    fn datasets() -> Datasets {
        let troop = |seq: f64, long: f64, lat: f64, surv: f64, dir: Direction| TroopRecord {
            longitude: long,
            latitude: lat,
            survivors: surv,
            group: Some(1.0),
            direction: Some(dir),
            sequence: Some(seq),
        };
        Datasets {
            troops: vec![
                troop(1.0, 24.0, 54.9, 340_000.0, Direction::Advance),
                troop(2.0, 37.6, 55.8, 100_000.0, Direction::Advance),
                troop(3.0, 37.7, 55.7, 100_000.0, Direction::Retreat),
                troop(4.0, 24.1, 54.4, 4_000.0, Direction::Retreat),
            ],
            temperatures: vec![
                TemperatureRecord {
                    longitude: 37.6,
                    temperature: 0.0,
                    date: Some("Oct18".into()),
                    days: Some(6.0),
                    sequence: Some(1.0),
                },
                TemperatureRecord {
                    longitude: 26.7,
                    temperature: -30.0,
                    date: None,
                    days: None,
                    sequence: Some(2.0),
                },
            ],
            cities: vec![CityRecord {
                longitude: 37.6,
                latitude: 55.8,
                name: "Moscou".into(),
                sequence: None,
            }],
            troops_grouped: true,
        }
    }

    fn config(dir: &TempDir, file: &str) -> ChartConfig {
        let mut config = ChartConfig::default();
        config.output = dir.path().join(file);
        config.dpi = 40;
        config.font_paths.clear();
        config
    }

    /// A font from `MINARD_TEST_FONT` or the default search list, when the
    /// machine has one.
    fn font_config(dir: &TempDir, file: &str) -> Option<ChartConfig> {
        let mut config = config(dir, file);
        config.font_paths = std::env::var_os("MINARD_TEST_FONT")
            .map(PathBuf::from)
            .into_iter()
            .chain(ChartConfig::default().font_paths)
            .collect();
        prepare_font(&config.font_paths).then_some(config)
    }

    #[test]
    fn chart_kind_follows_extension() {
        assert_eq!(ChartKind::for_path(Path::new("a.svg")), ChartKind::Svg);
        assert_eq!(ChartKind::for_path(Path::new("a.SVG")), ChartKind::Svg);
        assert_eq!(ChartKind::for_path(Path::new("a.png")), ChartKind::Png);
        assert_eq!(ChartKind::for_path(Path::new("chart")), ChartKind::Png);
    }

    #[test]
    fn png_has_configured_size() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, "chart.png");
        let layout = build_layout(&datasets(), &config).unwrap();
        render(&layout, &config).unwrap();

        let img = image::open(&config.output).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (480, 240));
        // Something other than background was drawn.
        assert!(img.pixels().any(|p| p.0 != [255, 255, 255]));
    }

    #[test]
    fn svg_output() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, "chart.svg");
        let layout = build_layout(&datasets(), &config).unwrap();
        render(&layout, &config).unwrap();

        let svg = std::fs::read_to_string(&config.output).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("<polyline") || svg.contains("<path") || svg.contains("<line"));
    }

    #[test]
    fn empty_font_list_disables_text() {
        assert!(!prepare_font(&[]));
    }

    #[test]
    fn text_layers_render_with_a_font() {
        let dir = TempDir::new().unwrap();
        let Some(mut config) = font_config(&dir, "chart.png") else {
            eprintln!("no font found; set MINARD_TEST_FONT to cover chart text");
            return;
        };
        let layout = build_layout(&datasets(), &config).unwrap();
        render(&layout, &config).unwrap();
        let img = image::open(&config.output).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (480, 240));
        assert!(img.pixels().any(|p| p.0 != [255, 255, 255]));

        config.output = dir.path().join("chart.svg");
        render(&layout, &config).unwrap();
        let svg = std::fs::read_to_string(&config.output).unwrap();
        assert!(svg.contains("<text"));
        assert!(svg.contains("Moscou"));
        assert!(svg.contains("Oct18"));
        assert!(svg.contains("Advance"));
    }

    #[test]
    fn font_search_follows_the_path_list() {
        let dir = TempDir::new().unwrap();
        let garbage = dir.path().join("broken.ttf");
        std::fs::write(&garbage, b"not a font").unwrap();
        let broken = vec![dir.path().join("missing.ttf"), garbage];
        assert!(!prepare_font(&broken));

        if let Some(config) = font_config(&dir, "chart.png") {
            assert!(prepare_font(&config.font_paths));
            assert!(!prepare_font(&broken));
        }
    }
}
