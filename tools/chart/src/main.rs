//! Minard combined chart: troop route, cities and temperature on one set of
//! axes, written as a PNG (or SVG, by extension).
//!
//! Reads three delimited files, validates their columns, lays the chart out
//! and renders it. Any failure aborts the run.

mod render;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueHint};
use minard_core::{build_layout, load_datasets, ChartConfig};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "minard-chart",
    version,
    about = "Render Minard's march on Moscow (troops + cities + temperature) as one chart"
)]
struct Args {
    /// JSON configuration file; absent fields keep their defaults
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Troop movement table (long, lat, survivors[, group, direction, X])
    #[arg(long, value_hint = ValueHint::FilePath)]
    troops: Option<PathBuf>,

    /// Temperature table (long, temp[, date, X])
    #[arg(long, value_hint = ValueHint::FilePath)]
    temperature: Option<PathBuf>,

    /// City table (long, lat, city)
    #[arg(long, value_hint = ValueHint::FilePath)]
    cities: Option<PathBuf>,

    /// Output image; `.svg` selects SVG, anything else PNG
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Output resolution in dots per inch
    #[arg(long)]
    dpi: Option<u32>,

    /// Also write the computed chart layout as JSON
    #[arg(long, value_hint = ValueHint::FilePath)]
    dump_layout: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = resolve_config(&args)?;
    run(&config, args.dump_layout.as_deref())
}

/// Defaults, then the config file, then command-line overrides.
fn resolve_config(args: &Args) -> Result<ChartConfig> {
    let mut config = match &args.config {
        Some(path) => ChartConfig::from_json_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => ChartConfig::default(),
    };
    if let Some(p) = &args.troops {
        config.inputs.troops.path = p.clone();
    }
    if let Some(p) = &args.temperature {
        config.inputs.temperature.path = p.clone();
    }
    if let Some(p) = &args.cities {
        config.inputs.cities.path = p.clone();
    }
    if let Some(p) = &args.output {
        config.output = p.clone();
    }
    if let Some(dpi) = args.dpi {
        config.dpi = dpi;
    }
    Ok(config)
}

/// Load → lay out → render. Nothing is drawn unless every input loads and
/// validates.
fn run(config: &ChartConfig, dump_layout: Option<&Path>) -> Result<()> {
    config.validate()?;
    debug!(?config, "configuration");

    let data = load_datasets(config)?;
    let layout = build_layout(&data, config)?;
    info!(
        segments = layout.route.len(),
        cities = layout.cities.len(),
        temperatures = layout.temperature.labels.len(),
        "layout ready"
    );

    if let Some(path) = dump_layout {
        let json = serde_json::to_string_pretty(&layout)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing layout {}", path.display()))?;
        info!("Wrote layout: {}", path.display());
    }

    render::render(&layout, config)
        .with_context(|| format!("rendering {}", config.output.display()))?;
    info!("Saved: {}", config.output.display());
    Ok(())
}
