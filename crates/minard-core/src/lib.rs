//! Minard combined chart: data loading, validation and chart layout.
//!
//! Pipeline:
//!   load → normalise → validate → records → scales → layout.
//! Drawing the layout is left to a backend (see the `chart` tool).

pub mod config;
pub mod error;
pub mod layout;
pub mod records;
pub mod route;
pub mod scale;
pub mod table;

pub use config::ChartConfig;
pub use error::{Error, Result};
pub use layout::{build_layout, ChartLayout};

use tracing::debug;

use records::{CityRecord, TemperatureRecord, TroopRecord};
use table::Table;

/// The three input tables after loading, normalisation and validation,
/// converted into typed records.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub troops: Vec<TroopRecord>,
    pub temperatures: Vec<TemperatureRecord>,
    pub cities: Vec<CityRecord>,
    /// True when the troops table carried both `group` and `direction`.
    pub troops_grouped: bool,
}

/// Load all three inputs named by `config`, failing on the first unreadable
/// file or missing required column. No drawing happens before this returns.
pub fn load_datasets(config: &ChartConfig) -> Result<Datasets> {
    let inputs = &config.inputs;

    let troops = prepare(&inputs.troops, "troops", records::TROOP_NUMERIC)?;
    let temps = prepare(&inputs.temperature, "temperature", records::TEMPERATURE_NUMERIC)?;
    let cities = prepare(&inputs.cities, "cities", records::CITY_NUMERIC)?;

    let troops_grouped = route::has_grouping(&troops);
    let datasets = Datasets {
        troops: records::troops_from_table(&troops),
        temperatures: records::temperatures_from_table(&temps),
        cities: records::cities_from_table(&cities),
        troops_grouped,
    };
    debug!(
        troops = datasets.troops.len(),
        temperatures = datasets.temperatures.len(),
        cities = datasets.cities.len(),
        grouped = troops_grouped,
        "datasets loaded"
    );
    Ok(datasets)
}

fn prepare(input: &config::InputSpec, name: &str, numeric: &[&str]) -> Result<Table> {
    let mut table = Table::load(&input.path, input.delimiter_byte()?)?;
    table.normalize_numeric(numeric);
    let required: Vec<&str> = input.required.iter().map(String::as_str).collect();
    table.require(name, &required)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        path
    }

    fn config(dir: &TempDir, troops: &str) -> ChartConfig {
        let mut config = ChartConfig::default();
        config.inputs.troops.path = write(dir, "troops.csv", troops);
        config.inputs.temperature.path =
            write(dir, "temps.csv", ",X,long,temp,date\n0,1,37.6,0,Oct18\n1,2,36.0,0,Oct24\n");
        config.inputs.cities.path = write(dir, "cities.csv", "long,lat,city\n37.6,55.8,Moscou\n");
        config
    }

    #[test]
    fn loads_and_lays_out_all_tables() {
        let dir = TempDir::new().unwrap();
        let config = config(
            &dir,
            "X,long,lat,survivors,direction,group\n1,30,55,400000,A,1\n2,31,54,300000,A,1\n",
        );
        let data = load_datasets(&config).unwrap();
        assert!(data.troops_grouped);
        assert_eq!(data.temperatures.len(), 2);
        assert_eq!(data.temperatures[1].date.as_deref(), Some("Oct24"));

        let layout = build_layout(&data, &config).unwrap();
        assert_eq!(layout.route.len(), 1);
        assert!((layout.route[0].width - 11.257).abs() < 1e-3);
        // Equal temperatures: the whole curve sits on the band midpoint.
        let mid = layout.temperature.band.midpoint();
        assert!(layout.temperature.runs[0].iter().all(|p| p.1 == mid));
    }

    #[test]
    fn missing_survivors_column_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, "long,lat\n30,55\n31,54\n");
        match load_datasets(&config) {
            Err(Error::MissingColumns { table, missing }) => {
                assert_eq!(table, "troops");
                assert_eq!(missing, vec!["survivors".to_string()]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn ungrouped_troops_form_one_route() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, "long,lat,survivors\n30,55,10\n31,54,8\n32,54,6\n");
        let data = load_datasets(&config).unwrap();
        assert!(!data.troops_grouped);
        let layout = build_layout(&data, &config).unwrap();
        assert_eq!(layout.route.len(), 2);
    }

    #[test]
    fn bundled_sample_data() {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data");
        let mut config = ChartConfig::from_json_file(&root.join("chart.json")).unwrap();
        config.inputs.troops.path = root.join("minard_troops.csv");
        config.inputs.temperature.path = root.join("minard_temperature.csv");
        config.inputs.cities.path = root.join("minard_cities.csv");
        config.validate().unwrap();

        let data = load_datasets(&config).unwrap();
        assert_eq!(data.troops.len(), 50);
        assert_eq!(data.temperatures.len(), 9);
        assert_eq!(data.cities.len(), 20);

        let layout = build_layout(&data, &config).unwrap();
        assert_eq!(layout.route.len(), 44);
        assert!(layout.route.iter().all(|s| (0.5..=12.0).contains(&s.width)));
        assert_eq!(layout.temperature.labels[3].text, "-21° Nov14");
        assert_eq!(layout.x_range, (23.5, 38.2));
    }
}
