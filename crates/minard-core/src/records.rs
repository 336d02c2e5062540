//! Typed rows of the three input tables.
//!
//! Numeric fields hold `NaN` where the source cell was missing or
//! unparseable, so later arithmetic propagates "missing".

use serde::Serialize;

use crate::table::Table;

/// Columns coerced to numbers in each table.
pub const TROOP_NUMERIC: &[&str] = &["X", "long", "lat", "survivors", "group"];
pub const TEMPERATURE_NUMERIC: &[&str] = &["X", "long", "temp", "days"];
pub const CITY_NUMERIC: &[&str] = &["X", "long", "lat"];

/// Sequence column shared by all three tables.
pub const SEQUENCE_COLUMN: &str = "X";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Advance,
    Retreat,
}

impl Direction {
    /// `A…` (any case) is an advance, any other non-empty value a retreat.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let first = s.chars().next()?;
        if first.eq_ignore_ascii_case(&'a') {
            Some(Direction::Advance)
        } else {
            Some(Direction::Retreat)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TroopRecord {
    pub longitude: f64,
    pub latitude: f64,
    pub survivors: f64,
    pub group: Option<f64>,
    pub direction: Option<Direction>,
    pub sequence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CityRecord {
    pub longitude: f64,
    pub latitude: f64,
    pub name: String,
    pub sequence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureRecord {
    pub longitude: f64,
    pub temperature: f64,
    pub date: Option<String>,
    pub days: Option<f64>,
    pub sequence: Option<f64>,
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

fn optional_numbers(table: &Table, name: &str) -> Vec<Option<f64>> {
    match table.numbers(name) {
        Some(v) => v.into_iter().map(finite).collect(),
        None => vec![None; table.n_rows()],
    }
}

fn required_numbers(table: &Table, name: &str) -> Vec<f64> {
    table
        .numbers(name)
        .unwrap_or_else(|| vec![f64::NAN; table.n_rows()])
}

fn optional_texts(table: &Table, name: &str) -> Vec<Option<String>> {
    match table.texts(name) {
        Some(v) => v.into_iter().map(|s| (!s.is_empty()).then_some(s)).collect(),
        None => vec![None; table.n_rows()],
    }
}

pub fn troops_from_table(table: &Table) -> Vec<TroopRecord> {
    let long = required_numbers(table, "long");
    let lat = required_numbers(table, "lat");
    let survivors = required_numbers(table, "survivors");
    let group = optional_numbers(table, "group");
    let direction = optional_texts(table, "direction");
    let seq = optional_numbers(table, SEQUENCE_COLUMN);

    (0..table.n_rows())
        .map(|i| TroopRecord {
            longitude: long[i],
            latitude: lat[i],
            survivors: survivors[i],
            group: group[i],
            direction: direction[i].as_deref().and_then(Direction::parse),
            sequence: seq[i],
        })
        .collect()
}

/// Temperature rows, ordered by the sequence column when it exists.
pub fn temperatures_from_table(table: &Table) -> Vec<TemperatureRecord> {
    let long = required_numbers(table, "long");
    let temp = required_numbers(table, "temp");
    let date = optional_texts(table, "date");
    let days = optional_numbers(table, "days");
    let seq = optional_numbers(table, SEQUENCE_COLUMN);

    let mut rows: Vec<TemperatureRecord> = (0..table.n_rows())
        .map(|i| TemperatureRecord {
            longitude: long[i],
            temperature: temp[i],
            date: date[i].clone(),
            days: days[i],
            sequence: seq[i],
        })
        .collect();
    if table.has_column(SEQUENCE_COLUMN) {
        rows.sort_by(|a, b| cmp_sequence(a.sequence, b.sequence));
    }
    rows
}

/// City rows, ordered by the sequence column when it exists.
pub fn cities_from_table(table: &Table) -> Vec<CityRecord> {
    let long = required_numbers(table, "long");
    let lat = required_numbers(table, "lat");
    let names = table
        .texts("city")
        .unwrap_or_else(|| vec![String::new(); table.n_rows()]);
    let seq = optional_numbers(table, SEQUENCE_COLUMN);

    let mut rows: Vec<CityRecord> = (0..table.n_rows())
        .map(|i| CityRecord {
            longitude: long[i],
            latitude: lat[i],
            name: names[i].clone(),
            sequence: seq[i],
        })
        .collect();
    if table.has_column(SEQUENCE_COLUMN) {
        rows.sort_by(|a, b| cmp_sequence(a.sequence, b.sequence));
    }
    rows
}

/// Ascending order with missing keys last. Used with stable sorts so rows
/// sharing a key keep their file order.
pub fn cmp_sequence(a: Option<f64>, b: Option<f64>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(text: &str, numeric: &[&str]) -> Table {
        let mut t = Table::from_reader(text.as_bytes(), b',').unwrap();
        t.normalize_numeric(numeric);
        t
    }

    #[test]
    fn direction_parsing() {
        assert_eq!(Direction::parse("A"), Some(Direction::Advance));
        assert_eq!(Direction::parse("advance"), Some(Direction::Advance));
        assert_eq!(Direction::parse("R"), Some(Direction::Retreat));
        assert_eq!(Direction::parse("x"), Some(Direction::Retreat));
        assert_eq!(Direction::parse("  "), None);
    }

    #[test]
    fn troop_rows_keep_missing_as_nan() {
        let t = load(
            "X,long,lat,survivors,direction,group\n1,24.0,54.9,340000,A,1\n2,24.5,55.0,n/a,R,\n",
            TROOP_NUMERIC,
        );
        let rows = troops_from_table(&t);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].group, Some(1.0));
        assert_eq!(rows[0].direction, Some(Direction::Advance));
        assert!(rows[1].survivors.is_nan());
        assert_eq!(rows[1].group, None);
        assert_eq!(rows[1].direction, Some(Direction::Retreat));
        assert_eq!(rows[1].sequence, Some(2.0));
    }

    #[test]
    fn temperatures_sorted_by_sequence_with_missing_last() {
        let t = load(
            "X,long,temp,date\n3,33.2,-9,Nov09\n,30.0,-1,\n1,37.6,0,Oct18\n",
            TEMPERATURE_NUMERIC,
        );
        let rows = temperatures_from_table(&t);
        let longs: Vec<f64> = rows.iter().map(|r| r.longitude).collect();
        assert_eq!(longs, vec![37.6, 33.2, 30.0]);
        assert_eq!(rows[0].date.as_deref(), Some("Oct18"));
        assert_eq!(rows[2].date, None);
    }

    #[test]
    fn cities_without_sequence_keep_file_order() {
        let t = load("long,lat,city\n37.6,55.8,Moscou\n24.0,55.0,Kowno\n", CITY_NUMERIC);
        let rows = cities_from_table(&t);
        assert_eq!(rows[0].name, "Moscou");
        assert_eq!(rows[1].name, "Kowno");
    }
}
