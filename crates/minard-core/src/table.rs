//! Delimited-table loading, numeric normalisation and column validation.
//!
//! A `Table` is a list of named columns of equal length. Columns start out
//! as text and are converted in place by [`Table::normalize_numeric`].

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

/// Header given to an unnamed leading row-index column by pandas.
pub const PANDAS_INDEX_COLUMN: &str = "Unnamed: 0";

#[derive(Debug, Clone, PartialEq)]
pub enum Cells {
    Text(Vec<String>),
    /// `None` marks a value that could not be parsed as a number.
    Numeric(Vec<Option<f64>>),
}

impl Cells {
    fn len(&self) -> usize {
        match self {
            Cells::Text(v) => v.len(),
            Cells::Numeric(v) => v.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Cells,
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Read a delimited file with a header row.
    pub fn load(path: &Path, delimiter: u8) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(file, delimiter).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            path = %path.display(),
            rows = table.n_rows,
            columns = table.columns.len(),
            "loaded table"
        );
        Ok(table)
    }

    /// Parse delimited text. A spurious row-index column (see
    /// [`is_index_header`]) is dropped.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self, csv::Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_owned).collect();
        let mut data: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        let mut n_rows = 0;
        for record in rdr.records() {
            let record = record?;
            for (col, field) in data.iter_mut().zip(record.iter()) {
                col.push(field.to_owned());
            }
            n_rows += 1;
        }

        let columns = headers
            .into_iter()
            .zip(data)
            .enumerate()
            .filter(|(i, (name, _))| !is_index_header(*i, name))
            .map(|(_, (name, cells))| Column { name, cells: Cells::Text(cells) })
            .collect();

        Ok(Self { columns, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Convert each named column that is present to numeric cells.
    /// Unparseable or empty cells become `None`; absent names are ignored.
    pub fn normalize_numeric(&mut self, names: &[&str]) {
        for col in self.columns.iter_mut().filter(|c| names.contains(&c.name.as_str())) {
            if let Cells::Text(values) = &col.cells {
                let parsed: Vec<Option<f64>> = values.iter().map(|s| parse_number(s)).collect();
                let missing = parsed.iter().filter(|v| v.is_none()).count();
                if missing > 0 {
                    debug!(column = %col.name, missing, "non-numeric cells treated as missing");
                }
                col.cells = Cells::Numeric(parsed);
            }
        }
    }

    /// Fail with [`Error::MissingColumns`] if any of `required` is absent.
    pub fn require(&self, table: &str, required: &[&str]) -> Result<()> {
        let mut missing: Vec<String> = required
            .iter()
            .filter(|name| !self.has_column(name))
            .map(|name| name.to_string())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        missing.dedup();
        Err(Error::MissingColumns {
            table: table.to_owned(),
            missing,
        })
    }

    /// Values of a column as `f64`, with `NaN` for missing cells.
    /// Text columns are parsed on the fly.
    pub fn numbers(&self, name: &str) -> Option<Vec<f64>> {
        let col = self.column(name)?;
        let values = match &col.cells {
            Cells::Numeric(v) => v.iter().map(|x| x.unwrap_or(f64::NAN)).collect(),
            Cells::Text(v) => v.iter().map(|s| parse_number(s).unwrap_or(f64::NAN)).collect(),
        };
        Some(values)
    }

    /// Values of a column as text. Missing numeric cells become empty strings.
    pub fn texts(&self, name: &str) -> Option<Vec<String>> {
        let col = self.column(name)?;
        let values = match &col.cells {
            Cells::Text(v) => v.clone(),
            Cells::Numeric(v) => v
                .iter()
                .map(|x| x.map(|n| n.to_string()).unwrap_or_default())
                .collect(),
        };
        debug_assert_eq!(values.len(), col.cells.len());
        Some(values)
    }
}

/// True for the header of a row-index column written by a dataframe export:
/// pandas' `Unnamed: 0`, or an empty name in the first position.
pub fn is_index_header(position: usize, name: &str) -> bool {
    name == PANDAS_INDEX_COLUMN || (position == 0 && name.is_empty())
}

fn parse_number(s: &str) -> Option<f64> {
    let v: f64 = s.trim().parse().ok()?;
    (!v.is_nan()).then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(text: &str) -> Table {
        Table::from_reader(text.as_bytes(), b',').unwrap()
    }

    #[test]
    fn drops_pandas_index_column() {
        let t = table("Unnamed: 0,long,lat\n0,24.0,54.9\n1,24.5,55.0\n");
        let names: Vec<&str> = t.column_names().collect();
        assert_eq!(names, vec!["long", "lat"]);
        assert_eq!(t.n_rows(), 2);
    }

    #[test]
    fn drops_leading_unnamed_column() {
        let t = table(",X,long\n1,1,24.0\n");
        let names: Vec<&str> = t.column_names().collect();
        assert_eq!(names, vec!["X", "long"]);
    }

    #[test]
    fn normalize_turns_garbage_into_missing() {
        let mut t = table("long,city\n24.0,Kowno\nabc,Wilna\n,Minsk\n");
        t.normalize_numeric(&["long", "city_absent"]);
        match &t.column("long").unwrap().cells {
            Cells::Numeric(v) => assert_eq!(v, &vec![Some(24.0), None, None]),
            other => panic!("expected numeric cells, got {other:?}"),
        }
        // Untouched column stays text.
        assert!(matches!(t.column("city").unwrap().cells, Cells::Text(_)));
        let longs = t.numbers("long").unwrap();
        assert_eq!(longs[0], 24.0);
        assert!(longs[1].is_nan());
    }

    #[test]
    fn trims_whitespace_around_cells() {
        let mut t = table("long , city\n 24.5 , Kowno \n");
        t.normalize_numeric(&["long"]);
        assert_eq!(t.numbers("long").unwrap(), vec![24.5]);
        assert_eq!(t.texts("city").unwrap(), vec!["Kowno".to_string()]);
    }

    #[test]
    fn require_lists_every_missing_column() {
        let t = table("long,lat\n1,2\n");
        match t.require("troops", &["survivors", "long", "direction"]) {
            Err(Error::MissingColumns { table, missing }) => {
                assert_eq!(table, "troops");
                assert_eq!(missing, vec!["direction".to_string(), "survivors".to_string()]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
        assert!(t.require("troops", &["long", "lat"]).is_ok());
    }

    #[test]
    fn ragged_rows_are_a_parse_error() {
        assert!(Table::from_reader("a,b\n1,2,3\n".as_bytes(), b',').is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Table::load(Path::new("/nonexistent/troops.csv"), b',').unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn semicolon_delimiter() {
        let t = Table::from_reader("long;lat\n1;2\n".as_bytes(), b';').unwrap();
        assert_eq!(t.numbers("lat").unwrap(), vec![2.0]);
    }
}
