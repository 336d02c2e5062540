use std::path::PathBuf;

/// Everything that can abort a chart run. None of these are recovered.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed delimited data in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{table} table is missing required column(s): {}", missing.join(", "))]
    MissingColumns { table: String, missing: Vec<String> },
    #[error("troops table has no plottable positions")]
    NoRoute,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
