use std::path::PathBuf;

use thiserror::Error;

pub type Result<T = ()> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("threat log directory {0} could not be listed")]
    LogDirUnreadable(PathBuf),
    #[error("no TWThreat part-files found in {0}")]
    NoPartFiles(PathBuf),
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),
    #[error("no raid zones detected in {0}")]
    NoRaidsDetected(PathBuf),
    #[error("raid '{requested}' not found in combat log (available: {})", .available.join(", "))]
    UnknownRaid {
        requested: String,
        available: Vec<String>,
    },
    #[error("multiple raids detected ({}); choose one explicitly", .0.join(", "))]
    AmbiguousRaid(Vec<String>),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid settings: {0}")]
    Settings(Box<figment::Error>),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Settings(Box::new(err))
    }
}

impl Error {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Write {
            path: path.into(),
            source,
        }
    }
}
