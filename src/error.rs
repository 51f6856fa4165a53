//! Module for the error management
use thiserror::Error;

/// An error that can occur while ingesting or querying GTFS data.
#[derive(Error, Debug)]
pub enum Error {
    /// A document, schedule or agency is absent from the store
    #[error("document {0:?} not found")]
    NotFound(String),
    /// A table name outside the fixed set of 13 GTFS tables
    #[error("{0:?} is not a recognized GTFS table")]
    UnrecognizedEntity(String),
    /// A key could not be decoded with the codec it was handed to
    #[error("{key:?} is not a well-formed {expected} key")]
    MalformedKey {
        /// The offending key
        key: String,
        /// Name of the codec that rejected it
        expected: &'static str,
    },
    /// The time is not given in the HH:MM:SS format
    #[error("'{0}' is not a valid time; HH:MM:SS format is expected")]
    InvalidTime(String),
    /// The date is not given in the YYYYMMDD format
    #[error("'{0}' is not a valid date; YYYYMMDD format is expected")]
    InvalidDate(String),
    /// Generic Input/Output error while reading a file
    #[error("impossible to read file")]
    Io(#[from] std::io::Error),
    /// Impossible to read a named file
    #[error("impossible to read '{file_name}'")]
    NamedFileIO {
        /// The file name that could not be read
        file_name: String,
        /// The initial error that caused the unability to read the file
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Impossible to read a CSV table
    #[error("impossible to read csv file '{file_name}'")]
    Csv {
        /// File name that could not be parsed as CSV
        file_name: String,
        /// The initial error by the csv library
        #[source]
        source: csv::Error,
    },
    /// Error when trying to unzip the feed archive
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    /// A document failed to (de)serialize
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// A snapshot line is not a valid JSON document
    #[error("snapshot line {line} is not a valid document")]
    SnapshotLine {
        /// 1-based line number within the snapshot
        line: usize,
        /// The underlying parse error
        #[source]
        source: serde_json::Error,
    },
    /// The reverse geocoding collaborator failed or returned nothing
    #[error("reverse geocoding failed")]
    ExternalServiceFailure(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// True for the absent-document case, which callers often branch on.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
