use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use super::prediction_record::PredictionRecord;

#[derive(Error, Debug)]
pub enum LogStoreError {
    #[error("I/O error on prediction log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed prediction log {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: u64,
        message: String,
    },
}

/// The file that currently receives records: one per log segment (day).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogFile {
    pub path: PathBuf,
    pub date: NaiveDate,
}

/// Append-only sink for prediction records.
///
/// An `Ok` return means the row is flushed to the file and visible to
/// concurrent readers.
pub trait PredictionLog: Send {
    fn append(&mut self, record: &PredictionRecord) -> Result<LogFile, LogStoreError>;
}
