use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};

use crate::prediction_log::domain::active_window::ActiveWindow;
use crate::prediction_log::domain::prediction_log::{LogFile, LogStoreError, PredictionLog};
use crate::prediction_log::domain::prediction_record::PredictionRecord;
use crate::shared::constants::{LOG_FILE_PREFIX, LOG_HEADER};

/// Daily CSV prediction log (`predictions_YYYYMMDD.csv`).
///
/// Files are created with their header in a single write and never
/// truncated, so restarting the capture reuses the day's file. Every row is
/// encoded in memory and written with one `write_all` followed by a flush,
/// so a concurrent reader sees either the whole row or none of it.
///
/// A record's own timestamp decides which file it lands in.
pub struct CsvLogStore {
    dir: PathBuf,
    window: ActiveWindow,
    active: Option<LogFile>,
}

impl CsvLogStore {
    pub fn new(dir: impl Into<PathBuf>, window: ActiveWindow) -> Self {
        Self {
            dir: dir.into(),
            window,
            active: None,
        }
    }

    /// The file records made at `now` belong to, creating it if needed.
    pub fn ensure_active_file(&mut self, now: NaiveDateTime) -> Result<LogFile, LogStoreError> {
        let date = self.window.segment_date(now);
        if let Some(active) = &self.active {
            if active.date == date && active.path.exists() {
                return Ok(active.clone());
            }
        }

        fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))?;
        let path = self.dir.join(file_name(date));
        if create_with_header(&path)? {
            log::info!("Started prediction log {}", path.display());
        } else {
            log::debug!("Reusing prediction log {}", path.display());
        }

        let file = LogFile { path, date };
        self.active = Some(file.clone());
        Ok(file)
    }
}

impl PredictionLog for CsvLogStore {
    fn append(&mut self, record: &PredictionRecord) -> Result<LogFile, LogStoreError> {
        let active = self.ensure_active_file(record.timestamp)?;

        let row = encode(&active.path, |w| w.serialize(record))?;
        let mut file = OpenOptions::new()
            .append(true)
            .open(&active.path)
            .map_err(|e| io_error(&active.path, e))?;
        file.write_all(&row)
            .and_then(|_| file.flush())
            .map_err(|e| io_error(&active.path, e))?;

        Ok(active)
    }
}

/// Parses a prediction log written by [`CsvLogStore`].
pub fn read_records(path: &Path) -> Result<Vec<PredictionRecord>, LogStoreError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    reader
        .deserialize()
        .map(|row| row.map_err(|e| csv_error(path, e)))
        .collect()
}

pub fn file_name(date: NaiveDate) -> String {
    format!("{LOG_FILE_PREFIX}{}.csv", date.format("%Y%m%d"))
}

/// Creates `path` with the header row. Returns `false` when the file was
/// already there.
///
/// An existing empty file (interrupted before its header landed) gets the
/// header written. An existing file cut off mid-row gets a line break so the
/// next row starts on its own line.
fn create_with_header(path: &Path) -> Result<bool, LogStoreError> {
    let (mut file, created) = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => (file, true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let file = OpenOptions::new()
                .append(true)
                .open(path)
                .map_err(|e| io_error(path, e))?;
            (file, false)
        }
        Err(e) => return Err(io_error(path, e)),
    };

    if created || is_empty(&file, path)? {
        let header = encode(path, |w| w.write_record(LOG_HEADER))?;
        file.write_all(&header)
            .and_then(|_| file.flush())
            .map_err(|e| io_error(path, e))?;
    } else if ends_mid_row(path).map_err(|e| io_error(path, e))? {
        log::warn!("Closing partial row left in {}", path.display());
        file.write_all(b"\n")
            .and_then(|_| file.flush())
            .map_err(|e| io_error(path, e))?;
    }
    Ok(created)
}

fn is_empty(file: &File, path: &Path) -> Result<bool, LogStoreError> {
    Ok(file.metadata().map_err(|e| io_error(path, e))?.len() == 0)
}

fn ends_mid_row(path: &Path) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Renders CSV rows into memory so they can be written in one call.
fn encode(
    path: &Path,
    write: impl FnOnce(&mut csv::Writer<Vec<u8>>) -> csv::Result<()>,
) -> Result<Vec<u8>, LogStoreError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    write(&mut writer).map_err(|e| csv_error(path, e))?;
    writer
        .into_inner()
        .map_err(|e| io_error(path, e.into_error()))
}

fn io_error(path: &Path, source: std::io::Error) -> LogStoreError {
    LogStoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn csv_error(path: &Path, source: csv::Error) -> LogStoreError {
    LogStoreError::Csv {
        path: path.to_path_buf(),
        source,
    }
}
