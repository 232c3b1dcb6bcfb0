use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::classification::domain::demographics::{AgeBucket, Gender};
use crate::prediction_log::domain::prediction_log::LogStoreError;
use crate::shared::constants::{LOG_FILE_PREFIX, TIMESTAMP_FORMAT};

const AGE_COLUMN: &str = "Predicted_Age";
const GENDER_COLUMN: &str = "Predicted_Gender";
const TIMESTAMP_COLUMN: &str = "Timestamp";

/// A log row as seen by reports. Older logs carry no timestamp column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    #[serde(rename = "Timestamp", serialize_with = "serialize_timestamp")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(rename = "Predicted_Age")]
    pub age: AgeBucket,
    #[serde(rename = "Predicted_Gender")]
    pub gender: Gender,
}

fn serialize_timestamp<S: serde::Serializer>(
    time: &Option<NaiveDateTime>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match time {
        Some(time) => serializer.collect_str(&time.format(TIMESTAMP_FORMAT)),
        None => serializer.serialize_none(),
    }
}

/// Aggregates over one or more prediction logs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PredictionSummary {
    pub total: usize,
    /// Every gender, zero when absent.
    pub genders: BTreeMap<Gender, usize>,
    /// Only the age buckets that occur, in bucket order.
    pub ages: BTreeMap<AgeBucket, usize>,
    /// Age bucket by gender counts.
    pub crosstab: BTreeMap<AgeBucket, BTreeMap<Gender, usize>>,
    /// The last rows in file order, oldest first.
    pub recent: Vec<SummaryRow>,
}

impl PredictionSummary {
    pub fn from_rows(rows: impl IntoIterator<Item = SummaryRow>, recent_rows: usize) -> Self {
        let mut summary = Self {
            genders: Gender::ALL.iter().map(|&g| (g, 0)).collect(),
            ..Self::default()
        };
        let mut recent = std::collections::VecDeque::with_capacity(recent_rows);

        for row in rows {
            summary.total += 1;
            *summary.genders.entry(row.gender).or_default() += 1;
            *summary.ages.entry(row.age).or_default() += 1;
            *summary
                .crosstab
                .entry(row.age)
                .or_default()
                .entry(row.gender)
                .or_default() += 1;

            if recent_rows > 0 {
                if recent.len() == recent_rows {
                    recent.pop_front();
                }
                recent.push_back(row);
            }
        }

        summary.recent = recent.into_iter().collect();
        summary
    }

    /// Summarizes the given log files, in order, as one stream of rows.
    pub fn load(paths: &[PathBuf], recent_rows: usize) -> Result<Self, LogStoreError> {
        let mut rows = Vec::new();
        for path in paths {
            rows.extend(read_rows(path)?);
        }
        Ok(Self::from_rows(rows, recent_rows))
    }

    pub fn count(&self, gender: Gender) -> usize {
        self.genders.get(&gender).copied().unwrap_or(0)
    }
}

/// Reads the rows of one log file, with or without the timestamp column.
///
/// Rows whose age or gender label does not parse, e.g. a line the capture
/// loop is still writing, are skipped. A timestamp in any other format is
/// kept as `None` and the row still counts.
pub fn read_rows(path: &Path) -> Result<Vec<SummaryRow>, LogStoreError> {
    let csv_error = |source| LogStoreError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;

    let headers = reader.headers().map_err(csv_error)?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let (Some(age_col), Some(gender_col)) = (column(AGE_COLUMN), column(GENDER_COLUMN)) else {
        return Err(LogStoreError::Parse {
            path: path.to_path_buf(),
            line: 1,
            message: format!("missing {AGE_COLUMN} or {GENDER_COLUMN} column"),
        });
    };
    let timestamp_col = column(TIMESTAMP_COLUMN);

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let parsed = result.ok().and_then(|record| {
            let age = record.get(age_col)?.parse().ok()?;
            let gender = record.get(gender_col)?.parse().ok()?;
            let timestamp = timestamp_col
                .and_then(|col| record.get(col))
                .and_then(|t| NaiveDateTime::parse_from_str(t, TIMESTAMP_FORMAT).ok());
            Some(SummaryRow {
                timestamp,
                age,
                gender,
            })
        });
        match parsed {
            Some(row) => rows.push(row),
            None => log::debug!("Skipping unreadable row {} of {}", line + 2, path.display()),
        }
    }
    Ok(rows)
}

/// All prediction logs in `dir`, oldest first.
pub fn log_files_in(dir: &Path) -> Result<Vec<PathBuf>, LogStoreError> {
    let entries = std::fs::read_dir(dir).map_err(|source| LogStoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension().is_some_and(|ext| ext == "csv")
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX))
        })
        .collect();
    files.sort();
    Ok(files)
}
