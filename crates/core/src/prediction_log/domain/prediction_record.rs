use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::classification::domain::demographics::{AgeBucket, Gender};

/// One classified face, as persisted in the prediction log.
///
/// Field names match the CSV header columns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRecord {
    #[serde(rename = "Timestamp", with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    #[serde(rename = "Predicted_Age")]
    pub age: AgeBucket,
    #[serde(rename = "Predicted_Gender")]
    pub gender: Gender,
}

impl PredictionRecord {
    pub fn new(timestamp: NaiveDateTime, age: AgeBucket, gender: Gender) -> Self {
        Self {
            timestamp: crate::shared::clock::to_seconds(timestamp),
            age,
            gender,
        }
    }
}

mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::shared::constants::TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}
