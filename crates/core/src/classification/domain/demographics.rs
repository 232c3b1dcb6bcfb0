use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::categorical_scores::CategoricalScores;

pub const AGE_BUCKET_COUNT: usize = 8;
pub const GENDER_COUNT: usize = 2;

/// Age range predicted for a face. Declaration order matches the age
/// model's output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgeBucket {
    UpTo12,
    From13To25,
    From26To35,
    From36To45,
    From46To55,
    From56To65,
    From66To75,
    Over75,
}

impl AgeBucket {
    pub const ALL: [AgeBucket; AGE_BUCKET_COUNT] = [
        AgeBucket::UpTo12,
        AgeBucket::From13To25,
        AgeBucket::From26To35,
        AgeBucket::From36To45,
        AgeBucket::From46To55,
        AgeBucket::From56To65,
        AgeBucket::From66To75,
        AgeBucket::Over75,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AgeBucket::UpTo12 => "0-12",
            AgeBucket::From13To25 => "13-25",
            AgeBucket::From26To35 => "26-35",
            AgeBucket::From36To45 => "36-45",
            AgeBucket::From46To55 => "46-55",
            AgeBucket::From56To65 => "56-65",
            AgeBucket::From66To75 => "66-75",
            AgeBucket::Over75 => "76+",
        }
    }

    pub fn from_scores(scores: &CategoricalScores<AGE_BUCKET_COUNT>) -> Self {
        Self::ALL[scores.argmax()]
    }
}

/// Gender predicted for a face. Declaration order matches the gender
/// model's output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Gender {
    Man,
    Woman,
}

impl Gender {
    pub const ALL: [Gender; GENDER_COUNT] = [Gender::Man, Gender::Woman];

    pub fn label(self) -> &'static str {
        match self {
            Gender::Man => "man",
            Gender::Woman => "woman",
        }
    }

    pub fn from_scores(scores: &CategoricalScores<GENDER_COUNT>) -> Self {
        Self::ALL[scores.argmax()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel(pub String);

impl fmt::Display for UnknownLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown label '{}'", self.0)
    }
}

impl std::error::Error for UnknownLabel {}

/// Label-based text form shared by the CSV log, reports and JSON.
macro_rules! label_codec {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.label())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownLabel;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.label() == s)
                    .ok_or_else(|| UnknownLabel(s.to_string()))
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

label_codec!(AgeBucket);
label_codec!(Gender);
