use std::fmt::Display;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use mzroi::{MatchMode, Reducer, Tolerance};

/// A mass tolerance written as a number followed by its unit, `0.005da` or `10ppm`.
/// A bare number is read as Daltons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArgTolerance(pub Tolerance);

impl Default for ArgTolerance {
    fn default() -> Self {
        Self(Tolerance::Da(0.005))
    }
}

impl FromStr for ArgTolerance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_lowercase();
        let (value, unit) = if let Some(value) = text.strip_suffix("ppm") {
            (value, "ppm")
        } else if let Some(value) = text.strip_suffix("da") {
            (value, "da")
        } else {
            (text.as_str(), "da")
        };
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse tolerance `{s}`: {e}"))?;
        if !value.is_finite() || value < 0.0 {
            return Err(format!("Tolerance `{s}` must be a non-negative number"));
        }
        match unit {
            "ppm" => Ok(Self(Tolerance::PPM(value))),
            _ => Ok(Self(Tolerance::Da(value))),
        }
    }
}

impl Display for ArgTolerance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Tolerance::PPM(v) => write!(f, "{v}ppm"),
            Tolerance::Da(v) => write!(f, "{v}da"),
        }
    }
}

impl TryFrom<String> for ArgTolerance {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ArgTolerance> for String {
    fn from(value: ArgTolerance) -> Self {
        value.to_string()
    }
}

impl From<ArgTolerance> for Tolerance {
    fn from(value: ArgTolerance) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgMatchMode {
    #[default]
    /// Keep only the peak nearest to each trace
    Closest,
    /// Merge every peak matching a trace with the m/z and intensity reducers
    Reduce,
}

impl From<ArgMatchMode> for MatchMode {
    fn from(value: ArgMatchMode) -> Self {
        match value {
            ArgMatchMode::Closest => MatchMode::Closest,
            ArgMatchMode::Reduce => MatchMode::Reduce,
        }
    }
}

impl Display for ArgMatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        MatchMode::from(*self).fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgReducer {
    Mean,
    Sum,
    Max,
}

impl From<ArgReducer> for Reducer {
    fn from(value: ArgReducer) -> Self {
        match value {
            ArgReducer::Mean => Reducer::Mean,
            ArgReducer::Sum => Reducer::Sum,
            ArgReducer::Max => Reducer::Max,
        }
    }
}

impl Display for ArgReducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Reducer::from(*self).fmt(f)
    }
}
