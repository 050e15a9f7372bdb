//! Small closed sets of strategies selected by name, either from code or from
//! configuration strings.
use std::fmt::Display;
use std::str::FromStr;

use crate::error::ROIError;

/// How to combine the intensities that fall into the same window or region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Accumulator {
    #[default]
    Sum,
    Mean,
}

impl Accumulator {
    /// Combine `total` built from `count` observations.
    ///
    /// An empty collection yields zero for either strategy.
    pub fn finish(&self, total: f64, count: usize) -> f64 {
        match self {
            Accumulator::Sum => total,
            Accumulator::Mean => total / count.max(1) as f64,
        }
    }
}

impl FromStr for Accumulator {
    type Err = ROIError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "mean" => Ok(Self::Mean),
            _ => Err(ROIError::invalid(format!(
                "accumulator `{s}` is not recognized, valid values are `sum` and `mean`"
            ))),
        }
    }
}

impl Display for Accumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Accumulator::Sum => f.write_str("sum"),
            Accumulator::Mean => f.write_str("mean"),
        }
    }
}

/// What to do when more than one new peak matches the same trace in a single scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MatchMode {
    /// Keep the peak nearest to the trace, the others become unmatched
    #[default]
    Closest,
    /// Merge all of the matching peaks using the configured [`Reducer`]s
    Reduce,
}

impl FromStr for MatchMode {
    type Err = ROIError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "closest" => Ok(Self::Closest),
            "reduce" | "merge" => Ok(Self::Reduce),
            _ => Err(ROIError::invalid(format!(
                "multiple match mode `{s}` is not recognized, valid values are `closest` and `reduce`"
            ))),
        }
    }
}

impl Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchMode::Closest => f.write_str("closest"),
            MatchMode::Reduce => f.write_str("reduce"),
        }
    }
}

/// The interpolation method used to project a scan onto a shared m/z grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum InterpolationKind {
    #[default]
    Linear,
    Nearest,
    Previous,
    Next,
}

impl FromStr for InterpolationKind {
    type Err = ROIError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" | "slinear" => Ok(Self::Linear),
            "nearest" => Ok(Self::Nearest),
            "previous" | "zero" => Ok(Self::Previous),
            "next" => Ok(Self::Next),
            _ => Err(ROIError::invalid(format!(
                "interpolation kind `{s}` is not recognized, valid values are `linear`, `nearest`, `previous` and `next`"
            ))),
        }
    }
}

impl Display for InterpolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InterpolationKind::Linear => "linear",
            InterpolationKind::Nearest => "nearest",
            InterpolationKind::Previous => "previous",
            InterpolationKind::Next => "next",
        };
        f.write_str(name)
    }
}

/// What an interpolation should produce for a query outside of the observed domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Extrapolation {
    /// Fail with [`ROIError::OutOfDomainInterpolation`]
    #[default]
    Error,
    /// Treat the missing signal as zero intensity
    Zero,
}

impl FromStr for Extrapolation {
    type Err = ROIError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "zero" => Ok(Self::Zero),
            _ => Err(ROIError::invalid(format!(
                "extrapolation policy `{s}` is not recognized, valid values are `error` and `zero`"
            ))),
        }
    }
}

impl Display for Extrapolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Extrapolation::Error => f.write_str("error"),
            Extrapolation::Zero => f.write_str("zero"),
        }
    }
}

/// A function collapsing several values into one
pub type ReduceFn = fn(&[f64]) -> f64;

/// How to collapse several m/z or intensity values that matched the same trace
/// into a single value.
///
/// `Custom` is the extension point for any other aggregation. It cannot be read
/// from configuration.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Reducer {
    Mean,
    Sum,
    Max,
    #[cfg_attr(feature = "serde", serde(skip))]
    Custom(ReduceFn),
}

impl Reducer {
    pub fn reduce(&self, values: &[f64]) -> f64 {
        match self {
            Reducer::Mean => {
                if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                }
            }
            Reducer::Sum => values.iter().sum(),
            Reducer::Max => values.iter().copied().fold(0.0, f64::max),
            Reducer::Custom(func) => func(values),
        }
    }
}

impl PartialEq for Reducer {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Mean, Self::Mean) | (Self::Sum, Self::Sum) | (Self::Max, Self::Max) => true,
            (Self::Custom(a), Self::Custom(b)) => *a as usize == *b as usize,
            _ => false,
        }
    }
}

impl FromStr for Reducer {
    type Err = ROIError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "sum" => Ok(Self::Sum),
            "max" => Ok(Self::Max),
            _ => Err(ROIError::invalid(format!(
                "reducer `{s}` is not recognized, valid values are `mean`, `sum` and `max`"
            ))),
        }
    }
}

impl Display for Reducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reducer::Mean => f.write_str("mean"),
            Reducer::Sum => f.write_str("sum"),
            Reducer::Max => f.write_str("max"),
            Reducer::Custom(_) => f.write_str("custom"),
        }
    }
}
