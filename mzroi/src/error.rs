/*! Errors raised while extracting traces and signals from scans */
use thiserror::Error;

/// An error that might occur while building chromatograms, accumulating spectra or
/// tracking regions of interest.
///
/// All argument checks happen before any state is mutated, so an `Err` never leaves
/// a partially updated tracker or result behind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ROIError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error(
        "Cannot interpolate scan {scan} at m/z {mz:0.5}, outside of its observed range {low:0.5}-{high:0.5}"
    )]
    OutOfDomainInterpolation {
        scan: usize,
        mz: f64,
        low: f64,
        high: f64,
    },
    #[error("Scan index {index} is out of range for a run with {count} scans")]
    ScanOutOfRange { index: usize, count: usize },
    #[error("Peaks must be picked before their parameters can be computed")]
    PeaksNotPicked,
}

impl ROIError {
    pub(crate) fn invalid<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}
