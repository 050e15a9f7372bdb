//! High level entry points over a [`ScanAccessor`]
use mzpeaks::Tolerance;

use crate::accumulate::{accumulate, AccumulatedSpectrum};
use crate::eic::{extract_chromatograms, ExtractedIonChromatograms};
use crate::error::ROIError;
use crate::modes::{Accumulator, Extrapolation, InterpolationKind};
use crate::scan::ScanAccessor;

pub use crate::builder::{build_roi, ROIParams};
pub use crate::isotopes::search_isotopic_envelope;

/// Extract one chromatogram per target m/z, see [`extract_chromatograms`]
pub fn extract_eic<S: ScanAccessor + Sync + ?Sized>(
    scans: &S,
    targets: &[f64],
    window: Tolerance,
    start: Option<usize>,
    end: Option<usize>,
    accumulator: Accumulator,
) -> Result<ExtractedIonChromatograms, ROIError> {
    extract_chromatograms(scans, targets, window, start, end, accumulator)
}

/// How [`accumulate_spectrum`] combines scans
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AccumulateParams {
    /// A wider scan range whose scans outside of the accumulated range are subtracted
    pub subtract: Option<(usize, usize)>,
    pub kind: InterpolationKind,
    pub accumulator: Accumulator,
    pub extrapolation: Extrapolation,
}

impl AccumulateParams {
    pub fn new(
        subtract: Option<(usize, usize)>,
        kind: InterpolationKind,
        accumulator: Accumulator,
        extrapolation: Extrapolation,
    ) -> Self {
        Self {
            subtract,
            kind,
            accumulator,
            extrapolation,
        }
    }
}

/// Accumulate scans `[start, end)` into one spectrum, see [`accumulate`]
pub fn accumulate_spectrum<S: ScanAccessor + Sync + ?Sized>(
    scans: &S,
    start: usize,
    end: usize,
    params: &AccumulateParams,
) -> Result<AccumulatedSpectrum, ROIError> {
    accumulate(
        scans,
        start,
        end,
        params.subtract,
        params.kind,
        params.accumulator,
        params.extrapolation,
    )
}
