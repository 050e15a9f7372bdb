//! Extracted ion chromatograms: the signal within fixed m/z windows across a run of scans
use mzpeaks::Tolerance;
use rayon::prelude::*;
use tracing::debug;

use crate::chromatogram::{Chromatogram, MassTrace};
use crate::error::ROIError;
use crate::modes::Accumulator;
use crate::scan::{ScanAccessor, SpectrumView};
use crate::search::{closed_interval, validate_tolerance};

/// A set of chromatograms sharing the same retention time axis.
///
/// `intensities[i][j]` is the signal for `targets[i]` in the `j`th scan of the
/// extracted range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedIonChromatograms {
    pub targets: Vec<f64>,
    pub time: Vec<f64>,
    pub intensities: Vec<Vec<f64>>,
    pub first_scan: usize,
}

impl ExtractedIonChromatograms {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Split into one [`Chromatogram`] per target m/z
    pub fn into_chromatograms(self) -> Vec<Chromatogram> {
        let first_scan = self.first_scan;
        let time = self.time;
        self.targets
            .into_iter()
            .zip(self.intensities)
            .map(|(mz, intensity)| {
                Chromatogram::new(
                    time.clone(),
                    intensity,
                    MassTrace::Scalar(mz),
                    first_scan,
                )
            })
            .collect()
    }
}

fn accumulate_windows(
    scan: &SpectrumView<'_>,
    windows: &[(f64, f64)],
    accumulator: Accumulator,
) -> Vec<f64> {
    windows
        .iter()
        .map(|(low, high)| {
            let span = closed_interval(scan.mz, *low, *high);
            let count = span.len();
            let total: f64 = scan.intensity[span].iter().sum();
            accumulator.finish(total, count)
        })
        .collect()
}

/// Build an extracted ion chromatogram for each of `targets`.
///
/// Every scan in `[start, end)` (the whole run by default) contributes the sum, or the
/// mean, of the intensities whose m/z lies in the closed window `window.bounds(target)`.
/// A window that contains no peaks contributes zero in either mode.
///
/// Scans are processed on the current `rayon` thread pool; the result is ordered by
/// scan index.
pub fn extract_chromatograms<S: ScanAccessor + Sync + ?Sized>(
    scans: &S,
    targets: &[f64],
    window: Tolerance,
    start: Option<usize>,
    end: Option<usize>,
    accumulator: Accumulator,
) -> Result<ExtractedIonChromatograms, ROIError> {
    let window = validate_tolerance(window)?;
    let range = scans.resolve_range(start, end)?;
    let windows: Vec<(f64, f64)> = targets.iter().map(|mz| window.bounds(*mz)).collect();

    debug!(
        "Extracting {} chromatograms over scans {}-{}",
        targets.len(),
        range.start,
        range.end
    );

    let columns: Vec<(f64, Vec<f64>)> = range
        .clone()
        .into_par_iter()
        .map(|index| -> Result<(f64, Vec<f64>), ROIError> {
            let scan = scans.scan_at(index)?;
            Ok((scan.time, accumulate_windows(&scan, &windows, accumulator)))
        })
        .collect::<Result<Vec<_>, ROIError>>()?;

    let mut time = Vec::with_capacity(columns.len());
    let mut intensities: Vec<Vec<f64>> = (0..targets.len())
        .map(|_| Vec::with_capacity(columns.len()))
        .collect();
    for (t, column) in columns {
        time.push(t);
        for (row, value) in intensities.iter_mut().zip(column) {
            row.push(value);
        }
    }

    Ok(ExtractedIonChromatograms {
        targets: targets.to_vec(),
        time,
        intensities,
        first_scan: range.start,
    })
}
