//! Merge a range of scans into a single spectrum on a shared m/z grid, optionally
//! subtracting the signal of the scans around it.
use std::ops::Range;

use mzpeaks::Tolerance;
use rayon::prelude::*;
use tracing::debug;

use crate::error::ROIError;
use crate::interpolate::interpolate;
use crate::isotopes::search_isotopic_envelope;
use crate::modes::{Accumulator, Extrapolation, InterpolationKind};
use crate::peaks::{CenterEstimation, CwtParams, InstrumentMode, Peak, PeakParams, PeakPicker};
use crate::scan::ScanAccessor;

/// Below this, a distance between two masses is treated as rounding noise
const GRID_EPSILON: f64 = 1e-9;

/// A spectrum produced by [`accumulate`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccumulatedSpectrum {
    pub mz: Vec<f64>,
    pub intensity: Vec<f64>,
    pub peaks: Option<Vec<Peak>>,
}

impl AccumulatedSpectrum {
    pub fn new(mz: Vec<f64>, intensity: Vec<f64>) -> Self {
        Self {
            mz,
            intensity,
            peaks: None,
        }
    }

    pub fn len(&self) -> usize {
        self.mz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }

    /// Pick spectral peaks with `picker`, using the preset for `mode` unless `params`
    /// are given
    pub fn find_peaks<P: PeakPicker + ?Sized>(
        &mut self,
        picker: &P,
        mode: InstrumentMode,
        params: Option<CwtParams>,
    ) -> &[Peak] {
        let params = params.unwrap_or_else(|| mode.cwt_params());
        let widths = mode.widths();
        let peaks = picker.pick(&self.mz, &self.intensity, &widths, &params);
        self.peaks.insert(peaks).as_slice()
    }

    /// Describe every picked peak, ordered by m/z
    pub fn peak_params(
        &self,
        subtract_baseline: bool,
        center: CenterEstimation,
    ) -> Result<Vec<PeakParams>, ROIError> {
        let peaks = self.peaks.as_ref().ok_or(ROIError::PeaksNotPicked)?;
        let mut rows = peaks
            .iter()
            .map(|p| p.params(&self.mz, &self.intensity, subtract_baseline, center))
            .collect::<Result<Vec<_>, ROIError>>()?;
        rows.sort_by(|a, b| a.location.total_cmp(&b.location));
        Ok(rows)
    }

    /// Search this spectrum for the isotopic envelope of `mz_mono`.
    ///
    /// See [`search_isotopic_envelope`].
    pub fn isotopic_envelope(
        &self,
        mz_mono: f64,
        max_charge: i32,
        n_isotopes: usize,
        tolerance: Tolerance,
    ) -> Result<Vec<usize>, ROIError> {
        search_isotopic_envelope(&self.mz, mz_mono, max_charge, n_isotopes, tolerance)
    }
}

/// Build the sparse reference grid for the scans in `region`.
///
/// The grid is spaced by the smallest distance between two distinct observed masses,
/// starting at the smallest one. Only the grid points that some observed mass rounds
/// up to are kept, and the last point is clipped to the largest observed mass.
pub fn reference_grid<S: ScanAccessor + ?Sized>(
    scans: &S,
    region: Range<usize>,
) -> Result<Vec<f64>, ROIError> {
    let mut observed: Vec<f64> = Vec::new();
    for i in region {
        observed.extend_from_slice(scans.scan_at(i)?.mz);
    }
    observed.sort_by(|a, b| a.total_cmp(b));
    observed.dedup();

    let (low, high) = match (observed.first(), observed.last()) {
        (Some(low), Some(high)) => (*low, *high),
        _ => return Ok(Vec::new()),
    };
    let resolution = observed
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| *d > GRID_EPSILON)
        .fold(f64::INFINITY, f64::min);
    if !resolution.is_finite() {
        return Ok(vec![low]);
    }

    let mut bins: Vec<u64> = observed
        .iter()
        .map(|mz| ((mz - low) / resolution - GRID_EPSILON).ceil().max(0.0) as u64)
        .collect();
    bins.dedup();
    Ok(bins
        .into_iter()
        .map(|k| (low + k as f64 * resolution).min(high))
        .collect())
}

fn reduce_rows(rows: &[Vec<f64>], width: usize, accumulator: Accumulator) -> Vec<f64> {
    let mut acc = vec![0.0; width];
    for row in rows {
        for (a, v) in acc.iter_mut().zip(row) {
            *a += v;
        }
    }
    acc.into_iter()
        .map(|total| accumulator.finish(total, rows.len()))
        .collect()
}

/// Accumulate the scans in `[start, end)` into one spectrum.
///
/// Each scan is interpolated onto the grid from [`reference_grid`] using `kind`. When
/// `subtract` is given it must contain `[start, end)`, and the accumulated signal of
/// the flanking scans on either side is subtracted from the result.
pub fn accumulate<S: ScanAccessor + Sync + ?Sized>(
    scans: &S,
    start: usize,
    end: usize,
    subtract: Option<(usize, usize)>,
    kind: InterpolationKind,
    accumulator: Accumulator,
    extrapolation: Extrapolation,
) -> Result<AccumulatedSpectrum, ROIError> {
    let main = scans.resolve_range(Some(start), Some(end))?;
    if main.is_empty() {
        return Err(ROIError::invalid(format!(
            "accumulation region {start}-{end} contains no scans"
        )));
    }
    let region = match subtract {
        Some((left, right)) => {
            if left > start || right < end {
                return Err(ROIError::invalid(format!(
                    "subtraction region {left}-{right} must contain the accumulation region {start}-{end}"
                )));
            }
            scans.resolve_range(Some(left), Some(right))?
        }
        None => main.clone(),
    };

    let grid = reference_grid(scans, region.clone())?;
    debug!(
        "Accumulating scans {}-{} over {} grid points, subtracting {}-{}",
        main.start,
        main.end,
        grid.len(),
        region.start,
        region.end
    );

    let rows: Vec<Vec<f64>> = region
        .clone()
        .into_par_iter()
        .map(|i| {
            let scan = scans.scan_at(i)?;
            interpolate(scan.mz, scan.intensity, &grid, kind, extrapolation, i)
        })
        .collect::<Result<Vec<_>, ROIError>>()?;

    let offset = region.start;
    let (left, rest) = rows.split_at(main.start - offset);
    let (center, right) = rest.split_at(main.len());

    let width = grid.len();
    let mut intensity = reduce_rows(center, width, accumulator);
    for flank in [left, right] {
        for (v, f) in intensity.iter_mut().zip(reduce_rows(flank, width, accumulator)) {
            *v -= f;
        }
    }
    Ok(AccumulatedSpectrum::new(grid, intensity))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scan::Scan;

    fn flat_scans(n: usize) -> Vec<Scan> {
        (0..n)
            .map(|i| {
                let level = if (15..25).contains(&i) { 3.0 } else { 1.0 };
                Scan::new(
                    i as f64,
                    vec![100.0, 101.0, 102.0],
                    vec![level, level * 2.0, level],
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_reference_grid() -> Result<(), ROIError> {
        let scans = vec![
            Scan::new(0.0, vec![100.0, 100.5, 103.0], vec![1.0; 3])?,
            Scan::new(1.0, vec![100.25, 103.25], vec![1.0; 2])?,
        ];
        let grid = reference_grid(&scans, 0..2)?;
        assert_eq!(grid, vec![100.0, 100.25, 100.5, 103.0, 103.25]);

        let single = vec![Scan::new(0.0, vec![250.0], vec![1.0])?];
        assert_eq!(reference_grid(&single, 0..1)?, vec![250.0]);
        let empty = vec![Scan::default()];
        assert!(reference_grid(&empty, 0..1)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_subtract_region() -> Result<(), ROIError> {
        let scans = flat_scans(40);
        let spectrum = accumulate(
            &scans,
            15,
            25,
            Some((10, 30)),
            InterpolationKind::Linear,
            Accumulator::Sum,
            Extrapolation::Error,
        )?;
        assert_eq!(spectrum.mz, vec![100.0, 101.0, 102.0]);
        // 10 scans at level 3 minus 5 + 5 flanking scans at level 1
        assert_eq!(spectrum.intensity, vec![20.0, 40.0, 20.0]);

        let err = accumulate(
            &scans,
            15,
            25,
            Some((16, 30)),
            InterpolationKind::Linear,
            Accumulator::Sum,
            Extrapolation::Error,
        )
        .unwrap_err();
        assert!(err.is_invalid_argument());
        Ok(())
    }

    #[test]
    fn test_mean_without_subtraction() -> Result<(), ROIError> {
        let scans = flat_scans(40);
        let spectrum = accumulate(
            &scans,
            20,
            30,
            None,
            InterpolationKind::Nearest,
            Accumulator::Mean,
            Extrapolation::Error,
        )?;
        // Scans 20-24 at level 3 and 25-29 at level 1
        assert_eq!(spectrum.intensity, vec![2.0, 4.0, 2.0]);
        Ok(())
    }

    #[test]
    fn test_out_of_domain() -> Result<(), ROIError> {
        let scans = vec![
            Scan::new(0.0, vec![100.0, 101.0], vec![2.0, 4.0])?,
            Scan::new(1.0, vec![100.0, 101.0, 102.0], vec![2.0, 4.0, 6.0])?,
        ];
        let err = accumulate(
            &scans,
            0,
            2,
            None,
            InterpolationKind::Linear,
            Accumulator::Sum,
            Extrapolation::Error,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ROIError::OutOfDomainInterpolation { scan: 0, .. }
        ));

        let spectrum = accumulate(
            &scans,
            0,
            2,
            None,
            InterpolationKind::Linear,
            Accumulator::Sum,
            Extrapolation::Zero,
        )?;
        assert_eq!(spectrum.intensity, vec![4.0, 8.0, 6.0]);
        Ok(())
    }

    #[test]
    fn test_spectrum_surface() -> Result<(), ROIError> {
        let mut spectrum = AccumulatedSpectrum::new(
            vec![500.0, 500.25, 500.5017, 500.75, 501.0034],
            vec![10.0, 0.0, 6.0, 0.0, 2.0],
        );
        assert_eq!(
            spectrum.peak_params(true, CenterEstimation::Apex).unwrap_err(),
            ROIError::PeaksNotPicked
        );
        let picker = |_: &[f64], _: &[f64], _: &[f64], _: &CwtParams| {
            vec![Peak::new(1, 2, 3), Peak::new(0, 0, 1)]
        };
        spectrum.find_peaks(&picker, InstrumentMode::Qtof, None);
        let rows = spectrum.peak_params(false, CenterEstimation::Apex)?;
        assert_eq!(rows[0].location, 500.0);
        assert_eq!(rows[1].location, 500.5017);

        let envelope = spectrum.isotopic_envelope(500.0, 2, 3, Tolerance::Da(0.01))?;
        assert_eq!(envelope, vec![0, 2, 4]);
        Ok(())
    }
}
