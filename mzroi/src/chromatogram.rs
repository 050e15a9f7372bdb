//! Chromatograms and the regions of interest built from tracked traces
use mzpeaks::feature::Feature;
use mzpeaks::{Time, MZ};

use crate::error::ROIError;
use crate::peaks::{CenterEstimation, CwtParams, Peak, PeakPicker, SeparationMode};

/// The m/z associated with a [`Chromatogram`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MassTrace {
    /// One observed m/z per scan, `0.0` where the trace had no peak
    Series(Vec<f64>),
    /// A single representative m/z
    Scalar(f64),
}

impl MassTrace {
    /// The m/z of the `i`th point, if it was observed
    pub fn get(&self, i: usize) -> Option<f64> {
        match self {
            MassTrace::Series(mz) => mz.get(i).copied().filter(|x| *x > 0.0),
            MassTrace::Scalar(mz) => Some(*mz),
        }
    }
}

/// Peak descriptors for one chromatographic peak, along with the m/z of its trace
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChromatogramPeak {
    pub rt: f64,
    pub intensity: f64,
    pub area: f64,
    pub width: f64,
    pub mz_mean: f64,
    pub mz_std: Option<f64>,
}

/// An intensity series over retention time, spanning scans `[start, end)` of a run
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chromatogram {
    pub time: Vec<f64>,
    pub intensity: Vec<f64>,
    pub mz: MassTrace,
    pub start: usize,
    pub end: usize,
    pub peaks: Option<Vec<Peak>>,
}

/// A region of interest is a chromatogram built by following one m/z trace
pub type ROI = Chromatogram;

impl Chromatogram {
    pub fn new(time: Vec<f64>, intensity: Vec<f64>, mz: MassTrace, start: usize) -> Self {
        let end = start + time.len();
        Self {
            time,
            intensity,
            mz,
            start,
            end,
            peaks: None,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    fn observed(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.intensity
            .iter()
            .enumerate()
            .filter_map(|(i, inten)| self.mz.get(i).map(|mz| (mz, *inten)))
    }

    /// The intensity-weighted mean m/z over the observed points.
    ///
    /// Falls back to the unweighted mean when all of them have zero intensity.
    pub fn mz_mean(&self) -> Option<f64> {
        if let MassTrace::Scalar(mz) = self.mz {
            return Some(mz);
        }
        let (mut acc, mut weight, mut plain, mut n) = (0.0, 0.0, 0.0, 0usize);
        for (mz, inten) in self.observed() {
            acc += mz * inten;
            weight += inten;
            plain += mz;
            n += 1;
        }
        if n == 0 {
            None
        } else if weight > 0.0 {
            Some(acc / weight)
        } else {
            Some(plain / n as f64)
        }
    }

    /// The population standard deviation of the observed m/z values, `None` for a
    /// scalar trace
    pub fn mz_std(&self) -> Option<f64> {
        let MassTrace::Series(_) = self.mz else {
            return None;
        };
        let values: Vec<f64> = self.observed().map(|(mz, _)| mz).collect();
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(var.sqrt())
    }

    /// Replace the m/z series with its weighted mean
    pub fn collapse(&mut self) -> Option<f64> {
        let mz = self.mz_mean()?;
        self.mz = MassTrace::Scalar(mz);
        Some(mz)
    }

    /// The retention time and intensity of the most intense point
    pub fn apex(&self) -> Option<(f64, f64)> {
        self.intensity
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, inten)| (self.time[i], *inten))
    }

    /// Convert the observed points into a [`Feature`], skipping scans where the trace
    /// had no peak
    pub fn to_feature(&self) -> Feature<MZ, Time> {
        let mut feature = Feature::empty();
        for (i, (time, inten)) in self.time.iter().zip(self.intensity.iter()).enumerate() {
            if let Some(mz) = self.mz.get(i) {
                feature.push_raw(mz, *time, *inten as f32);
            }
        }
        feature
    }

    /// Pick chromatographic peaks with `picker`, using the preset for `mode` unless
    /// `params` are given. Replaces any previously picked peaks.
    pub fn find_peaks<P: PeakPicker + ?Sized>(
        &mut self,
        picker: &P,
        mode: SeparationMode,
        params: Option<CwtParams>,
    ) -> &[Peak] {
        let params = params.unwrap_or_else(|| mode.cwt_params());
        let widths = mode.widths();
        let peaks = picker.pick(&self.time, &self.intensity, &widths, &params);
        self.peaks.insert(peaks).as_slice()
    }

    /// Describe every picked peak, ordered by retention time.
    ///
    /// Fails with [`ROIError::PeaksNotPicked`] if [`Chromatogram::find_peaks`] has not
    /// been called.
    pub fn peak_params(
        &self,
        subtract_baseline: bool,
        center: CenterEstimation,
    ) -> Result<Vec<ChromatogramPeak>, ROIError> {
        let peaks = self.peaks.as_ref().ok_or(ROIError::PeaksNotPicked)?;
        let mz_mean = self.mz_mean().unwrap_or_default();
        let mz_std = self.mz_std();
        let mut rows = peaks
            .iter()
            .map(|peak| {
                let p = peak.params(&self.time, &self.intensity, subtract_baseline, center)?;
                Ok(ChromatogramPeak {
                    rt: p.location,
                    intensity: p.intensity,
                    area: p.area,
                    width: p.width,
                    mz_mean,
                    mz_std,
                })
            })
            .collect::<Result<Vec<_>, ROIError>>()?;
        rows.sort_by(|a, b| a.rt.total_cmp(&b.rt));
        Ok(rows)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn make_roi() -> ROI {
        ROI::new(
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
            vec![10.0, 30.0, 0.0, 30.0, 10.0],
            MassTrace::Series(vec![200.0, 200.002, 0.0, 200.002, 200.004]),
            12,
        )
    }

    #[test]
    fn test_mz_summaries() {
        let mut roi = make_roi();
        assert_eq!(roi.len(), 5);
        assert_eq!(roi.end, 17);
        let mean = roi.mz_mean().unwrap();
        assert!((mean - 200.002).abs() < 1e-9);
        let std = roi.mz_std().unwrap();
        assert!((std - (0.000008f64 / 4.0).sqrt()).abs() < 1e-9);
        assert_eq!(roi.apex(), Some((4.0, 30.0)));

        roi.collapse();
        assert_eq!(roi.mz, MassTrace::Scalar(mean));
        assert_eq!(roi.mz_std(), None);
    }

    #[test]
    fn test_to_feature() {
        let roi = make_roi();
        let feature = roi.to_feature();
        assert_eq!(feature.len(), 4);
    }

    #[test]
    fn test_peak_params_requires_peaks() -> Result<(), ROIError> {
        let mut roi = make_roi();
        assert_eq!(
            roi.peak_params(true, CenterEstimation::Apex).unwrap_err(),
            ROIError::PeaksNotPicked
        );

        let picker = |_: &[f64], _: &[f64], _: &[f64], _: &CwtParams| {
            vec![Peak::new(2, 3, 4), Peak::new(0, 1, 2)]
        };
        let found = roi.find_peaks(&picker, SeparationMode::Uplc, None);
        assert_eq!(found.len(), 2);

        let rows = roi.peak_params(false, CenterEstimation::Apex)?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rt, 2.0);
        assert_eq!(rows[1].rt, 4.0);
        assert_eq!(rows[1].intensity, 30.0);
        assert!((rows[0].mz_mean - 200.002).abs() < 1e-9);
        Ok(())
    }
}
