//! The boundary with a continuous wavelet transform peak picker, and the parameter
//! presets for the chromatographic and spectral dimensions.
//!
//! The picking algorithm itself is supplied by the caller through [`PeakPicker`].
//! This module only describes the peaks it returns and how to summarize them.
use std::fmt::Display;
use std::str::FromStr;

use crate::error::ROIError;

/// A peak found in a one dimensional signal, as indices into that signal.
///
/// `end` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Peak {
    pub start: usize,
    pub apex: usize,
    pub end: usize,
}

/// How to estimate the location of a [`Peak`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CenterEstimation {
    /// The coordinate of the most intense point
    Apex,
    /// The intensity-weighted mean coordinate over the peak's extent
    #[default]
    Weighted,
}

impl FromStr for CenterEstimation {
    type Err = ROIError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "apex" => Ok(Self::Apex),
            "weighted" => Ok(Self::Weighted),
            _ => Err(ROIError::invalid(format!(
                "center estimation `{s}` is not recognized, valid values are `apex` and `weighted`"
            ))),
        }
    }
}

impl Display for CenterEstimation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CenterEstimation::Apex => f.write_str("apex"),
            CenterEstimation::Weighted => f.write_str("weighted"),
        }
    }
}

/// Summary descriptors of a [`Peak`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeakParams {
    pub location: f64,
    pub intensity: f64,
    pub area: f64,
    pub width: f64,
}

impl Peak {
    pub fn new(start: usize, apex: usize, end: usize) -> Self {
        Self { start, apex, end }
    }

    /// The number of points spanned by this peak
    pub fn span(&self) -> usize {
        self.end + 1 - self.start
    }

    /// Compute the location, height, area and width of this peak over `(x, y)`.
    ///
    /// When `subtract_baseline` is set, the straight line joining the signal at `start`
    /// and `end` is removed from the intensity and the area, with negative residuals
    /// treated as zero.
    pub fn params(
        &self,
        x: &[f64],
        y: &[f64],
        subtract_baseline: bool,
        center: CenterEstimation,
    ) -> Result<PeakParams, ROIError> {
        if x.len() != y.len() {
            return Err(ROIError::invalid(format!(
                "coordinate and intensity arrays must be the same length, got {} and {}",
                x.len(),
                y.len()
            )));
        }
        if !(self.start <= self.apex && self.apex <= self.end && self.end < x.len()) {
            return Err(ROIError::invalid(format!(
                "peak {self:?} does not fit in a signal of length {}",
                x.len()
            )));
        }

        let (x0, x1) = (x[self.start], x[self.end]);
        let (y0, y1) = (y[self.start], y[self.end]);
        let baseline = |i: usize| -> f64 {
            if !subtract_baseline {
                0.0
            } else if x1 == x0 {
                y0
            } else {
                y0 + (y1 - y0) * (x[i] - x0) / (x1 - x0)
            }
        };
        let corrected: Vec<f64> = (self.start..=self.end)
            .map(|i| (y[i] - baseline(i)).max(0.0))
            .collect();
        let xs = &x[self.start..=self.end];

        let area = xs
            .windows(2)
            .zip(corrected.windows(2))
            .map(|(xw, yw)| (xw[1] - xw[0]) * (yw[0] + yw[1]) / 2.0)
            .sum();

        let location = match center {
            CenterEstimation::Apex => x[self.apex],
            CenterEstimation::Weighted => {
                let total: f64 = corrected.iter().sum();
                if total > 0.0 {
                    xs.iter().zip(corrected.iter()).map(|(a, w)| a * w).sum::<f64>() / total
                } else {
                    x[self.apex]
                }
            }
        };

        Ok(PeakParams {
            location,
            intensity: corrected[self.apex - self.start],
            area,
            width: x1 - x0,
        })
    }
}

/// Parameters forwarded to a [`PeakPicker`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CwtParams {
    pub snr: f64,
    pub bl_ratio: f64,
    pub min_length: Option<usize>,
    pub max_distance: Option<f64>,
    pub gap_thresh: usize,
    pub min_width: f64,
    pub max_width: f64,
}

impl Default for CwtParams {
    fn default() -> Self {
        SeparationMode::default().cwt_params()
    }
}

impl CwtParams {
    fn preset(min_width: f64, max_width: f64) -> Self {
        Self {
            snr: 10.0,
            bl_ratio: 2.0,
            min_length: None,
            max_distance: None,
            gap_thresh: 1,
            min_width,
            max_width,
        }
    }
}

/// A continuous wavelet transform peak picker.
///
/// Implemented for any function with the same signature as [`PeakPicker::pick`].
pub trait PeakPicker {
    fn pick(&self, x: &[f64], y: &[f64], widths: &[f64], params: &CwtParams) -> Vec<Peak>;
}

impl<F> PeakPicker for F
where
    F: Fn(&[f64], &[f64], &[f64], &CwtParams) -> Vec<Peak>,
{
    fn pick(&self, x: &[f64], y: &[f64], widths: &[f64], params: &CwtParams) -> Vec<Peak> {
        (self)(x, y, widths, params)
    }
}

fn linspace(start: f64, stop: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 {
        (stop - start) / (n - 1) as f64
    } else {
        0.0
    };
    (0..n).map(move |i| if i + 1 == n { stop } else { start + step * i as f64 })
}

/// Two linearly spaced runs of widths joined at `middle`, which appears once
fn two_stage_widths(min: f64, middle: f64, max: f64, n_low: usize, n_high: usize) -> Vec<f64> {
    linspace(min, middle, n_low)
        .take(n_low.saturating_sub(1))
        .chain(linspace(middle, max, n_high))
        .collect()
}

/// The chromatographic conditions a run was acquired under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SeparationMode {
    /// Longer columns with particles larger than 3 micron
    Hplc,
    /// Short columns with particles smaller than 3 micron
    #[default]
    Uplc,
}

impl SeparationMode {
    /// Peak widths to test, in seconds
    pub fn widths(&self) -> Vec<f64> {
        match self {
            SeparationMode::Hplc => two_stage_widths(1.0, 30.0, 90.0, 20, 20),
            SeparationMode::Uplc => two_stage_widths(1.0, 15.0, 60.0, 20, 20),
        }
    }

    pub fn cwt_params(&self) -> CwtParams {
        match self {
            SeparationMode::Hplc => CwtParams::preset(10.0, 90.0),
            SeparationMode::Uplc => CwtParams::preset(5.0, 60.0),
        }
    }
}

impl FromStr for SeparationMode {
    type Err = ROIError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hplc" => Ok(Self::Hplc),
            "uplc" => Ok(Self::Uplc),
            _ => Err(ROIError::invalid(format!(
                "separation mode `{s}` is not recognized, valid values are `hplc` and `uplc`"
            ))),
        }
    }
}

impl Display for SeparationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeparationMode::Hplc => f.write_str("hplc"),
            SeparationMode::Uplc => f.write_str("uplc"),
        }
    }
}

/// The kind of mass analyzer a spectrum was acquired with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum InstrumentMode {
    /// Peak widths of roughly 0.01-0.05 Da
    #[default]
    Qtof,
    /// Peak widths of roughly 0.001-0.005 Da
    Orbitrap,
}

impl InstrumentMode {
    /// Peak widths to test, in m/z units
    pub fn widths(&self) -> Vec<f64> {
        match self {
            InstrumentMode::Qtof => two_stage_widths(0.005, 0.1, 0.2, 20, 10),
            InstrumentMode::Orbitrap => two_stage_widths(0.0005, 0.001, 0.005, 20, 10),
        }
    }

    pub fn cwt_params(&self) -> CwtParams {
        match self {
            InstrumentMode::Qtof => CwtParams::preset(0.01, 0.2),
            InstrumentMode::Orbitrap => CwtParams::preset(0.0005, 0.005),
        }
    }
}

impl FromStr for InstrumentMode {
    type Err = ROIError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "qtof" => Ok(Self::Qtof),
            "orbitrap" => Ok(Self::Orbitrap),
            _ => Err(ROIError::invalid(format!(
                "instrument mode `{s}` is not recognized, valid values are `qtof` and `orbitrap`"
            ))),
        }
    }
}

impl Display for InstrumentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstrumentMode::Qtof => f.write_str("qtof"),
            InstrumentMode::Orbitrap => f.write_str("orbitrap"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_widths() {
        let widths = SeparationMode::Uplc.widths();
        assert_eq!(widths.len(), 39);
        assert_eq!(widths[0], 1.0);
        assert_eq!(widths[19], 15.0);
        assert_eq!(widths[38], 60.0);
        assert!(widths.windows(2).all(|w| w[0] < w[1]));

        let widths = InstrumentMode::Orbitrap.widths();
        assert_eq!(widths.len(), 29);
        assert_eq!(*widths.last().unwrap(), 0.005);
        assert!(widths.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(InstrumentMode::Qtof.widths()[0], 0.005);
    }

    #[test]
    fn test_presets() {
        let params = SeparationMode::Hplc.cwt_params();
        assert_eq!(params.min_width, 10.0);
        assert_eq!(params.max_width, 90.0);
        assert_eq!(params.snr, 10.0);
        assert_eq!(params.gap_thresh, 1);
        assert_eq!(InstrumentMode::Orbitrap.cwt_params().max_width, 0.005);
        assert!("gc".parse::<SeparationMode>().unwrap_err().is_invalid_argument());
        assert_eq!("Orbitrap".parse::<InstrumentMode>().unwrap(), InstrumentMode::Orbitrap);
    }

    #[test]
    fn test_peak_params() -> Result<(), ROIError> {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [1.0, 3.0, 5.0, 3.0, 1.0];
        let peak = Peak::new(0, 2, 4);

        let raw = peak.params(&x, &y, false, CenterEstimation::Apex)?;
        assert_eq!(raw.location, 2.0);
        assert_eq!(raw.intensity, 5.0);
        assert_eq!(raw.area, 12.0);
        assert_eq!(raw.width, 4.0);

        let corrected = peak.params(&x, &y, true, CenterEstimation::Weighted)?;
        assert_eq!(corrected.intensity, 4.0);
        assert_eq!(corrected.area, 8.0);
        assert!((corrected.location - 2.0).abs() < 1e-12);

        assert!(Peak::new(0, 2, 5)
            .params(&x, &y, false, CenterEstimation::Apex)
            .unwrap_err()
            .is_invalid_argument());
        Ok(())
    }
}
