//! Search a spectrum for the isotopic peaks of a known monoisotopic m/z
use mzpeaks::Tolerance;
use tracing::trace;

use crate::error::ROIError;
use crate::search::{nearest_index, validate_tolerance, within_tolerance};

/// The mass difference between <sup>13</sup>C and <sup>12</sup>C
pub const C13_MASS_DIFFERENCE: f64 = 1.003355;

/// The peaks of one isotopic envelope and the charge state that explains them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IsotopicEnvelope {
    pub charge: i32,
    /// Indices into the searched m/z array, starting with the monoisotopic peak
    pub indices: Vec<usize>,
}

impl IsotopicEnvelope {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Find the peaks of `mz` matching the first `n_isotopes` isotopes of `mz_mono` at
/// a single `charge`. Empty if the monoisotopic peak is not found.
///
/// Each isotope contributes its nearest peak, so a wide `tolerance` may repeat an index.
pub fn isotopic_peaks_for_charge(
    mz: &[f64],
    mz_mono: f64,
    charge: i32,
    n_isotopes: usize,
    tolerance: Tolerance,
) -> Vec<usize> {
    let Some(mono_index) = nearest_index(mz, mz_mono) else {
        return Vec::new();
    };
    let observed_mono = mz[mono_index];
    if !within_tolerance(tolerance, mz_mono, observed_mono) {
        return Vec::new();
    }
    let spacing = C13_MASS_DIFFERENCE / charge.abs() as f64;
    (0..n_isotopes)
        .filter_map(|k| {
            let theoretical = observed_mono + k as f64 * spacing;
            let i = nearest_index(mz, theoretical)?;
            within_tolerance(tolerance, theoretical, mz[i]).then_some(i)
        })
        .collect()
}

/// Find the isotopic envelope of `mz_mono` in `mz`, trying every charge state from 1
/// to `max_charge`.
///
/// The charge state matching the most isotopic peaks wins. A later charge state
/// replaces an earlier one only if it matches strictly more peaks, so ties go to the
/// lowest charge.
pub fn find_isotopic_envelope(
    mz: &[f64],
    mz_mono: f64,
    max_charge: i32,
    n_isotopes: usize,
    tolerance: Tolerance,
) -> Result<Option<IsotopicEnvelope>, ROIError> {
    let tolerance = validate_tolerance(tolerance)?;
    if max_charge < 1 {
        return Err(ROIError::invalid(format!(
            "maximum charge must be at least 1, got {max_charge}"
        )));
    }
    if n_isotopes == 0 {
        return Err(ROIError::invalid("must search for at least one isotope"));
    }

    let mut best: Option<IsotopicEnvelope> = None;
    for charge in 1..=max_charge {
        let indices = isotopic_peaks_for_charge(mz, mz_mono, charge, n_isotopes, tolerance);
        trace!("Charge {charge} matched {} isotopic peaks for {mz_mono}", indices.len());
        let best_len = best.as_ref().map(|b| b.len()).unwrap_or_default();
        if indices.len() > best_len {
            best = Some(IsotopicEnvelope { charge, indices });
        }
    }
    Ok(best)
}

/// As [`find_isotopic_envelope`], returning only the peak indices
pub fn search_isotopic_envelope(
    mz: &[f64],
    mz_mono: f64,
    max_charge: i32,
    n_isotopes: usize,
    tolerance: Tolerance,
) -> Result<Vec<usize>, ROIError> {
    Ok(find_isotopic_envelope(mz, mz_mono, max_charge, n_isotopes, tolerance)?
        .map(|env| env.indices)
        .unwrap_or_default())
}
