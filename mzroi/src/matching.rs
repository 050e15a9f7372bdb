//! Match the peaks of a new scan against the running m/z of a set of traces
use itertools::Itertools;
use mzpeaks::Tolerance;

use crate::error::ROIError;
use crate::modes::{MatchMode, Reducer};
use crate::search::{nearest_index_by, validate_tolerance, within_tolerance};

/// The outcome of matching one scan against a set of reference m/z values.
///
/// `index`, `mz` and `intensity` are aligned and sorted by reference slot. The
/// unmatched peaks are kept in their input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    pub index: Vec<usize>,
    pub mz: Vec<f64>,
    pub intensity: Vec<f64>,
    pub unmatched_mz: Vec<f64>,
    pub unmatched_intensity: Vec<f64>,
}

impl MatchResult {
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn into_unmatched(self) -> (Vec<f64>, Vec<f64>) {
        (self.unmatched_mz, self.unmatched_intensity)
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    slot: usize,
    peak: usize,
    error: f64,
}

/// Assigns new peaks to the nearest reference m/z within a tolerance, resolving
/// the cases where several peaks land on the same reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassMatcher {
    pub tolerance: Tolerance,
    pub mode: MatchMode,
    pub mz_reduce: Reducer,
    pub intensity_reduce: Reducer,
}

impl Default for MassMatcher {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::Da(0.005),
            mode: MatchMode::Closest,
            mz_reduce: Reducer::Mean,
            intensity_reduce: Reducer::Sum,
        }
    }
}

impl MassMatcher {
    pub fn new(
        tolerance: Tolerance,
        mode: MatchMode,
        mz_reduce: Reducer,
        intensity_reduce: Reducer,
    ) -> Result<Self, ROIError> {
        Ok(Self {
            tolerance: validate_tolerance(tolerance)?,
            mode,
            mz_reduce,
            intensity_reduce,
        })
    }

    /// Match `mz`/`intensity` against `reference`, which may be in any order.
    pub fn match_peaks(
        &self,
        reference: &[f64],
        mz: &[f64],
        intensity: &[f64],
    ) -> Result<MatchResult, ROIError> {
        let order = argsort(reference);
        self.match_ordered(reference, &order, mz, intensity)
    }

    /// As [`MassMatcher::match_peaks`], but with `order` holding the indices of `reference`
    /// sorted by value, so the caller can reuse it across scans.
    pub(crate) fn match_ordered(
        &self,
        reference: &[f64],
        order: &[usize],
        mz: &[f64],
        intensity: &[f64],
    ) -> Result<MatchResult, ROIError> {
        if mz.len() != intensity.len() {
            return Err(ROIError::invalid(format!(
                "m/z and intensity arrays must be the same length, got {} and {}",
                mz.len(),
                intensity.len()
            )));
        }

        let mut candidates: Vec<Candidate> = mz
            .iter()
            .enumerate()
            .filter_map(|(peak, query)| {
                let k = nearest_index_by(order.len(), |k| reference[order[k]], *query)?;
                let slot = order[k];
                let ref_mz = reference[slot];
                within_tolerance(self.tolerance, ref_mz, *query).then_some(Candidate {
                    slot,
                    peak,
                    error: (query - ref_mz).abs(),
                })
            })
            .collect();
        // Stable, so peaks keep their input order within a slot
        candidates.sort_by_key(|c| c.slot);

        let mut result = MatchResult::default();
        let mut is_matched = vec![false; mz.len()];

        for (slot, group) in &candidates.into_iter().group_by(|c| c.slot) {
            let group: Vec<Candidate> = group.collect();
            match self.mode {
                MatchMode::Closest => {
                    let best = group
                        .iter()
                        .min_by(|a, b| a.error.total_cmp(&b.error))
                        .copied();
                    if let Some(best) = best {
                        is_matched[best.peak] = true;
                        result.index.push(slot);
                        result.mz.push(mz[best.peak]);
                        result.intensity.push(intensity[best.peak]);
                    }
                }
                MatchMode::Reduce => {
                    let mzs = group.iter().map(|c| mz[c.peak]).collect_vec();
                    let ints = group.iter().map(|c| intensity[c.peak]).collect_vec();
                    group.iter().for_each(|c| is_matched[c.peak] = true);
                    result.index.push(slot);
                    result.mz.push(self.mz_reduce.reduce(&mzs));
                    result.intensity.push(self.intensity_reduce.reduce(&ints));
                }
            }
        }

        for (i, hit) in is_matched.into_iter().enumerate() {
            if !hit {
                result.unmatched_mz.push(mz[i]);
                result.unmatched_intensity.push(intensity[i]);
            }
        }
        Ok(result)
    }
}

/// The indices of `values` ordered by value
pub(crate) fn argsort(values: &[f64]) -> Vec<usize> {
    let mut order = (0..values.len()).collect_vec();
    order.sort_by(|a, b| values[*a].total_cmp(&values[*b]));
    order
}
