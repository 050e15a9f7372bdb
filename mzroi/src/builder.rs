//! Drive [`TraceTracker`]s over a run of scans to build regions of interest
use mzpeaks::Tolerance;
use tracing::{debug, trace};

use crate::chromatogram::ROI;
use crate::error::ROIError;
use crate::matching::MassMatcher;
use crate::modes::{MatchMode, Reducer};
use crate::scan::ScanAccessor;
use crate::tracker::TraceTracker;

/// Parameters controlling how regions of interest are built
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ROIParams {
    pub tolerance: Tolerance,
    /// The number of consecutive scans a trace may miss before it is closed
    pub max_missing: usize,
    /// The minimum number of scans a closed trace must span to be kept
    pub min_length: usize,
    pub multiple_match: MatchMode,
    pub mz_reduce: Reducer,
    pub intensity_reduce: Reducer,
    pub start: Option<usize>,
    pub end: Option<usize>,
    /// When given, follow only these m/z values instead of every peak
    pub targeted_mz: Option<Vec<f64>>,
}

impl Default for ROIParams {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::Da(0.005),
            max_missing: 1,
            min_length: 5,
            multiple_match: MatchMode::Closest,
            mz_reduce: Reducer::Mean,
            intensity_reduce: Reducer::Sum,
            start: None,
            end: None,
            targeted_mz: None,
        }
    }
}

impl ROIParams {
    pub fn new(tolerance: Tolerance, max_missing: usize, min_length: usize) -> Self {
        Self {
            tolerance,
            max_missing,
            min_length,
            ..Default::default()
        }
    }

    pub fn with_multiple_match(mut self, mode: MatchMode) -> Self {
        self.multiple_match = mode;
        self
    }

    pub fn with_reducers(mut self, mz_reduce: Reducer, intensity_reduce: Reducer) -> Self {
        self.mz_reduce = mz_reduce;
        self.intensity_reduce = intensity_reduce;
        self
    }

    pub fn with_scan_range(mut self, start: Option<usize>, end: Option<usize>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_targets(mut self, targeted_mz: Vec<f64>) -> Self {
        self.targeted_mz = Some(targeted_mz);
        self
    }

    /// Check the parameters, producing the [`MassMatcher`] they describe
    pub fn validate(&self) -> Result<MassMatcher, ROIError> {
        if self.min_length == 0 {
            return Err(ROIError::invalid("minimum ROI length must be at least 1"));
        }
        if let Some(targets) = self.targeted_mz.as_ref() {
            if targets.is_empty() {
                return Err(ROIError::invalid("targeted m/z list cannot be empty"));
            }
            if targets.iter().any(|x| !x.is_finite() || *x <= 0.0) {
                return Err(ROIError::invalid("targeted m/z values must be positive"));
            }
        }
        MassMatcher::new(
            self.tolerance,
            self.multiple_match,
            self.mz_reduce,
            self.intensity_reduce,
        )
    }
}

/// Build regions of interest from the scans in `params`' scan range.
///
/// In untargeted mode, the peaks of the first scan seed the first tracker group, and
/// every later scan spawns a new group from whatever peaks all of the existing groups
/// left unmatched. Groups see the scan in the order they were created, each getting only
/// its predecessors' leftovers. In targeted mode a single group is seeded from
/// [`ROIParams::targeted_mz`] and nothing is spawned.
///
/// The result is ordered by tracker group, then by the scan each trace closed at. It is
/// the same for the same inputs.
pub fn build_roi<S: ScanAccessor + ?Sized>(
    scans: &S,
    params: &ROIParams,
) -> Result<Vec<ROI>, ROIError> {
    let matcher = params.validate()?;
    let range = scans.resolve_range(params.start, params.end)?;

    let mut groups: Vec<TraceTracker> = Vec::new();
    if let Some(targets) = params.targeted_mz.as_ref() {
        groups.push(TraceTracker::new(
            targets,
            range.len(),
            range.start,
            matcher,
            params.max_missing,
            params.min_length,
        )?);
    }
    let untargeted = params.targeted_mz.is_none();

    debug!(
        "Building ROIs over scans {}-{} ({})",
        range.start,
        range.end,
        if untargeted { "untargeted" } else { "targeted" }
    );

    let mut time: Vec<f64> = Vec::with_capacity(range.len());
    for index in range.clone() {
        let scan = scans.scan_at(index)?;
        time.push(scan.time);

        let mut mz = scan.mz.to_vec();
        let mut intensity = scan.intensity.to_vec();
        for group in groups.iter_mut() {
            let (rest_mz, rest_intensity) = group.add(&mz, &intensity)?;
            group.finalize_due(&time[group.first_scan() - range.start..])?;
            mz = rest_mz;
            intensity = rest_intensity;
        }

        trace!(
            "Scan {index} left {} of {} peaks unmatched across {} groups",
            mz.len(),
            scan.len(),
            groups.len()
        );

        if untargeted && !mz.is_empty() {
            let group = TraceTracker::spawn(
                &mz,
                &intensity,
                range.end - index,
                index,
                matcher,
                params.max_missing,
                params.min_length,
            )?;
            debug!(
                "Spawned tracker group {} at scan {index} with {} slots",
                groups.len(),
                group.slot_count()
            );
            groups.push(group);
        }
    }

    let mut rois = Vec::new();
    for group in groups.iter_mut() {
        group.force_complete();
        group.finalize_due(&time[group.first_scan() - range.start..])?;
        rois.extend(group.take_completed());
    }
    debug!(
        "Built {} ROIs from {} tracker groups",
        rois.len(),
        groups.len()
    );
    Ok(rois)
}
