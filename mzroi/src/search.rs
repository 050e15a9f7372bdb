//! Sorted-array lookups shared by the matching, extraction and isotope searches
use std::ops::Range;

use mzpeaks::Tolerance;

use crate::error::ROIError;

/// Find the index of the value in `sorted` nearest to `query`.
///
/// Ties between two neighbors resolve to the larger value. Returns `None` only if
/// `sorted` is empty.
pub fn nearest_index(sorted: &[f64], query: f64) -> Option<usize> {
    nearest_index_by(sorted.len(), |i| sorted[i], query)
}

/// As [`nearest_index`], for a sequence sorted through an accessor `value_at`.
pub(crate) fn nearest_index_by<F: Fn(usize) -> f64>(
    n: usize,
    value_at: F,
    query: f64,
) -> Option<usize> {
    if n == 0 {
        return None;
    }
    let (mut lo, mut hi) = (0usize, n);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if value_at(mid) < query {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    if lo == n {
        return Some(n - 1);
    }
    if lo == 0 {
        return Some(0);
    }
    let below = (query - value_at(lo - 1)).abs();
    let above = (value_at(lo) - query).abs();
    if below < above {
        Some(lo - 1)
    } else {
        Some(lo)
    }
}

/// The half-open index range of `sorted` whose values lie in the closed interval
/// `[low, high]`.
pub fn closed_interval(sorted: &[f64], low: f64, high: f64) -> Range<usize> {
    let start = sorted.partition_point(|x| *x < low);
    let end = sorted.partition_point(|x| *x <= high).max(start);
    start..end
}

/// Test whether `value` lies within `tolerance` of `reference`, with closed bounds
#[inline]
pub fn within_tolerance(tolerance: Tolerance, reference: f64, value: f64) -> bool {
    let (low, high) = tolerance.bounds(reference);
    low <= value && value <= high
}

/// Reject tolerances that cannot match anything
pub fn validate_tolerance(tolerance: Tolerance) -> Result<Tolerance, ROIError> {
    let (low, high) = tolerance.bounds(1000.0);
    if high - low > 0.0 {
        Ok(tolerance)
    } else {
        Err(ROIError::invalid(format!(
            "tolerance must be greater than zero, got {tolerance:?}"
        )))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_nearest_index() {
        let values = [100.0, 101.0, 102.5, 110.0];
        assert_eq!(nearest_index(&values, 50.0), Some(0));
        assert_eq!(nearest_index(&values, 100.4), Some(0));
        assert_eq!(nearest_index(&values, 101.9), Some(2));
        assert_eq!(nearest_index(&values, 100.5), Some(1));
        assert_eq!(nearest_index(&values, 200.0), Some(3));
        assert_eq!(nearest_index(&[], 200.0), None);
    }

    #[test]
    fn test_closed_interval() {
        let values = [100.0, 100.005, 100.01, 100.02];
        assert_eq!(closed_interval(&values, 100.0, 100.01), 0..3);
        assert_eq!(closed_interval(&values, 100.011, 100.015), 3..3);
        assert_eq!(closed_interval(&values, 100.015, 200.0), 3..4);
        assert_eq!(closed_interval(&values, 300.0, 400.0), 4..4);
    }

    #[test]
    fn test_validate_tolerance() {
        assert!(validate_tolerance(Tolerance::Da(0.005)).is_ok());
        assert!(validate_tolerance(Tolerance::PPM(10.0)).is_ok());
        assert!(validate_tolerance(Tolerance::Da(0.0)).is_err());
        assert!(validate_tolerance(Tolerance::Da(-1.0)).is_err());
    }
}
