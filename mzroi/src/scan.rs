//! Access to the scans of an LC-MS run.
//!
//! The algorithms in this crate never read files themselves. They consume anything
//! implementing [`ScanAccessor`], which hands out one [`SpectrumView`] per scan index.
use std::ops::Range;

use crate::error::ROIError;

/// A borrowed view of a single centroided scan.
///
/// `mz` is sorted in ascending order and `intensity` is aligned with it index-wise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumView<'a> {
    pub time: f64,
    pub mz: &'a [f64],
    pub intensity: &'a [f64],
}

impl<'a> SpectrumView<'a> {
    pub fn new(time: f64, mz: &'a [f64], intensity: &'a [f64]) -> Self {
        Self {
            time,
            mz,
            intensity,
        }
    }

    pub fn len(&self) -> usize {
        self.mz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }

    /// The smallest and largest m/z observed in this scan
    pub fn mz_range(&self) -> Option<(f64, f64)> {
        Some((*self.mz.first()?, *self.mz.last()?))
    }
}

/// An owned scan record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scan {
    pub time: f64,
    mz: Vec<f64>,
    intensity: Vec<f64>,
}

impl Scan {
    /// Create a new scan, checking that the arrays are aligned and that `mz` is
    /// non-decreasing.
    pub fn new(time: f64, mz: Vec<f64>, intensity: Vec<f64>) -> Result<Self, ROIError> {
        if mz.len() != intensity.len() {
            return Err(ROIError::invalid(format!(
                "m/z and intensity arrays must be the same length, got {} and {}",
                mz.len(),
                intensity.len()
            )));
        }
        if mz.windows(2).any(|w| w[1] < w[0]) {
            return Err(ROIError::invalid("m/z array must be sorted in ascending order"));
        }
        Ok(Self {
            time,
            mz,
            intensity,
        })
    }

    pub fn mz(&self) -> &[f64] {
        &self.mz
    }

    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }

    pub fn len(&self) -> usize {
        self.mz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }

    pub fn as_view(&self) -> SpectrumView<'_> {
        SpectrumView::new(self.time, &self.mz, &self.intensity)
    }
}

/// Random access to the scans of a run, in acquisition order
pub trait ScanAccessor {
    fn scan_count(&self) -> usize;

    fn get_scan(&self, index: usize) -> Option<SpectrumView<'_>>;

    /// As [`ScanAccessor::get_scan`], but a missing scan is an error
    fn scan_at(&self, index: usize) -> Result<SpectrumView<'_>, ROIError> {
        self.get_scan(index).ok_or(ROIError::ScanOutOfRange {
            index,
            count: self.scan_count(),
        })
    }

    /// Resolve an optional `[start, end)` scan range against this run, defaulting to
    /// the whole run. An empty range is allowed, so a run without scans resolves to `0..0`.
    fn resolve_range(&self, start: Option<usize>, end: Option<usize>) -> Result<Range<usize>, ROIError> {
        let count = self.scan_count();
        let start = start.unwrap_or(0);
        let end = end.unwrap_or(count);
        if end > count {
            return Err(ROIError::invalid(format!(
                "scan range end {end} is past the last scan ({count} scans)"
            )));
        }
        if start > end {
            return Err(ROIError::invalid(format!(
                "scan range start {start} must not be past its end {end}"
            )));
        }
        Ok(start..end)
    }
}

impl ScanAccessor for [Scan] {
    fn scan_count(&self) -> usize {
        self.len()
    }

    fn get_scan(&self, index: usize) -> Option<SpectrumView<'_>> {
        self.get(index).map(Scan::as_view)
    }
}

impl ScanAccessor for Vec<Scan> {
    fn scan_count(&self) -> usize {
        self.len()
    }

    fn get_scan(&self, index: usize) -> Option<SpectrumView<'_>> {
        self.as_slice().get_scan(index)
    }
}

impl<T: ScanAccessor + ?Sized> ScanAccessor for &T {
    fn scan_count(&self) -> usize {
        (**self).scan_count()
    }

    fn get_scan(&self, index: usize) -> Option<SpectrumView<'_>> {
        (**self).get_scan(index)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_scan_validation() {
        assert!(Scan::new(1.0, vec![100.0, 101.0], vec![1.0]).is_err());
        assert!(Scan::new(1.0, vec![101.0, 100.0], vec![1.0, 2.0]).is_err());
        let scan = Scan::new(1.0, vec![100.0, 100.0, 101.0], vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(scan.as_view().mz_range(), Some((100.0, 101.0)));
        assert_eq!(Scan::default().as_view().mz_range(), None);
    }

    #[test]
    fn test_resolve_range() {
        let scans: Vec<Scan> = (0..4).map(|i| Scan::new(i as f64, vec![], vec![]).unwrap()).collect();
        assert_eq!(scans.resolve_range(None, None).unwrap(), 0..4);
        assert_eq!(scans.resolve_range(Some(1), Some(3)).unwrap(), 1..3);
        assert_eq!(scans.resolve_range(Some(2), Some(2)).unwrap(), 2..2);
        assert!(scans.resolve_range(Some(3), Some(2)).unwrap_err().is_invalid_argument());
        assert!(scans.resolve_range(None, Some(5)).unwrap_err().is_invalid_argument());
        assert_eq!(Vec::<Scan>::new().resolve_range(None, None).unwrap(), 0..0);
        assert_eq!(
            scans.scan_at(7).unwrap_err(),
            ROIError::ScanOutOfRange { index: 7, count: 4 }
        );
    }
}
