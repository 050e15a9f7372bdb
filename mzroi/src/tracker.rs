//! Follow many m/z traces across consecutive scans at once.
//!
//! A [`TraceTracker`] owns one group of slots. Each slot has a running mean m/z that
//! new peaks are matched against, and an open trace while the slot keeps matching.
//! Traces that miss too many scans in a row are closed, and emitted as [`ROI`]s if
//! they are long enough.
use tracing::trace;

use crate::chromatogram::{MassTrace, ROI};
use crate::error::ROIError;
use crate::matching::{argsort, MassMatcher};

/// The per-slot state of a [`TraceTracker`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotState {
    /// No open trace, the slot still matches new peaks
    Idle,
    /// The last scan matched this slot
    Active,
    /// The open trace has missed this many consecutive scans
    Stalled(usize),
}

/// A group of traces seeded together and fed the same scans.
///
/// Buffers are allocated once, one row of `capacity` columns per slot. Column `j`
/// corresponds to the `first_scan + j`th scan of the run.
#[derive(Debug, Clone)]
pub struct TraceTracker {
    matcher: MassMatcher,
    max_missing: usize,
    min_length: usize,
    first_scan: usize,
    capacity: usize,
    column: usize,
    mean: Vec<f64>,
    counter: Vec<usize>,
    missing: Vec<usize>,
    start: Vec<usize>,
    last_hit: Vec<usize>,
    live: Vec<bool>,
    order: Vec<usize>,
    mz: Vec<f64>,
    intensity: Vec<f64>,
    completed: Vec<ROI>,
}

impl TraceTracker {
    /// Create a tracker whose slots are seeded with `seed`, which act as one prior
    /// observation of each slot's mean. No trace is open until a seed is matched.
    pub fn new(
        seed: &[f64],
        capacity: usize,
        first_scan: usize,
        matcher: MassMatcher,
        max_missing: usize,
        min_length: usize,
    ) -> Result<Self, ROIError> {
        if seed.iter().any(|x| !x.is_finite()) {
            return Err(ROIError::invalid("seed m/z values must be finite"));
        }
        let n = seed.len();
        let mean = seed.to_vec();
        let order = argsort(&mean);
        Ok(Self {
            matcher,
            max_missing,
            min_length,
            first_scan,
            capacity,
            column: 0,
            mean,
            counter: vec![1; n],
            missing: vec![0; n],
            start: vec![0; n],
            last_hit: vec![0; n],
            live: vec![false; n],
            order,
            mz: vec![0.0; n * capacity],
            intensity: vec![0.0; n * capacity],
            completed: Vec::new(),
        })
    }

    /// Create a tracker from the peaks of its first scan, opening a trace in every slot.
    pub fn spawn(
        mz: &[f64],
        intensity: &[f64],
        capacity: usize,
        first_scan: usize,
        matcher: MassMatcher,
        max_missing: usize,
        min_length: usize,
    ) -> Result<Self, ROIError> {
        if mz.len() != intensity.len() {
            return Err(ROIError::invalid(format!(
                "m/z and intensity arrays must be the same length, got {} and {}",
                mz.len(),
                intensity.len()
            )));
        }
        if capacity == 0 {
            return Err(ROIError::invalid("cannot spawn a tracker with no scans left"));
        }
        let mut this = Self::new(mz, capacity, first_scan, matcher, max_missing, min_length)?;
        for (slot, inten) in intensity.iter().enumerate() {
            let cell = slot * capacity;
            this.mz[cell] = mz[slot];
            this.intensity[cell] = *inten;
            this.live[slot] = true;
        }
        this.column = 1;
        Ok(this)
    }

    pub fn slot_count(&self) -> usize {
        self.mean.len()
    }

    pub fn first_scan(&self) -> usize {
        self.first_scan
    }

    /// The number of scans fed to this tracker so far
    pub fn scans_seen(&self) -> usize {
        self.column
    }

    pub fn mean_mz(&self) -> &[f64] {
        &self.mean
    }

    pub fn slot_state(&self, slot: usize) -> Option<SlotState> {
        if slot >= self.slot_count() {
            None
        } else if !self.live[slot] {
            Some(SlotState::Idle)
        } else if self.missing[slot] == 0 {
            Some(SlotState::Active)
        } else {
            Some(SlotState::Stalled(self.missing[slot]))
        }
    }

    /// The number of traces with data that are still open
    pub fn open_traces(&self) -> usize {
        self.live.iter().filter(|x| **x).count()
    }

    /// Feed the next scan, returning the peaks that matched no slot
    pub fn add(&mut self, mz: &[f64], intensity: &[f64]) -> Result<(Vec<f64>, Vec<f64>), ROIError> {
        if self.column >= self.capacity {
            return Err(ROIError::invalid(format!(
                "tracker starting at scan {} is full after {} scans",
                self.first_scan, self.capacity
            )));
        }
        let result = self
            .matcher
            .match_ordered(&self.mean, &self.order, mz, intensity)?;

        let column = self.column;
        for slot in 0..self.slot_count() {
            if self.live[slot] {
                self.missing[slot] += 1;
            }
        }

        for ((slot, x), y) in result
            .index
            .iter()
            .copied()
            .zip(result.mz.iter().copied())
            .zip(result.intensity.iter().copied())
        {
            let cell = slot * self.capacity + column;
            self.mz[cell] = x;
            self.intensity[cell] = y;

            let n = self.counter[slot] as f64;
            self.mean[slot] = (self.mean[slot] * n + x) / (n + 1.0);
            self.counter[slot] += 1;

            if !self.live[slot] {
                self.live[slot] = true;
                self.start[slot] = column;
            }
            self.missing[slot] = 0;
            self.last_hit[slot] = column;
        }

        if !result.is_empty() && !self.is_ordered() {
            self.order = argsort(&self.mean);
        }
        self.column += 1;

        trace!(
            "Tracker at scan {} matched {} of {} peaks in column {column}",
            self.first_scan,
            result.len(),
            mz.len()
        );
        Ok(result.into_unmatched())
    }

    fn is_ordered(&self) -> bool {
        self.order
            .windows(2)
            .all(|w| self.mean[w[0]] <= self.mean[w[1]])
    }

    /// Close every open trace that has missed more than `max_missing` consecutive scans.
    ///
    /// A closed trace spanning at least `min_length` scans, from its first to its last
    /// match, is kept as a completed [`ROI`]; shorter ones are dropped. `time` holds the
    /// retention times of the scans fed so far, starting at this tracker's first scan.
    pub fn finalize_due(&mut self, time: &[f64]) -> Result<usize, ROIError> {
        if time.len() < self.column {
            return Err(ROIError::invalid(format!(
                "expected at least {} retention times for the tracker starting at scan {}, got {}",
                self.column,
                self.first_scan,
                time.len()
            )));
        }
        let mut emitted = 0;
        for slot in 0..self.slot_count() {
            if !self.live[slot] || self.missing[slot] <= self.max_missing {
                continue;
            }
            let start = self.start[slot];
            let end = self.last_hit[slot] + 1;
            if end - start >= self.min_length {
                let row = slot * self.capacity;
                let roi = ROI::new(
                    time[start..end].to_vec(),
                    self.intensity[row + start..row + end].to_vec(),
                    MassTrace::Series(self.mz[row + start..row + end].to_vec()),
                    self.first_scan + start,
                );
                self.completed.push(roi);
                emitted += 1;
            }
            self.live[slot] = false;
            self.missing[slot] = 0;
        }
        Ok(emitted)
    }

    /// Mark every open trace as overdue, so the next [`TraceTracker::finalize_due`]
    /// closes all of them.
    pub fn force_complete(&mut self) {
        let overdue = self.max_missing + 1;
        for (missing, live) in self.missing.iter_mut().zip(self.live.iter()) {
            if *live {
                *missing = overdue;
            }
        }
    }

    pub fn completed(&self) -> &[ROI] {
        &self.completed
    }

    pub fn take_completed(&mut self) -> Vec<ROI> {
        std::mem::take(&mut self.completed)
    }
}
