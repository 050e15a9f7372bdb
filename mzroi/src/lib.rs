//! Extract regions of interest, extracted ion chromatograms and accumulated spectra
//! from a run of centroided LC-MS scans.
//!
//! The central piece is [`build_roi`], which follows every m/z trace across the scans
//! of a run with a set of [`TraceTracker`]s and returns the traces long enough to be
//! peak picked.
pub mod accumulate;
pub mod api;
pub mod builder;
pub mod chromatogram;
pub mod eic;
pub mod error;
pub mod interpolate;
pub mod isotopes;
pub mod matching;
pub mod modes;
pub mod peaks;
pub mod scan;
pub mod search;
pub mod tracker;

pub use accumulate::AccumulatedSpectrum;
pub use api::{accumulate_spectrum, extract_eic, AccumulateParams};
pub use builder::{build_roi, ROIParams};
pub use chromatogram::{Chromatogram, ChromatogramPeak, MassTrace, ROI};
pub use eic::ExtractedIonChromatograms;
pub use error::ROIError;
pub use isotopes::{find_isotopic_envelope, search_isotopic_envelope, IsotopicEnvelope};
pub use matching::{MassMatcher, MatchResult};
pub use modes::{Accumulator, Extrapolation, InterpolationKind, MatchMode, Reducer};
pub use peaks::{
    CenterEstimation, CwtParams, InstrumentMode, Peak, PeakParams, PeakPicker, SeparationMode,
};
pub use scan::{Scan, ScanAccessor, SpectrumView};
pub use tracker::{SlotState, TraceTracker};

pub use mzpeaks::Tolerance;
