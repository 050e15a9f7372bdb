use std::fs;
use std::io::{self, prelude::*};
use std::path::PathBuf;
use std::str::FromStr;
use std::thread;
use std::time::Instant;

use clap::{builder::TypedValueParser, parser::ValueSource, ArgMatches, CommandFactory, FromArgMatches, Parser};
use serde::{Deserialize, Serialize};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    value::{Dict, Value},
    Figment,
};
use flate2::write::GzEncoder;
use flate2::Compression;
use rayon::prelude::*;
use thiserror::Error;

use tracing::{debug, info, warn};

use mzdata::io::{
    infer_format, infer_from_stream,
    mgf::MGFReaderType,
    mzml::MzMLReaderType,
    MassSpectrometryFormat, PreBufferedStream, RestartableGzDecoder, StreamingSpectrumIterator,
};
use mzdata::prelude::*;
use mzdata::spectrum::SignalContinuity;

use mzroi::{build_roi, ROIError, ROIParams, Scan, ROI};

use crate::args::{ArgMatchMode, ArgReducer, ArgTolerance};
use crate::time_range::TimeRange;
use crate::types::SpectrumType;

#[derive(Debug, Error)]
pub enum MZRoierError {
    #[error("An IO error occurred: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
    #[error("The input file format for {0} was either unknown or not supported ({1:?})")]
    FormatUnknownOrNotSupportedError(String, MassSpectrometryFormat),
    #[error("The input file format from STDIN was either unknown or not supported ({0:?})")]
    FormatUnknownOrNotSupportedErrorStdIn(MassSpectrometryFormat),
    #[error("Failed to centroid spectrum {0}: {1}")]
    PeakPickingError(String, String),
    #[error("Failed to build regions of interest: {0}")]
    ROIError(
        #[source]
        #[from]
        ROIError,
    ),
    #[error("Failed to read configuration: {0}")]
    ConfigurationError(
        #[source]
        #[from]
        Box<figment::Error>,
    ),
    #[error("Failed to create the thread pool: {0}")]
    ThreadPoolError(
        #[source]
        #[from]
        rayon::ThreadPoolBuildError,
    ),
    #[error("Failed to initialize logging: {0}")]
    LoggingError(String),
}

impl From<figment::Error> for MZRoierError {
    fn from(value: figment::Error) -> Self {
        Self::ConfigurationError(Box::new(value))
    }
}

fn default_output_file() -> PathBuf {
    PathBuf::from("-")
}

/// Region of interest extraction from LC-MS data files.
///
/// Read the MS1 scans of a file or stream, follow every m/z trace across them, and
/// write out a tab-separated table with one row per region of interest.
#[derive(Parser, Debug, Clone, Deserialize, Serialize)]
#[command(author, version)]
pub struct MZRoier {
    /// The path to read the input spectra from, or if '-' is passed, read from STDIN
    #[arg()]
    pub input_file: String,

    /// The path to write the ROI table to, or if '-' is passed, write to STDOUT.
    ///
    /// Paths ending in `.gz` are gzip compressed.
    #[arg(short = 'o', long = "output-file", default_value = "-")]
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,

    /// The path to write a log file to, in addition to STDERR
    #[arg(short = 'l', long = "log-file")]
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// A TOML configuration file to read additional parameters from.
    ///
    /// Configurations are also read from `mzroier.toml` in the working directory.
    /// Environment variables prefixed with `MZROIER_` will be read too. Options given
    /// on the command line take precedence over both.
    #[arg(long = "config-file")]
    #[serde(default)]
    pub config_file: Option<PathBuf>,

    /// The number of threads to use, passing a value < 1 to use all available threads
    #[arg(
        short='t',
        long="threads",
        default_value_t=-1,
    )]
    #[serde(default = "default_threads")]
    pub threads: i32,

    /// The time range to process, denoted (start?)-(stop?)
    #[arg(
        short='r',
        long="time-range",
        value_parser=TimeRange::from_str,
        value_name="BEGIN-END",
        long_help=r#"The time range to process, denoted (start?)-(stop?)

If a start is not specified, processing begins from the start of the run.
If a stop is not specified, processing stops at the end of the run.
"#
    )]
    #[serde(default)]
    pub time_range: Option<TimeRange>,

    /// Follow only these m/z values, separated by commas, instead of every peak
    #[arg(long = "targets", value_delimiter = ',', num_args = 1..)]
    #[serde(default)]
    pub targets: Vec<f64>,

    /// The mass tolerance for matching peaks to a trace, e.g. `0.005da` or `10ppm`
    #[arg(short = 'e', long = "tolerance", default_value_t = ArgTolerance::default())]
    #[serde(default)]
    pub tolerance: ArgTolerance,

    /// The number of consecutive scans a trace may miss before it is closed
    #[arg(short = 'm', long = "max-missing", default_value_t = 1)]
    #[serde(default = "default_max_missing")]
    pub max_missing: usize,

    /// The minimum number of scans a trace must span to be reported
    #[arg(
        short = 'n',
        long = "min-length",
        default_value_t = 5,
        value_parser = clap::value_parser!(u32).range(1..).map(|v| v as usize),
    )]
    #[serde(default = "default_min_length")]
    pub min_length: usize,

    /// What to do when several peaks in one scan match the same trace
    #[arg(long = "multiple-match", default_value = "closest")]
    #[serde(default)]
    pub multiple_match: ArgMatchMode,

    /// How to combine the m/z of merged peaks
    #[arg(long = "mz-reduce", default_value = "mean")]
    #[serde(default = "default_mz_reduce")]
    pub mz_reduce: ArgReducer,

    /// How to combine the intensity of merged peaks
    #[arg(long = "intensity-reduce", default_value = "sum")]
    #[serde(default = "default_intensity_reduce")]
    pub intensity_reduce: ArgReducer,
}

fn default_threads() -> i32 {
    -1
}

fn default_max_missing() -> usize {
    1
}

fn default_min_length() -> usize {
    5
}

fn default_mz_reduce() -> ArgReducer {
    ArgReducer::Mean
}

fn default_intensity_reduce() -> ArgReducer {
    ArgReducer::Sum
}

/// Convert one spectrum into a centroided [`Scan`], picking peaks from profile data
pub(crate) fn spectrum_to_scan(mut spectrum: SpectrumType) -> Result<Scan, MZRoierError> {
    let time = spectrum.start_time();
    let id = spectrum.id().to_string();
    if spectrum.signal_continuity() == SignalContinuity::Profile {
        spectrum
            .pick_peaks(1.0)
            .map_err(|e| MZRoierError::PeakPickingError(id.clone(), e.to_string()))?;
        spectrum.description_mut().signal_continuity = SignalContinuity::Centroid;
    }
    let peaks = spectrum
        .try_build_centroids()
        .map_err(|e| MZRoierError::PeakPickingError(id, e.to_string()))?;
    let (mz, intensity): (Vec<f64>, Vec<f64>) =
        peaks.iter().map(|p| (p.mz, p.intensity as f64)).unzip();
    Ok(Scan::new(time, mz, intensity)?)
}

impl MZRoier {
    /// Parse the process arguments and layer the configuration sources under them
    pub fn from_command_line() -> Result<Self, MZRoierError> {
        let matches = Self::command().get_matches();
        let args = Self::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
        args.load_configuration_from(&matches)
    }

    fn layered(&self) -> Figment {
        let mut config = Figment::from(Serialized::defaults(self)).merge(Toml::file("mzroier.toml"));
        if let Some(path) = self.config_file.as_ref() {
            config = config.merge(Toml::file_exact(path));
        }
        config.merge(Env::prefixed("MZROIER_"))
    }

    /// Merge `mzroier.toml`, the `--config-file` and `MZROIER_` environment variables
    /// over these arguments.
    pub fn load_configuration(self) -> Result<Self, MZRoierError> {
        Ok(self.layered().extract()?)
    }

    /// As [`MZRoier::load_configuration`], but every option `matches` saw on the
    /// command line is merged last and wins over the other sources.
    pub fn load_configuration_from(self, matches: &ArgMatches) -> Result<Self, MZRoierError> {
        let mut explicit = Dict::new();
        if let Some(values) = Value::serialize(&self)?.into_dict() {
            explicit.extend(values.into_iter().filter(|(key, _)| {
                matches.ids().any(|id| id.as_str() == key.as_str())
                    && matches.value_source(key) == Some(ValueSource::CommandLine)
            }));
        }
        Ok(self
            .layered()
            .merge(Serialized::defaults(explicit))
            .extract()?)
    }

    pub fn roi_params(&self) -> ROIParams {
        let params = ROIParams::new(self.tolerance.into(), self.max_missing, self.min_length)
            .with_multiple_match(self.multiple_match.into())
            .with_reducers(self.mz_reduce.into(), self.intensity_reduce.into());
        if self.targets.is_empty() {
            params
        } else {
            params.with_targets(self.targets.clone())
        }
    }

    fn create_threadpool(&self) -> Result<rayon::ThreadPool, MZRoierError> {
        let num_threads = if self.threads > 0 {
            self.threads as usize
        } else {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        };
        debug!("Using {} cores", num_threads);
        Ok(rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?)
    }

    pub fn main(&self) -> Result<(), MZRoierError> {
        info!(
            "mzroier v{}",
            option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
        );
        info!("Input: {}", self.input_file);
        info!("Output: {}", self.output_file.display());
        let pool = self.create_threadpool()?;
        pool.install(|| self.reader_then())
    }

    fn reader_then(&self) -> Result<(), MZRoierError> {
        let scans = if self.input_file == "-" {
            let mut buffered =
                PreBufferedStream::new_with_buffer_size(io::stdin(), 2usize.pow(20))?;
            let (ms_format, compressed) = infer_from_stream(&mut buffered)?;
            debug!("Detected {ms_format:?} from STDIN (compressed? {compressed})");
            match ms_format {
                MassSpectrometryFormat::MGF => {
                    if compressed {
                        self.load_scans(StreamingSpectrumIterator::new(MGFReaderType::new(
                            RestartableGzDecoder::new(io::BufReader::new(buffered)),
                        )))?
                    } else {
                        self.load_scans(StreamingSpectrumIterator::new(MGFReaderType::new(
                            buffered,
                        )))?
                    }
                }
                MassSpectrometryFormat::MzML => {
                    if compressed {
                        self.load_scans(StreamingSpectrumIterator::new(MzMLReaderType::new(
                            RestartableGzDecoder::new(io::BufReader::new(buffered)),
                        )))?
                    } else {
                        self.load_scans(StreamingSpectrumIterator::new(MzMLReaderType::new(
                            buffered,
                        )))?
                    }
                }
                _ => return Err(MZRoierError::FormatUnknownOrNotSupportedErrorStdIn(ms_format)),
            }
        } else {
            let (ms_format, compressed) = infer_format(&self.input_file)?;
            debug!("Detected {ms_format:?} from path (compressed? {compressed})");
            match ms_format {
                MassSpectrometryFormat::MGF => {
                    if compressed {
                        let fh = RestartableGzDecoder::new(io::BufReader::new(fs::File::open(
                            &self.input_file,
                        )?));
                        self.load_scans(StreamingSpectrumIterator::new(MGFReaderType::new(fh)))?
                    } else {
                        self.load_scans(MGFReaderType::open_path(self.input_file.clone())?)?
                    }
                }
                MassSpectrometryFormat::MzML => {
                    if compressed {
                        let fh = RestartableGzDecoder::new(io::BufReader::new(fs::File::open(
                            &self.input_file,
                        )?));
                        self.load_scans(StreamingSpectrumIterator::new(MzMLReaderType::new(fh)))?
                    } else {
                        self.load_scans(MzMLReaderType::open_path(self.input_file.clone())?)?
                    }
                }
                _ => {
                    return Err(MZRoierError::FormatUnknownOrNotSupportedError(
                        self.input_file.clone(),
                        ms_format,
                    ))
                }
            }
        };
        self.writer_then(&scans)
    }

    /// Read the MS1 spectra in the time range and centroid them in parallel
    fn load_scans<R: Iterator<Item = SpectrumType>>(
        &self,
        reader: R,
    ) -> Result<Vec<Scan>, MZRoierError> {
        let started = Instant::now();
        let time_range = self.time_range.unwrap_or_default();
        if self.time_range.is_some() {
            info!("Processing time range {time_range}");
        }
        let spectra: Vec<SpectrumType> = reader
            .filter(|s| s.ms_level() == 1)
            .take_while(|s| !time_range.is_past(s.start_time()))
            .filter(|s| time_range.contains(s.start_time()))
            .collect();

        let scans = spectra
            .into_par_iter()
            .map(spectrum_to_scan)
            .collect::<Result<Vec<_>, _>>()?;

        let n_peaks: usize = scans.iter().map(|s| s.len()).sum();
        info!("MS1 Spectra: {}", scans.len());
        info!("MS1 Peaks: {}", n_peaks);
        debug!("Loaded scans in {:0.3?}", Instant::now() - started);
        Ok(scans)
    }

    fn writer_then(&self, scans: &[Scan]) -> Result<(), MZRoierError> {
        if scans.is_empty() {
            warn!("No MS1 spectra were found, the ROI table will be empty");
        }
        let started = Instant::now();
        let params = self.roi_params();
        let rois = build_roi(scans, &params)?;
        info!("ROIs: {}", rois.len());
        info!("Elapsed Time: {:0.3?}", Instant::now() - started);

        if self.output_file == PathBuf::from("-") {
            let stdout = io::stdout();
            write_roi_table(io::BufWriter::new(stdout.lock()), &rois)?;
        } else {
            let handle = io::BufWriter::new(fs::File::create(&self.output_file)?);
            let compressed = self
                .output_file
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
            if compressed {
                let encoder = GzEncoder::new(handle, Compression::best());
                write_roi_table(encoder, &rois)?.finish()?.flush()?;
            } else {
                write_roi_table(handle, &rois)?;
            }
        }
        Ok(())
    }
}

pub(crate) const ROI_TABLE_HEADER: &str =
    "roi\tstart_scan\tend_scan\tstart_time\tend_time\tlength\tapex_time\tapex_intensity\ttotal_intensity\tmz_mean\tmz_std";

/// Write one tab-separated row per ROI, returning the writer once flushed
pub fn write_roi_table<W: Write>(mut writer: W, rois: &[ROI]) -> io::Result<W> {
    writeln!(writer, "{ROI_TABLE_HEADER}")?;
    for (i, roi) in rois.iter().enumerate() {
        let (apex_time, apex_intensity) = roi.apex().unwrap_or((f64::NAN, 0.0));
        let start_time = roi.time.first().copied().unwrap_or(f64::NAN);
        let end_time = roi.time.last().copied().unwrap_or(f64::NAN);
        let total: f64 = roi.intensity.iter().sum();
        let mz_mean = roi.mz_mean().unwrap_or(f64::NAN);
        let mz_std = roi.mz_std().unwrap_or(0.0);
        writeln!(
            writer,
            "{i}\t{}\t{}\t{start_time:0.4}\t{end_time:0.4}\t{}\t{apex_time:0.4}\t{apex_intensity:0.2}\t{total:0.2}\t{mz_mean:0.5}\t{mz_std:0.6}",
            roi.start,
            roi.end,
            roi.len(),
        )?;
    }
    writer.flush()?;
    Ok(writer)
}

#[cfg(test)]
mod test {
    use super::*;
    use mzroi::MassTrace;

    #[test]
    fn test_write_roi_table() -> io::Result<()> {
        let roi = ROI::new(
            vec![1.0, 1.1, 1.2],
            vec![10.0, 30.0, 20.0],
            MassTrace::Series(vec![300.0, 300.0, 300.0]),
            4,
        );
        let buffer = write_roi_table(Vec::new(), &[roi])?;
        let text = String::from_utf8_lossy(&buffer);
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(ROI_TABLE_HEADER));
        let row: Vec<&str> = lines.next().unwrap_or_default().split('\t').collect();
        assert_eq!(row.len(), 11);
        assert_eq!(row[1], "4");
        assert_eq!(row[2], "7");
        assert_eq!(row[5], "3");
        assert_eq!(row[6], "1.1000");
        assert_eq!(row[8], "60.00");
        assert_eq!(row[9], "300.00000");
        assert!(lines.next().is_none());
        Ok(())
    }

    #[test]
    fn test_roi_params() {
        let args = MZRoier::parse_from([
            "mzroier",
            "run.mzML",
            "--targets",
            "300.5,410.2",
            "--tolerance",
            "15ppm",
            "--multiple-match",
            "reduce",
            "--mz-reduce",
            "max",
        ]);
        let params = args.roi_params();
        assert_eq!(params.targeted_mz, Some(vec![300.5, 410.2]));
        assert_eq!(params.tolerance, mzroi::Tolerance::PPM(15.0));
        assert_eq!(params.multiple_match, mzroi::MatchMode::Reduce);
        assert_eq!(params.mz_reduce, mzroi::Reducer::Max);
        assert_eq!(params.intensity_reduce, mzroi::Reducer::Sum);
        assert_eq!(params.min_length, 5);
        assert_eq!(params.max_missing, 1);
    }
}
