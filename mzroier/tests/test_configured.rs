use std::ffi::OsString;
use std::fs;

use clap::{CommandFactory, FromArgMatches};
use figment::{
    providers::{Format, Toml},
    Figment,
};

use mzroi::{MatchMode, Reducer, Tolerance};
use mzroier::{ArgMatchMode, ArgReducer, MZRoier, TimeRange};

#[test]
fn test_partial_config() -> Result<(), figment::Error> {
    let config = Figment::new().merge(Toml::string(
        r#"
        input_file = "run.mzML"
        tolerance = "20ppm"
        targets = [301.1, 402.2]
        multiple_match = "reduce"
        intensity_reduce = "max"
        time_range = { start = 1.5, end = 9.0 }
        "#,
    ));
    let driver: MZRoier = config.extract()?;
    assert_eq!(driver.input_file, "run.mzML");
    assert_eq!(driver.output_file.to_string_lossy(), "-");
    assert_eq!(driver.threads, -1);
    assert_eq!(driver.min_length, 5);
    assert_eq!(driver.max_missing, 1);
    assert_eq!(driver.multiple_match, ArgMatchMode::Reduce);
    assert_eq!(driver.mz_reduce, ArgReducer::Mean);
    assert_eq!(driver.time_range, Some(TimeRange::new(1.5, 9.0)));

    let params = driver.roi_params();
    assert_eq!(params.tolerance, Tolerance::PPM(20.0));
    assert_eq!(params.multiple_match, MatchMode::Reduce);
    assert_eq!(params.intensity_reduce, Reducer::Max);
    assert_eq!(params.targeted_mz, Some(vec![301.1, 402.2]));
    Ok(())
}

#[test]
fn test_bad_config() {
    let config = Figment::new().merge(Toml::string(
        r#"
        input_file = "run.mzML"
        tolerance = "wide"
        "#,
    ));
    assert!(config.extract::<MZRoier>().is_err());
}

#[test]
fn test_command_line_overrides_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("settings.toml");
    fs::write(
        &config_path,
        "min_length = 7\nmax_missing = 3\ntolerance = \"20ppm\"\n",
    )?;
    let argv: Vec<OsString> = vec![
        "mzroier".into(),
        "run.mzML".into(),
        "--config-file".into(),
        config_path.clone().into_os_string(),
        "--min-length".into(),
        "9".into(),
        "-e".into(),
        "0.01da".into(),
    ];
    let matches = MZRoier::command().try_get_matches_from(argv)?;

    let driver = MZRoier::from_arg_matches(&matches)?.load_configuration_from(&matches)?;
    assert_eq!(driver.input_file, "run.mzML");
    assert_eq!(driver.min_length, 9);
    assert_eq!(driver.tolerance.0, Tolerance::Da(0.01));
    // Not given on the command line, so the file's value is used
    assert_eq!(driver.max_missing, 3);
    assert_eq!(driver.config_file.as_deref(), Some(config_path.as_path()));

    let driver = MZRoier::from_arg_matches(&matches)?.load_configuration()?;
    assert_eq!(driver.min_length, 7);
    assert_eq!(driver.tolerance.0, Tolerance::PPM(20.0));
    Ok(())
}

#[test_log::test]
#[test_log(default_log_filter = "debug")]
fn test_configured_run() {
    let dir = tempfile::tempdir().unwrap();
    let outpath = dir.path().join("rois.tsv.gz");
    let config = Figment::new()
        .merge(Toml::string(
            r#"
            input_file = "./tests/data/small.mzML"
            threads = 2
            min_length = 7
            "#,
        ))
        .merge(("output_file", outpath.clone()));
    let driver: MZRoier = config.extract().unwrap();
    driver.main().unwrap();

    let raw = fs::read(&outpath).unwrap();
    let mut decoder = flate2::read::GzDecoder::new(raw.as_slice());
    let mut table = String::new();
    std::io::Read::read_to_string(&mut decoder, &mut table).unwrap();
    let rows: Vec<&str> = table.lines().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[0].starts_with("roi\t"));
    assert!(rows[2].starts_with("1\t3\t10\t0.6500\t0.9500\t7\t"));
}
