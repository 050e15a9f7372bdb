use std::{error::Error, fs, process::Command};

use assert_cmd::prelude::*;
use predicates::prelude::*;

#[test]
fn test_file_missing() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzroier")?;

    cmd.arg("not_real.mzML").arg("-o").arg("-");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("NotFound"));
    Ok(())
}

#[test]
fn test_malformed_time_range() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzroier")?;

    cmd.arg("not_real.mzML").arg("-o").arg("-").args(["-r a-z"]);
    cmd.assert().failure().stderr(predicate::str::contains(
        "Failed to parse time range end invalid float literal",
    ));

    let mut cmd = Command::cargo_bin("mzroier")?;

    cmd.arg("not_real.mzML").args(["-r", "z-5"]);
    cmd.assert().failure().stderr(predicate::str::contains(
        "Failed to parse time range start invalid float literal",
    ));
    Ok(())
}

#[test]
fn test_malformed_tolerance() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzroier")?;

    cmd.arg("not_real.mzML").args(["--tolerance", "tenppm"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse tolerance"));
    Ok(())
}

#[test]
fn test_run_full() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzroier")?;
    cmd.env("RUST_LOG", "info");
    cmd.arg("./tests/data/small.mzML").args(["-o", "-"]);
    let result = cmd.assert().success();
    result
        .stderr(predicate::str::contains("MS1 Spectra: 12"))
        .stderr(predicate::str::contains("ROIs: 2"))
        .stdout(predicate::str::starts_with("roi\tstart_scan\tend_scan"))
        .stdout(predicate::str::contains("0\t0\t12\t"))
        .stdout(predicate::str::contains("1\t3\t10\t"));
    Ok(())
}

#[test]
fn test_run_subset_to_file() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let outpath = dir.path().join("rois.tsv");

    let mut cmd = Command::cargo_bin("mzroier")?;
    cmd.env("RUST_LOG", "info");
    cmd.arg("./tests/data/small.mzML")
        .arg("-o")
        .arg(&outpath)
        .args(["-r", "0.6-0.8", "--min-length", "3"]);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("MS1 Spectra: 5"));

    let table = fs::read_to_string(&outpath)?;
    let rows: Vec<&str> = table.lines().skip(1).collect();
    // 300.0 spans the whole subset, 450.25 starts one scan in
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("0\t0\t5\t"));
    assert!(rows[1].starts_with("1\t1\t5\t"));
    Ok(())
}

#[test]
fn test_run_targeted() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzroier")?;
    cmd.arg("./tests/data/small.mzML")
        .args(["--targets", "450.25", "--tolerance", "10ppm"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("0\t3\t10\t"))
        .stdout(predicate::str::contains("450.25000"));
    Ok(())
}
