// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io::Write;

use indoc::indoc;
use tempfile::TempDir;

use crate::{get_cmd_output, scan_reduce};

#[test]
fn test_help() {
    let cmd = scan_reduce().arg("--help").ok();
    assert!(cmd.is_ok());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("simulate"));
    assert!(stdout.contains("atran-find"));

    let cmd = scan_reduce().args(["simulate", "--help"]).ok();
    assert!(cmd.is_ok());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("--dead-channels"));
    assert!(stdout.contains("--estimator"));
}

#[test]
fn test_simulate_dry_run() {
    #[rustfmt::skip]
    let cmd = scan_reduce()
        .args([
            "simulate",
            "--num-frames", "300",
            "--estimator", "robust",
            "--dry-run",
        ])
        .ok();
    assert!(cmd.is_ok(), "{}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Dry run -- exiting now."), "{stdout}");
    assert!(stdout.contains("Estimator: robust"), "{stdout}");
}

#[test]
fn test_simulate_writes_summary() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let output = tmp_dir.path().join("fit.json");

    #[rustfmt::skip]
    let cmd = scan_reduce()
        .args([
            "simulate",
            "--num-frames", "400",
            "--num-channels", "6",
            "--dead-channels", "5",
            "--noise-rms", "0.01",
            "--iterations", "4",
            "--no-progress-bars",
            "--output", &output.display().to_string(),
        ])
        .ok();
    assert!(cmd.is_ok(), "{}", cmd.err().unwrap());

    let json: serde_json::Value =
        serde_json::from_reader(std::fs::File::open(&output).unwrap()).unwrap();
    let channels: Vec<u64> = json["channels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_u64().unwrap())
        .collect();
    assert_eq!(channels, vec![0, 1, 2, 3, 4]);
    assert!(json["gain_rms_error"].as_f64().unwrap() < 0.05);
}

#[test]
fn test_simulate_with_arg_file_and_save_toml() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let arg_file = tmp_dir.path().join("simulate.toml");
    let saved = tmp_dir.path().join("saved.toml");
    let mut f = std::fs::File::create(&arg_file).unwrap();
    write!(
        &mut f,
        "{}",
        indoc! {r#"
            [scan]
            num_frames = 250
            num_channels = 3

            [fit]
            iterations = 1
            resolution = 5
        "#}
    )
    .unwrap();
    drop(f);

    #[rustfmt::skip]
    let cmd = scan_reduce()
        .args([
            "simulate",
            &arg_file.display().to_string(),
            "--seed", "3",
            "--save-toml", &saved.display().to_string(),
        ])
        .ok();
    assert!(cmd.is_ok(), "{}", cmd.err().unwrap());

    let saved = std::fs::read_to_string(saved).unwrap();
    assert!(saved.contains("num_frames = 250"), "{saved}");
    assert!(saved.contains("seed = 3"), "{saved}");
    assert!(saved.contains("resolution = 5"), "{saved}");
}

#[test]
fn test_simulate_bad_args() {
    let cmd = scan_reduce()
        .args(["simulate", "--num-channels", "2", "--dead-channels", "0", "1"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("Every channel is dead"), "{stderr}");

    let cmd = scan_reduce()
        .args(["simulate", "--estimator", "mean"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("Unrecognised correlated-signal estimator"), "{stderr}");
}
