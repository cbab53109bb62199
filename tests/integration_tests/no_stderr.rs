// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests to ensure there is no stderr output for successful commands.

use tempfile::TempDir;

use crate::{get_cmd_output, make_atran_files, scan_reduce};

#[test]
fn test_simulate_no_stderr() {
    #[rustfmt::skip]
    let cmd = scan_reduce()
        .args([
            "simulate",
            "--num-frames", "300",
            "--num-channels", "4",
            "--iterations", "2",
        ])
        .ok();
    assert!(
        cmd.is_ok(),
        "simulate failed on a small scan: {}",
        cmd.err().unwrap()
    );
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
}

#[test]
fn test_atran_find_no_stderr() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    make_atran_files(tmp_dir.path());

    #[rustfmt::skip]
    let cmd = scan_reduce()
        .args([
            "atran-find",
            "--atran-dir", &tmp_dir.path().display().to_string(),
            "--zenith-angle", "40", "40",
            "--altitude", "40000", "40000",
        ])
        .ok();
    assert!(
        cmd.is_ok(),
        "atran-find failed: {}",
        cmd.err().unwrap()
    );
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
}
