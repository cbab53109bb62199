// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use tempfile::TempDir;

use crate::{get_cmd_output, make_atran_files, scan_reduce};

#[test]
fn test_atran_find_nearest() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    make_atran_files(tmp_dir.path());

    #[rustfmt::skip]
    let cmd = scan_reduce()
        .args([
            "atran-find",
            "--atran-dir", &tmp_dir.path().display().to_string(),
            "--zenith-angle", "30", "32",
            "--altitude", "38000", "40000",
        ])
        .ok();
    assert!(cmd.is_ok(), "{}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("atran_39K_30deg_4-50mum.fits"), "{stdout}");
}

#[test]
fn test_atran_find_prefers_water_vapour() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    make_atran_files(tmp_dir.path());

    #[rustfmt::skip]
    let cmd = scan_reduce()
        .args([
            "atran-find",
            "--atran-dir", &tmp_dir.path().display().to_string(),
            "--zenith-angle", "45", "45",
            "--altitude", "41000", "41000",
            "--observed-water-vapour", "7",
            "--use-wv",
        ])
        .ok();
    assert!(cmd.is_ok(), "{}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("atran_41K_45deg_7pwv_4-50mum.fits"), "{stdout}");
}

#[test]
fn test_atran_find_errors() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    make_atran_files(tmp_dir.path());

    // No file covers this wavelength range.
    #[rustfmt::skip]
    let cmd = scan_reduce()
        .args([
            "atran-find",
            "--atran-dir", &tmp_dir.path().display().to_string(),
            "--zenith-angle", "45", "45",
            "--wmin", "1", "--wmax", "2",
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("No ATRAN file for 1-2 microns"), "{stderr}");

    let missing = tmp_dir.path().join("missing");
    #[rustfmt::skip]
    let cmd = scan_reduce()
        .args([
            "atran-find",
            "--atran-dir", &missing.display().to_string(),
        ])
        .ok();
    assert!(cmd.is_err());

    let cmd = scan_reduce().args(["atran-find"]).ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("No ATRAN directory was supplied"), "{stderr}");
}
