// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod atran_find;
mod no_stderr;
mod signal;
mod simulate;

use std::{path::Path, process::Output, str::from_utf8};

use assert_cmd::{output::OutputError, Command};

fn scan_reduce() -> Command {
    Command::cargo_bin("scan_reduce").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

/// Make empty ATRAN files in a directory; only their names matter.
fn make_atran_files(dir: &Path) {
    for name in [
        "atran_41K_45deg_4-50mum.fits",
        "atran_39K_30deg_4-50mum.fits",
        "atran_41K_45deg_7pwv_4-50mum.fits",
        "atran_41K_45deg_40-300mum.fits",
    ] {
        std::fs::File::create(dir.join(name)).unwrap();
    }
}
