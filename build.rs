// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{env, fs::File, path::PathBuf};

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR env. variable not defined!"));

    // Release builds always regenerate the build-time information, so that
    // `scan_reduce` reports the git hash it was actually built from.
    if env::var("PROFILE").map(|p| p != "debug").unwrap_or(false) {
        let stamp = out_dir.join("rebuild_stamp");
        File::create(&stamp).expect("Couldn't create the rebuild stamp");
        println!("cargo:rerun-if-changed={}", stamp.display());
    }

    // The git hash, compiler version and build time are written to
    // $OUT_DIR/built.rs.
    built::write_built_file().expect("Failed to acquire build-time information");
}
