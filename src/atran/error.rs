// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with ATRAN reference files.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtranError {
    #[error("ATRAN directory '{0}' does not exist or is not a directory")]
    NoDirectory(PathBuf),

    #[error("Couldn't get the modification time of ATRAN file '{file}': {err}")]
    ModificationTime {
        file: PathBuf,
        err: std::io::Error,
    },

    #[error(transparent)]
    Glob(#[from] glob::GlobError),

    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}
