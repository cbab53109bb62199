// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all scan_reduce-related errors. This should be the *only*
//! error enum that is publicly visible.

use thiserror::Error;

use super::{atran_find::AtranFindArgsError, simulate::SimulateArgsError};
use crate::{atran::AtranError, params::SimulateError};

/// The *only* publicly visible error from scan_reduce. Each error message
/// should point to the relevant README section, unless it's "generic".
#[derive(Error, Debug)]
pub enum ScanReduceError {
    /// An error related to simulate.
    #[error("{0}\n\nSee the \"simulate\" section of the README for more info.")]
    Simulate(String),

    /// An error related to ATRAN files.
    #[error("{0}\n\nSee the \"atran-find\" section of the README for more info.")]
    Atran(String),

    /// An error related to argument files.
    #[error("{0}\n\nSee the \"Argument files\" section of the README for more info.")]
    ArgFile(String),

    /// A generic error that can't be clarified further with documentation, e.g.
    /// IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

// Binary sub-command errors.

impl From<SimulateArgsError> for ScanReduceError {
    fn from(e: SimulateArgsError) -> Self {
        Self::Simulate(e.to_string())
    }
}

impl From<AtranFindArgsError> for ScanReduceError {
    fn from(e: AtranFindArgsError) -> Self {
        Self::Atran(e.to_string())
    }
}

// Library code errors.

impl From<SimulateError> for ScanReduceError {
    fn from(e: SimulateError) -> Self {
        match e {
            SimulateError::Json(_) => Self::Simulate(e.to_string()),
            SimulateError::IO(e) => Self::from(e),
        }
    }
}

impl From<AtranError> for ScanReduceError {
    fn from(e: AtranError) -> Self {
        match e {
            AtranError::NoDirectory(_) | AtranError::ModificationTime { .. } => {
                Self::Atran(e.to_string())
            }
            AtranError::Glob(_) | AtranError::Pattern(_) => Self::Generic(e.to_string()),
        }
    }
}

impl From<std::io::Error> for ScanReduceError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
