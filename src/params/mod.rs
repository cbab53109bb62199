// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parameters that are kept modular to be used in multiple aspects of
//! `scan_reduce`.
//!
//! The code here is kind of "mirroring" the code within the `cli` module; the
//! idea is that `cli` is unparsed, user-facing code, whereas parameters have
//! been parsed and are ready to be used directly.

mod simulate;

pub(crate) use simulate::{SimulateError, SimulateParams, SimulateSummary, SyntheticScanParams};

use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        DEFAULT_MAX_DEPENDENCE, DEFAULT_NUM_DRIFTS, DEFAULT_NUM_ITERATIONS, DEFAULT_RESOLUTION,
    },
    signal::CorrelatedEstimator,
};

/// How the correlated signal (and the gains against it) are fitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct FitConfig {
    /// The number of frames per correlated-signal block.
    pub(crate) resolution: usize,

    pub(crate) estimator: CorrelatedEstimator,

    /// Used by the robust estimator; see [`crate::math::smart_median`].
    pub(crate) max_dependence: f64,

    /// The number of drift segments that channel offsets are removed over.
    pub(crate) num_drifts: usize,

    pub(crate) iterations: usize,

    /// Fit channel gains against the correlated signal?
    pub(crate) fit_gains: bool,

    /// The source-filtering overlap between neighbouring channels.
    pub(crate) channel_overlap: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        FitConfig {
            resolution: DEFAULT_RESOLUTION,
            estimator: CorrelatedEstimator::default(),
            max_dependence: DEFAULT_MAX_DEPENDENCE,
            num_drifts: DEFAULT_NUM_DRIFTS,
            iterations: DEFAULT_NUM_ITERATIONS,
            fit_gains: true,
            channel_overlap: 0.0,
        }
    }
}
