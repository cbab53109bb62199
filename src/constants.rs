// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All constants *must* be double precision; every kernel accumulates in `f64`.
 */

pub use std::f64::consts::{PI, TAU};

/// The largest fraction of the total weight that a single sample may carry
/// before a robust (median) estimate is abandoned in favour of a weighted mean.
pub const DEFAULT_MAX_DEPENDENCE: f64 = 0.25;

/// The default number of frames per correlated-signal block.
pub const DEFAULT_RESOLUTION: usize = 1;

/// The default number of drift segments per integration.
pub const DEFAULT_NUM_DRIFTS: usize = 1;

/// The default number of fitting iterations used by `simulate`.
pub const DEFAULT_NUM_ITERATIONS: usize = 3;

/// The water-vapour value \[μm\] used to pick ATRAN files when the observed
/// value is unusable.
pub const DEFAULT_WATER_VAPOUR: f64 = 6.0;

/// Water-vapour values below this \[μm\] are considered unusable.
pub const MIN_WATER_VAPOUR: f64 = 2.0;

/// The default wavelength limits \[μm\] in ATRAN file names.
pub const DEFAULT_ATRAN_WMIN: u32 = 4;
pub const DEFAULT_ATRAN_WMAX: u32 = 50;

/// Channels whose fitted gain (relative to the mean gain of a mode) falls
/// below this are dropped from the mode.
pub const MIN_RELATIVE_GAIN: f64 = 0.1;
