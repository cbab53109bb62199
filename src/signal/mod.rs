// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Correlated-signal kernels.
//!
//! Everything here operates on arrays owned by the caller (the fitting loop).
//! The frame data is a 2D array of shape `(n_frames, all_channels)`; a "mode"
//! only concerns a group of those channels, given by `channel_indices`, so
//! per-channel arrays like gains and weights have one entry per group member
//! while channel dependents span all channels. Correlated signals are
//! block-averaged over `resolution` frames (see [`Blocks`]).
//!
//! None of these functions keep state between calls, and none of them fail:
//! degenerate blocks produce zero values with zero weight, NaNs are skipped and
//! a resolution of 0 is treated as 1. Accumulation is strictly sequential, so
//! results are reproducible bit-for-bit.
//!
//! [`Blocks`]: crate::math::Blocks

mod correlated;
mod covariance;
mod drifts;
mod filtering;
mod gains;
mod transform;
#[cfg(test)]
mod tests;

pub use correlated::{ml_correlated, robust_correlated, BlockSignal, CorrelatedEstimator};
pub use covariance::covariance;
pub use drifts::{add_drifts, level, remove_drifts};
pub use filtering::{calculate_filtering, SourceFiltering};
pub use gains::{
    apply_gain_increments, ml_gain_increment, prepare_frame_temp_fields, resync_gains,
    robust_gain_increment, synchronize_gains, FrameTempFields, GainIncrement,
};
pub use transform::{differentiate, differentiate_weighted, integrate, integrate_weighted};
