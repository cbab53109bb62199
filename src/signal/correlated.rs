// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Block-wise estimates of a correlated signal from many channels.

use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::math::{smart_median, Blocks, Weights};

/// How the correlated signal is estimated from the channel data.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum CorrelatedEstimator {
    /// The weighted mean of gain-scaled data.
    #[default]
    #[strum(serialize = "ml")]
    MaximumLikelihood,

    /// The weighted [`smart_median`] of gain-normalised data.
    #[strum(serialize = "robust")]
    Robust,
}

impl CorrelatedEstimator {
    /// Estimate the correlated signal with this estimator. `channel_gains`,
    /// `channel_wg` and `channel_wg2` are the channel gains, weights × gains and
    /// weights × gains² respectively; the ML estimator doesn't need the gains
    /// alone and the robust estimator doesn't need `channel_wg`.
    #[allow(clippy::too_many_arguments)]
    pub fn estimate(
        self,
        frame_data: ArrayView2<f64>,
        frame_weights: &[f64],
        frame_valid: &[bool],
        channel_indices: &[usize],
        channel_gains: &[f64],
        channel_wg: &[f64],
        channel_wg2: &[f64],
        sample_flags: ArrayView2<u32>,
        resolution: usize,
        max_dependence: f64,
    ) -> BlockSignal {
        match self {
            CorrelatedEstimator::MaximumLikelihood => ml_correlated(
                frame_data,
                frame_weights,
                frame_valid,
                channel_indices,
                channel_wg,
                channel_wg2,
                sample_flags,
                resolution,
            ),
            CorrelatedEstimator::Robust => robust_correlated(
                frame_data,
                frame_weights,
                frame_valid,
                channel_indices,
                channel_gains,
                channel_wg2,
                sample_flags,
                resolution,
                max_dependence,
            ),
        }
    }
}

/// A block-averaged signal: one value and one (inverse-variance) weight per
/// block. A zero weight means the block had no usable data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockSignal {
    pub values: Vec<f64>,
    pub weights: Vec<f64>,
}

impl BlockSignal {
    pub fn zeros(n_blocks: usize) -> BlockSignal {
        BlockSignal {
            values: vec![0.0; n_blocks],
            weights: vec![0.0; n_blocks],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Expand the block values to one value per frame.
    pub fn to_frames(&self, n_frames: usize, resolution: usize) -> Vec<f64> {
        let blocks = Blocks::new(n_frames, resolution);
        (0..n_frames)
            .map(|frame| self.values[blocks.block_of(frame)])
            .collect()
    }
}

/// Derive the maximum-likelihood correlated signal for each block:
///
/// `Σ(fw · wg · x) / Σ(fw · wg2)`
///
/// where `fw` are the relative frame weights, `wg` the channel weights × gains
/// and `wg2` the channel weights × gains². The block weight is the denominator.
///
/// `frame_valid` should already exclude modelling frames. Frames with zero
/// weight, channels with NaN weights, flagged samples and NaN samples don't
/// contribute.
#[allow(clippy::too_many_arguments)]
pub fn ml_correlated(
    frame_data: ArrayView2<f64>,
    frame_weights: &[f64],
    frame_valid: &[bool],
    channel_indices: &[usize],
    channel_wg: &[f64],
    channel_wg2: &[f64],
    sample_flags: ArrayView2<u32>,
    resolution: usize,
) -> BlockSignal {
    let n_frames = frame_data.len_of(Axis(0));
    debug_assert_eq!(frame_weights.len(), n_frames);
    debug_assert_eq!(frame_valid.len(), n_frames);
    debug_assert_eq!(sample_flags.dim(), frame_data.dim());
    debug_assert_eq!(channel_wg.len(), channel_indices.len());
    debug_assert_eq!(channel_wg2.len(), channel_indices.len());

    let blocks = Blocks::new(n_frames, resolution);
    let mut signal = BlockSignal::zeros(blocks.len());

    for (block, frames) in blocks.iter() {
        let mut sum_wx = 0.0;
        let mut sum_w = 0.0;
        for frame in frames {
            if !frame_valid[frame] {
                continue;
            }
            let fw = frame_weights[frame];
            if fw == 0.0 || fw.is_nan() {
                continue;
            }
            for ((&channel, &wg), &wg2) in channel_indices.iter().zip(channel_wg).zip(channel_wg2) {
                if wg.is_nan() || wg2.is_nan() || sample_flags[(frame, channel)] != 0 {
                    continue;
                }
                let x = frame_data[(frame, channel)];
                if x.is_nan() {
                    continue;
                }
                sum_wx += fw * wg * x;
                sum_w += fw * wg2;
            }
        }

        if sum_w != 0.0 && !sum_w.is_nan() {
            signal.values[block] = sum_wx / sum_w;
            signal.weights[block] = sum_w;
        }
    }

    signal
}

/// Derive a robust correlated signal for each block: the [`smart_median`] of
/// `x / g`, weighted by `fw · wg2`.
///
/// Channels with zero gain can't be normalised and are skipped. Otherwise the
/// same frames and samples are excluded as for [`ml_correlated`].
#[allow(clippy::too_many_arguments)]
pub fn robust_correlated(
    frame_data: ArrayView2<f64>,
    frame_weights: &[f64],
    frame_valid: &[bool],
    channel_indices: &[usize],
    channel_gains: &[f64],
    channel_wg2: &[f64],
    sample_flags: ArrayView2<u32>,
    resolution: usize,
    max_dependence: f64,
) -> BlockSignal {
    let n_frames = frame_data.len_of(Axis(0));
    debug_assert_eq!(frame_weights.len(), n_frames);
    debug_assert_eq!(frame_valid.len(), n_frames);
    debug_assert_eq!(sample_flags.dim(), frame_data.dim());
    debug_assert_eq!(channel_gains.len(), channel_indices.len());
    debug_assert_eq!(channel_wg2.len(), channel_indices.len());

    let blocks = Blocks::new(n_frames, resolution);
    let mut signal = BlockSignal::zeros(blocks.len());

    // Re-used between blocks.
    let capacity = blocks.resolution() * channel_indices.len();
    let mut buffer_values = Vec::with_capacity(capacity);
    let mut buffer_weights = Vec::with_capacity(capacity);

    for (block, frames) in blocks.iter() {
        buffer_values.clear();
        buffer_weights.clear();
        for frame in frames {
            if !frame_valid[frame] {
                continue;
            }
            let fw = frame_weights[frame];
            if fw == 0.0 || fw.is_nan() {
                continue;
            }
            for ((&channel, &gain), &wg2) in
                channel_indices.iter().zip(channel_gains).zip(channel_wg2)
            {
                if gain == 0.0 || sample_flags[(frame, channel)] != 0 {
                    continue;
                }
                buffer_values.push(frame_data[(frame, channel)] / gain);
                buffer_weights.push(fw * wg2);
            }
        }

        if buffer_values.is_empty() {
            continue;
        }
        let (value, weight) = smart_median(
            &buffer_values,
            Weights::Given(&buffer_weights),
            max_dependence,
        );
        signal.values[block] = value;
        signal.weights[block] = weight;
    }

    signal
}
