// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Applying correlated-signal increments and gain changes to frame data, while
//! keeping track of the degrees of freedom ("dependents") consumed.

use ndarray::prelude::*;

use crate::{
    constants::DEFAULT_MAX_DEPENDENCE,
    math::{smart_median, Blocks, Weights},
};

/// Remove the contribution of a previous gain change from the frame data:
///
/// `x[frame, channel] -= signal[block(frame)] · delta_gain[channel]`
///
/// for all valid frames. Blocks with a zero signal and channels with a zero
/// gain delta are left alone.
pub fn resync_gains(
    mut frame_data: ArrayViewMut2<f64>,
    signal_values: &[f64],
    resolution: usize,
    delta_gains: &[f64],
    channel_indices: &[usize],
    frame_valid: &[bool],
) {
    let n_frames = frame_data.len_of(Axis(0));
    debug_assert_eq!(frame_valid.len(), n_frames);
    debug_assert_eq!(delta_gains.len(), channel_indices.len());

    let blocks = Blocks::new(n_frames, resolution);
    debug_assert!(signal_values.len() >= blocks.len());

    for (block, frames) in blocks.iter() {
        let c = signal_values[block];
        if c == 0.0 {
            continue;
        }
        for frame in frames {
            if !frame_valid[frame] {
                continue;
            }
            for (&channel, &dg) in channel_indices.iter().zip(delta_gains) {
                if dg == 0.0 {
                    continue;
                }
                frame_data[(frame, channel)] -= dg * c;
            }
        }
    }
}

/// Apply block-wise correlated-signal increments.
///
/// For every block with a positive increment weight `dw`:
///
/// 1. `gain · increment` is removed from the data of all valid frames. The
///    gains are those the previous signal was fitted with, so this undoes the
///    old contribution as well as removing the new increment.
/// 2. For valid, non-modelling frames, every unflagged sample adds
///    `frame_weight / dw · channel_fwg2` to both the frame and the channel
///    dependents.
/// 3. The increment is added to the block's signal value and the block's
///    signal weight becomes `dw`.
///
/// `channel_fwg2` is the product of channel filtering × weight × gain².
/// `frame_dependents` has one entry per frame; `channel_dependents` spans all
/// channels, as `channel_indices` does.
#[allow(clippy::too_many_arguments)]
pub fn apply_gain_increments(
    mut frame_data: ArrayViewMut2<f64>,
    frame_weights: &[f64],
    frame_valid: &[bool],
    frame_modeling: &[bool],
    frame_dependents: &mut [f64],
    channel_gains: &[f64],
    channel_fwg2: &[f64],
    channel_indices: &[usize],
    channel_dependents: &mut [f64],
    sample_flags: ArrayView2<u32>,
    signal_values: &mut [f64],
    signal_weights: &mut [f64],
    resolution: usize,
    increment: &[f64],
    increment_weight: &[f64],
) {
    let n_frames = frame_data.len_of(Axis(0));
    debug_assert_eq!(frame_weights.len(), n_frames);
    debug_assert_eq!(frame_valid.len(), n_frames);
    debug_assert_eq!(frame_modeling.len(), n_frames);
    debug_assert_eq!(frame_dependents.len(), n_frames);
    debug_assert_eq!(channel_gains.len(), channel_indices.len());
    debug_assert_eq!(channel_fwg2.len(), channel_indices.len());
    debug_assert_eq!(sample_flags.dim(), frame_data.dim());

    let blocks = Blocks::new(n_frames, resolution);
    debug_assert!(signal_values.len() >= blocks.len());
    debug_assert!(signal_weights.len() >= blocks.len());
    debug_assert!(increment.len() >= blocks.len());
    debug_assert!(increment_weight.len() >= blocks.len());

    for (block, frames) in blocks.iter() {
        let dw = increment_weight[block];
        if dw.is_nan() || dw <= 0.0 {
            continue;
        }
        let dc = increment[block];

        for frame in frames {
            if !frame_valid[frame] {
                continue;
            }

            for (&channel, &gain) in channel_indices.iter().zip(channel_gains) {
                frame_data[(frame, channel)] -= gain * dc;
            }

            if frame_modeling[frame] {
                continue;
            }
            let fp_norm = frame_weights[frame] / dw;
            if fp_norm == 0.0 || fp_norm.is_nan() {
                continue;
            }

            for (&channel, &fwg2) in channel_indices.iter().zip(channel_fwg2) {
                if sample_flags[(frame, channel)] != 0 || fwg2 == 0.0 || fwg2.is_nan() {
                    continue;
                }
                let dp = fp_norm * fwg2;
                frame_dependents[frame] += dp;
                channel_dependents[channel] += dp;
            }
        }

        signal_values[block] += dc;
        signal_weights[block] = dw;
    }
}

/// Apply a change of channel gains against a per-frame signal.
///
/// For each valid frame and each channel with a positive `channel_wc2`:
/// `x -= delta_gain · signal[frame]`, and unless the frame is a modelling frame
/// or the sample is flagged, `frame_wc2[frame] / channel_wc2` is added to the
/// frame dependents. Each of those channels then gains `1 − 1/n_channels`
/// dependents: one gain parameter per channel, minus the overall gain
/// normalisation shared between them.
#[allow(clippy::too_many_arguments)]
pub fn synchronize_gains(
    mut frame_data: ArrayViewMut2<f64>,
    sample_flags: ArrayView2<u32>,
    frame_valid: &[bool],
    frame_modeling: &[bool],
    channel_indices: &[usize],
    delta_gains: &[f64],
    frame_wc2: &[f64],
    channel_wc2: &[f64],
    signal_values: &[f64],
    frame_dependents: &mut [f64],
    channel_dependents: &mut [f64],
) {
    let n_frames = frame_data.len_of(Axis(0));
    debug_assert_eq!(sample_flags.dim(), frame_data.dim());
    debug_assert_eq!(frame_valid.len(), n_frames);
    debug_assert_eq!(frame_modeling.len(), n_frames);
    debug_assert_eq!(frame_wc2.len(), n_frames);
    debug_assert_eq!(signal_values.len(), n_frames);
    debug_assert_eq!(frame_dependents.len(), n_frames);
    debug_assert_eq!(delta_gains.len(), channel_indices.len());
    debug_assert_eq!(channel_wc2.len(), channel_indices.len());

    if channel_indices.is_empty() {
        return;
    }

    for frame in 0..n_frames {
        if !frame_valid[frame] {
            continue;
        }
        for ((&channel, &dg), &c_wc2) in channel_indices.iter().zip(delta_gains).zip(channel_wc2) {
            if c_wc2.is_nan() || c_wc2 <= 0.0 {
                continue;
            }
            frame_data[(frame, channel)] -= dg * signal_values[frame];

            if frame_modeling[frame] || sample_flags[(frame, channel)] != 0 {
                continue;
            }
            let f_wc2 = frame_wc2[frame];
            if f_wc2.is_nan() {
                continue;
            }
            frame_dependents[frame] += f_wc2 / c_wc2;
        }
    }

    let channel_dependence = 1.0 - 1.0 / channel_indices.len() as f64;
    for (&channel, &c_wc2) in channel_indices.iter().zip(channel_wc2) {
        if c_wc2 > 0.0 {
            channel_dependents[channel] += channel_dependence;
        }
    }
}

/// Per-channel gain increments and their weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GainIncrement {
    pub values: Vec<f64>,
    pub weights: Vec<f64>,
}

/// The maximum-likelihood gain increment for each channel:
///
/// `dG = Σ(wc · x) / Σ(wc2)`
///
/// where `wc` is frame weight × signal and `wc2` is frame weight × signal²
/// (see [`prepare_frame_temp_fields`]). The weight is the denominator. Frames
/// with `wc == 0` carry no information and are skipped.
pub fn ml_gain_increment(
    frame_data: ArrayView2<f64>,
    signal_wc: &[f64],
    signal_wc2: &[f64],
    sample_flags: ArrayView2<u32>,
    channel_indices: &[usize],
    frame_valid: &[bool],
) -> GainIncrement {
    let n_frames = frame_data.len_of(Axis(0));
    debug_assert_eq!(signal_wc.len(), n_frames);
    debug_assert_eq!(signal_wc2.len(), n_frames);
    debug_assert_eq!(frame_valid.len(), n_frames);
    debug_assert_eq!(sample_flags.dim(), frame_data.dim());

    let n_channels = channel_indices.len();
    let mut increment = GainIncrement {
        values: vec![0.0; n_channels],
        weights: vec![0.0; n_channels],
    };

    for frame in 0..n_frames {
        if !frame_valid[frame] {
            continue;
        }
        let wc = signal_wc[frame];
        if wc == 0.0 || wc.is_nan() {
            continue;
        }
        let wc2 = signal_wc2[frame];

        for (i, &channel) in channel_indices.iter().enumerate() {
            if sample_flags[(frame, channel)] != 0 {
                continue;
            }
            let x = frame_data[(frame, channel)];
            if x.is_nan() {
                continue;
            }
            increment.values[i] += wc * x;
            increment.weights[i] += wc2;
        }
    }

    for (value, &weight) in increment.values.iter_mut().zip(&increment.weights) {
        if weight > 0.0 {
            *value /= weight;
        }
    }

    increment
}

/// A robust gain increment for each channel: the [`smart_median`] of `x / c`
/// weighted by `wc2`, where `c` is the signal of each frame. Frames with a
/// non-positive `wc2` are skipped.
pub fn robust_gain_increment(
    frame_data: ArrayView2<f64>,
    signal_c: &[f64],
    signal_wc2: &[f64],
    sample_flags: ArrayView2<u32>,
    channel_indices: &[usize],
    frame_valid: &[bool],
) -> GainIncrement {
    let n_frames = frame_data.len_of(Axis(0));
    debug_assert_eq!(signal_c.len(), n_frames);
    debug_assert_eq!(signal_wc2.len(), n_frames);
    debug_assert_eq!(frame_valid.len(), n_frames);
    debug_assert_eq!(sample_flags.dim(), frame_data.dim());

    let mut temp_data = Vec::with_capacity(n_frames);
    let mut temp_weight = Vec::with_capacity(n_frames);
    let mut increment = GainIncrement::default();

    for &channel in channel_indices {
        temp_data.clear();
        temp_weight.clear();
        for frame in 0..n_frames {
            if !frame_valid[frame]
                || signal_wc2[frame].is_nan()
                || signal_wc2[frame] <= 0.0
                || sample_flags[(frame, channel)] != 0
            {
                continue;
            }
            temp_data.push(frame_data[(frame, channel)] / signal_c[frame]);
            temp_weight.push(signal_wc2[frame]);
        }

        let (value, weight) = smart_median(
            &temp_data,
            Weights::Given(&temp_weight),
            DEFAULT_MAX_DEPENDENCE,
        );
        increment.values.push(value);
        increment.weights.push(weight);
    }

    increment
}

/// Per-frame signal products used when fitting channel gains.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameTempFields {
    /// The signal value `c`.
    pub c: Vec<f64>,
    /// Frame weight × `c`.
    pub wc: Vec<f64>,
    /// Frame weight × `c²`.
    pub wc2: Vec<f64>,
}

/// Prepare the per-frame signal products for [`ml_gain_increment`] and
/// [`robust_gain_increment`] from a per-frame signal.
///
/// Invalid frames and frames with a NaN signal get zeros. Modelling frames keep
/// their signal but carry no weight, as do frames with a NaN or non-positive
/// weight.
pub fn prepare_frame_temp_fields(
    signal_values: &[f64],
    frame_weights: &[f64],
    frame_valid: &[bool],
    frame_modeling: &[bool],
) -> FrameTempFields {
    let n_frames = frame_valid.len();
    debug_assert_eq!(signal_values.len(), n_frames);
    debug_assert_eq!(frame_weights.len(), n_frames);
    debug_assert_eq!(frame_modeling.len(), n_frames);

    let mut fields = FrameTempFields {
        c: vec![0.0; n_frames],
        wc: vec![0.0; n_frames],
        wc2: vec![0.0; n_frames],
    };

    for frame in 0..n_frames {
        if !frame_valid[frame] {
            continue;
        }
        let c = signal_values[frame];
        if c.is_nan() {
            continue;
        }
        fields.c[frame] = c;
        if frame_modeling[frame] {
            continue;
        }
        let w = frame_weights[frame];
        if w.is_nan() || w <= 0.0 {
            continue;
        }
        let wc = w * c;
        fields.wc[frame] = wc;
        fields.wc2[frame] = wc * c;
    }

    fields
}
