// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use ndarray::prelude::*;

/// How strongly a per-frame signal correlates with the channel data.
///
/// For each channel, `xs = Σ w·x·s`, `xx = Σ w·x²` and `ss = Σ w·s²` are
/// accumulated over valid frames with a finite signal and unflagged, non-NaN
/// samples (`w` is the channel weight; NaN weights drop the channel). The
/// result is
///
/// `sqrt(Σ_{channels, xs > 0} xs² / (xx · ss))`
pub fn covariance(
    signal_values: &[f64],
    frame_data: ArrayView2<f64>,
    frame_valid: &[bool],
    channel_indices: &[usize],
    channel_weights: &[f64],
    sample_flags: ArrayView2<u32>,
) -> f64 {
    let n_frames = frame_data.len_of(Axis(0));
    debug_assert_eq!(signal_values.len(), n_frames);
    debug_assert_eq!(frame_valid.len(), n_frames);
    debug_assert_eq!(channel_weights.len(), channel_indices.len());
    debug_assert_eq!(sample_flags.dim(), frame_data.dim());

    let n_channels = channel_indices.len();
    let mut sum_xs = vec![0.0; n_channels];
    let mut sum_x2 = vec![0.0; n_channels];
    let mut sum_s2 = vec![0.0; n_channels];

    for frame in 0..n_frames {
        if !frame_valid[frame] {
            continue;
        }
        let s = signal_values[frame];
        if s.is_nan() {
            continue;
        }
        for (i, (&channel, &w)) in channel_indices.iter().zip(channel_weights).enumerate() {
            if w == 0.0 || w.is_nan() || sample_flags[(frame, channel)] != 0 {
                continue;
            }
            let x = frame_data[(frame, channel)];
            if x.is_nan() {
                continue;
            }
            sum_x2[i] += w * x * x;
            sum_xs[i] += w * x * s;
            sum_s2[i] += w * s * s;
        }
    }

    let c2: f64 = sum_xs
        .iter()
        .zip(&sum_x2)
        .zip(&sum_s2)
        .filter(|((&xs, _), _)| xs > 0.0)
        .map(|((&xs, &xx), &ss)| (xs * xs) / (xx * ss))
        .sum();

    c2.sqrt()
}
