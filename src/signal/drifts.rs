// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Removing (and restoring) the average level of a signal over frame segments.

use log::trace;

use crate::math::{roundup_ratio, smart_median_default, weighted_mean, Weights};

/// Remove and return the average signal value between a start frame
/// (inclusive) and an end frame (exclusive).
///
/// The frame range is converted into the signal blocks touching it. The
/// average is the weighted mean, or the weighted [`smart_median`] if `robust`
/// is set; it is subtracted from every value in the range.
///
/// [`smart_median`]: crate::math::smart_median
pub fn level(
    values: &mut [f64],
    start_frame: usize,
    end_frame: usize,
    resolution: usize,
    weights: Weights,
    robust: bool,
) -> f64 {
    let resolution = resolution.max(1);
    let end = roundup_ratio(end_frame, resolution).min(values.len());
    let start = (start_frame / resolution).min(end);
    let range = start..end;

    let x = &values[range.clone()];
    let w = weights.slice(range.clone());
    let (center, _) = if robust {
        smart_median_default(x, w)
    } else {
        weighted_mean(x, w)
    };

    for v in &mut values[range] {
        *v -= center;
    }
    center
}

/// Remove drifts (the average signal level over consecutive frame segments)
/// from a signal.
///
/// There are as many segments as there are `drifts`; each spans `drift_frames`
/// frames, the last one truncated to `integration_size` frames in total. The
/// level removed from each segment is added to its entry in `drifts`, so over
/// repeated calls `drifts` holds the cumulative drift removed.
pub fn remove_drifts(
    signal_values: &mut [f64],
    drifts: &mut [f64],
    drift_frames: usize,
    resolution: usize,
    integration_size: usize,
    signal_weights: Weights,
    robust: bool,
) {
    for (i_drift, drift) in drifts.iter_mut().enumerate() {
        let start_frame = (i_drift * drift_frames).min(integration_size);
        let end_frame = (start_frame + drift_frames).min(integration_size);

        let center = level(
            signal_values,
            start_frame,
            end_frame,
            resolution,
            signal_weights,
            robust,
        );
        trace!("Drift {i_drift} (frames {start_frame}..{end_frame}): removed {center}");
        *drift += center;
    }
}

/// Add drifts back onto signal values. Drift `i` applies to the signal values
/// `i * drift_length .. (i + 1) * drift_length`, clamped to the signal length.
pub fn add_drifts(signal_values: &mut [f64], drifts: &[f64], drift_length: usize) {
    let n_signal = signal_values.len();
    for (i_drift, &drift) in drifts.iter().enumerate() {
        if drift == 0.0 {
            continue;
        }
        let start = (i_drift * drift_length).min(n_signal);
        let end = (start + drift_length).min(n_signal);
        for v in &mut signal_values[start..end] {
            *v += drift;
        }
    }
}
