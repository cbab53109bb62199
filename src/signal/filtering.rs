// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Filtering-gain corrections for the source signal removed along with the
//! correlated noise.

use ndarray::prelude::*;

/// The updated source filtering of each channel in a mode group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFiltering {
    /// The cumulative filtering of each channel.
    pub channel: Vec<f64>,
    /// The filtering due to this signal alone.
    pub signal: Vec<f64>,
}

/// Calculate the new signal and channel source filtering.
///
/// For each valid channel `i`, the fraction of its degrees of freedom consumed
/// by the signal is
///
/// `phi = (dep[i] + Σ_{j≠i, valid} overlap[i, j] · dep[j]) / n_parms`
///
/// capped at 1 (`n_parms <= 0` skips the division). The previous signal
/// filtering is divided out of the channel filtering (a NaN result is reset to
/// 1), the new signal filtering is `1 − phi` and it is multiplied back in.
/// Invalid channels keep their previous values.
///
/// `channel_dependents` spans all channels; `overlaps` is a symmetric
/// `(n_channels, n_channels)` matrix over the group, and the other arrays have
/// one entry per group member. The returned values must be handed back on the
/// next call, since each call undoes the previous correction.
pub fn calculate_filtering(
    channel_indices: &[usize],
    channel_dependents: &[f64],
    overlaps: ArrayView2<f64>,
    channel_valid: &[bool],
    n_parms: f64,
    channel_filtering: &[f64],
    signal_filtering: &[f64],
) -> SourceFiltering {
    let n_channels = channel_indices.len();
    debug_assert_eq!(overlaps.dim(), (n_channels, n_channels));
    debug_assert_eq!(channel_valid.len(), n_channels);
    debug_assert_eq!(channel_filtering.len(), n_channels);
    debug_assert_eq!(signal_filtering.len(), n_channels);

    let mut new = SourceFiltering {
        channel: Vec::with_capacity(n_channels),
        signal: Vec::with_capacity(n_channels),
    };

    // The full double loop is used; summing a triangle and mirroring it changes
    // the accumulation order and hence the rounding.
    for (i, &channel_i) in channel_indices.iter().enumerate() {
        if !channel_valid[i] {
            new.signal.push(signal_filtering[i]);
            new.channel.push(channel_filtering[i]);
            continue;
        }

        let mut phi = channel_dependents[channel_i];
        for (j, &channel_j) in channel_indices.iter().enumerate() {
            if i == j || !channel_valid[j] {
                continue;
            }
            let overlap = overlaps[(i, j)];
            if overlap == 0.0 {
                continue;
            }
            phi += overlap * channel_dependents[channel_j];
        }

        if n_parms > 0.0 {
            phi /= n_parms;
        }
        if phi > 1.0 {
            phi = 1.0;
        }

        // Undo the prior filtering correction.
        let mut sf = signal_filtering[i];
        let mut cf = channel_filtering[i];
        if sf > 0.0 {
            cf /= sf;
        }
        if cf.is_nan() {
            cf = 1.0;
        }

        sf = 1.0 - phi;
        cf *= sf;

        new.signal.push(sf);
        new.channel.push(cf);
    }

    new
}
