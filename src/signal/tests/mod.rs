// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests for the correlated-signal kernels.


use approx::assert_abs_diff_eq;
use ndarray::prelude::*;

use super::*;
use crate::{constants::TAU, math::Blocks};

/// Sample flags with nothing flagged.
fn no_flags(n_frames: usize, n_channels: usize) -> Array2<u32> {
    Array2::zeros((n_frames, n_channels))
}

/// A slow sinusoid with a period of 100 frames.
fn sinusoid(n_frames: usize) -> Vec<f64> {
    (0..n_frames)
        .map(|frame| (TAU * frame as f64 / 100.0).sin())
        .collect()
}

/// Inject a common-mode sinusoid into 5 channels with equal gains, estimate it
/// with the ML estimator in blocks of 10 frames and remove it again.
#[test]
fn test_recover_and_remove_common_mode() {
    let n_frames = 100;
    let n_channels = 5;
    let resolution = 10;

    let injected = sinusoid(n_frames);
    let mut frame_data = Array2::from_shape_fn((n_frames, n_channels), |(f, _)| injected[f]);
    let flags = no_flags(n_frames, n_channels);
    let frame_weights = vec![1.0; n_frames];
    let frame_valid = vec![true; n_frames];
    let frame_modeling = vec![false; n_frames];
    let channel_indices: Vec<usize> = (0..n_channels).collect();
    let gains = vec![1.0; n_channels];
    let channel_weights = vec![1.0; n_channels];
    let wg: Vec<f64> = gains.iter().zip(&channel_weights).map(|(g, w)| g * w).collect();
    let wg2: Vec<f64> = gains
        .iter()
        .zip(&channel_weights)
        .map(|(g, w)| g * g * w)
        .collect();

    let initial_variance = frame_data.iter().map(|x| x * x).sum::<f64>() / frame_data.len() as f64;
    assert_abs_diff_eq!(initial_variance, 0.5, epsilon = 1e-10);

    let increment = ml_correlated(
        frame_data.view(),
        &frame_weights,
        &frame_valid,
        &channel_indices,
        &wg,
        &wg2,
        flags.view(),
        resolution,
    );
    let blocks = Blocks::new(n_frames, resolution);
    assert_eq!(blocks.len(), 10);
    assert_eq!(increment.len(), 10);

    // Each block estimate is the block average of the injected signal.
    for (block, frames) in blocks.iter() {
        let expected = injected[frames.clone()].iter().sum::<f64>() / frames.len() as f64;
        assert_abs_diff_eq!(increment.values[block], expected, epsilon = 1e-12);
        assert_abs_diff_eq!(increment.weights[block], 50.0);
    }

    let mut signal = BlockSignal::zeros(blocks.len());
    let mut frame_dependents = vec![0.0; n_frames];
    let mut channel_dependents = vec![0.0; n_channels];
    apply_gain_increments(
        frame_data.view_mut(),
        &frame_weights,
        &frame_valid,
        &frame_modeling,
        &mut frame_dependents,
        &gains,
        &wg2,
        &channel_indices,
        &mut channel_dependents,
        flags.view(),
        &mut signal.values,
        &mut signal.weights,
        resolution,
        &increment.values,
        &increment.weights,
    );

    assert_eq!(signal, increment);
    let residual_variance =
        frame_data.iter().map(|x| x * x).sum::<f64>() / frame_data.len() as f64;
    assert!(
        residual_variance < 0.05,
        "residual variance too high: {residual_variance}"
    );

    // One degree of freedom per block was consumed, spread evenly.
    assert_abs_diff_eq!(frame_dependents.iter().sum::<f64>(), 10.0, epsilon = 1e-10);
    assert_abs_diff_eq!(channel_dependents.iter().sum::<f64>(), 10.0, epsilon = 1e-10);
    for &dep in &frame_dependents {
        assert_abs_diff_eq!(dep, 0.1, epsilon = 1e-12);
    }
    for &dep in &channel_dependents {
        assert_abs_diff_eq!(dep, 2.0, epsilon = 1e-12);
    }

    // The correlated signal no longer correlates with what is left.
    let signal_per_frame = signal.to_frames(n_frames, resolution);
    let before = covariance(
        &signal_per_frame,
        Array2::from_shape_fn((n_frames, n_channels), |(f, _)| injected[f]).view(),
        &frame_valid,
        &channel_indices,
        &channel_weights,
        flags.view(),
    );
    let after = covariance(
        &signal_per_frame,
        frame_data.view(),
        &frame_valid,
        &channel_indices,
        &channel_weights,
        flags.view(),
    );
    assert!(before > 2.0);
    assert!(after < before / 10.0);

    // The filtering for this signal follows from the dependents.
    let filtering = calculate_filtering(
        &channel_indices,
        &channel_dependents,
        Array2::<f64>::zeros((n_channels, n_channels)).view(),
        &vec![true; n_channels],
        n_frames as f64,
        &vec![1.0; n_channels],
        &vec![1.0; n_channels],
    );
    for (&cf, &sf) in filtering.channel.iter().zip(&filtering.signal) {
        assert_abs_diff_eq!(sf, 0.98, epsilon = 1e-12);
        assert_abs_diff_eq!(cf, 0.98, epsilon = 1e-12);
    }
}

/// Fitting a second time on the residuals only adds a small correction; the
/// accumulated signal still matches the injected one.
#[test]
fn test_iterated_fit_is_stable() {
    let n_frames = 100;
    let n_channels = 5;
    let resolution = 10;

    let injected = sinusoid(n_frames);
    let mut frame_data = Array2::from_shape_fn((n_frames, n_channels), |(f, _)| injected[f]);
    let flags = no_flags(n_frames, n_channels);
    let frame_weights = vec![1.0; n_frames];
    let frame_valid = vec![true; n_frames];
    let frame_modeling = vec![false; n_frames];
    let channel_indices: Vec<usize> = (0..n_channels).collect();
    let ones = vec![1.0; n_channels];

    let blocks = Blocks::new(n_frames, resolution);
    let mut signal = BlockSignal::zeros(blocks.len());
    let mut frame_dependents = vec![0.0; n_frames];
    let mut channel_dependents = vec![0.0; n_channels];

    for _ in 0..3 {
        let increment = CorrelatedEstimator::MaximumLikelihood.estimate(
            frame_data.view(),
            &frame_weights,
            &frame_valid,
            &channel_indices,
            &ones,
            &ones,
            &ones,
            flags.view(),
            resolution,
            0.25,
        );
        apply_gain_increments(
            frame_data.view_mut(),
            &frame_weights,
            &frame_valid,
            &frame_modeling,
            &mut frame_dependents,
            &ones,
            &ones,
            &channel_indices,
            &mut channel_dependents,
            flags.view(),
            &mut signal.values,
            &mut signal.weights,
            resolution,
            &increment.values,
            &increment.weights,
        );
    }

    for (block, frames) in blocks.iter() {
        let expected = injected[frames.clone()].iter().sum::<f64>() / frames.len() as f64;
        assert_abs_diff_eq!(signal.values[block], expected, epsilon = 1e-12);
    }
}
