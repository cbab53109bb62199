// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests against the public signal API.

use approx::assert_abs_diff_eq;
use ndarray::prelude::*;

use scan_reduce::{
    constants::TAU,
    math::Weights,
    signal::{add_drifts, covariance, ml_correlated, remove_drifts, CorrelatedEstimator},
};

#[test]
fn test_remove_then_add_drifts() {
    let original: Vec<f64> = (0..40)
        .map(|i| (TAU * i as f64 / 20.0).sin() + if i < 20 { 3.0 } else { -2.0 })
        .collect();
    let mut values = original.clone();
    let mut drifts = vec![0.0; 2];
    remove_drifts(&mut values, &mut drifts, 20, 1, 40, Weights::Uniform, false);
    assert_abs_diff_eq!(drifts[0], 3.0, epsilon = 1e-10);
    assert_abs_diff_eq!(drifts[1], -2.0, epsilon = 1e-10);

    add_drifts(&mut values, &drifts, 20);
    for (v, o) in values.iter().zip(&original) {
        assert_abs_diff_eq!(*v, *o, epsilon = 1e-10);
    }
}

#[test]
fn test_estimators_agree_on_clean_data() {
    let n_frames = 60;
    let gains = [1.0, 2.0, 0.5];
    let common: Vec<f64> = (0..n_frames)
        .map(|i| (TAU * i as f64 / 30.0).cos())
        .collect();
    let frame_data = Array2::from_shape_fn((n_frames, 3), |(f, c)| gains[c] * common[f]);
    let flags = Array2::<u32>::zeros((n_frames, 3));
    let frame_weights = vec![1.0; n_frames];
    let frame_valid = vec![true; n_frames];
    let channels = [0, 1, 2];
    let wg = gains.to_vec();
    let wg2: Vec<f64> = gains.iter().map(|g| g * g).collect();

    let ml = ml_correlated(
        frame_data.view(),
        &frame_weights,
        &frame_valid,
        &channels,
        &wg,
        &wg2,
        flags.view(),
        1,
    );
    let robust = CorrelatedEstimator::Robust.estimate(
        frame_data.view(),
        &frame_weights,
        &frame_valid,
        &channels,
        &gains,
        &wg,
        &wg2,
        flags.view(),
        1,
        0.25,
    );
    for ((m, r), c) in ml.values.iter().zip(&robust.values).zip(&common) {
        assert_abs_diff_eq!(*m, *c, epsilon = 1e-12);
        assert_abs_diff_eq!(*r, *c, epsilon = 1e-12);
    }

    // The recovered signal is perfectly correlated with every channel.
    let weights = vec![1.0; 3];
    let c = covariance(
        &ml.to_frames(n_frames, 1),
        frame_data.view(),
        &frame_valid,
        &channels,
        &weights,
        flags.view(),
    );
    assert_abs_diff_eq!(c, 3.0_f64.sqrt(), epsilon = 1e-10);
}
