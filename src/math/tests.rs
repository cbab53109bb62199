// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;

#[test]
fn test_roundup_ratio() {
    assert_eq!(roundup_ratio(0, 3), 0);
    assert_eq!(roundup_ratio(9, 3), 3);
    assert_eq!(roundup_ratio(10, 3), 4);
    assert_eq!(roundup_ratio(11, 3), 4);
    assert_eq!(roundup_ratio(12, 3), 4);
    assert_eq!(roundup_ratio(1, 1), 1);
}

#[test]
fn test_blocks() {
    let blocks = Blocks::new(10, 3);
    assert_eq!(blocks.len(), 4);
    assert_eq!(blocks.frames(0), 0..3);
    assert_eq!(blocks.frames(2), 6..9);
    // The last block is short.
    assert_eq!(blocks.frames(3), 9..10);
    assert_eq!(blocks.block_of(0), 0);
    assert_eq!(blocks.block_of(8), 2);
    assert_eq!(blocks.block_of(9), 3);

    let ranges: Vec<_> = blocks.iter().collect();
    assert_eq!(ranges, vec![(0, 0..3), (1, 3..6), (2, 6..9), (3, 9..10)]);
}

#[test]
fn test_blocks_clamps_resolution() {
    let blocks = Blocks::new(7, 0);
    assert_eq!(blocks.resolution(), 1);
    assert_eq!(blocks.len(), 7);
    assert_eq!(blocks.frames(6), 6..7);

    let blocks = Blocks::new(0, 4);
    assert!(blocks.is_empty());
    assert_eq!(blocks.len(), 0);
}

#[test]
fn test_blocks_every_resolution() {
    for n_frames in 0..40 {
        for resolution in 1..12 {
            let blocks = Blocks::new(n_frames, resolution);
            let expected = (n_frames as f64 / resolution as f64).ceil() as usize;
            assert_eq!(blocks.len(), expected);
            // The blocks cover every frame exactly once.
            let covered: usize = blocks.iter().map(|(_, r)| r.len()).sum();
            assert_eq!(covered, n_frames);
        }
    }
}

#[test]
fn test_weighted_mean() {
    let values = [1.0, 2.0, 3.0, 4.0];
    let (mean, weight) = weighted_mean(&values, Weights::Uniform);
    assert_abs_diff_eq!(mean, 2.5);
    assert_abs_diff_eq!(weight, 4.0);

    let weights = [1.0, 0.0, 0.0, 3.0];
    let (mean, weight) = weighted_mean(&values, Weights::Given(&weights));
    assert_abs_diff_eq!(mean, 3.25);
    assert_abs_diff_eq!(weight, 4.0);
}

#[test]
fn test_weighted_mean_zero_weights() {
    let values = [1.0, 2.0, 3.0];
    let weights = [0.0; 3];
    assert_eq!(weighted_mean(&values, Weights::Given(&weights)), (0.0, 0.0));
    assert_eq!(weighted_mean(&[], Weights::Uniform), (0.0, 0.0));
}

#[test]
fn test_weighted_mean_skips_nans() {
    let values = [1.0, f64::NAN, 3.0];
    let (mean, weight) = weighted_mean(&values, Weights::Uniform);
    assert_abs_diff_eq!(mean, 2.0);
    assert_abs_diff_eq!(weight, 2.0);

    let weights = [1.0, 1.0, f64::NAN];
    let (mean, weight) = weighted_mean(&[5.0, 7.0, 100.0], Weights::Given(&weights));
    assert_abs_diff_eq!(mean, 6.0);
    assert_abs_diff_eq!(weight, 2.0);
}

#[test]
fn test_smart_median_zero_weights() {
    let values = [1.0, 2.0, 3.0];
    let weights = [0.0; 3];
    assert_eq!(
        smart_median(&values, Weights::Given(&weights), 0.25),
        (0.0, 0.0)
    );
    assert_eq!(smart_median(&[], Weights::Uniform, 0.25), (0.0, 0.0));
}

#[test]
fn test_smart_median_single_value() {
    assert_eq!(
        smart_median(&[3.0], Weights::Given(&[2.0]), 0.25),
        (3.0, 2.0)
    );
}

#[test]
fn test_smart_median_ignores_outlier() {
    // One wild sample among ten; no sample carries more than 10% of the
    // weight, so the median is used and the outlier has no pull.
    let mut values = vec![1.0; 10];
    values[4] = 1e6;
    let (median, weight) = smart_median(&values, Weights::Uniform, 0.25);
    assert_abs_diff_eq!(median, 1.0);
    assert_abs_diff_eq!(weight, 10.0);

    // The mean would have been dragged far away.
    let (mean, _) = weighted_mean(&values, Weights::Uniform);
    assert!(mean > 1e4);
}

#[test]
fn test_smart_median_even_count() {
    let values = [4.0, 1.0, 3.0, 2.0];
    let (median, weight) = smart_median(&values, Weights::Uniform, 0.25);
    assert_abs_diff_eq!(median, 2.5);
    assert_abs_diff_eq!(weight, 4.0);
}

#[test]
fn test_smart_median_odd_count() {
    let values = [5.0, 1.0, 3.0, 2.0, 4.0];
    let (median, _) = smart_median(&values, Weights::Uniform, 0.25);
    assert_abs_diff_eq!(median, 3.0);
}

#[test]
fn test_smart_median_weighted() {
    let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let weights = [1.0, 1.0, 1.0, 1.0, 2.0, 2.0];
    // Total 8, half 4, reached exactly after the 4th sample.
    let (median, weight) = smart_median(&values, Weights::Given(&weights), 0.25);
    assert_abs_diff_eq!(median, 4.5);
    assert_abs_diff_eq!(weight, 8.0);
}

#[test]
fn test_smart_median_dominant_weight_uses_mean() {
    // The last sample carries 70% of the total weight, which exceeds the 25%
    // limit; the weighted mean is returned.
    let values = [1.0, 2.0, 3.0, 10.0];
    let weights = [1.0, 1.0, 1.0, 7.0];
    let (value, weight) = smart_median(&values, Weights::Given(&weights), 0.25);
    assert_abs_diff_eq!(value, (1.0 + 2.0 + 3.0 + 70.0) / 10.0);
    assert_abs_diff_eq!(weight, 10.0);

    // With a permissive dependence the median is used.
    let (value, _) = smart_median(&values, Weights::Given(&weights), 1.0);
    assert_abs_diff_eq!(value, 10.0);
}

#[test]
fn test_smart_median_few_samples_fall_back_to_mean() {
    // Three equal weights: each is a third of the total, which is above 0.25.
    let values = [1.0, 2.0, 9.0];
    let (value, _) = smart_median_default(&values, Weights::Uniform);
    assert_abs_diff_eq!(value, 4.0);
}

#[test]
fn test_smart_median_weight_at_the_limit() {
    // Four equal weights are each exactly a quarter of the total; that doesn't
    // exceed the limit, so the median is still used.
    let values = [1.0, 2.0, 3.0, 10.0];
    let (value, weight) = smart_median_default(&values, Weights::Uniform);
    assert_abs_diff_eq!(value, 2.5);
    assert_abs_diff_eq!(weight, 4.0);
}

#[test]
fn test_smart_median_skips_nans() {
    let values = [1.0, 2.0, f64::NAN, 3.0, 4.0, 5.0];
    let (median, weight) = smart_median(&values, Weights::Uniform, 0.25);
    assert_abs_diff_eq!(median, 3.0);
    assert_abs_diff_eq!(weight, 5.0);
}

#[test]
fn test_signal_variance() {
    let values = [1.0, -1.0, 2.0, -2.0];
    assert_abs_diff_eq!(signal_variance(&values, Weights::Uniform), 2.5);

    let weights = [1.0, 1.0, 0.0, 0.0];
    assert_abs_diff_eq!(signal_variance(&values, Weights::Given(&weights)), 1.0);

    assert_abs_diff_eq!(signal_variance(&values, Weights::Given(&[0.0; 4])), 0.0);
    assert_abs_diff_eq!(
        signal_variance(&[f64::NAN, 3.0], Weights::Uniform),
        9.0
    );
}

#[test]
fn test_weights_from_option() {
    let w = [2.0, 3.0];
    let given: Weights = Some(&w[..]).into();
    assert_abs_diff_eq!(given.get(1), 3.0);
    let uniform: Weights = None.into();
    assert_abs_diff_eq!(uniform.get(100), 1.0);
    assert_abs_diff_eq!(given.slice(1..2).get(0), 3.0);
}
