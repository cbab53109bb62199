// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use criterion::*;
use ndarray::prelude::*;

use scan_reduce::{
    constants::TAU,
    math::{smart_median_default, Weights},
    signal::{calculate_filtering, remove_drifts, CorrelatedEstimator},
};

const NUM_FRAMES: usize = 10_000;
const NUM_CHANNELS: usize = 64;

fn scan() -> Array2<f64> {
    Array2::from_shape_fn((NUM_FRAMES, NUM_CHANNELS), |(f, c)| {
        (1.0 + 0.01 * c as f64) * (TAU * f as f64 / 500.0).sin() + 0.1 * c as f64
    })
}

fn correlated(c: &mut Criterion) {
    let frame_data = scan();
    let flags = Array2::<u32>::zeros(frame_data.dim());
    let frame_weights = vec![1.0; NUM_FRAMES];
    let frame_valid = vec![true; NUM_FRAMES];
    let channels: Vec<usize> = (0..NUM_CHANNELS).collect();
    let gains = vec![1.0; NUM_CHANNELS];

    let mut group = c.benchmark_group("correlated signal");
    for estimator in [CorrelatedEstimator::MaximumLikelihood, CorrelatedEstimator::Robust] {
        for resolution in [1, 10] {
            group.bench_function(format!("{estimator} resolution {resolution}"), |b| {
                b.iter(|| {
                    estimator.estimate(
                        frame_data.view(),
                        &frame_weights,
                        &frame_valid,
                        &channels,
                        &gains,
                        &gains,
                        &gains,
                        flags.view(),
                        resolution,
                        0.25,
                    )
                })
            });
        }
    }
    group.finish();
}

fn statistics(c: &mut Criterion) {
    let values: Vec<f64> = (0..NUM_FRAMES).map(|i| ((i * 7919) % 1000) as f64).collect();
    let weights = vec![1.0; NUM_FRAMES];
    c.bench_function("smart median", |b| {
        b.iter(|| smart_median_default(&values, Weights::Given(&weights)))
    });

    c.bench_function("remove drifts", |b| {
        b.iter_batched(
            || (values.clone(), vec![0.0; 10]),
            |(mut values, mut drifts)| {
                remove_drifts(
                    &mut values,
                    &mut drifts,
                    NUM_FRAMES / 10,
                    1,
                    NUM_FRAMES,
                    Weights::Uniform,
                    true,
                );
                drifts
            },
            BatchSize::SmallInput,
        )
    });
}

fn filtering(c: &mut Criterion) {
    let channels: Vec<usize> = (0..NUM_CHANNELS).collect();
    let dependents = vec![100.0; NUM_CHANNELS];
    let overlaps = Array2::from_elem((NUM_CHANNELS, NUM_CHANNELS), 0.1);
    let valid = vec![true; NUM_CHANNELS];
    let ones = vec![1.0; NUM_CHANNELS];
    c.bench_function("source filtering", |b| {
        b.iter(|| {
            calculate_filtering(
                &channels,
                &dependents,
                overlaps.view(),
                &valid,
                NUM_FRAMES as f64,
                &ones,
                &ones,
            )
        })
    });
}

criterion_group!(benches, correlated, statistics, filtering);
criterion_main!(benches);
