// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics: block arithmetic and weighted statistics that every
//! signal kernel shares.

#[cfg(test)]
mod tests;

use std::ops::Range;

use crate::constants::DEFAULT_MAX_DEPENDENCE;

/// Integer division, rounding up. `b` must be non-zero.
///
/// # Examples
///
/// `assert_eq!(roundup_ratio(10, 3), 4);`
#[inline]
pub fn roundup_ratio(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

/// The mapping between frames and the blocks of a correlated signal. Each block
/// aggregates `resolution` consecutive frames; the last block may be short.
///
/// Every block-structured kernel goes through this type so that the number of
/// blocks is always `ceil(n_frames / resolution)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blocks {
    n_frames: usize,
    resolution: usize,
}

impl Blocks {
    /// A `resolution` of 0 is treated as 1.
    pub fn new(n_frames: usize, resolution: usize) -> Blocks {
        Blocks {
            n_frames,
            resolution: resolution.max(1),
        }
    }

    /// The (clamped) number of frames per block.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn n_frames(&self) -> usize {
        self.n_frames
    }

    /// The number of blocks.
    pub fn len(&self) -> usize {
        roundup_ratio(self.n_frames, self.resolution)
    }

    pub fn is_empty(&self) -> bool {
        self.n_frames == 0
    }

    /// The frames belonging to a block. The range never extends past the last
    /// frame.
    pub fn frames(&self, block: usize) -> Range<usize> {
        let start = (block * self.resolution).min(self.n_frames);
        let end = (start + self.resolution).min(self.n_frames);
        start..end
    }

    /// The block that a frame belongs to.
    pub fn block_of(&self, frame: usize) -> usize {
        frame / self.resolution
    }

    /// Iterate over `(block, frames)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Range<usize>)> + '_ {
        (0..self.len()).map(|block| (block, self.frames(block)))
    }
}

/// Statistical weights that may or may not have been supplied. Absent weights
/// behave as an array of ones with the same length as the values.
#[derive(Debug, Clone, Copy)]
pub enum Weights<'a> {
    Given(&'a [f64]),
    Uniform,
}

impl<'a> Weights<'a> {
    #[inline]
    pub fn get(&self, i: usize) -> f64 {
        match self {
            Weights::Given(w) => w[i],
            Weights::Uniform => 1.0,
        }
    }

    /// The weights for a sub-range of the values.
    pub fn slice(&self, range: Range<usize>) -> Weights<'a> {
        match *self {
            Weights::Given(w) => Weights::Given(&w[range]),
            Weights::Uniform => Weights::Uniform,
        }
    }
}

impl<'a> From<Option<&'a [f64]>> for Weights<'a> {
    fn from(w: Option<&'a [f64]>) -> Self {
        match w {
            Some(w) => Weights::Given(w),
            None => Weights::Uniform,
        }
    }
}

/// Is this (value, weight) pair usable for statistics? NaN values and NaN or
/// non-positive weights are not.
#[inline]
fn usable(value: f64, weight: f64) -> bool {
    !value.is_nan() && weight > 0.0
}

/// The weighted mean `Σ(w·x) / Σ(w)` and its weight `Σ(w)`. `(0, 0)` is returned
/// if there is nothing to average.
pub fn weighted_mean(values: &[f64], weights: Weights) -> (f64, f64) {
    let mut sum_wx = 0.0;
    let mut sum_w = 0.0;
    for (i, &x) in values.iter().enumerate() {
        let w = weights.get(i);
        if !usable(x, w) {
            continue;
        }
        sum_wx += w * x;
        sum_w += w;
    }

    if sum_w == 0.0 {
        (0.0, 0.0)
    } else {
        (sum_wx / sum_w, sum_w)
    }
}

/// A weighted median that refuses to let a single datum decide the result.
///
/// If any one sample carries more than `max_dependence` of the total weight,
/// the median would be dominated by it, so the weighted mean is returned
/// instead. Otherwise the weighted median is returned; when the half-weight
/// point lands exactly between two samples, their values are averaged. The
/// returned weight is the total weight of the usable samples.
///
/// NaN values and NaN or non-positive weights are ignored. `(0, 0)` is
/// returned if nothing is left.
pub fn smart_median(values: &[f64], weights: Weights, max_dependence: f64) -> (f64, f64) {
    let mut points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, &x)| (x, weights.get(i)))
        .filter(|&(x, w)| usable(x, w))
        .collect();

    match points.as_slice() {
        [] => return (0.0, 0.0),
        [(x, w)] => return (*x, *w),
        _ => (),
    }

    let (sum_w, max_w) = points
        .iter()
        .fold((0.0, 0.0_f64), |(sum, max), &(_, w)| (sum + w, max.max(w)));
    // Strictly greater: a weight exactly at the limit keeps the median.
    if max_w > max_dependence * sum_w {
        let (mean, _) = weighted_mean(values, weights);
        return (mean, sum_w);
    }

    points.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));
    let half_w = 0.5 * sum_w;
    let mut cumulative = 0.0;
    for (i, &(x, w)) in points.iter().enumerate() {
        cumulative += w;
        if cumulative < half_w {
            continue;
        }
        if cumulative == half_w {
            if let Some(&(next, _)) = points.get(i + 1) {
                return (0.5 * (x + next), sum_w);
            }
        }
        return (x, sum_w);
    }

    // Only reachable through rounding in the cumulative sum.
    (points[points.len() - 1].0, sum_w)
}

/// [`smart_median`] with the default maximum dependence.
pub fn smart_median_default(values: &[f64], weights: Weights) -> (f64, f64) {
    smart_median(values, weights, DEFAULT_MAX_DEPENDENCE)
}

/// The signal variance `Σ(w·x²) / Σ(w)`. NaN values are skipped. 0 is returned
/// if the weights sum to zero.
pub fn signal_variance(values: &[f64], weights: Weights) -> f64 {
    let mut sum_wx2 = 0.0;
    let mut sum_w = 0.0;
    for (i, &x) in values.iter().enumerate() {
        if x.is_nan() {
            continue;
        }
        let w = weights.get(i);
        if w.is_nan() {
            continue;
        }
        sum_wx2 += w * x * x;
        sum_w += w;
    }

    if sum_w == 0.0 {
        0.0
    } else {
        sum_wx2 / sum_w
    }
}
