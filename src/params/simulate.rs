// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Generate a synthetic scan and fit its correlated signal, channel gains and
//! channel drifts.

use std::{fs::File, io::BufWriter, path::PathBuf};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info, trace};
use ndarray::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::Serialize;
use thiserror::Error;

use super::FitConfig;
use crate::{
    constants::{MIN_RELATIVE_GAIN, TAU},
    math::{roundup_ratio, signal_variance, Blocks, Weights},
    signal::{
        apply_gain_increments, calculate_filtering, covariance, differentiate_weighted,
        ml_gain_increment, prepare_frame_temp_fields, remove_drifts, resync_gains,
        robust_gain_increment, synchronize_gains, BlockSignal, CorrelatedEstimator,
    },
    PROGRESS_BARS,
};

/// Glitches are this many times larger than the signal and noise combined.
const GLITCH_SCALE: f64 = 100.0;

/// The sample flag given to glitches.
const GLITCH_FLAG: u32 = 1;

/// Parameters describing a synthetic scan: channels see a common-mode
/// sinusoid through their own gains, on top of per-channel offsets (which
/// change at every drift segment) and white noise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SyntheticScanParams {
    pub(crate) num_frames: usize,
    pub(crate) num_channels: usize,

    /// The time between frames \[seconds\].
    pub(crate) frame_interval: f64,

    pub(crate) signal_amplitude: f64,

    /// The period of the common-mode signal \[frames\].
    pub(crate) signal_period: f64,

    pub(crate) noise_rms: f64,

    /// The RMS of the channel gains around 1.
    pub(crate) gain_spread: f64,

    pub(crate) offset_rms: f64,

    /// The fraction of samples hit by (flagged) glitches.
    pub(crate) glitch_fraction: f64,

    /// Channels that don't respond to the common mode at all.
    pub(crate) dead_channels: Vec<usize>,

    pub(crate) seed: u64,
}

/// The data of a synthetic scan, along with the truth it was generated from.
pub(crate) struct SyntheticScan {
    pub(crate) frame_data: Array2<f64>,
    pub(crate) sample_flags: Array2<u32>,
    pub(crate) true_gains: Vec<f64>,
    pub(crate) common_mode: Vec<f64>,
}

impl SyntheticScanParams {
    /// Generate a scan. The channel offsets change every `num_frames /
    /// num_drifts` (rounded up) frames.
    pub(crate) fn generate(&self, num_drifts: usize) -> SyntheticScan {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let num_drifts = num_drifts.max(1);
        let drift_frames = roundup_ratio(self.num_frames, num_drifts);

        let true_gains: Vec<f64> = (0..self.num_channels)
            .map(|channel| {
                let g = 1.0 + self.gain_spread * rng.sample::<f64, _>(StandardNormal);
                if self.dead_channels.contains(&channel) {
                    0.0
                } else {
                    g
                }
            })
            .collect();
        let common_mode: Vec<f64> = (0..self.num_frames)
            .map(|frame| self.signal_amplitude * (TAU * frame as f64 / self.signal_period).sin())
            .collect();
        let offsets = Array2::from_shape_fn((num_drifts, self.num_channels), |_| {
            self.offset_rms * rng.sample::<f64, _>(StandardNormal)
        });

        let glitch = GLITCH_SCALE * (self.signal_amplitude.abs() + self.noise_rms + 1.0);
        let mut frame_data = Array2::zeros((self.num_frames, self.num_channels));
        let mut sample_flags = Array2::zeros((self.num_frames, self.num_channels));
        for ((frame, channel), x) in frame_data.indexed_iter_mut() {
            let noise: f64 = rng.sample(StandardNormal);
            *x = true_gains[channel] * common_mode[frame]
                + offsets[(frame / drift_frames, channel)]
                + self.noise_rms * noise;
            if rng.gen::<f64>() < self.glitch_fraction {
                *x += glitch;
                sample_flags[(frame, channel)] = GLITCH_FLAG;
            }
        }
        debug!(
            "Generated {} frames × {} channels; {} samples glitched",
            self.num_frames,
            self.num_channels,
            sample_flags.iter().filter(|&&f| f != 0).count()
        );

        SyntheticScan {
            frame_data,
            sample_flags,
            true_gains,
            common_mode,
        }
    }
}

/// Parameters needed to simulate and fit a scan.
#[derive(Debug)]
pub(crate) struct SimulateParams {
    pub(crate) scan: SyntheticScanParams,
    pub(crate) fit: FitConfig,

    /// Where to write the JSON summary.
    pub(crate) output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct IterationSummary {
    pub(crate) iteration: usize,
    pub(crate) num_channels: usize,
    pub(crate) residual_rms: f64,
    /// The correlation of the fitted signal with the residuals.
    pub(crate) covariance: f64,
}

/// The results of a fit against a synthetic scan.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SimulateSummary {
    pub(crate) scan: SyntheticScanParams,
    pub(crate) fit: FitConfig,
    pub(crate) num_blocks: usize,
    pub(crate) iterations: Vec<IterationSummary>,

    /// The channels remaining in the correlated mode.
    pub(crate) channels: Vec<usize>,
    /// The true gains of the remaining channels, relative to their mean.
    pub(crate) true_gains: Vec<f64>,
    /// The fitted gains of the remaining channels, relative to their mean.
    pub(crate) fitted_gains: Vec<f64>,
    pub(crate) gain_rms_error: f64,

    pub(crate) signal: Vec<f64>,
    pub(crate) signal_weights: Vec<f64>,
    /// The RMS difference between the fitted signal and the injected one, after
    /// levelling both over the drift segments.
    pub(crate) signal_rms_error: f64,
    pub(crate) signal_derivative_rms: f64,

    /// The offset removed from each channel in each drift segment, indexed by
    /// channel.
    pub(crate) channel_drifts: Vec<Vec<f64>>,
    pub(crate) channel_filtering: Vec<f64>,
    pub(crate) signal_filtering: Vec<f64>,
}

impl SimulateParams {
    pub(crate) fn run(&self) -> Result<SimulateSummary, SimulateError> {
        let SimulateParams { scan, fit, output } = self;

        let synthetic = scan.generate(fit.num_drifts);
        let mut state = ScanFit::new(&synthetic, fit);

        let progress = ProgressBar::with_draw_target(
            Some(fit.iterations as _),
            if PROGRESS_BARS.load() {
                ProgressDrawTarget::stdout()
            } else {
                ProgressDrawTarget::hidden()
            },
        )
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg:17}: [{wide_bar:.blue}] {pos:2}/{len:2} iterations ({elapsed_precise}<{eta_precise})").unwrap()
                .progress_chars("=> "),
        )
        .with_position(0)
        .with_message("Fitting");

        info!("Fitting the correlated signal");
        let mut iterations = Vec::with_capacity(fit.iterations);
        for iteration in 0..fit.iterations {
            state.remove_channel_drifts();
            state.update_signal();
            if fit.fit_gains {
                state.update_gains();
            }
            state.update_filtering();
            state.update_weights();

            let summary = state.summarise(iteration);
            debug!(
                "Iteration {}: residual RMS {:.6}, covariance {:.6}, {} channels",
                iteration + 1,
                summary.residual_rms,
                summary.covariance,
                summary.num_channels
            );
            iterations.push(summary);
            progress.inc(1);
        }
        progress.abandon_with_message("Finished fitting");

        let summary = state.finish(&synthetic, scan, iterations);
        info!(
            "Residual RMS: {:.6}",
            summary
                .iterations
                .last()
                .map(|i| i.residual_rms)
                .unwrap_or_default()
        );
        info!("Gain RMS error: {:.6}", summary.gain_rms_error);
        info!("Signal RMS error: {:.6}", summary.signal_rms_error);

        if let Some(output) = output {
            let f = BufWriter::new(File::create(output)?);
            serde_json::to_writer_pretty(f, &summary)?;
            info!("Summary written to {}", output.display());
        }

        Ok(summary)
    }
}

/// The overlaps between the members of a mode: neighbouring channels overlap
/// by `overlap`, everything else not at all.
fn neighbour_overlaps(channel_indices: &[usize], overlap: f64) -> Array2<f64> {
    Array2::from_shape_fn(
        (channel_indices.len(), channel_indices.len()),
        |(i, j)| {
            if channel_indices[i].abs_diff(channel_indices[j]) == 1 {
                overlap
            } else {
                0.0
            }
        },
    )
}

/// The degrees of freedom left for the correlated signal: the number of
/// weighted, non-modelling frames, less the one offset removed from every
/// drift segment of `drift_frames` frames.
pub(super) fn signal_degrees_of_freedom(
    frame_weights: &[f64],
    frame_valid: &[bool],
    frame_modeling: &[bool],
    drift_frames: usize,
) -> f64 {
    let num_weighted = frame_weights
        .iter()
        .zip(frame_valid)
        .zip(frame_modeling)
        .filter(|((&w, &valid), &modeling)| valid && !modeling && w > 0.0)
        .count();
    num_weighted as f64 * (1.0 - 1.0 / drift_frames.max(1) as f64)
}

/// The state of a fit: the residual data and everything fitted to it so far.
struct ScanFit<'a> {
    config: &'a FitConfig,

    /// Starts as the scan data; the models are subtracted as they are fitted.
    frame_data: Array2<f64>,
    sample_flags: ArrayView2<'a, u32>,
    frame_weights: Vec<f64>,
    frame_valid: Vec<bool>,
    frame_modeling: Vec<bool>,
    frame_dependents: Vec<f64>,

    /// Drift offsets for all channels, shape `(num_drifts, num_channels)`.
    channel_drifts: Array2<f64>,
    /// Dependents for all channels.
    channel_dependents: Vec<f64>,

    // The members of the correlated mode, and per-member quantities.
    channel_indices: Vec<usize>,
    channel_gains: Vec<f64>,
    channel_weights: Vec<f64>,
    channel_filtering: Vec<f64>,
    signal_filtering: Vec<f64>,

    signal: BlockSignal,
}

impl<'a> ScanFit<'a> {
    fn new(scan: &'a SyntheticScan, config: &'a FitConfig) -> ScanFit<'a> {
        let (num_frames, num_channels) = scan.frame_data.dim();
        let num_blocks = Blocks::new(num_frames, config.resolution).len();
        ScanFit {
            config,
            frame_data: scan.frame_data.clone(),
            sample_flags: scan.sample_flags.view(),
            frame_weights: vec![1.0; num_frames],
            frame_valid: vec![true; num_frames],
            frame_modeling: vec![false; num_frames],
            frame_dependents: vec![0.0; num_frames],
            channel_drifts: Array2::zeros((config.num_drifts.max(1), num_channels)),
            channel_dependents: vec![0.0; num_channels],
            channel_indices: (0..num_channels).collect(),
            channel_gains: vec![1.0; num_channels],
            channel_weights: vec![1.0; num_channels],
            channel_filtering: vec![1.0; num_channels],
            signal_filtering: vec![1.0; num_channels],
            signal: BlockSignal::zeros(num_blocks),
        }
    }

    fn num_frames(&self) -> usize {
        self.frame_data.len_of(Axis(0))
    }

    fn drift_frames(&self) -> usize {
        roundup_ratio(self.num_frames(), self.config.num_drifts.max(1))
    }

    fn robust(&self) -> bool {
        self.config.estimator == CorrelatedEstimator::Robust
    }

    /// Remove the offset of every channel over each drift segment.
    fn remove_channel_drifts(&mut self) {
        let num_frames = self.num_frames();
        let drift_frames = self.drift_frames();
        let robust = self.robust();

        let mut values = Vec::with_capacity(num_frames);
        let mut weights = Vec::with_capacity(num_frames);
        for (channel, mut drifts) in self.channel_drifts.axis_iter_mut(Axis(1)).enumerate() {
            values.clear();
            weights.clear();
            for frame in 0..num_frames {
                values.push(self.frame_data[(frame, channel)]);
                let usable = self.frame_valid[frame] && self.sample_flags[(frame, channel)] == 0;
                weights.push(if usable {
                    self.frame_weights[frame]
                } else {
                    0.0
                });
            }

            let mut channel_drifts = drifts.to_vec();
            remove_drifts(
                &mut values,
                &mut channel_drifts,
                drift_frames,
                1,
                num_frames,
                Weights::Given(&weights),
                robust,
            );

            self.frame_data
                .column_mut(channel)
                .iter_mut()
                .zip(&values)
                .for_each(|(x, &v)| *x = v);
            drifts
                .iter_mut()
                .zip(channel_drifts)
                .for_each(|(d, new)| *d = new);
        }
    }

    /// Estimate a correlated-signal increment from the residuals and remove it.
    fn update_signal(&mut self) {
        let wg: Vec<f64> = self
            .channel_gains
            .iter()
            .zip(&self.channel_weights)
            .map(|(g, w)| w * g)
            .collect();
        let wg2: Vec<f64> = wg
            .iter()
            .zip(&self.channel_gains)
            .map(|(wg, g)| wg * g)
            .collect();
        let fwg2: Vec<f64> = wg2
            .iter()
            .zip(&self.channel_filtering)
            .map(|(wg2, f)| wg2 * f)
            .collect();

        let increment = self.config.estimator.estimate(
            self.frame_data.view(),
            &self.frame_weights,
            &self.frame_valid,
            &self.channel_indices,
            &self.channel_gains,
            &wg,
            &wg2,
            self.sample_flags,
            self.config.resolution,
            self.config.max_dependence,
        );
        trace!("Signal increment: {:?}", increment.values);

        // The dependents are those of the signal as a whole.
        self.frame_dependents.fill(0.0);
        self.channel_dependents.fill(0.0);
        apply_gain_increments(
            self.frame_data.view_mut(),
            &self.frame_weights,
            &self.frame_valid,
            &self.frame_modeling,
            &mut self.frame_dependents,
            &self.channel_gains,
            &fwg2,
            &self.channel_indices,
            &mut self.channel_dependents,
            self.sample_flags,
            &mut self.signal.values,
            &mut self.signal.weights,
            self.config.resolution,
            &increment.values,
            &increment.weights,
        );
    }

    /// Fit the channel gains against the current signal, drop channels that
    /// don't respond to it and normalise the remaining gains.
    fn update_gains(&mut self) {
        let signal_frames = self
            .signal
            .to_frames(self.num_frames(), self.config.resolution);
        let fields = prepare_frame_temp_fields(
            &signal_frames,
            &self.frame_weights,
            &self.frame_valid,
            &self.frame_modeling,
        );
        let increment = if self.robust() {
            robust_gain_increment(
                self.frame_data.view(),
                &fields.c,
                &fields.wc2,
                self.sample_flags,
                &self.channel_indices,
                &self.frame_valid,
            )
        } else {
            ml_gain_increment(
                self.frame_data.view(),
                &fields.wc,
                &fields.wc2,
                self.sample_flags,
                &self.channel_indices,
                &self.frame_valid,
            )
        };
        synchronize_gains(
            self.frame_data.view_mut(),
            self.sample_flags,
            &self.frame_valid,
            &self.frame_modeling,
            &self.channel_indices,
            &increment.values,
            &fields.wc2,
            &increment.weights,
            &signal_frames,
            &mut self.frame_dependents,
            &mut self.channel_dependents,
        );
        for (gain, delta) in self.channel_gains.iter_mut().zip(&increment.values) {
            *gain += delta;
        }

        self.drop_unresponsive_channels();

        // Only the product of the gains and the signal is constrained; keep the
        // mean gain at 1.
        let num_channels = self.channel_gains.len();
        if num_channels == 0 {
            return;
        }
        let mean_gain = self.channel_gains.iter().sum::<f64>() / num_channels as f64;
        if mean_gain == 0.0 || mean_gain.is_nan() {
            return;
        }
        self.channel_gains.iter_mut().for_each(|g| *g /= mean_gain);
        self.signal.values.iter_mut().for_each(|v| *v *= mean_gain);
        self.signal
            .weights
            .iter_mut()
            .for_each(|w| *w /= mean_gain * mean_gain);
    }

    /// Channels with a gain too small to be fitted leave the mode. Their share of
    /// the signal is restored to their data.
    fn drop_unresponsive_channels(&mut self) {
        let num_channels = self.channel_gains.len();
        if num_channels == 0 {
            return;
        }
        let mean_gain = self.channel_gains.iter().map(|g| g.abs()).sum::<f64>() / num_channels as f64;
        let keep: Vec<bool> = self
            .channel_gains
            .iter()
            .map(|g| g.abs() >= MIN_RELATIVE_GAIN * mean_gain)
            .collect();
        if keep.iter().all(|&k| k) {
            return;
        }

        let dropped: Vec<usize> = self
            .channel_indices
            .iter()
            .zip(&keep)
            .filter(|(_, &k)| !k)
            .map(|(&c, _)| c)
            .collect();
        let removed_gains: Vec<f64> = self
            .channel_gains
            .iter()
            .zip(&keep)
            .filter(|(_, &k)| !k)
            .map(|(&g, _)| -g)
            .collect();
        info!("Dropping unresponsive channels {dropped:?} from the correlated mode");
        resync_gains(
            self.frame_data.view_mut(),
            &self.signal.values,
            self.config.resolution,
            &removed_gains,
            &dropped,
            &self.frame_valid,
        );

        fn retain<T: Copy>(v: &mut Vec<T>, keep: &[bool]) {
            let mut i = 0;
            v.retain(|_| {
                let k = keep[i];
                i += 1;
                k
            });
        }
        retain(&mut self.channel_indices, &keep);
        retain(&mut self.channel_gains, &keep);
        retain(&mut self.channel_weights, &keep);
        retain(&mut self.channel_filtering, &keep);
        retain(&mut self.signal_filtering, &keep);
    }

    fn update_filtering(&mut self) {
        let num_parms = signal_degrees_of_freedom(
            &self.frame_weights,
            &self.frame_valid,
            &self.frame_modeling,
            self.drift_frames(),
        );
        let overlaps = neighbour_overlaps(&self.channel_indices, self.config.channel_overlap);
        let filtering = calculate_filtering(
            &self.channel_indices,
            &self.channel_dependents,
            overlaps.view(),
            &vec![true; self.channel_indices.len()],
            num_parms,
            &self.channel_filtering,
            &self.signal_filtering,
        );
        self.channel_filtering = filtering.channel;
        self.signal_filtering = filtering.signal;
    }

    /// Channel weights are the inverse residual variance, scaled by the
    /// fraction of degrees of freedom left.
    fn update_weights(&mut self) {
        let num_frames = self.num_frames();
        let mut mask = Vec::with_capacity(num_frames);
        for (&channel, weight) in self.channel_indices.iter().zip(self.channel_weights.iter_mut()) {
            mask.clear();
            let mut num_points = 0.0;
            for frame in 0..num_frames {
                let usable = self.frame_valid[frame] && self.sample_flags[(frame, channel)] == 0;
                if usable {
                    num_points += 1.0;
                }
                mask.push(if usable { 1.0 } else { 0.0 });
            }
            let column = self.frame_data.column(channel).to_vec();
            let variance = signal_variance(&column, Weights::Given(&mask));
            if variance > 0.0 && num_points > 0.0 {
                let dof = (1.0 - self.channel_dependents[channel] / num_points).max(0.0);
                *weight = dof / variance;
            }
        }
    }

    fn residual_rms(&self) -> f64 {
        let mut sum = 0.0;
        let mut n = 0.0;
        for ((frame, channel), &x) in self.frame_data.indexed_iter() {
            if !self.frame_valid[frame] || self.sample_flags[(frame, channel)] != 0 {
                continue;
            }
            sum += x * x;
            n += 1.0;
        }
        if n > 0.0 {
            (sum / n).sqrt()
        } else {
            0.0
        }
    }

    fn summarise(&self, iteration: usize) -> IterationSummary {
        let signal_frames = self
            .signal
            .to_frames(self.num_frames(), self.config.resolution);
        IterationSummary {
            iteration: iteration + 1,
            num_channels: self.channel_indices.len(),
            residual_rms: self.residual_rms(),
            covariance: covariance(
                &signal_frames,
                self.frame_data.view(),
                &self.frame_valid,
                &self.channel_indices,
                &self.channel_weights,
                self.sample_flags,
            ),
        }
    }

    fn finish(
        self,
        scan: &SyntheticScan,
        params: &SyntheticScanParams,
        iterations: Vec<IterationSummary>,
    ) -> SimulateSummary {
        let num_frames = self.num_frames();
        let resolution = self.config.resolution;
        let blocks = Blocks::new(num_frames, resolution);

        // Gains relative to their mean over the mode.
        let relative = |gains: Vec<f64>| -> Vec<f64> {
            let mean = gains.iter().sum::<f64>() / gains.len().max(1) as f64;
            gains.into_iter().map(|g| g / mean).collect()
        };
        let true_gains = relative(
            self.channel_indices
                .iter()
                .map(|&c| scan.true_gains[c])
                .collect(),
        );
        let fitted_gains = relative(self.channel_gains.clone());
        let gain_rms_error = rms(true_gains
            .iter()
            .zip(&fitted_gains)
            .map(|(t, f)| t - f));

        // The fitted signal carries the mean true gain of the mode.
        let mean_true_gain = self
            .channel_indices
            .iter()
            .map(|&c| scan.true_gains[c])
            .sum::<f64>()
            / self.channel_indices.len().max(1) as f64;
        let mut injected: Vec<f64> = blocks
            .iter()
            .map(|(_, frames)| {
                let n = frames.len() as f64;
                mean_true_gain * scan.common_mode[frames].iter().sum::<f64>() / n
            })
            .collect();
        let mut fitted = self.signal.values.clone();
        let num_drifts = self.config.num_drifts.max(1);
        for values in [&mut injected, &mut fitted] {
            let mut drifts = vec![0.0; num_drifts];
            remove_drifts(
                values,
                &mut drifts,
                self.drift_frames(),
                resolution,
                num_frames,
                Weights::Given(&self.signal.weights),
                false,
            );
        }
        let signal_rms_error = rms(injected.iter().zip(&fitted).map(|(i, f)| i - f));

        let mut derivative = self.signal.values.clone();
        let mut derivative_weights = self.signal.weights.clone();
        differentiate_weighted(
            &mut derivative,
            &mut derivative_weights,
            params.frame_interval * blocks.resolution() as f64,
        );
        let signal_derivative_rms =
            signal_variance(&derivative, Weights::Given(&derivative_weights)).sqrt();

        SimulateSummary {
            scan: params.clone(),
            fit: *self.config,
            num_blocks: blocks.len(),
            iterations,
            channels: self.channel_indices,
            true_gains,
            fitted_gains,
            gain_rms_error,
            signal: self.signal.values,
            signal_weights: self.signal.weights,
            signal_rms_error,
            signal_derivative_rms,
            channel_drifts: self
                .channel_drifts
                .axis_iter(Axis(1))
                .map(|d| d.to_vec())
                .collect(),
            channel_filtering: self.channel_filtering,
            signal_filtering: self.signal_filtering,
        }
    }
}

fn rms(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v * v, n + 1));
    if n == 0 {
        0.0
    } else {
        (sum / n as f64).sqrt()
    }
}

#[derive(Error, Debug)]
pub(crate) enum SimulateError {
    #[error("Couldn't serialise the summary: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
