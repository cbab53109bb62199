// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Generate a synthetic scan and fit it.


use std::path::PathBuf;

use clap::Parser;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::common::{
    display_warnings, FitArgs, FitArgsError, InfoPrinter, Warn, ARG_FILE_HELP,
};
use crate::{
    params::{SimulateParams, SimulateSummary, SyntheticScanParams},
    ScanReduceError,
};

const DEFAULT_NUM_FRAMES: usize = 2000;
const DEFAULT_NUM_CHANNELS: usize = 16;
const DEFAULT_FRAME_INTERVAL: f64 = 0.1;
const DEFAULT_SIGNAL_AMPLITUDE: f64 = 1.0;
const DEFAULT_SIGNAL_PERIOD: f64 = 200.0;
const DEFAULT_NOISE_RMS: f64 = 0.05;
const DEFAULT_GAIN_SPREAD: f64 = 0.1;
const DEFAULT_OFFSET_RMS: f64 = 0.5;
const DEFAULT_GLITCH_FRACTION: f64 = 0.0;
const DEFAULT_SEED: u64 = 0;

lazy_static::lazy_static! {
    static ref NUM_FRAMES_HELP: String =
        format!("The number of frames in the scan. Default: {DEFAULT_NUM_FRAMES}");

    static ref NUM_CHANNELS_HELP: String =
        format!("The number of detector channels. Default: {DEFAULT_NUM_CHANNELS}");

    static ref FRAME_INTERVAL_HELP: String =
        format!("The time between frames [seconds]. Default: {DEFAULT_FRAME_INTERVAL}");

    static ref SIGNAL_AMPLITUDE_HELP: String =
        format!("The amplitude of the common-mode signal. Default: {DEFAULT_SIGNAL_AMPLITUDE}");

    static ref SIGNAL_PERIOD_HELP: String =
        format!("The period of the common-mode signal [frames]. Default: {DEFAULT_SIGNAL_PERIOD}");

    static ref NOISE_RMS_HELP: String =
        format!("The RMS of the white noise on each sample. Default: {DEFAULT_NOISE_RMS}");

    static ref GAIN_SPREAD_HELP: String =
        format!("The RMS of the channel gains around 1. Default: {DEFAULT_GAIN_SPREAD}");

    static ref OFFSET_RMS_HELP: String =
        format!("The RMS of the channel offsets in each drift segment. Default: {DEFAULT_OFFSET_RMS}");

    static ref GLITCH_FRACTION_HELP: String =
        format!("The fraction of samples hit by (flagged) glitches. Default: {DEFAULT_GLITCH_FRACTION}");

    static ref SEED_HELP: String =
        format!("The seed of the random number generator. Default: {DEFAULT_SEED}");
}

#[derive(Parser, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(super) struct ScanArgs {
    #[clap(short, long, help = NUM_FRAMES_HELP.as_str(), help_heading = "SYNTHETIC SCAN")]
    pub(super) num_frames: Option<usize>,

    #[clap(short = 'c', long, help = NUM_CHANNELS_HELP.as_str(), help_heading = "SYNTHETIC SCAN")]
    pub(super) num_channels: Option<usize>,

    #[clap(long, help = FRAME_INTERVAL_HELP.as_str(), help_heading = "SYNTHETIC SCAN")]
    pub(super) frame_interval: Option<f64>,

    #[clap(long, help = SIGNAL_AMPLITUDE_HELP.as_str(), help_heading = "SYNTHETIC SCAN")]
    pub(super) signal_amplitude: Option<f64>,

    #[clap(long, help = SIGNAL_PERIOD_HELP.as_str(), help_heading = "SYNTHETIC SCAN")]
    pub(super) signal_period: Option<f64>,

    #[clap(long, help = NOISE_RMS_HELP.as_str(), help_heading = "SYNTHETIC SCAN")]
    pub(super) noise_rms: Option<f64>,

    #[clap(long, help = GAIN_SPREAD_HELP.as_str(), help_heading = "SYNTHETIC SCAN")]
    pub(super) gain_spread: Option<f64>,

    #[clap(long, help = OFFSET_RMS_HELP.as_str(), help_heading = "SYNTHETIC SCAN")]
    pub(super) offset_rms: Option<f64>,

    #[clap(long, help = GLITCH_FRACTION_HELP.as_str(), help_heading = "SYNTHETIC SCAN")]
    pub(super) glitch_fraction: Option<f64>,

    /// Channels (zero indexed) that don't respond to the common-mode signal.
    /// They should be dropped from the fit.
    #[clap(long, multiple_values(true), help_heading = "SYNTHETIC SCAN")]
    pub(super) dead_channels: Option<Vec<usize>>,

    #[clap(long, help = SEED_HELP.as_str(), help_heading = "SYNTHETIC SCAN")]
    pub(super) seed: Option<u64>,

    /// Write a JSON summary of the fit (fitted gains, signal, drifts, and
    /// per-iteration statistics) to this file.
    #[clap(short, long, help_heading = "OUTPUT FILES")]
    pub(super) output: Option<PathBuf>,
}

impl ScanArgs {
    fn merge(self, other: Self) -> Self {
        Self {
            num_frames: self.num_frames.or(other.num_frames),
            num_channels: self.num_channels.or(other.num_channels),
            frame_interval: self.frame_interval.or(other.frame_interval),
            signal_amplitude: self.signal_amplitude.or(other.signal_amplitude),
            signal_period: self.signal_period.or(other.signal_period),
            noise_rms: self.noise_rms.or(other.noise_rms),
            gain_spread: self.gain_spread.or(other.gain_spread),
            offset_rms: self.offset_rms.or(other.offset_rms),
            glitch_fraction: self.glitch_fraction.or(other.glitch_fraction),
            dead_channels: self.dead_channels.or(other.dead_channels),
            seed: self.seed.or(other.seed),
            output: self.output.or(other.output),
        }
    }
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct SimulateArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    #[clap(flatten)]
    #[serde(rename = "scan")]
    #[serde(default)]
    pub(super) scan_args: ScanArgs,

    #[clap(flatten)]
    #[serde(rename = "fit")]
    #[serde(default)]
    pub(super) fit_args: FitArgs,
}

impl SimulateArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub(super) fn merge(self) -> Result<SimulateArgs, ScanReduceError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Read in the file arguments. Ensure all of the file args are
            // accounted for by pattern matching.
            let SimulateArgs {
                args_file: _,
                scan_args,
                fit_args,
            } = unpack_arg_file!(arg_file);

            // Merge all the arguments, preferring the CLI args when available.
            Ok(SimulateArgs {
                args_file: None,
                scan_args: cli_args.scan_args.merge(scan_args),
                fit_args: cli_args.fit_args.merge(fit_args),
            })
        } else {
            Ok(cli_args)
        }
    }

    fn parse(self) -> Result<SimulateParams, SimulateArgsError> {
        debug!("{:#?}", self);

        // Expose all the struct fields to ensure they're all used.
        let SimulateArgs {
            args_file: _,
            scan_args:
                ScanArgs {
                    num_frames,
                    num_channels,
                    frame_interval,
                    signal_amplitude,
                    signal_period,
                    noise_rms,
                    gain_spread,
                    offset_rms,
                    glitch_fraction,
                    dead_channels,
                    seed,
                    output,
                },
            fit_args,
        } = self;

        let num_frames = num_frames.unwrap_or(DEFAULT_NUM_FRAMES);
        if num_frames == 0 {
            return Err(SimulateArgsError::ZeroFrames);
        }
        let num_channels = num_channels.unwrap_or(DEFAULT_NUM_CHANNELS);
        if num_channels == 0 {
            return Err(SimulateArgsError::ZeroChannels);
        }
        let frame_interval = frame_interval.unwrap_or(DEFAULT_FRAME_INTERVAL);
        if frame_interval <= 0.0 {
            return Err(SimulateArgsError::BadFrameInterval(frame_interval));
        }
        let signal_period = signal_period.unwrap_or(DEFAULT_SIGNAL_PERIOD);
        if signal_period <= 0.0 {
            return Err(SimulateArgsError::BadSignalPeriod(signal_period));
        }

        let rms = |name: &'static str, value: Option<f64>, default: f64| {
            let value = value.unwrap_or(default);
            if value < 0.0 {
                Err(SimulateArgsError::NegativeRms { name, value })
            } else {
                Ok(value)
            }
        };
        let noise_rms = rms("noise RMS", noise_rms, DEFAULT_NOISE_RMS)?;
        let gain_spread = rms("gain spread", gain_spread, DEFAULT_GAIN_SPREAD)?;
        let offset_rms = rms("offset RMS", offset_rms, DEFAULT_OFFSET_RMS)?;

        let glitch_fraction = glitch_fraction.unwrap_or(DEFAULT_GLITCH_FRACTION);
        if !(0.0..=1.0).contains(&glitch_fraction) {
            return Err(SimulateArgsError::BadGlitchFraction(glitch_fraction));
        }

        let mut dead_channels = dead_channels.unwrap_or_default();
        dead_channels.sort_unstable();
        dead_channels.dedup();
        if let Some(&channel) = dead_channels.iter().find(|&&c| c >= num_channels) {
            return Err(SimulateArgsError::DeadChannelOutOfRange {
                channel,
                num_channels,
            });
        }
        if dead_channels.len() == num_channels {
            return Err(SimulateArgsError::AllChannelsDead);
        }

        let fit = fit_args.parse()?;
        if fit.resolution > num_frames {
            format!(
                "The correlated-signal resolution ({}) is larger than the number of frames ({num_frames}); there will be a single block",
                fit.resolution
            )
            .warn();
        }
        if fit.num_drifts > num_frames {
            format!(
                "There are more drift segments ({}) than frames ({num_frames})",
                fit.num_drifts
            )
            .warn();
        }

        let scan = SyntheticScanParams {
            num_frames,
            num_channels,
            frame_interval,
            signal_amplitude: signal_amplitude.unwrap_or(DEFAULT_SIGNAL_AMPLITUDE),
            signal_period,
            noise_rms,
            gain_spread,
            offset_rms,
            glitch_fraction,
            dead_channels,
            seed: seed.unwrap_or(DEFAULT_SEED),
        };

        let mut scan_printer = InfoPrinter::new("Synthetic scan".into());
        scan_printer.push_block(vec![
            format!("{num_frames} frames × {num_channels} channels").into(),
            format!("{} s between frames", scan.frame_interval).into(),
        ]);
        scan_printer.push_block(vec![
            format!(
                "Common mode: amplitude {}, period {} frames",
                scan.signal_amplitude, scan.signal_period
            )
            .into(),
            format!(
                "Noise RMS {}, gain spread {}, offset RMS {}",
                scan.noise_rms, scan.gain_spread, scan.offset_rms
            )
            .into(),
        ]);
        if scan.glitch_fraction > 0.0 {
            scan_printer
                .push_line(format!("Glitch fraction: {}", scan.glitch_fraction).into());
        }
        if !scan.dead_channels.is_empty() {
            scan_printer.push_line(format!("Dead channels: {:?}", scan.dead_channels).into());
        }
        scan_printer.push_line(format!("Seed: {}", scan.seed).into());
        scan_printer.display();

        let mut fit_printer = InfoPrinter::new("Fitting".into());
        fit_printer.push_block(vec![
            format!("Estimator: {}", fit.estimator).into(),
            format!("Resolution: {} frames", fit.resolution).into(),
        ]);
        fit_printer.push_line(format!("Drift segments: {}", fit.num_drifts).into());
        fit_printer.push_line(format!("Iterations: {}", fit.iterations).into());
        if !fit.fit_gains {
            fit_printer.push_line("Not fitting channel gains".into());
        }
        if let Some(output) = &output {
            fit_printer.push_line(format!("Writing summary to {}", output.display()).into());
        }
        fit_printer.display();

        display_warnings();

        Ok(SimulateParams { scan, fit, output })
    }

    pub(super) fn run(self, dry_run: bool) -> Result<Option<SimulateSummary>, ScanReduceError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let params = self.parse()?;

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(None);
        }

        let summary = params.run()?;

        let mut printer = InfoPrinter::new("Results".into());
        printer.push_line(
            format!(
                "{} of {} channels in the correlated mode",
                summary.channels.len(),
                summary.scan.num_channels
            )
            .into(),
        );
        printer.push_block(vec![
            format!("Gain RMS error:   {:.6}", summary.gain_rms_error).into(),
            format!("Signal RMS error: {:.6}", summary.signal_rms_error).into(),
        ]);
        if let Some(last) = summary.iterations.last() {
            printer.push_block(vec![
                format!("Residual RMS: {:.6}", last.residual_rms).into(),
                format!("Covariance:   {:.6}", last.covariance).into(),
            ]);
        }
        printer.display();

        Ok(Some(summary))
    }
}

#[derive(Error, Debug)]
pub(super) enum SimulateArgsError {
    #[error("The number of frames cannot be 0")]
    ZeroFrames,

    #[error("The number of channels cannot be 0")]
    ZeroChannels,

    #[error("The frame interval must be positive, got {0}")]
    BadFrameInterval(f64),

    #[error("The signal period must be positive, got {0}")]
    BadSignalPeriod(f64),

    #[error("The {name} cannot be negative, got {value}")]
    NegativeRms { name: &'static str, value: f64 },

    #[error("The glitch fraction must be between 0 and 1, got {0}")]
    BadGlitchFraction(f64),

    #[error("Dead channel {channel} doesn't exist; there are only {num_channels} channels")]
    DeadChannelOutOfRange { channel: usize, num_channels: usize },

    #[error("Every channel is dead; there's nothing to fit")]
    AllChannelsDead,

    #[error(transparent)]
    Fit(#[from] FitArgsError),
}
