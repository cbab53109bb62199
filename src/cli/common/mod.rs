// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Common arguments for command-line interfaces, e.g. the correlated-signal
//! fitting arguments and the argument-file machinery shared by subcommands.

mod printers;

pub(super) use printers::InfoPrinter;
pub(crate) use printers::{display_warnings, Warn};

use std::str::FromStr;

use clap::Parser;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

use crate::{
    constants::{
        DEFAULT_MAX_DEPENDENCE, DEFAULT_NUM_DRIFTS, DEFAULT_NUM_ITERATIONS, DEFAULT_RESOLUTION,
    },
    params::FitConfig,
    signal::CorrelatedEstimator,
};

lazy_static::lazy_static! {
    pub(super) static ref ARG_FILE_TYPES_COMMA_SEPARATED: String = ArgFileTypes::iter().join(", ");

    pub(super) static ref ARG_FILE_HELP: String =
        format!("All arguments may be specified in a file. Any CLI arguments override arguments set in the file. Supported formats: {}", *ARG_FILE_TYPES_COMMA_SEPARATED);

    static ref ESTIMATORS_COMMA_SEPARATED: String = CorrelatedEstimator::iter().join(", ");

    static ref ESTIMATOR_HELP: String =
        format!("The correlated-signal estimator. Supported estimators: {}. Default: {}", *ESTIMATORS_COMMA_SEPARATED, CorrelatedEstimator::default());

    static ref RESOLUTION_HELP: String =
        format!("The number of frames averaged into each correlated-signal block. Default: {DEFAULT_RESOLUTION}");

    static ref MAX_DEPENDENCE_HELP: String =
        format!("The largest fraction of the total weight a single sample may carry before the robust estimator falls back to a weighted mean. Default: {DEFAULT_MAX_DEPENDENCE}");

    static ref NUM_DRIFTS_HELP: String =
        format!("The number of segments the scan is split into when removing channel drifts. Default: {DEFAULT_NUM_DRIFTS}");

    static ref ITERATIONS_HELP: String =
        format!("The number of fitting iterations. Default: {DEFAULT_NUM_ITERATIONS}");
}

#[derive(Debug, Display, EnumIter, EnumString)]
pub(super) enum ArgFileTypes {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

macro_rules! unpack_arg_file {
    ($arg_file:expr) => ({
        use std::{fs::File, io::Read, str::FromStr};

        use crate::cli::common::{ArgFileTypes, ARG_FILE_TYPES_COMMA_SEPARATED};

        debug!("Attempting to parse argument file {}", $arg_file.display());

        let mut contents = String::new();
        let arg_file_type = $arg_file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| ArgFileTypes::from_str(&e).ok());

        match arg_file_type {
            Some(ArgFileTypes::Toml) => {
                debug!("Parsing toml file...");
                let mut fh = File::open(&$arg_file)?;
                fh.read_to_string(&mut contents)?;
                match toml::from_str(&contents) {
                    Ok(p) => p,
                    Err(err) => {
                        return Err(ScanReduceError::ArgFile(format!(
                            "Couldn't decode toml structure from {:?}:\n{err}",
                            $arg_file
                        )))
                    }
                }
            }
            Some(ArgFileTypes::Json) => {
                debug!("Parsing json file...");
                let mut fh = File::open(&$arg_file)?;
                fh.read_to_string(&mut contents)?;
                match serde_json::from_str(&contents) {
                    Ok(p) => p,
                    Err(err) => {
                        return Err(ScanReduceError::ArgFile(format!(
                            "Couldn't decode json structure from {:?}:\n{err}",
                            $arg_file
                        )))
                    }
                }
            }

            _ => {
                return Err(ScanReduceError::ArgFile(format!(
                    "Argument file '{:?}' doesn't have a recognised file extension! Valid extensions are: {}", $arg_file, *ARG_FILE_TYPES_COMMA_SEPARATED)
                ))
            }
        }
    });
}

/// Arguments controlling how the correlated signal is fitted.
#[derive(Parser, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(super) struct FitArgs {
    #[clap(short, long, help = RESOLUTION_HELP.as_str(), help_heading = "FITTING")]
    pub(super) resolution: Option<usize>,

    #[clap(short, long, help = ESTIMATOR_HELP.as_str(), help_heading = "FITTING")]
    pub(super) estimator: Option<String>,

    #[clap(long, help = MAX_DEPENDENCE_HELP.as_str(), help_heading = "FITTING")]
    pub(super) max_dependence: Option<f64>,

    #[clap(long, help = NUM_DRIFTS_HELP.as_str(), help_heading = "FITTING")]
    pub(super) num_drifts: Option<usize>,

    #[clap(short, long, help = ITERATIONS_HELP.as_str(), help_heading = "FITTING")]
    pub(super) iterations: Option<usize>,

    /// Don't fit channel gains; only the correlated signal and the channel
    /// drifts are fitted.
    #[clap(long, help_heading = "FITTING")]
    #[serde(default)]
    pub(super) no_gains: bool,

    /// The source-filtering overlap between neighbouring channels (0 to 1).
    /// Default: 0
    #[clap(long, help_heading = "FITTING")]
    pub(super) channel_overlap: Option<f64>,
}

impl FitArgs {
    pub(super) fn merge(self, other: Self) -> Self {
        Self {
            resolution: self.resolution.or(other.resolution),
            estimator: self.estimator.or(other.estimator),
            max_dependence: self.max_dependence.or(other.max_dependence),
            num_drifts: self.num_drifts.or(other.num_drifts),
            iterations: self.iterations.or(other.iterations),
            no_gains: self.no_gains || other.no_gains,
            channel_overlap: self.channel_overlap.or(other.channel_overlap),
        }
    }

    pub(super) fn parse(self) -> Result<FitConfig, FitArgsError> {
        let FitArgs {
            resolution,
            estimator,
            max_dependence,
            num_drifts,
            iterations,
            no_gains,
            channel_overlap,
        } = self;

        let resolution = resolution.unwrap_or(DEFAULT_RESOLUTION);
        if resolution == 0 {
            return Err(FitArgsError::ZeroResolution);
        }

        let estimator = match estimator {
            None => CorrelatedEstimator::default(),
            Some(s) => CorrelatedEstimator::from_str(&s.to_lowercase()).map_err(|_| {
                FitArgsError::UnknownEstimator {
                    got: s,
                    valid: ESTIMATORS_COMMA_SEPARATED.as_str(),
                }
            })?,
        };

        let max_dependence = max_dependence.unwrap_or(DEFAULT_MAX_DEPENDENCE);
        if !(max_dependence > 0.0 && max_dependence <= 1.0) {
            return Err(FitArgsError::BadMaxDependence(max_dependence));
        }

        let num_drifts = num_drifts.unwrap_or(DEFAULT_NUM_DRIFTS);
        if num_drifts == 0 {
            return Err(FitArgsError::ZeroDrifts);
        }

        let channel_overlap = channel_overlap.unwrap_or(0.0);
        if !(0.0..=1.0).contains(&channel_overlap) {
            return Err(FitArgsError::BadChannelOverlap(channel_overlap));
        }

        let iterations = iterations.unwrap_or(DEFAULT_NUM_ITERATIONS);
        if iterations == 0 {
            "Zero fitting iterations requested; nothing will be fitted".warn();
        }

        Ok(FitConfig {
            resolution,
            estimator,
            max_dependence,
            num_drifts,
            iterations,
            fit_gains: !no_gains,
            channel_overlap,
        })
    }
}

#[derive(Error, Debug, PartialEq)]
pub(super) enum FitArgsError {
    #[error("The correlated-signal resolution cannot be 0")]
    ZeroResolution,

    #[error("Unrecognised correlated-signal estimator '{got}'; supported estimators: {valid}")]
    UnknownEstimator { got: String, valid: &'static str },

    #[error("The maximum dependence must be larger than 0 and at most 1, got {0}")]
    BadMaxDependence(f64),

    #[error("The number of drift segments cannot be 0")]
    ZeroDrifts,

    #[error("The channel overlap must be between 0 and 1, got {0}")]
    BadChannelOverlap(f64),
}
