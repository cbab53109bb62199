// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Find the ATRAN reference file for an observation.

use std::path::PathBuf;

use clap::Parser;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::common::{display_warnings, InfoPrinter, Warn, ARG_FILE_HELP};
use crate::{
    atran::{find_nearest_atran_file, ObservingConditions, ObservingRanges},
    constants::{DEFAULT_ATRAN_WMAX, DEFAULT_ATRAN_WMIN},
    ScanReduceError,
};

lazy_static::lazy_static! {
    static ref WMIN_HELP: String =
        format!("The lower end of the wavelength range of the ATRAN file [microns]. Default: {DEFAULT_ATRAN_WMIN}");

    static ref WMAX_HELP: String =
        format!("The upper end of the wavelength range of the ATRAN file [microns]. Default: {DEFAULT_ATRAN_WMAX}");
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct AtranFindArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// The directory containing ATRAN files.
    #[clap(short, long, help_heading = "INPUT FILES")]
    pub(super) atran_dir: Option<PathBuf>,

    /// The zenith angle at the start and end of the observation [degrees].
    #[clap(
        long, number_of_values = 2, value_names = &["START", "END"],
        help_heading = "OBSERVING CONDITIONS"
    )]
    pub(super) zenith_angle: Option<Vec<f64>>,

    /// The altitude at the start and end of the observation [feet].
    #[clap(
        long, number_of_values = 2, value_names = &["START", "END"],
        help_heading = "OBSERVING CONDITIONS"
    )]
    pub(super) altitude: Option<Vec<f64>>,

    /// The water vapour at the start and end of the observation [microns].
    #[clap(
        long, number_of_values = 2, value_names = &["START", "END"],
        help_heading = "OBSERVING CONDITIONS"
    )]
    pub(super) water_vapour: Option<Vec<f64>>,

    /// The observed water vapour [microns]. Takes precedence over
    /// --water-vapour.
    #[clap(long, help_heading = "OBSERVING CONDITIONS")]
    pub(super) observed_water_vapour: Option<f64>,

    /// Prefer ATRAN files generated for a specific water vapour.
    #[clap(long, help_heading = "OBSERVING CONDITIONS")]
    #[serde(default)]
    pub(super) use_wv: bool,

    #[clap(long, help = WMIN_HELP.as_str(), help_heading = "OBSERVING CONDITIONS")]
    pub(super) wmin: Option<u32>,

    #[clap(long, help = WMAX_HELP.as_str(), help_heading = "OBSERVING CONDITIONS")]
    pub(super) wmax: Option<u32>,
}

/// Everything needed to look up an ATRAN file.
struct AtranFindParams {
    atran_dir: PathBuf,
    conditions: ObservingConditions,
    use_wv: bool,
    wmin: u32,
    wmax: u32,
}

impl AtranFindArgs {
    pub(super) fn merge(self) -> Result<AtranFindArgs, ScanReduceError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            let AtranFindArgs {
                args_file: _,
                atran_dir,
                zenith_angle,
                altitude,
                water_vapour,
                observed_water_vapour,
                use_wv,
                wmin,
                wmax,
            } = unpack_arg_file!(arg_file);

            Ok(AtranFindArgs {
                args_file: None,
                atran_dir: cli_args.atran_dir.or(atran_dir),
                zenith_angle: cli_args.zenith_angle.or(zenith_angle),
                altitude: cli_args.altitude.or(altitude),
                water_vapour: cli_args.water_vapour.or(water_vapour),
                observed_water_vapour: cli_args.observed_water_vapour.or(observed_water_vapour),
                use_wv: cli_args.use_wv || use_wv,
                wmin: cli_args.wmin.or(wmin),
                wmax: cli_args.wmax.or(wmax),
            })
        } else {
            Ok(cli_args)
        }
    }

    fn parse(self) -> Result<AtranFindParams, AtranFindArgsError> {
        debug!("{:#?}", self);

        let AtranFindArgs {
            args_file: _,
            atran_dir,
            zenith_angle,
            altitude,
            water_vapour,
            observed_water_vapour,
            use_wv,
            wmin,
            wmax,
        } = self;

        let atran_dir = atran_dir.ok_or(AtranFindArgsError::NoDirectory)?;

        fn start_end(
            name: &'static str,
            values: Option<Vec<f64>>,
        ) -> Result<(f64, f64), AtranFindArgsError> {
            match values.as_deref() {
                None => Ok((0.0, 0.0)),
                Some(&[start, end]) => Ok((start, end)),
                Some(v) => Err(AtranFindArgsError::BadRange {
                    name,
                    values: v.to_vec(),
                }),
            }
        }
        let (za_start, za_end) = start_end("zenith angle", zenith_angle)?;
        let (altitude_start, altitude_end) = start_end("altitude", altitude)?;
        let (wv_start, wv_end) = start_end("water vapour", water_vapour)?;
        if za_start <= 0.0 && za_end <= 0.0 {
            "No zenith angle was given; it won't distinguish between ATRAN files".warn();
        }

        let wmin = wmin.unwrap_or(DEFAULT_ATRAN_WMIN);
        let wmax = wmax.unwrap_or(DEFAULT_ATRAN_WMAX);
        if wmin >= wmax {
            return Err(AtranFindArgsError::BadWavelengthRange { wmin, wmax });
        }

        let ranges = ObservingRanges {
            za_start,
            za_end,
            altitude_start,
            altitude_end,
            wv_observed: observed_water_vapour.unwrap_or_default(),
            wv_start,
            wv_end,
        };
        let conditions = ObservingConditions::from_ranges(&ranges, use_wv);

        let mut printer = InfoPrinter::new("Observing conditions".into());
        printer.push_block(vec![
            format!("Altitude:      {:.2} kft", conditions.altitude).into(),
            format!("Zenith angle:  {:.2}°", conditions.zenith_angle).into(),
            format!("Water vapour:  {:.2} µm", conditions.water_vapour).into(),
        ]);
        printer.push_line(format!("Wavelengths: {wmin}-{wmax} µm").into());
        printer.display();

        display_warnings();

        Ok(AtranFindParams {
            atran_dir,
            conditions,
            use_wv,
            wmin,
            wmax,
        })
    }

    pub(super) fn run(self, dry_run: bool) -> Result<Option<PathBuf>, ScanReduceError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let AtranFindParams {
            atran_dir,
            conditions,
            use_wv,
            wmin,
            wmax,
        } = self.parse()?;

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(None);
        }

        match find_nearest_atran_file(&atran_dir, &conditions, use_wv, wmin, wmax)? {
            Some(file) => {
                info!("Nearest ATRAN file: {}", file.display());
                Ok(Some(file))
            }
            None => Err(AtranFindArgsError::NoMatch {
                dir: atran_dir,
                wmin,
                wmax,
            }
            .into()),
        }
    }
}

#[derive(Error, Debug)]
pub(super) enum AtranFindArgsError {
    #[error("No ATRAN directory was supplied")]
    NoDirectory,

    #[error("The {name} must be given as a start and an end value, got {values:?}")]
    BadRange { name: &'static str, values: Vec<f64> },

    #[error("The wavelength range {wmin}-{wmax} microns is empty")]
    BadWavelengthRange { wmin: u32, wmax: u32 },

    #[error("No ATRAN file for {wmin}-{wmax} microns was found in {}", .dir.display())]
    NoMatch { dir: PathBuf, wmin: u32, wmax: u32 },
}
