// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! ATRAN atmospheric-transmission reference files.
//!
//! Reference files are named after the observing conditions they were
//! generated for:
//!
//! ```text
//! atran_[alt]K_[za]deg_[wmin]-[wmax]mum.fits
//! atran_[alt]K_[za]deg_[wv]pwv_[wmin]-[wmax]mum.fits
//! ```
//!
//! where `alt` is the altitude in thousands of feet, `za` the zenith angle in
//! degrees, `wv` the precipitable water vapour in microns and `wmin`/`wmax` the
//! wavelength range in microns. The file nearest to the conditions of an
//! observation is selected with [`find_nearest_atran_file`]; the (smoothed)
//! transmission read from it is kept in an [`AtranCache`].

mod cache;
mod error;

pub use cache::{AtranCache, AtranData};
pub use error::AtranError;

use std::path::{Path, PathBuf};

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_WATER_VAPOUR, MIN_WATER_VAPOUR};

lazy_static::lazy_static! {
    static ref ATRAN_FILENAME: Regex =
        Regex::new(r"^atran_(\d+)K_(\d+)deg_(?:(\d+)pwv_)?(\d+)-(\d+)mum\.fits$").unwrap();
}

/// The start and end values of the observing conditions, as recorded in an
/// observation's metadata. Values that weren't recorded are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservingRanges {
    /// Zenith angle at the start of the observation [degrees].
    pub za_start: f64,
    /// Zenith angle at the end of the observation [degrees].
    pub za_end: f64,
    /// Altitude at the start of the observation [feet].
    pub altitude_start: f64,
    /// Altitude at the end of the observation [feet].
    pub altitude_end: f64,
    /// Observed precipitable water vapour [microns].
    pub wv_observed: f64,
    pub wv_start: f64,
    pub wv_end: f64,
}

/// The representative conditions of an observation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ObservingConditions {
    /// [thousands of feet]
    pub altitude: f64,
    /// [degrees]
    pub zenith_angle: f64,
    /// [microns]
    pub water_vapour: f64,
}

impl ObservingConditions {
    /// Reduce start/end values to a single value each. If only one of a pair is
    /// positive it is used, otherwise the pair is averaged. An observed water
    /// vapour takes precedence over the start/end values. If `use_wv` is set
    /// and the water vapour is implausibly low, a default value is used.
    pub fn from_ranges(ranges: &ObservingRanges, use_wv: bool) -> ObservingConditions {
        let zenith_angle = representative(ranges.za_start, ranges.za_end);
        let altitude = representative(ranges.altitude_start, ranges.altitude_end) / 1000.0;
        let mut water_vapour = if ranges.wv_observed > 0.0 {
            ranges.wv_observed
        } else {
            representative(ranges.wv_start, ranges.wv_end)
        };
        if use_wv && water_vapour < MIN_WATER_VAPOUR {
            debug!("Bad water vapour value: {water_vapour}");
            debug!("Using default value {DEFAULT_WATER_VAPOUR} um");
            water_vapour = DEFAULT_WATER_VAPOUR;
        }

        let conditions = ObservingConditions {
            altitude,
            zenith_angle,
            water_vapour,
        };
        debug!(
            "Alt, ZA, WV: {:.2} {:.2} {:.2}",
            conditions.altitude, conditions.zenith_angle, conditions.water_vapour
        );
        conditions
    }
}

fn representative(start: f64, end: f64) -> f64 {
    if start > 0.0 && end <= 0.0 {
        start
    } else if end > 0.0 && start <= 0.0 {
        end
    } else {
        0.5 * (start + end)
    }
}

/// The conditions an ATRAN file was generated for, parsed from its name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AtranFileConditions {
    pub(crate) altitude: f64,
    pub(crate) zenith_angle: f64,
    pub(crate) water_vapour: Option<f64>,
    pub(crate) wmin: u32,
    pub(crate) wmax: u32,
}

impl AtranFileConditions {
    /// Parse the name of an ATRAN file. `None` is returned if the name doesn't
    /// follow the naming convention.
    pub(crate) fn from_file_name(name: &str) -> Option<AtranFileConditions> {
        let caps = ATRAN_FILENAME.captures(name)?;
        Some(AtranFileConditions {
            altitude: caps[1].parse().ok()?,
            zenith_angle: caps[2].parse().ok()?,
            water_vapour: match caps.get(3) {
                Some(m) => Some(m.as_str().parse().ok()?),
                None => None,
            },
            wmin: caps[4].parse().ok()?,
            wmax: caps[5].parse().ok()?,
        })
    }

    /// The sum of the relative differences between these conditions and the
    /// observed ones. Water vapour only contributes if this file was generated
    /// for a specific water vapour. `None` if any of the file's conditions is
    /// zero.
    fn distance(&self, observed: &ObservingConditions) -> Option<f64> {
        fn relative(reference: f64, value: f64) -> Option<f64> {
            if reference == 0.0 {
                None
            } else {
                Some((reference - value).abs() / reference)
            }
        }

        let mut d = relative(self.altitude, observed.altitude)?;
        d += relative(self.zenith_angle, observed.zenith_angle)?;
        if let Some(wv) = self.water_vapour {
            d += relative(wv, observed.water_vapour)?;
        }
        Some(d)
    }
}

/// Find the ATRAN file in `dir` nearest to the observing conditions, for the
/// wavelength range `wmin`-`wmax` microns.
///
/// If `use_wv` is set, the nearest file generated for a specific water vapour
/// is preferred; if there isn't one, the nearest file without a water vapour is
/// used (as it is when `use_wv` isn't set). `Ok(None)` is returned if no file
/// matches.
pub fn find_nearest_atran_file(
    dir: &Path,
    conditions: &ObservingConditions,
    use_wv: bool,
    wmin: u32,
    wmax: u32,
) -> Result<Option<PathBuf>, AtranError> {
    if !dir.is_dir() {
        return Err(AtranError::NoDirectory(dir.to_path_buf()));
    }

    let pattern = format!(
        "{}/atran*fits",
        glob::Pattern::escape(&dir.display().to_string())
    );
    let mut nearest: Option<(f64, PathBuf)> = None;
    let mut nearest_wv: Option<(f64, PathBuf)> = None;
    for entry in glob::glob(&pattern)? {
        let file = entry?;
        let file_conditions = match file
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(AtranFileConditions::from_file_name)
        {
            Some(c) if c.wmin == wmin && c.wmax == wmax => c,
            _ => continue,
        };
        let distance = match file_conditions.distance(conditions) {
            Some(d) => d,
            None => {
                debug!("Ignoring ATRAN file with a zero condition: {}", file.display());
                continue;
            }
        };

        let best = if file_conditions.water_vapour.is_some() {
            &mut nearest_wv
        } else {
            &mut nearest
        };
        if best.as_ref().map_or(true, |(min, _)| distance < *min) {
            *best = Some((distance, file));
        }
    }

    let file = match (use_wv, nearest_wv) {
        (true, Some((_, file))) => {
            debug!("Using nearest Alt/ZA/WV");
            Some(file)
        }
        _ => {
            debug!("Using nearest Alt/ZA");
            nearest.map(|(_, file)| file)
        }
    };
    match &file {
        Some(f) => debug!("Using ATRAN file {}", f.display()),
        None => debug!("No ATRAN file found"),
    }
    Ok(file)
}
