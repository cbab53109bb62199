// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Command-line interface code. More specific options for `scan_reduce`
//! subcommands are contained in modules.
//!
//! All booleans must have `#[serde(default)]` annotated, and anything that
//! isn't a boolean must be optional. This allows all arguments to be optional
//! *and* usable in an arguments file.
//!
//! Only 3 things should be public in this module: `ScanReduce`,
//! `ScanReduce::run`, and `ScanReduceError`.

#[macro_use]
mod common;
mod atran_find;
mod error;
mod simulate;

pub use error::ScanReduceError;

use std::path::{Path, PathBuf};

use clap::{AppSettings, Args, Parser, Subcommand};
use log::{debug, info};
use serde::Serialize;

use crate::PROGRESS_BARS;

// Add build-time information from the "built" crate.
include!(concat!(env!("OUT_DIR"), "/built.rs"));

#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    about = "Correlated-signal gain fitting and drift removal for scanning detector arrays"
)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_subcommands = true)]
#[clap(propagate_version = true)]
#[clap(infer_long_args = true)]
pub struct ScanReduce {
    #[clap(flatten)]
    global_opts: GlobalArgs,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Don't draw progress bars.
    #[clap(long)]
    #[clap(global = true)]
    no_progress_bars: bool,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    #[clap(global = true)]
    verbosity: u8,

    /// Only verify that arguments were correctly ingested and print out
    /// high-level information.
    #[clap(long)]
    #[clap(global = true)]
    dry_run: bool,

    /// Save the input arguments into a new TOML file that can be used to
    /// reproduce this run.
    #[clap(long)]
    #[clap(global = true)]
    save_toml: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
#[clap(arg_required_else_help = true)]
enum Command {
    #[clap(alias = "simulate-scan")]
    #[clap(
        about = "Generate a synthetic scan and fit its correlated signal, channel gains and drifts."
    )]
    Simulate(simulate::SimulateArgs),

    #[clap(alias = "find-atran")]
    #[clap(
        about = "Find the ATRAN transmission file nearest to the conditions of an observation."
    )]
    AtranFind(atran_find::AtranFindArgs),
}

impl ScanReduce {
    pub fn run(self) -> Result<(), ScanReduceError> {
        let GlobalArgs {
            verbosity,
            dry_run,
            no_progress_bars,
            save_toml,
        } = self.global_opts;
        setup_logging(verbosity).map_err(|e| ScanReduceError::Generic(e.to_string()))?;
        PROGRESS_BARS.store(!no_progress_bars);

        let sub_command = match &self.command {
            Command::Simulate(_) => "simulate",
            Command::AtranFind(_) => "atran-find",
        };
        info!("scan_reduce {} {}", sub_command, env!("CARGO_PKG_VERSION"));
        display_build_info();

        // Arguments files are merged with the command line before anything is
        // saved or run.
        macro_rules! merge_save_run {
            ($args:expr) => {{
                let args = $args.merge()?;
                if let Some(toml) = &save_toml {
                    write_toml(&args, toml)?;
                }
                args.run(dry_run)?;
            }};
        }

        match self.command {
            Command::Simulate(args) => merge_save_run!(args),
            Command::AtranFind(args) => merge_save_run!(args),
        }

        info!("scan_reduce {} complete.", sub_command);
        Ok(())
    }
}

/// Write merged arguments to a TOML file that reproduces the run.
fn write_toml<T: Serialize>(args: &T, path: &Path) -> Result<(), ScanReduceError> {
    let toml_str = toml::to_string(args).map_err(|e| ScanReduceError::ArgFile(e.to_string()))?;
    std::fs::write(path, toml_str)?;
    debug!("Arguments saved to {}", path.display());
    Ok(())
}

/// Log to `stdout`. The verbosity picks the level: info, debug, then trace. At
/// 3 or more, each message also carries the module it came from.
fn setup_logging(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let level = match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Stdout)
        .filter_level(level)
        .format_target(verbosity >= 3)
        .try_init()
}

fn display_build_info() {
    let dirty = if GIT_DIRTY == Some(true) { " (dirty)" } else { "" };
    info!(
        "Compiled on git commit hash: {}{dirty}",
        GIT_COMMIT_HASH_SHORT.unwrap_or("<no git info>")
    );
    info!("            {BUILT_TIME_UTC}");
    info!("         with compiler {RUSTC_VERSION}");
    info!("");
}
