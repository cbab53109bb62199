// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Correlated-signal gain fitting and drift removal for scanning detector arrays.

The [`signal`] kernels fit a signal shared by a group of detector channels,
the channel gains against it, and remove slow offsets (drifts) from signals.
[`math`] holds the weighted statistics they share and [`atran`] looks up
atmospheric-transmission reference files.
 */

pub mod atran;
mod cli;
pub mod constants;
pub mod math;
pub(crate) mod params;
pub mod signal;

// Re-exports.
pub use cli::{ScanReduce, ScanReduceError};

use crossbeam_utils::atomic::AtomicCell;

lazy_static::lazy_static! {
    /// Are progress bars being drawn? This should only ever be enabled by CLI
    /// code.
    static ref PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);
}
