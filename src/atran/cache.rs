// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::SystemTime,
};

use log::debug;

use super::AtranError;

/// Transmission data read from an ATRAN file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtranData {
    /// The name of the file the data came from.
    pub filename: String,
    /// The water-vapour scale factor applied to the transmission.
    pub wv_scale: f64,
    /// Wavelengths [microns].
    pub wave: Vec<f64>,
    /// The transmission as read from the file.
    pub unsmoothed: Vec<f64>,
    /// The transmission smoothed to the spectral resolution.
    pub smoothed: Vec<f64>,
}

#[derive(Debug)]
struct CachedAtran {
    modified: SystemTime,
    data: AtranData,
}

/// A cache of ATRAN data, keyed by file path and (integer) spectral resolution.
///
/// An entry is only handed out while its file is unchanged: if the file has
/// disappeared the entry is dropped, and if it has been modified since the
/// entry was stored it is a miss.
#[derive(Debug, Default)]
pub struct AtranCache {
    entries: HashMap<(PathBuf, i64), CachedAtran>,
}

fn cache_key(file: &Path, resolution: f64) -> (PathBuf, i64) {
    (file.to_path_buf(), resolution.trunc() as i64)
}

fn modification_time(file: &Path) -> std::io::Result<SystemTime> {
    let metadata = std::fs::metadata(file)?;
    if !metadata.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a file",
        ));
    }
    metadata.modified()
}

impl AtranCache {
    pub fn new() -> AtranCache {
        AtranCache::default()
    }

    /// Get the data stored for an ATRAN file at a resolution.
    pub fn get(&mut self, file: &Path, resolution: f64) -> Option<&AtranData> {
        let key = cache_key(file, resolution);
        if !self.entries.contains_key(&key) {
            return None;
        }

        let modified = match modification_time(file) {
            Ok(m) => m,
            Err(e) => {
                debug!(
                    "Dropping cached ATRAN data for {} ({e})",
                    file.display()
                );
                self.entries.remove(&key);
                return None;
            }
        };
        let entry = self.entries.get(&key)?;
        if entry.modified != modified {
            debug!("ATRAN file {} has changed since caching", file.display());
            return None;
        }

        debug!(
            "Retrieving ATRAN data from cache ({}, resolution {})",
            key.0.display(),
            key.1
        );
        Some(&entry.data)
    }

    /// Store the data read from an ATRAN file at a resolution, replacing any
    /// previous entry.
    pub fn put(&mut self, file: &Path, resolution: f64, data: AtranData) -> Result<(), AtranError> {
        let key = cache_key(file, resolution);
        let modified = modification_time(file).map_err(|err| AtranError::ModificationTime {
            file: file.to_path_buf(),
            err,
        })?;
        debug!(
            "Storing ATRAN data in cache ({}, resolution {})",
            key.0.display(),
            key.1
        );
        self.entries.insert(key, CachedAtran { modified, data });
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
