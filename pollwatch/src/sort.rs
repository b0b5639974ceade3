//! Optional ordering stage applied before delivery.

use std::path::PathBuf;

use crate::config::WatchConfig;
use crate::error::{Result, WatchError};

/// Order the filtered result list according to the config.
///
/// Fewer than two files, or sorting disabled, passes through unchanged.
/// The default routine is an ascending lexicographic full-path sort; a
/// custom routine receives the whole list and must return a permutation
/// of it.
pub(crate) fn sort(files: Vec<PathBuf>, config: &WatchConfig) -> Result<Vec<PathBuf>> {
    if files.len() < 2 || !config.sort_enabled {
        return Ok(files);
    }

    match &config.sort_fn {
        Some(custom) => {
            let expected = files.len();
            let sorted = custom(files)?;
            if sorted.len() != expected {
                return Err(WatchError::Sort(format!(
                    "custom sort returned {} paths, expected {expected}",
                    sorted.len()
                )));
            }
            Ok(sorted)
        }
        None => {
            let mut files = files;
            files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
            Ok(files)
        }
    }
}
