//! Directory listing and the new-or-modified filter pipeline.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::WatchConfig;
use crate::error::{Result, WatchError};
use crate::mod_time::ModTimeStore;

/// Upper bound on concurrent in-flight stat calls during filtering.
pub(crate) const MAX_IN_FLIGHT_STATS: usize = 10;

/// Recursively enumerate all files (not directories) under `root`,
/// returning absolute paths in a deterministic lexicographic walk order.
///
/// A missing root maps to [`WatchError::RootNotFound`] so the watch can
/// special-case it; every other failure is a regular I/O error.
pub(crate) async fn list(root: &Path) -> Result<Vec<PathBuf>> {
    match tokio::fs::metadata(root).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(WatchError::Io {
                path: root.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotADirectory,
                    "watched root is not a directory",
                ),
            });
        }
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            return Err(WatchError::RootNotFound(root.to_path_buf()));
        }
        Err(source) => {
            return Err(WatchError::Io {
                path: root.to_path_buf(),
                source,
            });
        }
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            let path = err
                .path()
                .map_or_else(|| root.to_path_buf(), Path::to_path_buf);
            let source = err
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
            WatchError::Io { path, source }
        })?;

        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    debug!("Listed {} files under {}", files.len(), root.display());
    Ok(files)
}

/// Reduce a listing to the files that are new or modified since the
/// store last observed them, updating the store for everything reported.
///
/// An empty listing or an unfiltered watch passes through unchanged with
/// zero stat calls. Otherwise non-matching suffixes are dropped, the
/// matchers are stat-ed with a bounded order-preserving fan-out, and the
/// first stat failure aborts the whole batch. The result order always
/// matches the input enumeration order.
pub(crate) async fn filter(
    files: Vec<PathBuf>,
    config: &WatchConfig,
    store: &ModTimeStore,
) -> Result<Vec<PathBuf>> {
    if files.is_empty() || config.extension.is_none() {
        return Ok(files);
    }

    let candidates: Vec<PathBuf> = files
        .into_iter()
        .filter(|path| config.matches_extension(path))
        .collect();

    let mut checks = stream::iter(candidates)
        .map(stat_one)
        .buffered(MAX_IN_FLIGHT_STATS);

    let mut fresh = Vec::new();
    while let Some(checked) = checks.next().await {
        let (path, modified) = checked?;
        if store.record_if_newer(&path, modified).await {
            fresh.push(path);
        }
    }

    Ok(fresh)
}

/// Seed the store with the current timestamps of every matching file,
/// without producing a report. Used once, by the startup scan.
pub(crate) async fn seed(
    files: Vec<PathBuf>,
    config: &WatchConfig,
    store: &ModTimeStore,
) -> Result<usize> {
    let matching: Vec<PathBuf> = files
        .into_iter()
        .filter(|path| config.matches_extension(path))
        .collect();

    let mut checks = stream::iter(matching)
        .map(stat_one)
        .buffered(MAX_IN_FLIGHT_STATS);

    let mut seeded = 0;
    while let Some(checked) = checks.next().await {
        let (path, modified) = checked?;
        store.record(&path, modified).await;
        seeded += 1;
    }

    Ok(seeded)
}

/// Stat a single file, yielding its modification timestamp.
async fn stat_one(path: PathBuf) -> Result<(PathBuf, DateTime<Utc>)> {
    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|source| WatchError::Io {
            path: path.clone(),
            source,
        })?;

    let modified = metadata.modified().map_err(|source| WatchError::Io {
        path: path.clone(),
        source,
    })?;

    Ok((path, DateTime::<Utc>::from(modified)))
}
