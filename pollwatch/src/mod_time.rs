//! Shared modification-time store.
//!
//! One store is shared by every watch a registry creates, so watches over
//! overlapping trees observe each other's state. Entries are never
//! removed; a file deleted from disk leaves a stale entry behind, which
//! only affects a path that is no longer enumerated.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Cheap-to-clone handle to a map from absolute file path to the
/// last-observed modification timestamp.
#[derive(Clone, Debug, Default)]
pub struct ModTimeStore {
    inner: Arc<RwLock<HashMap<PathBuf, DateTime<Utc>>>>,
}

impl ModTimeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `modified` for `path` unconditionally. Used by the startup
    /// seeding scan.
    pub async fn record(&self, path: &Path, modified: DateTime<Utc>) {
        self.inner.write().await.insert(path.to_path_buf(), modified);
    }

    /// Record `modified` for `path` if the path is unknown or its stored
    /// timestamp is strictly older. Returns whether the entry was
    /// updated, i.e. whether the file counts as new or modified.
    ///
    /// Check and update happen under one write lock so two concurrent
    /// filter passes cannot both claim the same observation.
    pub async fn record_if_newer(&self, path: &Path, modified: DateTime<Utc>) -> bool {
        let mut map = self.inner.write().await;
        match map.get(path) {
            Some(seen) if *seen >= modified => false,
            _ => {
                map.insert(path.to_path_buf(), modified);
                true
            }
        }
    }

    /// Last-observed timestamp for `path`, if any.
    pub async fn last_seen(&self, path: &Path) -> Option<DateTime<Utc>> {
        self.inner.read().await.get(path).copied()
    }

    /// Number of tracked paths.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether the store tracks no paths.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_record_if_newer_first_observation() {
        let store = ModTimeStore::new();
        let now = Utc::now();

        assert!(store.record_if_newer(Path::new("/a"), now).await);
        assert_eq!(store.last_seen(Path::new("/a")).await, Some(now));
    }

    #[tokio::test]
    async fn test_record_if_newer_requires_strictly_newer() {
        let store = ModTimeStore::new();
        let now = Utc::now();
        store.record(Path::new("/a"), now).await;

        // Same timestamp: not an update.
        assert!(!store.record_if_newer(Path::new("/a"), now).await);
        // Older timestamp: not an update.
        assert!(
            !store
                .record_if_newer(Path::new("/a"), now - TimeDelta::seconds(1))
                .await
        );
        // Newer timestamp: update.
        let later = now + TimeDelta::seconds(1);
        assert!(store.record_if_newer(Path::new("/a"), later).await);
        assert_eq!(store.last_seen(Path::new("/a")).await, Some(later));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = ModTimeStore::new();
        let alias = store.clone();
        store.record(Path::new("/a"), Utc::now()).await;

        assert_eq!(alias.len().await, 1);
        assert!(!alias.is_empty().await);
    }
}
