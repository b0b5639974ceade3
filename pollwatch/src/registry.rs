//! Path-keyed table of live watches.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use path_absolutize::Absolutize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::WatchConfig;
use crate::error::Result;
use crate::mod_time::ModTimeStore;
use crate::watch::Watch;

/// Registry of live watches, one per root path.
///
/// The registry owns the [`ModTimeStore`] shared by every watch it
/// creates, so watches over overlapping trees observe each other's
/// state.
pub struct WatchRegistry {
    store: ModTimeStore,
    watches: RwLock<HashMap<PathBuf, Arc<Watch>>>,
}

impl WatchRegistry {
    /// Create a registry with a fresh store.
    pub fn new() -> Self {
        Self::with_store(ModTimeStore::new())
    }

    /// Create a registry around an existing store. Lets tests isolate
    /// their timestamp state per run.
    pub fn with_store(store: ModTimeStore) -> Self {
        Self {
            store,
            watches: RwLock::new(HashMap::new()),
        }
    }

    /// The store shared by this registry's watches.
    pub fn store(&self) -> &ModTimeStore {
        &self.store
    }

    /// Return the existing watch for the config's root if one exists;
    /// otherwise construct, initialize, and start a new one.
    pub async fn create(&self, config: WatchConfig) -> Result<Arc<Watch>> {
        let key = config.resolved_root()?;

        if let Some(existing) = self.watches.read().await.get(&key) {
            debug!("Reusing existing watch for {}", key.display());
            return Ok(Arc::clone(existing));
        }

        // Seed outside the table lock; a large tree walking through
        // init() must not stall lookups for unrelated paths.
        let watch = Watch::new(config, self.store.clone())?;
        watch.init().await?;

        let mut watches = self.watches.write().await;
        if let Some(existing) = watches.get(&key) {
            // Lost a concurrent create for the same root; the loser was
            // never started and is retired before it leaks out.
            watch.shutdown().await;
            debug!("Reusing existing watch for {}", key.display());
            return Ok(Arc::clone(existing));
        }

        watch.start().await;
        watches.insert(key.clone(), Arc::clone(&watch));
        info!("Created watch for {}", key.display());
        Ok(watch)
    }

    /// Stop and remove the watch for `root`. Returns whether a watch
    /// existed; destroying an unknown path is a no-op, not an error.
    pub async fn destroy(&self, root: impl AsRef<Path>) -> bool {
        let key = registry_key(root.as_ref());

        let removed = self.watches.write().await.remove(&key);
        match removed {
            Some(watch) => {
                watch.shutdown().await;
                info!("Destroyed watch for {}", key.display());
                true
            }
            None => false,
        }
    }

    /// Look up the watch for `root`.
    pub async fn get(&self, root: impl AsRef<Path>) -> Option<Arc<Watch>> {
        let key = registry_key(root.as_ref());
        self.watches.read().await.get(&key).cloned()
    }

    /// Number of live watches.
    pub async fn len(&self) -> usize {
        self.watches.read().await.len()
    }

    /// Whether no watches are live.
    pub async fn is_empty(&self) -> bool {
        self.watches.read().await.is_empty()
    }
}

impl Default for WatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Watches are keyed by absolute root path so relative and absolute
/// spellings of the same directory resolve to one watch.
fn registry_key(root: &Path) -> PathBuf {
    root.absolutize()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_else(|_| root.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn silent_config(root: &Path) -> WatchConfig {
        WatchConfig::new(root).on_result(Arc::new(|_| {}))
    }

    #[tokio::test]
    async fn test_create_returns_existing_watch_for_same_root() {
        let temp_dir = TempDir::new().unwrap();
        let registry = WatchRegistry::new();

        let first = registry.create(silent_config(temp_dir.path())).await.unwrap();
        // Second create for the same root, different filter: same watch.
        let second = registry
            .create(silent_config(temp_dir.path()).with_extension(".txt"))
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len().await, 1);

        registry.destroy(temp_dir.path()).await;
    }

    #[tokio::test]
    async fn test_concurrent_creates_converge_on_one_watch() {
        let temp_dir = TempDir::new().unwrap();
        let registry = Arc::new(WatchRegistry::new());

        let mut handles = Vec::new();
        for _ in 0..4 {
            let registry = Arc::clone(&registry);
            let root = temp_dir.path().to_path_buf();
            handles.push(tokio::spawn(async move {
                registry.create(silent_config(&root)).await.unwrap()
            }));
        }

        let mut watches = Vec::new();
        for handle in handles {
            watches.push(handle.await.unwrap());
        }

        assert_eq!(registry.len().await, 1);
        for watch in &watches[1..] {
            assert!(Arc::ptr_eq(&watches[0], watch));
        }

        registry.destroy(temp_dir.path()).await;
    }

    #[tokio::test]
    async fn test_destroy_unknown_path_is_noop() {
        let registry = WatchRegistry::new();
        assert!(!registry.destroy("/nonexistent/pollwatch/12345").await);
    }

    #[tokio::test]
    async fn test_get_after_destroy() {
        let temp_dir = TempDir::new().unwrap();
        let registry = WatchRegistry::new();

        registry.create(silent_config(temp_dir.path())).await.unwrap();
        assert!(registry.get(temp_dir.path()).await.is_some());

        assert!(registry.destroy(temp_dir.path()).await);
        assert!(registry.get(temp_dir.path()).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_config() {
        let registry = WatchRegistry::new();
        let result = registry.create(WatchConfig::new("")).await;
        assert!(result.is_err());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_watches_share_the_registry_store() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::File::create(temp_dir.path().join("seeded.txt")).unwrap();

        let store = ModTimeStore::new();
        let registry = WatchRegistry::with_store(store.clone());

        registry.create(silent_config(temp_dir.path())).await.unwrap();
        assert_eq!(store.len().await, 1);

        registry.destroy(temp_dir.path()).await;
    }
}
