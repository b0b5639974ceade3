//! Configuration for a polling watch.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use path_absolutize::Absolutize;

use crate::error::{Result, WatchError};

/// Default delay between poll cycles.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

/// Outcome of one poll cycle, handed to the result handler.
///
/// `Ok` carries the ordered list of absolute paths that are new or
/// modified since the previous cycle; it is never delivered empty.
pub type PollResult = Result<Vec<PathBuf>>;

/// Callback invoked after a poll cycle that produced files or a
/// reportable error.
pub type ResultHandler = Arc<dyn Fn(PollResult) + Send + Sync>;

/// Custom sort routine. Receives the full filtered path list and must
/// return a permutation of it.
pub type SortFn = Arc<dyn Fn(Vec<PathBuf>) -> Result<Vec<PathBuf>> + Send + Sync>;

/// Configuration for a watched directory. Immutable once the watch is
/// constructed.
#[derive(Clone)]
pub struct WatchConfig {
    /// Directory to monitor. Resolved to an absolute path at
    /// construction so all reported paths are absolute.
    pub root: PathBuf,

    /// Suffix filter applied to each file's full path; `None` disables
    /// filtering.
    pub extension: Option<String>,

    /// Delay between poll cycles.
    pub period: Duration,

    /// Whether the sort stage runs.
    pub sort_enabled: bool,

    /// Custom sort routine; only consulted when `sort_enabled`.
    pub sort_fn: Option<SortFn>,

    /// Handler invoked with each cycle's outcome.
    pub on_result: Option<ResultHandler>,
}

impl WatchConfig {
    /// Create a config for the given root with defaults: no extension
    /// filter, one-second period, sorting disabled, no handler.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: None,
            period: DEFAULT_PERIOD,
            sort_enabled: false,
            sort_fn: None,
            on_result: None,
        }
    }

    /// Only report files whose path ends with `extension`.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Set the delay between poll cycles.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Enable the default ascending lexicographic sort.
    pub fn sorted(mut self) -> Self {
        self.sort_enabled = true;
        self
    }

    /// Enable sorting with a custom routine.
    pub fn with_sort_fn(mut self, sort_fn: SortFn) -> Self {
        self.sort_enabled = true;
        self.sort_fn = Some(sort_fn);
        self
    }

    /// Set the result handler.
    pub fn on_result(mut self, handler: ResultHandler) -> Self {
        self.on_result = Some(handler);
        self
    }

    /// Deliver each cycle's outcome into a tokio channel instead of a
    /// closure. Outcomes are dropped once the receiver closes.
    pub fn deliver_to(self, tx: tokio::sync::mpsc::UnboundedSender<PollResult>) -> Self {
        self.on_result(Arc::new(move |outcome| {
            let _ = tx.send(outcome);
        }))
    }

    /// Validate required fields. Fatal on failure; a watch is never
    /// constructed from an invalid config.
    pub fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(WatchError::Config("root path is required".to_string()));
        }
        if self.on_result.is_none() {
            return Err(WatchError::Config("result handler is required".to_string()));
        }
        if self.period.is_zero() {
            return Err(WatchError::Config("poll period must be nonzero".to_string()));
        }
        Ok(())
    }

    /// Resolve `root` to an absolute path without requiring it to exist
    /// on disk yet.
    pub fn resolved_root(&self) -> Result<PathBuf> {
        self.root
            .absolutize()
            .map(std::borrow::Cow::into_owned)
            .map_err(|source| WatchError::Io {
                path: self.root.clone(),
                source,
            })
    }

    /// Whether `path` passes the extension filter.
    pub(crate) fn matches_extension(&self, path: &Path) -> bool {
        match &self.extension {
            Some(ext) => path.to_string_lossy().ends_with(ext.as_str()),
            None => true,
        }
    }
}

impl fmt::Debug for WatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchConfig")
            .field("root", &self.root)
            .field("extension", &self.extension)
            .field("period", &self.period)
            .field("sort_enabled", &self.sort_enabled)
            .field("sort_fn", &self.sort_fn.as_ref().map(|_| "<fn>"))
            .field("on_result", &self.on_result.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn noop_handler() -> ResultHandler {
        Arc::new(|_| {})
    }

    #[test]
    fn test_config_defaults() {
        let config = WatchConfig::new("/tmp/inbox");
        assert_eq!(config.root, Path::new("/tmp/inbox"));
        assert_eq!(config.extension, None);
        assert_eq!(config.period, DEFAULT_PERIOD);
        assert!(!config.sort_enabled);
    }

    #[test]
    fn test_validate_requires_root() {
        let config = WatchConfig::new("").on_result(noop_handler());
        assert!(matches!(config.validate(), Err(WatchError::Config(_))));
    }

    #[test]
    fn test_validate_requires_handler() {
        let config = WatchConfig::new("/tmp/inbox");
        assert!(matches!(config.validate(), Err(WatchError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_period() {
        let config = WatchConfig::new("/tmp/inbox")
            .on_result(noop_handler())
            .with_period(Duration::ZERO);
        assert!(matches!(config.validate(), Err(WatchError::Config(_))));
    }

    #[test]
    fn test_extension_matching_is_a_suffix_test() {
        let config = WatchConfig::new("/tmp/inbox").with_extension(".log");
        assert!(config.matches_extension(Path::new("/tmp/inbox/a.log")));
        assert!(!config.matches_extension(Path::new("/tmp/inbox/a.log.bak")));
        assert!(!config.matches_extension(Path::new("/tmp/inbox/a.txt")));

        let unfiltered = WatchConfig::new("/tmp/inbox");
        assert!(unfiltered.matches_extension(Path::new("/tmp/inbox/a.txt")));
    }

    #[test]
    fn test_resolved_root_is_absolute() {
        let config = WatchConfig::new("relative/inbox");
        let resolved = config.resolved_root().unwrap();
        assert!(resolved.is_absolute());
    }
}
