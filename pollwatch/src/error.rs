//! Error types for the polling watcher.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors that can occur while constructing or running a watch.
#[derive(Error, Debug)]
pub enum WatchError {
    /// Invalid or incomplete configuration. Fatal at construction.
    #[error("configuration error: {0}")]
    Config(String),

    /// Listing or stat failure during the startup seeding scan. Fatal;
    /// the watch is unusable afterward and must be reconstructed.
    #[error("initialization failed for {}: {source}", path.display())]
    Init {
        /// Path the failing operation touched.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// Watched root absent during a steady-state poll. Suppressed by the
    /// watch (retried silently on the next cycle), never delivered.
    #[error("watched root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    /// Any other listing or stat failure during steady-state polling.
    /// Delivered through the result handler; the watch keeps polling.
    #[error("io error at {}: {source}", path.display())]
    Io {
        /// Path the failing operation touched.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// Failure from a custom sort routine.
    #[error("sort error: {0}")]
    Sort(String),
}

impl WatchError {
    /// Whether this error is the deliberately suppressed "root does not
    /// exist yet" condition.
    pub fn is_root_not_found(&self) -> bool {
        matches!(self, Self::RootNotFound(_))
    }

    /// Whether this error is fatal to the watch (as opposed to an
    /// operational error the polling loop survives).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Init { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_not_found_classification() {
        let err = WatchError::RootNotFound(PathBuf::from("/missing"));
        assert!(err.is_root_not_found());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_fatal_classification() {
        let err = WatchError::Config("root path is required".to_string());
        assert!(err.is_fatal());

        let err = WatchError::Io {
            path: PathBuf::from("/x"),
            source: std::io::Error::other("boom"),
        };
        assert!(!err.is_fatal());
        assert!(!err.is_root_not_found());
    }
}
