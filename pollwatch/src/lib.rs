//! # pollwatch
//!
//! Poll-based directory watching for new and modified files. Instead of
//! OS-level file-event subscription, each watch periodically rescans its
//! directory tree and compares modification timestamps against a shared
//! store, which keeps behavior identical across platforms and avoids
//! notification-handle limits on large trees.
//!
//! ## Features
//!
//! - **Recursive Polling**: Walk the whole tree on every cycle
//! - **Startup Seeding**: Pre-existing files are never reported as new
//! - **Extension Filtering**: Suffix filter applied before any stat call
//! - **Pluggable Ordering**: Lexicographic by default, custom routines
//!   supported
//! - **Shared Timestamp State**: Overlapping watches observe each other
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        WatchRegistry                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  WatchConfig ──► Watch ──► list ──► filter ──► sort ──► deliver │
//! │                    │                   │                        │
//! │                    ▼                   ▼                        │
//! │              one-shot timer      ModTimeStore                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One cycle lists the tree, keeps the files whose modification time is
//! newer than last observed, optionally sorts, delivers through the
//! configured handler only when there is something to say, and re-arms
//! its timer — a transient failure never stops the loop.

pub mod config;
pub mod error;
pub mod mod_time;
pub mod registry;
pub mod watch;

mod scanner;
mod sort;

pub use config::{DEFAULT_PERIOD, PollResult, ResultHandler, SortFn, WatchConfig};
pub use error::{Result, WatchError};
pub use mod_time::ModTimeStore;
pub use registry::WatchRegistry;
pub use watch::{Phase, Watch};
