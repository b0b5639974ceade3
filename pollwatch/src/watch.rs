//! The watch state machine.
//!
//! A `Watch` owns one polling cycle for one root path: list, filter,
//! sort, deliver if nonempty, reschedule. A startup phase silently seeds
//! the shared [`ModTimeStore`] with the directory's pre-existing files so
//! they are never reported as new.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::WatchConfig;
use crate::error::{Result, WatchError};
use crate::mod_time::ModTimeStore;
use crate::{scanner, sort};

/// Lifecycle phase of a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Startup seeding scan has not completed yet.
    Initializing,

    /// Usable, no timer armed.
    Idle,

    /// One-shot timer armed for the next poll cycle.
    Scheduled,

    /// Poll cycle in flight.
    Scanning,

    /// Terminal; the watch was destroyed and can never be rearmed.
    Stopped,
}

/// Handle to the pending one-shot timer.
#[derive(Debug)]
struct Timer {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

#[derive(Debug)]
struct WatchState {
    phase: Phase,

    /// A start() arrived while still initializing; replayed once the
    /// seeding scan completes.
    start_pending: bool,

    /// Present only while a timer is armed.
    timer: Option<Timer>,
}

/// One configured, independently scheduled polling unit for a single
/// root path.
#[derive(Debug)]
pub struct Watch {
    config: WatchConfig,
    root: PathBuf,
    store: ModTimeStore,
    state: Mutex<WatchState>,
}

impl Watch {
    /// Validate the config and create the watch in its initializing
    /// phase. Fails fast on a missing root path, missing result handler,
    /// or zero period; no watch exists after a configuration error.
    ///
    /// The watch is not usable until [`Watch::init`] has seeded the
    /// store.
    pub fn new(config: WatchConfig, store: ModTimeStore) -> Result<Arc<Self>> {
        config.validate()?;
        let root = config.resolved_root()?;

        Ok(Arc::new(Self {
            config,
            root,
            store,
            state: Mutex::new(WatchState {
                phase: Phase::Initializing,
                start_pending: false,
                timer: None,
            }),
        }))
    }

    /// Absolute root path this watch monitors.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current lifecycle phase.
    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase
    }

    /// Run the one-time startup seeding scan.
    ///
    /// Every pre-existing file matching the extension filter has its
    /// current modification timestamp recorded so it is never later
    /// reported as new. Any listing or stat failure here is fatal: the
    /// watch transitions to [`Phase::Stopped`] and the error is returned
    /// to the caller, never delivered through the result handler.
    ///
    /// If a `start()` request arrived while initializing, the timer is
    /// armed as soon as seeding completes. Calling `init` on an already
    /// initialized watch is a no-op.
    pub async fn init(self: &Arc<Self>) -> Result<()> {
        {
            let state = self.state.lock().await;
            if state.phase != Phase::Initializing {
                return Ok(());
            }
        }

        let seeded = match self.seed_baseline().await {
            Ok(count) => count,
            Err(err) => {
                self.state.lock().await.phase = Phase::Stopped;
                return Err(err);
            }
        };

        info!(
            "Watch initialized for {} ({} files seeded)",
            self.root.display(),
            seeded
        );

        let replay = {
            let mut state = self.state.lock().await;
            state.phase = Phase::Idle;
            std::mem::take(&mut state.start_pending)
        };

        if replay {
            self.start().await;
        }

        Ok(())
    }

    async fn seed_baseline(&self) -> Result<usize> {
        let files = scanner::list(&self.root).await.map_err(into_init)?;
        scanner::seed(files, &self.config, &self.store)
            .await
            .map_err(into_init)
    }

    /// Arm the one-shot timer for the next poll cycle.
    ///
    /// Idempotent: a no-op while a timer is already armed, a scan is in
    /// flight, or the watch is stopped. When called before
    /// initialization completes, the request is recorded and replayed
    /// once seeding finishes.
    pub async fn start(self: &Arc<Self>) {
        let mut state = self.state.lock().await;
        match state.phase {
            Phase::Initializing => {
                state.start_pending = true;
            }
            Phase::Idle => {
                self.arm(&mut state);
            }
            Phase::Scheduled | Phase::Scanning | Phase::Stopped => {}
        }
    }

    /// Disarm a pending timer. Idempotent; a no-op when no timer is
    /// armed. A timer that already fired but whose cycle has not yet
    /// begun is stopped too. Only a scan already in flight runs to
    /// completion, delivers, and reschedules.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        if let Some(timer) = state.timer.take() {
            timer.cancel.cancel();
            debug!("Disarmed timer for {}", self.root.display());
        }
        if state.phase == Phase::Scheduled {
            state.phase = Phase::Idle;
        }
    }

    /// Terminal stop used by the registry when the watch is destroyed.
    /// After this, `start()` is a permanent no-op, so a scan that was in
    /// flight during destruction cannot re-arm the timer.
    pub(crate) async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        if let Some(timer) = state.timer.take() {
            timer.cancel.cancel();
        }
        state.phase = Phase::Stopped;
        info!("Watch stopped for {}", self.root.display());
    }

    /// Timer fire: run one poll cycle, deliver its outcome, reschedule.
    ///
    /// `token` is the timer's own cancellation token. `stop()` cancels
    /// it under the state lock, so rechecking it inside the first
    /// critical section closes the window where a stop lands after the
    /// sleep elapsed but before the cycle has begun.
    async fn poll(self: &Arc<Self>, token: &CancellationToken) {
        {
            let mut state = self.state.lock().await;
            if state.phase == Phase::Stopped || token.is_cancelled() {
                return;
            }
            // Not "scheduled" while scanning.
            state.timer = None;
            state.phase = Phase::Scanning;
        }

        let outcome = self.run_cycle().await;
        self.deliver(outcome);

        // Reschedule unconditionally, errors included, so one failed
        // cycle never stops monitoring. Rearming under the same lock as
        // the phase change leaves no instant where the watch reads as
        // idle while a rearm is still pending.
        let mut state = self.state.lock().await;
        if state.phase == Phase::Scanning {
            state.phase = Phase::Idle;
            self.arm(&mut state);
        }
    }

    /// One scan cycle: list, filter against the store, sort.
    async fn run_cycle(&self) -> Result<Vec<PathBuf>> {
        let files = scanner::list(&self.root).await?;
        let fresh = scanner::filter(files, &self.config, &self.store).await?;
        sort::sort(fresh, &self.config)
    }

    /// Decide whether the cycle's outcome is reportable and invoke the
    /// handler exactly once if so.
    ///
    /// A missing root is swallowed: the watch may exist before its
    /// directory does, and keeps polling until it appears. An empty
    /// success is never delivered.
    fn deliver(&self, outcome: Result<Vec<PathBuf>>) {
        let reportable = match &outcome {
            Ok(files) => !files.is_empty(),
            Err(err) => {
                if err.is_root_not_found() {
                    debug!("Root {} missing, retrying next cycle", self.root.display());
                    false
                } else {
                    warn!("Poll cycle failed for {}: {err}", self.root.display());
                    true
                }
            }
        };

        if !reportable {
            return;
        }

        if let Some(handler) = &self.config.on_result {
            handler(outcome);
        }
    }

    /// Spawn the one-shot timer task. Caller holds the state lock.
    fn arm(self: &Arc<Self>, state: &mut WatchState) {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let period = self.config.period;
        let watch = Arc::clone(self);

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(period) => {}
            }
            watch.poll(&token).await;
        });

        state.timer = Some(Timer { cancel, task });
        state.phase = Phase::Scheduled;
        debug!("Armed {:?} timer for {}", period, self.root.display());
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        // An armed timer task holds an Arc<Watch>, so a live timer here
        // means the runtime is tearing the task down anyway.
        if let Some(timer) = self.state.get_mut().timer.take() {
            timer.task.abort();
        }
    }
}

/// Startup-scan failures are fatal initialization errors, including the
/// root-not-found case that steady-state polling would suppress.
fn into_init(err: WatchError) -> WatchError {
    match err {
        WatchError::RootNotFound(path) => WatchError::Init {
            path,
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "watched root not found during startup scan",
            ),
        },
        WatchError::Io { path, source } => WatchError::Init { path, source },
        other => other,
    }
}
