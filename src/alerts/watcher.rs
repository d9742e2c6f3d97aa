//! Background drift watcher
//!
//! Polls the backend's drift endpoint on a fixed interval while enabled and
//! turns the reported status into alert history entries and notifications.
//!
//! State machine:
//!
//! ```text
//! Disabled --enable--> Idle --tick/manual--> Checking --result/error--> Idle
//!    ^                  |
//!    +-----disable------+
//! ```
//!
//! At most one check runs at a time; a tick that finds a check in flight is
//! skipped, not queued. Failures are logged and otherwise ignored, the next
//! tick being the retry. Notifications are delivered outside the check, so a
//! slow target never holds up polling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::config::{AlertConfig, AlertHistoryItem, ConfigError};
use super::history::AlertHistory;
use super::notifier::Notifier;
use crate::backend::{ClientError, DriftInfo, DriftSource};

/// Observable watcher state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatcherState {
    Disabled,
    Idle,
    Checking,
}

/// What a single check did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Watcher is disabled; nothing was fetched
    Disabled,
    /// Another check was already in flight
    Skipped,
    /// No baseline existed, one was requested and an info entry recorded
    BaselineRequested { item: AlertHistoryItem },
    /// The backend refused the automatic baseline; a warning entry was recorded
    BaselineRejected { item: AlertHistoryItem },
    /// Drift reported and recorded; notification delivery continues in the background
    DriftRecorded { item: AlertHistoryItem },
    /// Status fetched, nothing to record
    Checked {
        drift_detected: bool,
        drift_score: Option<f64>,
    },
    /// Fetch failed; logged and suppressed
    Failed { error: String },
    /// Watcher was disabled or shut down while the check was in flight
    Stale,
}

/// Point-in-time view of the watcher
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatcherStatus {
    pub state: WatcherState,
    pub last_checked: Option<DateTime<Utc>>,
    pub history_len: usize,
    pub latest_alert: Option<AlertHistoryItem>,
    pub scheduled: bool,
    /// Period of the running schedule, which always matches `config` once
    /// an update has returned
    pub scheduled_interval_seconds: Option<u64>,
    pub config: AlertConfig,
}

struct Shared {
    config: AlertConfig,
    history: AlertHistory,
    last_checked: Option<DateTime<Utc>>,
    /// Bumped whenever the watcher is disabled, re-enabled or shut down.
    /// Checks started under an older generation are discarded.
    generation: u64,
    stopped: bool,
}

struct Inner {
    source: Arc<dyn DriftSource>,
    notifier: Notifier,
    shared: RwLock<Shared>,
    in_flight: AtomicBool,
    /// Lock order: `schedule` before `shared`
    schedule: Mutex<Option<WatchHandle>>,
}

/// Drift watcher. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct DriftWatcher {
    inner: Arc<Inner>,
}

impl DriftWatcher {
    /// Create a watcher. No timer runs until [`start`](Self::start) or
    /// [`update_config`](Self::update_config) is called.
    pub fn new(
        source: Arc<dyn DriftSource>,
        notifier: Notifier,
        config: AlertConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(Inner {
                source,
                notifier,
                shared: RwLock::new(Shared {
                    config,
                    history: AlertHistory::new(),
                    last_checked: None,
                    generation: 0,
                    stopped: false,
                }),
                in_flight: AtomicBool::new(false),
                schedule: Mutex::new(None),
            }),
        })
    }

    /// Start the schedule if the current config is enabled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut schedule = self.inner.schedule.lock();
        let config = self.config();
        self.reschedule(&mut schedule, &config);
    }

    /// Replace the configuration.
    ///
    /// Any change while enabled restarts the schedule, which fires an
    /// immediate check. Disabling cancels the schedule. Invalid configs are
    /// rejected and leave the current one in place.
    pub fn update_config(&self, config: AlertConfig) -> Result<(), ConfigError> {
        config.validate()?;

        // Held across the swap and the reschedule so concurrent updates
        // cannot leave the timer running with another request's settings.
        let mut schedule = self.inner.schedule.lock();

        {
            let mut shared = self.inner.shared.write();
            if shared.config.enabled != config.enabled {
                shared.generation += 1;
            }
            shared.config = config.clone();
            shared.stopped = false;
        }

        tracing::info!(
            enabled = config.enabled,
            threshold = config.threshold,
            interval_secs = config.check_interval_seconds,
            "Drift alert config updated"
        );

        self.reschedule(&mut schedule, &config);
        Ok(())
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<(), ConfigError> {
        let config = self.config().with_enabled(enabled);
        self.update_config(config)
    }

    /// Stop the schedule and discard any in-flight result. Idempotent.
    pub fn shutdown(&self) {
        let mut schedule = self.inner.schedule.lock();

        {
            let mut shared = self.inner.shared.write();
            shared.generation += 1;
            shared.stopped = true;
        }

        if let Some(mut handle) = schedule.take() {
            handle.cancel();
            tracing::info!("Drift watcher shut down");
        }
    }

    pub fn config(&self) -> AlertConfig {
        self.inner.shared.read().config.clone()
    }

    /// History, newest first
    pub fn history(&self) -> Vec<AlertHistoryItem> {
        self.inner.shared.read().history.to_vec()
    }

    pub fn clear_history(&self) {
        self.inner.shared.write().history.clear();
    }

    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        self.inner.shared.read().last_checked
    }

    pub fn state(&self) -> WatcherState {
        let enabled = self.inner.shared.read().config.enabled;
        self.state_for(enabled)
    }

    fn state_for(&self, enabled: bool) -> WatcherState {
        if !enabled {
            WatcherState::Disabled
        } else if self.inner.in_flight.load(Ordering::Acquire) {
            WatcherState::Checking
        } else {
            WatcherState::Idle
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled_interval().is_some()
    }

    /// Period of the running schedule, if any
    pub fn scheduled_interval(&self) -> Option<Duration> {
        self.inner
            .schedule
            .lock()
            .as_ref()
            .filter(|h| h.is_active())
            .map(WatchHandle::period)
    }

    pub fn status(&self) -> WatcherStatus {
        let schedule = self.inner.schedule.lock();
        let shared = self.inner.shared.read();
        let period = schedule
            .as_ref()
            .filter(|h| h.is_active())
            .map(WatchHandle::period);

        WatcherStatus {
            state: self.state_for(shared.config.enabled),
            last_checked: shared.last_checked,
            history_len: shared.history.len(),
            latest_alert: shared.history.latest().cloned(),
            scheduled: period.is_some(),
            scheduled_interval_seconds: period.map(|p| p.as_secs()),
            config: shared.config.clone(),
        }
    }

    /// Run one check now. Used by both the schedule and manual triggers.
    pub async fn check_now(&self) -> CheckOutcome {
        let Some((mut config, mut generation)) = self.active_snapshot() else {
            return CheckOutcome::Disabled;
        };

        let Some(_guard) = InFlightGuard::acquire(&self.inner.in_flight) else {
            tracing::debug!("Drift check already in flight, skipping");
            return CheckOutcome::Skipped;
        };

        loop {
            let outcome = self.run_check(&config, generation).await;
            if outcome != CheckOutcome::Stale {
                return outcome;
            }

            // Re-enabled while this check was in flight. The restart's own
            // immediate check was skipped by the guard, so it runs here.
            match self.active_snapshot() {
                Some(snapshot) => {
                    tracing::debug!("Watcher restarted during check, checking again");
                    (config, generation) = snapshot;
                }
                None => return outcome,
            }
        }
    }

    /// Config and generation, if the watcher is enabled and not shut down
    fn active_snapshot(&self) -> Option<(AlertConfig, u64)> {
        let shared = self.inner.shared.read();
        (shared.config.enabled && !shared.stopped)
            .then(|| (shared.config.clone(), shared.generation))
    }

    async fn run_check(&self, config: &AlertConfig, generation: u64) -> CheckOutcome {
        match self.inner.source.drift_status(config.threshold).await {
            Ok(info) => self.handle_status(config, generation, info).await,
            Err(e) => {
                tracing::warn!(error = %e, "Drift check failed");
                if !self.apply(generation, None) {
                    return CheckOutcome::Stale;
                }
                CheckOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn handle_status(
        &self,
        config: &AlertConfig,
        generation: u64,
        info: DriftInfo,
    ) -> CheckOutcome {
        if self.is_stale(generation) {
            tracing::debug!("Discarding drift status from a previous session");
            return CheckOutcome::Stale;
        }

        if !info.baseline_configured && config.auto_set_baseline {
            return self.request_baseline(generation).await;
        }

        if info.drift_detected && config.notify_on_drift {
            let item = AlertHistoryItem::drift(info.drift_score);
            if !self.apply(generation, Some(&item)) {
                return CheckOutcome::Stale;
            }

            self.inner.notifier.dispatch(item.clone());
            return CheckOutcome::DriftRecorded { item };
        }

        if !self.apply(generation, None) {
            return CheckOutcome::Stale;
        }

        tracing::debug!(
            drift_detected = info.drift_detected,
            drift_score = ?info.drift_score,
            "Drift check complete"
        );

        CheckOutcome::Checked {
            drift_detected: info.drift_detected,
            drift_score: info.drift_score,
        }
    }

    async fn request_baseline(&self, generation: u64) -> CheckOutcome {
        match self.inner.source.set_baseline().await {
            Ok(()) => {
                tracing::info!("No drift baseline configured, baseline set automatically");
                let item = AlertHistoryItem::info(
                    "No baseline configured; baseline set automatically from current predictions",
                );
                if !self.apply(generation, Some(&item)) {
                    return CheckOutcome::Stale;
                }
                CheckOutcome::BaselineRequested { item }
            }
            Err(ClientError::Api { status, detail }) => {
                tracing::warn!(status, detail = %detail, "Automatic baseline rejected");
                let item =
                    AlertHistoryItem::warning(format!("Automatic baseline failed: {}", detail));
                if !self.apply(generation, Some(&item)) {
                    return CheckOutcome::Stale;
                }
                CheckOutcome::BaselineRejected { item }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Automatic baseline request failed");
                if !self.apply(generation, None) {
                    return CheckOutcome::Stale;
                }
                CheckOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.inner.shared.read().generation != generation
    }

    /// Record the check time and optional history entry, unless the
    /// check belongs to an older generation. Returns false when discarded.
    fn apply(&self, generation: u64, item: Option<&AlertHistoryItem>) -> bool {
        let mut shared = self.inner.shared.write();
        if shared.generation != generation {
            return false;
        }

        if let Some(item) = item {
            shared.history.push(item.clone());
        }
        shared.last_checked = Some(Utc::now());
        true
    }

    /// Replace the running schedule. The caller holds the `schedule` lock.
    fn reschedule(&self, schedule: &mut Option<WatchHandle>, config: &AlertConfig) {
        if let Some(mut handle) = schedule.take() {
            handle.cancel();
        }

        if config.enabled {
            *schedule = Some(WatchHandle::spawn(
                Arc::downgrade(&self.inner),
                config.interval(),
            ));
        }
    }
}

/// Clears the in-flight flag when the check finishes, however it finishes
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Handle to a running check schedule. Cancelling is idempotent, and
/// dropping the handle cancels it.
pub struct WatchHandle {
    shutdown_tx: Option<mpsc::Sender<()>>,
    task: JoinHandle<()>,
    period: Duration,
}

impl WatchHandle {
    fn spawn(watcher: Weak<Inner>, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::info!("Drift watcher started with interval {:?}", period);

            loop {
                tokio::select! {
                    // The first tick completes immediately
                    _ = ticker.tick() => {
                        let Some(inner) = watcher.upgrade() else {
                            break;
                        };
                        let watcher = DriftWatcher { inner };
                        tokio::spawn(async move {
                            watcher.check_now().await;
                        });
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            tracing::info!("Drift watcher schedule stopped");
        });

        Self {
            shutdown_tx: Some(shutdown_tx),
            task,
            period,
        }
    }

    pub fn cancel(&mut self) {
        // Dropping the only sender wakes the loop's recv with None
        self.shutdown_tx.take();
    }

    pub fn is_active(&self) -> bool {
        self.shutdown_tx.is_some() && !self.task.is_finished()
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
