//! Drift alerting
//!
//! Background polling of the backend's drift status with a user-editable
//! configuration, a bounded in-memory history and notification targets.

pub mod config;
pub mod history;
pub mod notifier;
pub mod watcher;

pub use config::{AlertConfig, AlertHistoryItem, AlertKind, ConfigError, NotifyTarget};
pub use history::{AlertHistory, MAX_HISTORY};
pub use notifier::{Notifier, NotifierError};
pub use watcher::{CheckOutcome, DriftWatcher, WatchHandle, WatcherState, WatcherStatus};
