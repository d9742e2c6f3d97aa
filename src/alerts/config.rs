//! Alert configuration and history types

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Drift alert settings, edited by the user at runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertConfig {
    /// Whether the watcher polls at all
    pub enabled: bool,
    /// Drift threshold in standard deviations, forwarded to the backend
    pub threshold: f64,
    /// Seconds between scheduled checks
    pub check_interval_seconds: u64,
    /// Record and notify when the backend reports drift
    pub notify_on_drift: bool,
    /// Request a baseline automatically when none is configured
    pub auto_set_baseline: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 2.0,
            check_interval_seconds: 60,
            notify_on_drift: true,
            auto_set_baseline: false,
        }
    }
}

impl AlertConfig {
    /// Set enabled state
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set check interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.check_interval_seconds = interval.as_secs();
        self
    }

    pub fn with_auto_baseline(mut self, auto_set_baseline: bool) -> Self {
        self.auto_set_baseline = auto_set_baseline;
        self
    }

    pub fn with_notify_on_drift(mut self, notify_on_drift: bool) -> Self {
        self.notify_on_drift = notify_on_drift;
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        if self.check_interval_seconds == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        Ok(())
    }

    /// Initial alert settings from environment variables
    /// DRIFTWATCH_ALERTS_ENABLED=true
    /// DRIFTWATCH_ALERT_THRESHOLD=2.0
    /// DRIFTWATCH_CHECK_INTERVAL_SECS=60
    /// DRIFTWATCH_NOTIFY_ON_DRIFT=true
    /// DRIFTWATCH_AUTO_BASELINE=false
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            enabled: env_flag("DRIFTWATCH_ALERTS_ENABLED").unwrap_or(defaults.enabled),
            threshold: std::env::var("DRIFTWATCH_ALERT_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.threshold),
            check_interval_seconds: std::env::var("DRIFTWATCH_CHECK_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.check_interval_seconds),
            notify_on_drift: env_flag("DRIFTWATCH_NOTIFY_ON_DRIFT")
                .unwrap_or(defaults.notify_on_drift),
            auto_set_baseline: env_flag("DRIFTWATCH_AUTO_BASELINE")
                .unwrap_or(defaults.auto_set_baseline),
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| v == "true" || v == "1")
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Threshold must be a positive number, got {0}")]
    InvalidThreshold(f64),

    #[error("Check interval must be at least one second")]
    InvalidInterval,
}

/// Kind of history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Drift,
    Info,
    Warning,
}

/// One entry in the alert history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertHistoryItem {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drift_score: Option<f64>,
}

impl AlertHistoryItem {
    pub fn drift(score: Option<f64>) -> Self {
        let message = match score {
            Some(score) => format!("Drift detected! Score: {:.2}", score),
            None => "Drift detected (no score reported)".to_string(),
        };

        Self {
            timestamp: Utc::now(),
            kind: AlertKind::Drift,
            message,
            drift_score: score,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind: AlertKind::Info,
            message: message.into(),
            drift_score: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind: AlertKind::Warning,
            message: message.into(),
            drift_score: None,
        }
    }
}

/// Notification target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NotifyTarget {
    /// Log to tracing
    Log,
    /// HTTP webhook
    Webhook {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
}

impl NotifyTarget {
    pub fn webhook(url: impl Into<String>) -> Self {
        NotifyTarget::Webhook {
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    /// Log target plus any webhooks listed in DRIFTWATCH_WEBHOOKS (comma-separated)
    pub fn from_env() -> Vec<NotifyTarget> {
        let mut targets = vec![NotifyTarget::Log];

        if let Ok(urls) = std::env::var("DRIFTWATCH_WEBHOOKS") {
            targets.extend(
                urls.split(',')
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .map(NotifyTarget::webhook),
            );
        }

        targets
    }
}
