use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where the serving backend lives and how to talk to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL, e.g. `http://127.0.0.1:8000`
    pub base_url: String,
    /// Per-request timeout; `None` leaves the transport default (no timeout)
    pub timeout: Option<Duration>,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Create a backend config from environment variables
    /// DRIFTWATCH_BACKEND_URL=http://127.0.0.1:8000
    /// DRIFTWATCH_BACKEND_TIMEOUT_SECS=10
    pub fn from_env() -> Self {
        let base_url = std::env::var("DRIFTWATCH_BACKEND_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
        let timeout = std::env::var("DRIFTWATCH_BACKEND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Self { base_url, timeout }
    }

    /// Join an endpoint path onto the base URL
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new("http://127.0.0.1:8000")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join() {
        let config = BackendConfig::new("http://localhost:8000/");
        assert_eq!(config.url("/health"), "http://localhost:8000/health");
        assert_eq!(
            config.url("monitoring/drift"),
            "http://localhost:8000/monitoring/drift"
        );
    }

    #[test]
    fn test_default_has_no_timeout() {
        let config = BackendConfig::default();
        assert!(config.timeout.is_none());

        let config = config.with_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }
}
