//! Delivery of new alert history entries to the configured targets
//!
//! Every target is attempted, concurrently, and each webhook request is
//! bounded by a timeout. The watcher hands items over with
//! [`Notifier::dispatch`] and never waits on delivery.

use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;

use super::config::{AlertHistoryItem, AlertKind, NotifyTarget};

/// Upper bound on a single webhook request
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
    targets: Vec<NotifyTarget>,
    webhook_timeout: Duration,
}

impl Notifier {
    /// Create a notifier that only logs
    pub fn new() -> Self {
        Self::with_targets(vec![NotifyTarget::Log])
    }

    pub fn with_targets(targets: Vec<NotifyTarget>) -> Self {
        Self {
            client: reqwest::Client::new(),
            targets,
            webhook_timeout: DEFAULT_WEBHOOK_TIMEOUT,
        }
    }

    pub fn with_webhook_timeout(mut self, timeout: Duration) -> Self {
        self.webhook_timeout = timeout;
        self
    }

    pub fn targets(&self) -> &[NotifyTarget] {
        &self.targets
    }

    /// Deliver in a background task, logging failures
    pub fn dispatch(&self, item: AlertHistoryItem) -> JoinHandle<()> {
        let notifier = self.clone();

        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&item).await {
                tracing::error!(error = %e, "Failed to deliver alert notification");
            }
        })
    }

    /// Deliver to every target and wait for all of them
    pub async fn notify(&self, item: &AlertHistoryItem) -> Result<(), NotifierError> {
        let results = join_all(self.targets.iter().map(|target| self.deliver(target, item))).await;

        let failures: Vec<NotifierError> = results.into_iter().filter_map(Result::err).collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(NotifierError::Delivery(failures))
        }
    }

    async fn deliver(
        &self,
        target: &NotifyTarget,
        item: &AlertHistoryItem,
    ) -> Result<(), NotifierError> {
        match target {
            NotifyTarget::Log => {
                match item.kind {
                    AlertKind::Info => tracing::info!("Alert: {}", item.message),
                    AlertKind::Drift | AlertKind::Warning => tracing::warn!(
                        kind = ?item.kind,
                        drift_score = ?item.drift_score,
                        "Alert: {}",
                        item.message
                    ),
                }
                Ok(())
            }
            NotifyTarget::Webhook { url, headers } => {
                let payload = serde_json::json!({
                    "alert": item,
                    "sent_at": chrono::Utc::now().to_rfc3339(),
                });

                let request = headers.iter().fold(
                    self.client
                        .post(url)
                        .timeout(self.webhook_timeout)
                        .json(&payload),
                    |request, (key, value)| request.header(key, value),
                );

                let response = request.send().await.map_err(|e| NotifierError::Webhook {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;

                if !response.status().is_success() {
                    return Err(NotifierError::Webhook {
                        url: url.clone(),
                        reason: format!("status {}", response.status()),
                    });
                }

                tracing::debug!(url = %url, "Webhook notification sent");
                Ok(())
            }
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Webhook {url} failed: {reason}")]
    Webhook { url: String, reason: String },

    #[error("{} notification target(s) failed: {:?}", .0.len(), .0)]
    Delivery(Vec<NotifierError>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{spawn_backend, spawn_silent_listener};
    use axum::{routing::post, Json, Router};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[tokio::test]
    async fn test_log_notification() {
        let notifier = Notifier::new();

        let result = notifier.notify(&AlertHistoryItem::drift(Some(2.4))).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_webhook_notification() {
        let received = Arc::new(Mutex::new(Vec::<serde_json::Value>::new()));
        let sink = Arc::clone(&received);
        let router = Router::new().route(
            "/hook",
            post(move |Json(body): Json<serde_json::Value>| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().await.push(body);
                    "ok"
                }
            }),
        );
        let base_url = spawn_backend(router).await;

        let notifier =
            Notifier::with_targets(vec![NotifyTarget::webhook(format!("{}/hook", base_url))]);
        notifier
            .notify(&AlertHistoryItem::drift(Some(3.1)))
            .await
            .unwrap();

        let received = received.lock().await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["alert"]["type"], "drift");
        assert_eq!(received[0]["alert"]["driftScore"], 3.1);
    }

    #[tokio::test]
    async fn test_webhook_failure_collected() {
        let notifier = Notifier::with_targets(vec![
            NotifyTarget::Log,
            NotifyTarget::webhook("http://127.0.0.1:9/hook"),
        ]);

        let err = notifier
            .notify(&AlertHistoryItem::info("x"))
            .await
            .unwrap_err();
        match err {
            NotifierError::Delivery(errors) => assert_eq!(errors.len(), 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unresponsive_webhook_times_out() {
        let hook_url = spawn_silent_listener().await;
        let notifier = Notifier::with_targets(vec![NotifyTarget::webhook(hook_url)])
            .with_webhook_timeout(Duration::from_millis(200));

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            notifier.notify(&AlertHistoryItem::drift(Some(3.1))),
        )
        .await
        .expect("webhook request was not bounded");

        match result.unwrap_err() {
            NotifierError::Delivery(errors) => {
                assert!(matches!(errors[0], NotifierError::Webhook { .. }))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
