//! Driftwatch: monitoring dashboard for a model-serving backend
//!
//! A small HTTP service that sits in front of a house-price prediction
//! backend and exposes its health, model registry info, predictions,
//! EDA report and synthetic data generation, together with a background
//! drift watcher that polls the backend and keeps a short alert history.
//!
//! # Features
//!
//! - **Typed backend client**: validation of prediction inputs before any request
//! - **Drift alerts**: interval polling, auto-baseline and bounded history
//! - **Notifications**: log and webhook targets for detected drift
//! - **Response cache**: short-lived cache for read-mostly backend documents
//!
//! # Example
//!
//! ```no_run
//! use driftwatch::alerts::{AlertConfig, DriftWatcher, Notifier};
//! use driftwatch::backend::{BackendConfig, ServingClient};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ServingClient::new(BackendConfig::new("http://127.0.0.1:8000"))?;
//! let watcher = DriftWatcher::new(
//!     Arc::new(client),
//!     Notifier::new(),
//!     AlertConfig::default().with_enabled(true),
//! )?;
//!
//! let outcome = watcher.check_now().await;
//! println!("Check: {:?}", outcome);
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod api;
pub mod backend;
pub mod prediction;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use alerts::{AlertConfig, AlertHistoryItem, CheckOutcome, DriftWatcher};
pub use backend::{BackendConfig, ClientError, DriftSource, ServingClient};
pub use prediction::{PredictionInput, ValidationError};
