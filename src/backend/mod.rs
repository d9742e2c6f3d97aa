//! Client side of the model-serving backend
//!
//! Everything the dashboard knows about models, predictions and drift comes
//! through [`ServingClient`]. The backend itself (training, inference, drift
//! statistics) is an external service.

pub mod analytics;
pub mod client;
pub mod config;
pub mod models;

use async_trait::async_trait;

pub use client::{ClientError, ServingClient};
pub use config::BackendConfig;
pub use models::{
    BaselineResponse, BatchPredictionItem, BatchPredictionOutput, DriftAlertRecord, DriftInfo,
    FeatureStatistics, FeatureStats, HealthStatus, ModelInfo, MonitoringStats, PredictionOutput,
    ProductionModelInfo, ReloadResponse, SaveSyntheticRequest, SavedDataset, SyntheticDataset,
    SyntheticMetadata, SyntheticRequest,
};

/// Anything that can report drift status and accept a baseline request.
///
/// The drift watcher only needs these two calls, so it depends on this
/// trait rather than on the concrete HTTP client.
#[async_trait]
pub trait DriftSource: Send + Sync {
    async fn drift_status(&self, threshold: f64) -> Result<DriftInfo, ClientError>;

    async fn set_baseline(&self) -> Result<(), ClientError>;
}
