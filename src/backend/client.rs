use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use super::config::BackendConfig;
use super::models::{
    BaselineResponse, BatchPredictionOutput, DriftInfo, FeatureStatistics, HealthStatus,
    ModelInfo, MonitoringStats, PredictionOutput, ProductionModelInfo, ReloadResponse,
    SaveSyntheticRequest, SavedDataset, SyntheticDataset, SyntheticRequest,
};
use super::DriftSource;
use crate::prediction::{BatchPredictionInput, PredictionInput, ValidationError};

pub const HEALTH_PATH: &str = "/health";
pub const MODEL_INFO_PATH: &str = "/model/info";
pub const PRODUCTION_INFO_PATH: &str = "/model/production-info";
pub const PREDICT_PATH: &str = "/predict";
pub const PREDICT_BATCH_PATH: &str = "/predict/batch";
pub const MONITORING_STATS_PATH: &str = "/monitoring/stats";
pub const FEATURE_STATS_PATH: &str = "/monitoring/features";
pub const DRIFT_PATH: &str = "/monitoring/drift";
pub const BASELINE_PATH: &str = "/monitoring/baseline";
pub const EDA_DATA_PATH: &str = "/eda/data";
pub const SYNTHETIC_GENERATE_PATH: &str = "/api/v1/synthetic/generate";
pub const SYNTHETIC_SAVE_PATH: &str = "/api/v1/synthetic/save";
pub const RELOAD_PATH: &str = "/admin/reload";

/// Client for the model-serving backend
#[derive(Debug, Clone)]
pub struct ServingClient {
    http_client: reqwest::Client,
    config: BackendConfig,
}

impl ServingClient {
    pub fn new(config: BackendConfig) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http_client = builder
            .build()
            .map_err(|e| ClientError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Backend liveness and loaded-model summary
    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        self.send(self.http_client.get(self.config.url(HEALTH_PATH)))
            .await
    }

    pub async fn model_info(&self) -> Result<ModelInfo, ClientError> {
        self.send(self.http_client.get(self.config.url(MODEL_INFO_PATH)))
            .await
    }

    /// Registry entry for the production model, with metrics and usage
    pub async fn production_info(&self) -> Result<ProductionModelInfo, ClientError> {
        self.send(self.http_client.get(self.config.url(PRODUCTION_INFO_PATH)))
            .await
    }

    /// Run a single prediction. Input is validated before any request is sent.
    pub async fn predict(&self, input: &PredictionInput) -> Result<PredictionOutput, ClientError> {
        input.validate()?;

        self.send(
            self.http_client
                .post(self.config.url(PREDICT_PATH))
                .json(input),
        )
        .await
    }

    pub async fn predict_batch(
        &self,
        input: &BatchPredictionInput,
    ) -> Result<BatchPredictionOutput, ClientError> {
        input.validate()?;

        self.send(
            self.http_client
                .post(self.config.url(PREDICT_BATCH_PATH))
                .json(input),
        )
        .await
    }

    pub async fn monitoring_stats(&self) -> Result<MonitoringStats, ClientError> {
        self.send(self.http_client.get(self.config.url(MONITORING_STATS_PATH)))
            .await
    }

    /// Per-feature statistics of recent inputs, with drift flags once a baseline exists
    pub async fn feature_stats(&self) -> Result<FeatureStatistics, ClientError> {
        self.send(self.get(FEATURE_STATS_PATH)).await
    }

    /// Current drift status, evaluated server-side against `threshold` std-deviations
    pub async fn drift_status(&self, threshold: f64) -> Result<DriftInfo, ClientError> {
        self.send(
            self.http_client
                .get(self.config.url(DRIFT_PATH))
                .query(&[("threshold", threshold)]),
        )
        .await
    }

    /// Ask the backend to snapshot its current predictions as the drift baseline
    pub async fn set_baseline(&self) -> Result<BaselineResponse, ClientError> {
        let response = self
            .http_client
            .post(self.config.url(BASELINE_PATH))
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ClientError::from_response(status, &body));
        }

        // Success is all that matters here; tolerate any body shape.
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    /// Raw EDA report document
    pub async fn eda_data(&self) -> Result<serde_json::Value, ClientError> {
        self.send(self.http_client.get(self.config.url(EDA_DATA_PATH)))
            .await
    }

    pub async fn generate_synthetic(
        &self,
        request: &SyntheticRequest,
    ) -> Result<SyntheticDataset, ClientError> {
        request.validate()?;

        // Sizes go in the query string; the drift feature list is the bare body
        let mut builder = self
            .http_client
            .post(self.config.url(SYNTHETIC_GENERATE_PATH))
            .query(&[("n_samples", request.n_samples)])
            .query(&[("drift_factor", request.drift_factor)]);
        if let Some(features) = &request.features {
            builder = builder.json(features);
        }

        self.send(builder).await
    }

    pub async fn save_synthetic(
        &self,
        request: &SaveSyntheticRequest,
    ) -> Result<SavedDataset, ClientError> {
        if request.name.trim().is_empty() {
            return Err(ClientError::InvalidRequest(
                "Dataset name must not be empty".to_string(),
            ));
        }

        self.send(
            self.http_client
                .post(self.config.url(SYNTHETIC_SAVE_PATH))
                .query(&[("name", request.name.as_str())])
                .json(&request.data),
        )
        .await
    }

    /// Reload the production model on the backend
    pub async fn reload_model(&self) -> Result<ReloadResponse, ClientError> {
        self.send(self.http_client.post(self.config.url(RELOAD_PATH)))
            .await
    }

    pub(super) fn get(&self, path: &str) -> RequestBuilder {
        self.http_client.get(self.config.url(path))
    }

    pub(super) async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_response(status, &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Deserialization(e.to_string()))
    }
}

#[async_trait]
impl DriftSource for ServingClient {
    async fn drift_status(&self, threshold: f64) -> Result<DriftInfo, ClientError> {
        ServingClient::drift_status(self, threshold).await
    }

    async fn set_baseline(&self) -> Result<(), ClientError> {
        ServingClient::set_baseline(self).await.map(|_| ())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("{detail}")]
    Api { status: u16, detail: String },

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Build an API error from a non-2xx response, preferring the `detail` field
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        ClientError::Api {
            status: status.as_u16(),
            detail: error_detail(status, body),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn error_detail(status: StatusCode, body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        match map.get("detail") {
            Some(serde_json::Value::String(detail)) => return detail.clone(),
            // Validation failures carry a structured detail list
            Some(detail) if !detail.is_null() => return detail.to_string(),
            _ => {}
        }
    }

    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }

    format!(
        "Request failed with status {}",
        status
            .canonical_reason()
            .map(|reason| format!("{} {}", status.as_u16(), reason))
            .unwrap_or_else(|| status.as_u16().to_string())
    )
}
