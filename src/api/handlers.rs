use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

use super::cache::{CacheStats, ResponseCache};
use crate::alerts::{AlertConfig, AlertHistoryItem, CheckOutcome, ConfigError, DriftWatcher, WatcherStatus};
use crate::backend::{
    analytics::{
        CORRELATION_PATH, DATASET_INFO_PATH, DEFAULT_ALERT_DAYS, DEFAULT_EXPERIMENT,
        DEFAULT_HISTOGRAM_BINS, DEFAULT_RUNS_LIMIT, DISTRIBUTION_PATH, EXPERIMENTS_PATH,
        FEATURE_IMPORTANCE_PATH, RUNS_PATH, RUN_PATH, STATISTICS_PATH,
    },
    client::{EDA_DATA_PATH, MODEL_INFO_PATH, PRODUCTION_INFO_PATH},
    BaselineResponse, BatchPredictionOutput, ClientError, DriftAlertRecord, DriftInfo,
    FeatureStatistics, HealthStatus, MonitoringStats, PredictionOutput, ReloadResponse,
    SaveSyntheticRequest, SavedDataset, ServingClient, SyntheticDataset, SyntheticRequest,
};
use crate::prediction::{BatchPredictionInput, PredictionInput};

/// Application state shared across handlers
pub struct AppState {
    pub client: ServingClient,
    pub watcher: DriftWatcher,
    pub cache: ResponseCache,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Overview
// ============================================================================

#[derive(Serialize)]
pub struct OverviewResponse {
    /// Backend reachable, healthy and serving a loaded model
    pub backend_healthy: bool,
    pub backend: Option<HealthStatus>,
    pub drift: Option<DriftInfo>,
    pub stats: Option<MonitoringStats>,
    pub alerts: WatcherStatus,
    /// One message per section that could not be loaded
    pub errors: Vec<String>,
}

/// Everything the landing page shows, fetched concurrently. A failing
/// section is reported in `errors` without failing the others.
pub async fn overview(State(state): State<Arc<AppState>>) -> Json<OverviewResponse> {
    let threshold = state.watcher.config().threshold;

    let (health, drift, stats) = futures::join!(
        state.client.health(),
        state.client.drift_status(threshold),
        state.client.monitoring_stats(),
    );

    let mut errors = Vec::new();
    let backend = collect_section("health", health, &mut errors);
    let drift = collect_section("drift", drift, &mut errors);
    let stats = collect_section("stats", stats, &mut errors);

    Json(OverviewResponse {
        backend_healthy: backend.as_ref().is_some_and(HealthStatus::is_healthy),
        backend,
        drift,
        stats,
        alerts: state.watcher.status(),
        errors,
    })
}

fn collect_section<T>(
    name: &str,
    result: Result<T, ClientError>,
    errors: &mut Vec<String>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(section = name, error = %e, "Overview section unavailable");
            errors.push(format!("{}: {}", name, e));
            None
        }
    }
}

// ============================================================================
// Backend pass-through
// ============================================================================

pub async fn backend_health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthStatus>, ApiError> {
    Ok(Json(state.client.health().await?))
}

pub async fn model_info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    cached_json(&state.cache, MODEL_INFO_PATH, state.client.model_info()).await
}

pub async fn production_info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    cached_json(&state.cache, PRODUCTION_INFO_PATH, state.client.production_info()).await
}

pub async fn eda_data(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    cached_json(&state.cache, EDA_DATA_PATH, state.client.eda_data()).await
}

async fn cached_json<T, F>(
    cache: &ResponseCache,
    key: &str,
    fetch: F,
) -> Result<Json<serde_json::Value>, ApiError>
where
    T: Serialize,
    F: Future<Output = Result<T, ClientError>>,
{
    if let Some(value) = cache.get(key) {
        return Ok(Json(value));
    }

    let value = serde_json::to_value(fetch.await?)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    cache.insert(key, value.clone());

    Ok(Json(value))
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(input): Json<PredictionInput>,
) -> Result<Json<PredictionOutput>, ApiError> {
    Ok(Json(state.client.predict(&input).await?))
}

pub async fn predict_batch(
    State(state): State<Arc<AppState>>,
    Json(input): Json<BatchPredictionInput>,
) -> Result<Json<BatchPredictionOutput>, ApiError> {
    let output = state.client.predict_batch(&input).await?;

    let failed = output.failed().count();
    if failed > 0 {
        tracing::warn!(failed, total = output.count, "Batch prediction had failed records");
    }

    Ok(Json(output))
}

pub async fn monitoring_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MonitoringStats>, ApiError> {
    Ok(Json(state.client.monitoring_stats().await?))
}

pub async fn feature_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FeatureStatistics>, ApiError> {
    Ok(Json(state.client.feature_stats().await?))
}

#[derive(Deserialize)]
pub struct DriftQuery {
    pub threshold: Option<f64>,
}

/// Drift status, defaulting to the watcher's configured threshold
pub async fn drift(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DriftQuery>,
) -> Result<Json<DriftInfo>, ApiError> {
    let threshold = query
        .threshold
        .unwrap_or_else(|| state.watcher.config().threshold);

    Ok(Json(state.client.drift_status(threshold).await?))
}

pub async fn set_baseline(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BaselineResponse>, ApiError> {
    Ok(Json(state.client.set_baseline().await?))
}

pub async fn generate_synthetic(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SyntheticRequest>,
) -> Result<Json<SyntheticDataset>, ApiError> {
    Ok(Json(state.client.generate_synthetic(&request).await?))
}

pub async fn save_synthetic(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SaveSyntheticRequest>,
) -> Result<Json<SavedDataset>, ApiError> {
    Ok(Json(state.client.save_synthetic(&request).await?))
}

#[derive(Deserialize)]
pub struct AlertDaysQuery {
    pub days: Option<u32>,
}

/// Per-feature drift alerts kept by the backend
pub async fn drift_alerts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AlertDaysQuery>,
) -> Result<Json<Vec<DriftAlertRecord>>, ApiError> {
    let days = query.days.unwrap_or(DEFAULT_ALERT_DAYS);
    Ok(Json(state.client.drift_alerts(days).await?))
}

/// Reload the backend's production model and drop cached model documents
pub async fn reload_model(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReloadResponse>, ApiError> {
    let reloaded = state.client.reload_model().await?;
    state.cache.invalidate_all();

    tracing::info!(model_version = ?reloaded.model_version, "Backend model reloaded, cache cleared");
    Ok(Json(reloaded))
}

// ============================================================================
// Model registry
// ============================================================================

pub async fn experiments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    cached_json(&state.cache, EXPERIMENTS_PATH, state.client.experiments()).await
}

#[derive(Deserialize)]
pub struct RunsQuery {
    pub experiment: Option<String>,
    pub limit: Option<u32>,
}

pub async fn runs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let experiment = query.experiment.as_deref().unwrap_or(DEFAULT_EXPERIMENT);
    let limit = query.limit.unwrap_or(DEFAULT_RUNS_LIMIT);

    let key = format!("{}?experiment_name={}&limit={}", RUNS_PATH, experiment, limit);
    cached_json(&state.cache, &key, state.client.runs(experiment, limit)).await
}

pub async fn run_details(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let key = format!("{}/{}", RUN_PATH, run_id);
    cached_json(&state.cache, &key, state.client.run(&run_id)).await
}

// ============================================================================
// EDA
// ============================================================================

pub async fn dataset_info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    cached_json(&state.cache, DATASET_INFO_PATH, state.client.dataset_info()).await
}

#[derive(Deserialize)]
pub struct StatisticsQuery {
    pub feature: Option<String>,
}

pub async fn statistics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatisticsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let feature = query.feature.as_deref();
    let key = match feature {
        Some(feature) => format!("{}?feature={}", STATISTICS_PATH, feature),
        None => STATISTICS_PATH.to_string(),
    };

    cached_json(&state.cache, &key, state.client.statistics(feature)).await
}

#[derive(Deserialize)]
pub struct DistributionQuery {
    pub feature: String,
    pub bins: Option<u32>,
}

pub async fn distribution(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DistributionQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let bins = query.bins.unwrap_or(DEFAULT_HISTOGRAM_BINS);
    let key = format!("{}?feature={}&bins={}", DISTRIBUTION_PATH, query.feature, bins);

    cached_json(&state.cache, &key, state.client.distribution(&query.feature, bins)).await
}

pub async fn correlation(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    cached_json(&state.cache, CORRELATION_PATH, state.client.correlation()).await
}

pub async fn feature_importance(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    cached_json(&state.cache, FEATURE_IMPORTANCE_PATH, state.client.feature_importance()).await
}

// ============================================================================
// Alerts
// ============================================================================

pub async fn get_alert_config(State(state): State<Arc<AppState>>) -> Json<AlertConfig> {
    Json(state.watcher.config())
}

pub async fn update_alert_config(
    State(state): State<Arc<AppState>>,
    Json(config): Json<AlertConfig>,
) -> Result<Json<WatcherStatus>, ApiError> {
    state.watcher.update_config(config)?;
    Ok(Json(state.watcher.status()))
}

pub async fn alert_status(State(state): State<Arc<AppState>>) -> Json<WatcherStatus> {
    Json(state.watcher.status())
}

pub async fn alert_history(State(state): State<Arc<AppState>>) -> Json<Vec<AlertHistoryItem>> {
    Json(state.watcher.history())
}

pub async fn clear_alert_history(State(state): State<Arc<AppState>>) -> StatusCode {
    state.watcher.clear_history();
    StatusCode::NO_CONTENT
}

/// Manual "check now"
pub async fn trigger_check(State(state): State<Arc<AppState>>) -> Json<CheckOutcome> {
    Json(state.watcher.check_now().await)
}

// ============================================================================
// Stats
// ============================================================================

#[derive(Serialize)]
pub struct StatsResponse {
    pub cache: CacheStats,
    pub alerts: WatcherStatus,
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        cache: state.cache.stats(),
        alerts: state.watcher.status(),
    })
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    /// Non-2xx from the backend, passed through with its status
    Upstream { status: u16, message: String },
    BadGateway(String),
    Internal(String),
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Validation(_) | ClientError::InvalidRequest(_) => {
                ApiError::BadRequest(err.to_string())
            }
            ClientError::Api { status, detail } => ApiError::Upstream {
                status,
                message: detail,
            },
            ClientError::Network(_) | ClientError::Deserialization(_) => {
                ApiError::BadGateway(err.to_string())
            }
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Upstream { status, message } => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                message,
            ),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
