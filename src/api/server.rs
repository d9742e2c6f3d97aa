use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::cache::ResponseCache;
use super::handlers::{
    alert_history, alert_status, backend_health, clear_alert_history, correlation, dataset_info,
    distribution, drift, drift_alerts, eda_data, experiments, feature_importance, feature_stats,
    generate_synthetic, get_alert_config, health_check, model_info, monitoring_stats, overview,
    predict, predict_batch, production_info, reload_model, run_details, runs, save_synthetic,
    set_baseline, statistics, stats, trigger_check, update_alert_config, AppState,
};
use crate::alerts::{AlertConfig, DriftWatcher, Notifier, NotifyTarget};
use crate::backend::{BackendConfig, ServingClient};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub backend: BackendConfig,
    pub alerts: AlertConfig,
    pub notify_targets: Vec<NotifyTarget>,
    pub cache_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            backend: BackendConfig::default(),
            alerts: AlertConfig::default(),
            notify_targets: vec![NotifyTarget::Log],
            cache_ttl_secs: 300,
        }
    }
}

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        .route("/overview", get(overview))
        // Backend pass-through
        .route("/backend/health", get(backend_health))
        .route("/model/info", get(model_info))
        .route("/model/production-info", get(production_info))
        .route("/predict", post(predict))
        .route("/predict/batch", post(predict_batch))
        .route("/monitoring/stats", get(monitoring_stats))
        .route("/monitoring/features", get(feature_stats))
        .route("/drift", get(drift))
        .route("/drift/baseline", post(set_baseline))
        .route("/drift/alerts", get(drift_alerts))
        .route("/synthetic/generate", post(generate_synthetic))
        .route("/synthetic/save", post(save_synthetic))
        .route("/admin/reload", post(reload_model))
        // Model registry
        .route("/registry/experiments", get(experiments))
        .route("/registry/runs", get(runs))
        .route("/registry/runs/:run_id", get(run_details))
        // EDA reports
        .route("/eda/data", get(eda_data))
        .route("/eda/dataset-info", get(dataset_info))
        .route("/eda/statistics", get(statistics))
        .route("/eda/distribution", get(distribution))
        .route("/eda/correlation", get(correlation))
        .route("/eda/feature-importance", get(feature_importance))
        // Drift alerts
        .route(
            "/alerts/config",
            get(get_alert_config).put(update_alert_config),
        )
        .route("/alerts/status", get(alert_status))
        .route(
            "/alerts/history",
            get(alert_history).delete(clear_alert_history),
        )
        .route("/alerts/check", post(trigger_check))
        // Stats
        .route("/stats", get(stats))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let client = ServingClient::new(config.backend.clone())?;

    let notifier = Notifier::with_targets(config.notify_targets.clone());
    tracing::info!("Drift notifications go to {} target(s)", notifier.targets().len());

    let watcher = DriftWatcher::new(Arc::new(client.clone()), notifier, config.alerts.clone())?;
    watcher.start();

    if config.alerts.enabled {
        tracing::info!(
            "Drift alerts enabled: every {}s, threshold {}",
            config.alerts.check_interval_seconds,
            config.alerts.threshold
        );
    } else {
        tracing::info!("Drift alerts disabled until enabled via /alerts/config");
    }

    let state = Arc::new(AppState {
        client,
        watcher: watcher.clone(),
        cache: ResponseCache::with_config(64, Duration::from_secs(config.cache_ttl_secs)),
    });

    // Build router
    let app = build_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting driftwatch on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(watcher))
        .await?;

    tracing::info!("driftwatch stopped");
    Ok(())
}

async fn shutdown_signal(watcher: DriftWatcher) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }

    tracing::info!("Shutdown signal received, stopping drift watcher...");
    watcher.shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spawn_backend;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::util::ServiceExt;

    fn mock_backend(model_info_calls: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/health",
                get(|| async {
                    Json(serde_json::json!({
                        "status": "healthy",
                        "model_loaded": true,
                        "scaler_loaded": true,
                        "uptime_seconds": 5.0,
                        "total_predictions": 7
                    }))
                }),
            )
            .route(
                "/monitoring/drift",
                get(|| async {
                    Json(serde_json::json!({
                        "baseline_configured": true,
                        "drift_detected": true,
                        "drift_score": 3.1
                    }))
                }),
            )
            .route(
                "/monitoring/stats",
                get(|| async {
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        Json(serde_json::json!({"detail": "Model not loaded"})),
                    )
                }),
            )
            .route(
                "/model/info",
                get(move || {
                    let calls = Arc::clone(&model_info_calls);
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Json(serde_json::json!({
                            "model_name": "housing-price-production",
                            "model_version": "3",
                            "model_stage": "Production",
                            "model_type": "XGBRegressor",
                            "features": ["RM", "LSTAT"],
                            "n_features": 2
                        }))
                    }
                }),
            )
            .route(
                "/api/v1/mlflow/experiments",
                get(|| async {
                    Json(serde_json::json!([
                        {"experiment_id": "1", "name": "housing-price-prediction"}
                    ]))
                }),
            )
            .route(
                "/admin/reload",
                post(|| async {
                    Json(serde_json::json!({
                        "message": "Model reloaded successfully",
                        "model_version": "4",
                        "features_count": 10
                    }))
                }),
            )
            .route(
                "/predict",
                post(|| async {
                    Json(serde_json::json!({
                        "prediction": 24.3,
                        "model_name": "housing-price-production",
                        "model_version": "v3",
                        "model_stage": "Production",
                        "inference_time": 0.8,
                        "features_used": ["RM", "LSTAT"]
                    }))
                }),
            )
    }

    fn app_for(base_url: &str, alerts: AlertConfig) -> Router {
        let client = ServingClient::new(BackendConfig::new(base_url)).unwrap();
        let watcher =
            DriftWatcher::new(Arc::new(client.clone()), Notifier::new(), alerts).unwrap();

        build_router(Arc::new(AppState {
            client,
            watcher,
            cache: ResponseCache::new(),
        }))
    }

    async fn create_test_app() -> (Router, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let base_url = spawn_backend(mock_backend(Arc::clone(&calls))).await;
        (app_for(&base_url, AlertConfig::default()), calls)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _) = create_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_predict_roundtrip() {
        let (app, _) = create_test_app().await;

        let body = serde_json::to_value(crate::prediction::PredictionInput::example()).unwrap();
        let response = app
            .oneshot(json_request("POST", "/predict", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["prediction"], 24.3);
    }

    #[tokio::test]
    async fn test_predict_missing_fields() {
        let (app, _) = create_test_app().await;

        let response = app
            .oneshot(json_request("POST", "/predict", serde_json::json!({"RM": 6.0})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"]
            .as_str()
            .unwrap()
            .starts_with("Missing required features"));
    }

    #[tokio::test]
    async fn test_backend_error_passed_through() {
        let (app, _) = create_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/monitoring/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Model not loaded");
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let app = app_for("http://127.0.0.1:9", AlertConfig::default());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/backend/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_model_info_cached() {
        let (app, calls) = create_test_app().await;

        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .uri("/model/info")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reload_clears_cache() {
        let (app, calls) = create_test_app().await;

        let get_model_info = || {
            Request::builder()
                .uri("/model/info")
                .body(Body::empty())
                .unwrap()
        };

        app.clone().oneshot(get_model_info()).await.unwrap();
        app.clone().oneshot(get_model_info()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/reload")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["features_count"], 10);

        app.oneshot(get_model_info()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_registry_experiments() {
        let (app, _) = create_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/registry/experiments")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json[0]["name"], "housing-price-prediction");
    }

    #[tokio::test]
    async fn test_runs_limit_rejected() {
        let (app, _) = create_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/registry/runs?limit=500")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_overview_partial_failure() {
        let (app, _) = create_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/overview")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["backend"]["total_predictions"], 7);
        assert_eq!(json["backend_healthy"], true);
        assert_eq!(json["drift"]["drift_score"], 3.1);
        assert!(json["stats"].is_null());
        assert_eq!(json["errors"].as_array().unwrap().len(), 1);
        assert_eq!(json["alerts"]["state"], "disabled");
    }

    #[tokio::test]
    async fn test_alert_config_update() {
        let (app, _) = create_test_app().await;

        let config = serde_json::json!({
            "enabled": false,
            "threshold": 3.0,
            "checkIntervalSeconds": 120,
            "notifyOnDrift": true,
            "autoSetBaseline": true
        });
        let response = app
            .clone()
            .oneshot(json_request("PUT", "/alerts/config", config))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/alerts/config")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["threshold"], 3.0);
        assert_eq!(json["checkIntervalSeconds"], 120);
        assert_eq!(json["autoSetBaseline"], true);
    }

    #[tokio::test]
    async fn test_alert_config_rejects_invalid() {
        let (app, _) = create_test_app().await;

        let config = serde_json::json!({
            "enabled": true,
            "threshold": 2.0,
            "checkIntervalSeconds": 0,
            "notifyOnDrift": true,
            "autoSetBaseline": false
        });
        let response = app
            .oneshot(json_request("PUT", "/alerts/config", config))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_manual_check_records_drift() {
        let calls = Arc::new(AtomicUsize::new(0));
        let base_url = spawn_backend(mock_backend(calls)).await;
        let alerts = AlertConfig::default().with_enabled(true);
        let app = app_for(&base_url, alerts);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/alerts/check")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["outcome"], "drift_recorded");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/alerts/history")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        let history = json.as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["type"], "drift");
        assert_eq!(history[0]["driftScore"], 3.1);
        assert!(history[0]["message"].as_str().unwrap().contains("3.10"));
    }

    #[tokio::test]
    async fn test_manual_check_when_disabled() {
        let (app, _) = create_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/alerts/check")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["outcome"], "disabled");
    }
}
