//! Wire types for the serving backend's HTTP API

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::prediction::ValidationError;

/// `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
    pub scaler_loaded: bool,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub model_stage: Option<String>,
    pub uptime_seconds: f64,
    pub total_predictions: u64,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy" && self.model_loaded
    }
}

/// `GET /model/info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub model_version: String,
    pub model_stage: String,
    pub model_type: String,
    pub features: Vec<String>,
    pub n_features: usize,
    #[serde(default)]
    pub metrics: Option<serde_json::Map<String, serde_json::Value>>,
}

/// `GET /model/production-info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionModelInfo {
    pub model_name: String,
    pub model_version: String,
    pub model_stage: String,
    pub model_type: String,
    pub features: Vec<String>,
    pub n_features: usize,
    pub all_features: Vec<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub trained_at: Option<String>,
    #[serde(default)]
    pub registered_at: Option<String>,
    pub model_path: String,
    #[serde(default)]
    pub deployment_date: Option<String>,
    pub uptime_hours: f64,
    pub total_predictions: u64,
}

/// `POST /predict` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutput {
    pub prediction: f64,
    pub model_name: String,
    pub model_version: String,
    pub model_stage: String,
    /// Milliseconds, as measured by the backend
    pub inference_time: f64,
    pub features_used: Vec<String>,
}

/// One record of a batch response; failed records carry `error` instead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictionItem {
    pub index: usize,
    #[serde(default)]
    pub prediction: Option<f64>,
    #[serde(default)]
    pub inference_time_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `POST /predict/batch` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPredictionOutput {
    pub predictions: Vec<BatchPredictionItem>,
    pub count: usize,
    pub model_version: String,
    pub total_inference_time: f64,
    pub avg_inference_time: f64,
}

impl BatchPredictionOutput {
    pub fn failed(&self) -> impl Iterator<Item = &BatchPredictionItem> {
        self.predictions.iter().filter(|p| p.error.is_some())
    }
}

/// `GET /monitoring/stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringStats {
    pub total_predictions: u64,
    pub uptime_hours: f64,
    pub predictions_per_hour: f64,
    #[serde(default)]
    pub prediction_stats: BTreeMap<String, f64>,
    #[serde(default)]
    pub inference_stats: BTreeMap<String, f64>,
    #[serde(default)]
    pub last_prediction_time: Option<String>,
    #[serde(default)]
    pub recent_predictions: Vec<f64>,
}

/// `GET /monitoring/drift`
///
/// Only the three leading fields drive the watcher; the rest are shown as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftInfo {
    #[serde(default)]
    pub baseline_configured: bool,
    #[serde(default)]
    pub drift_detected: bool,
    #[serde(default)]
    pub drift_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_mean: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_mean: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `POST /monitoring/baseline`
///
/// The watcher ignores the body; every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaselineResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub baseline_predictions: Option<u64>,
    #[serde(default)]
    pub baseline_mean: Option<f64>,
    #[serde(default)]
    pub baseline_std: Option<f64>,
}

pub const MIN_SYNTHETIC_SAMPLES: u32 = 10;
pub const MAX_SYNTHETIC_SAMPLES: u32 = 1000;
pub const MAX_DRIFT_FACTOR: f64 = 2.0;

/// Synthetic data generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticRequest {
    pub n_samples: u32,
    /// 0 = no drift, 1 = moderate, 2 = severe
    pub drift_factor: f64,
    /// Features the drift applies to; all numeric features when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
}

impl Default for SyntheticRequest {
    fn default() -> Self {
        Self {
            n_samples: 100,
            drift_factor: 0.0,
            features: None,
        }
    }
}

impl SyntheticRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(MIN_SYNTHETIC_SAMPLES..=MAX_SYNTHETIC_SAMPLES).contains(&self.n_samples) {
            return Err(ValidationError::Parameter {
                field: "n_samples",
                value: self.n_samples as f64,
                min: MIN_SYNTHETIC_SAMPLES as f64,
                max: MAX_SYNTHETIC_SAMPLES as f64,
            });
        }

        if !self.drift_factor.is_finite() || !(0.0..=MAX_DRIFT_FACTOR).contains(&self.drift_factor)
        {
            return Err(ValidationError::Parameter {
                field: "drift_factor",
                value: self.drift_factor,
                min: 0.0,
                max: MAX_DRIFT_FACTOR,
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticMetadata {
    pub n_samples: u32,
    pub drift_factor: f64,
    #[serde(default)]
    pub drift_features: Vec<String>,
    pub timestamp: String,
}

/// Generated columns keyed by feature name
///
/// Accepts both the nested `{data, metadata}` document and the flat one
/// the backend returns (`{data, n_samples, drift_factor, drift_features,
/// generated_at}`); always serializes nested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SyntheticWire")]
pub struct SyntheticDataset {
    pub data: BTreeMap<String, Vec<f64>>,
    pub metadata: SyntheticMetadata,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SyntheticWire {
    Nested {
        data: BTreeMap<String, Vec<f64>>,
        metadata: SyntheticMetadata,
    },
    Flat {
        data: BTreeMap<String, Vec<f64>>,
        n_samples: u32,
        drift_factor: f64,
        #[serde(default)]
        drift_features: Vec<String>,
        generated_at: String,
    },
}

impl From<SyntheticWire> for SyntheticDataset {
    fn from(wire: SyntheticWire) -> Self {
        match wire {
            SyntheticWire::Nested { data, metadata } => Self { data, metadata },
            SyntheticWire::Flat {
                data,
                n_samples,
                drift_factor,
                drift_features,
                generated_at,
            } => Self {
                data,
                metadata: SyntheticMetadata {
                    n_samples,
                    drift_factor,
                    drift_features,
                    timestamp: generated_at,
                },
            },
        }
    }
}

/// Body accepted by the dashboard for saving a generated dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveSyntheticRequest {
    pub name: String,
    pub data: BTreeMap<String, Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedDataset {
    #[serde(default)]
    pub message: Option<String>,
    pub filename: String,
    #[serde(default)]
    pub path: Option<String>,
    pub rows: usize,
    pub columns: usize,
}

/// Per-feature summary of recent prediction inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    #[serde(default)]
    pub mean: f64,
    #[serde(default)]
    pub std: f64,
    #[serde(default)]
    pub min: f64,
    #[serde(default)]
    pub max: f64,
    /// Present once a baseline is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drift_score: Option<f64>,
    #[serde(default)]
    pub drift_detected: bool,
}

/// `GET /monitoring/features`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureStatistics {
    pub features_tracked: usize,
    #[serde(default)]
    pub statistics: BTreeMap<String, FeatureStats>,
    #[serde(default)]
    pub baseline_configured: bool,
}

impl FeatureStatistics {
    /// Names of the features currently flagged as drifting
    pub fn drifting(&self) -> Vec<&str> {
        self.statistics
            .iter()
            .filter(|(_, stats)| stats.drift_detected)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

pub const MAX_RUNS_LIMIT: u32 = 100;
pub const MAX_ALERT_DAYS: u32 = 30;

/// One record of `GET /api/v1/drift/alerts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftAlertRecord {
    pub id: String,
    pub timestamp: String,
    pub severity: String,
    pub feature: String,
    pub drift_score: f64,
    pub status: String,
    #[serde(default)]
    pub recommendation: Option<String>,
}

/// `POST /admin/reload`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReloadResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub model_version: Option<serde_json::Value>,
    #[serde(default)]
    pub test_rmse: Option<f64>,
    #[serde(default)]
    pub test_r2: Option<f64>,
    #[serde(default)]
    pub features_count: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drift_info_defaults() {
        let info: DriftInfo =
            serde_json::from_str(r#"{"message": "No data available"}"#).unwrap();
        assert!(!info.baseline_configured);
        assert!(!info.drift_detected);
        assert_eq!(info.drift_score, None);
        assert_eq!(info.message.as_deref(), Some("No data available"));
    }

    #[test]
    fn test_drift_info_with_extras() {
        let info: DriftInfo = serde_json::from_value(serde_json::json!({
            "baseline_configured": true,
            "drift_detected": true,
            "drift_score": 3.1,
            "current_mean": 25.4,
            "baseline_mean": 22.1,
            "threshold": 2.0,
            "recommendation": null
        }))
        .unwrap();

        assert!(info.drift_detected);
        assert_eq!(info.drift_score, Some(3.1));
        assert_eq!(info.threshold, Some(2.0));
        assert_eq!(info.recommendation, None);
    }

    #[test]
    fn test_synthetic_request_bounds() {
        assert!(SyntheticRequest::default().validate().is_ok());

        let req = SyntheticRequest {
            n_samples: 5,
            ..Default::default()
        };
        assert!(matches!(
            req.validate(),
            Err(ValidationError::Parameter { field: "n_samples", .. })
        ));

        let req = SyntheticRequest {
            drift_factor: 2.5,
            ..Default::default()
        };
        assert!(matches!(
            req.validate(),
            Err(ValidationError::Parameter { field: "drift_factor", .. })
        ));
    }

    #[test]
    fn test_synthetic_flat_response() {
        let dataset: SyntheticDataset = serde_json::from_value(serde_json::json!({
            "data": {"RM": [6.1, 6.4]},
            "n_samples": 2,
            "drift_factor": 1.0,
            "drift_features": ["RM"],
            "generated_at": "2024-05-01T10:00:00"
        }))
        .unwrap();

        assert_eq!(dataset.data["RM"], vec![6.1, 6.4]);
        assert_eq!(dataset.metadata.n_samples, 2);
        assert_eq!(dataset.metadata.drift_features, vec!["RM".to_string()]);
        assert_eq!(dataset.metadata.timestamp, "2024-05-01T10:00:00");

        // Re-served nested
        let json = serde_json::to_value(&dataset).unwrap();
        assert_eq!(json["metadata"]["drift_factor"], 1.0);
        assert!(json.get("generated_at").is_none());
    }

    #[test]
    fn test_synthetic_nested_response() {
        let dataset: SyntheticDataset = serde_json::from_value(serde_json::json!({
            "data": {"LSTAT": [12.0]},
            "metadata": {
                "n_samples": 1,
                "drift_factor": 0.0,
                "timestamp": "2024-05-01T10:00:00Z"
            }
        }))
        .unwrap();

        assert!(dataset.metadata.drift_features.is_empty());
        assert_eq!(dataset.metadata.timestamp, "2024-05-01T10:00:00Z");
    }

    #[test]
    fn test_feature_statistics_drifting() {
        let stats: FeatureStatistics = serde_json::from_value(serde_json::json!({
            "features_tracked": 2,
            "statistics": {
                "RM": {"mean": 6.2, "std": 0.7, "min": 4.0, "max": 8.7,
                       "drift_score": 3.4, "drift_detected": true},
                "LSTAT": {"mean": 12.0, "std": 7.0, "min": 1.7, "max": 37.9}
            },
            "baseline_configured": true
        }))
        .unwrap();

        assert_eq!(stats.drifting(), vec!["RM"]);
        assert_eq!(stats.statistics["LSTAT"].drift_score, None);
    }

    #[test]
    fn test_batch_failed_records() {
        let out: BatchPredictionOutput = serde_json::from_value(serde_json::json!({
            "predictions": [
                {"index": 0, "prediction": 24.1, "inference_time_ms": 1.2},
                {"index": 1, "prediction": null, "error": "bad input"}
            ],
            "count": 2,
            "model_version": "v3",
            "total_inference_time": 4.0,
            "avg_inference_time": 2.0
        }))
        .unwrap();

        let failed: Vec<_> = out.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].index, 1);
    }
}
