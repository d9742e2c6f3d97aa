//! Model registry and exploratory-analysis endpoints (`/api/v1/...`)
//!
//! Registry and EDA documents are passed through as JSON; only the
//! parameters are checked here.

use serde_json::Value;

use super::client::{ClientError, ServingClient};
use super::models::{DriftAlertRecord, MAX_ALERT_DAYS, MAX_RUNS_LIMIT};
use crate::prediction::ValidationError;

pub const EXPERIMENTS_PATH: &str = "/api/v1/mlflow/experiments";
pub const RUNS_PATH: &str = "/api/v1/mlflow/runs";
pub const RUN_PATH: &str = "/api/v1/mlflow/run";
pub const DATASET_INFO_PATH: &str = "/api/v1/eda/dataset-info";
pub const STATISTICS_PATH: &str = "/api/v1/eda/statistics";
pub const DISTRIBUTION_PATH: &str = "/api/v1/eda/distribution";
pub const CORRELATION_PATH: &str = "/api/v1/eda/correlation";
pub const FEATURE_IMPORTANCE_PATH: &str = "/api/v1/eda/feature-importance";
pub const DRIFT_ALERTS_PATH: &str = "/api/v1/drift/alerts";

pub const DEFAULT_EXPERIMENT: &str = "housing-price-prediction";
pub const DEFAULT_RUNS_LIMIT: u32 = 10;
pub const DEFAULT_HISTOGRAM_BINS: u32 = 30;
pub const DEFAULT_ALERT_DAYS: u32 = 7;

impl ServingClient {
    /// All registry experiments
    pub async fn experiments(&self) -> Result<Value, ClientError> {
        self.send(self.get(EXPERIMENTS_PATH)).await
    }

    /// Most recent runs of an experiment, newest first
    pub async fn runs(&self, experiment: &str, limit: u32) -> Result<Value, ClientError> {
        if experiment.trim().is_empty() {
            return Err(ClientError::InvalidRequest(
                "Experiment name must not be empty".to_string(),
            ));
        }
        check_range("limit", limit, MAX_RUNS_LIMIT)?;

        self.send(
            self.get(RUNS_PATH)
                .query(&[("experiment_name", experiment)])
                .query(&[("limit", limit)]),
        )
        .await
    }

    /// Metrics, params and tags of a single run
    pub async fn run(&self, run_id: &str) -> Result<Value, ClientError> {
        let valid = !run_id.is_empty()
            && run_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ClientError::InvalidRequest(format!(
                "Invalid run id: {:?}",
                run_id
            )));
        }

        self.send(self.get(&format!("{}/{}", RUN_PATH, run_id)))
            .await
    }

    pub async fn dataset_info(&self) -> Result<Value, ClientError> {
        self.send(self.get(DATASET_INFO_PATH)).await
    }

    /// Descriptive statistics for every column, or for one feature
    pub async fn statistics(&self, feature: Option<&str>) -> Result<Value, ClientError> {
        let mut request = self.get(STATISTICS_PATH);
        if let Some(feature) = feature {
            request = request.query(&[("feature", feature)]);
        }

        self.send(request).await
    }

    /// Histogram of one feature
    pub async fn distribution(&self, feature: &str, bins: u32) -> Result<Value, ClientError> {
        if feature.trim().is_empty() {
            return Err(ClientError::InvalidRequest(
                "Feature name must not be empty".to_string(),
            ));
        }
        if bins == 0 {
            return Err(ClientError::InvalidRequest(
                "Histogram needs at least one bin".to_string(),
            ));
        }

        self.send(
            self.get(DISTRIBUTION_PATH)
                .query(&[("feature", feature)])
                .query(&[("bins", bins)]),
        )
        .await
    }

    pub async fn correlation(&self) -> Result<Value, ClientError> {
        self.send(self.get(CORRELATION_PATH)).await
    }

    pub async fn feature_importance(&self) -> Result<Value, ClientError> {
        self.send(self.get(FEATURE_IMPORTANCE_PATH)).await
    }

    /// Per-feature drift alerts recorded by the backend over the last `days`
    pub async fn drift_alerts(&self, days: u32) -> Result<Vec<DriftAlertRecord>, ClientError> {
        check_range("days", days, MAX_ALERT_DAYS)?;

        self.send(self.get(DRIFT_ALERTS_PATH).query(&[("days", days)]))
            .await
    }
}

fn check_range(field: &'static str, value: u32, max: u32) -> Result<(), ValidationError> {
    if (1..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::Parameter {
            field,
            value: value as f64,
            min: 1.0,
            max: max as f64,
        })
    }
}
