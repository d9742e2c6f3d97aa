use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Accepted range for a single model feature
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    /// Required features must be present; optional ones default to 0.0 server-side
    pub required: bool,
}

impl FeatureSpec {
    const fn required(name: &'static str, min: f64, max: f64) -> Self {
        Self {
            name,
            min,
            max,
            required: true,
        }
    }

    const fn optional(name: &'static str, min: f64, max: f64) -> Self {
        Self {
            name,
            min,
            max,
            required: false,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// All features the prediction endpoint understands, in scaler order
pub const FEATURES: [FeatureSpec; 13] = [
    FeatureSpec::required("CRIM", 0.0, 100.0),
    FeatureSpec::optional("ZN", 0.0, 100.0),
    FeatureSpec::optional("INDUS", 0.0, 30.0),
    FeatureSpec::optional("CHAS", 0.0, 1.0),
    FeatureSpec::required("NOX", 0.3, 1.0),
    FeatureSpec::required("RM", 3.0, 9.0),
    FeatureSpec::required("AGE", 0.0, 100.0),
    FeatureSpec::required("DIS", 0.5, 12.0),
    FeatureSpec::required("RAD", 1.0, 24.0),
    FeatureSpec::required("TAX", 100.0, 800.0),
    FeatureSpec::required("PTRATIO", 10.0, 25.0),
    FeatureSpec::required("B", 0.0, 400.0),
    FeatureSpec::required("LSTAT", 0.0, 40.0),
];

/// Named numeric features for a single prediction
///
/// Serializes as a flat JSON object, which is what `POST /predict` expects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredictionInput {
    features: BTreeMap<String, f64>,
}

impl PredictionInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a feature value
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.features.insert(name.into(), value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.features.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }

    pub fn features(&self) -> &BTreeMap<String, f64> {
        &self.features
    }

    /// A known-good record, used to prefill the interactive tester
    pub fn example() -> Self {
        Self::new()
            .with("CRIM", 0.00632)
            .with("ZN", 18.0)
            .with("INDUS", 2.31)
            .with("CHAS", 0.0)
            .with("NOX", 0.538)
            .with("RM", 6.575)
            .with("AGE", 65.2)
            .with("DIS", 4.09)
            .with("RAD", 1.0)
            .with("TAX", 296.0)
            .with("PTRATIO", 15.3)
            .with("B", 396.9)
            .with("LSTAT", 4.98)
    }

    /// Check required features and ranges.
    ///
    /// Missing features are reported together; otherwise the first bad value
    /// in scaler order is returned. Names not in [`FEATURES`] pass through.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let missing: Vec<String> = FEATURES
            .iter()
            .filter(|spec| spec.required && !self.features.contains_key(spec.name))
            .map(|spec| spec.name.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(ValidationError::MissingFeatures(missing));
        }

        for spec in FEATURES.iter() {
            let Some(&value) = self.features.get(spec.name) else {
                continue;
            };

            if !value.is_finite() {
                return Err(ValidationError::NotFinite {
                    feature: spec.name.to_string(),
                });
            }

            if !spec.contains(value) {
                return Err(ValidationError::OutOfRange {
                    feature: spec.name.to_string(),
                    value,
                    min: spec.min,
                    max: spec.max,
                });
            }
        }

        Ok(())
    }
}

impl From<BTreeMap<String, f64>> for PredictionInput {
    fn from(features: BTreeMap<String, f64>) -> Self {
        Self { features }
    }
}

/// Body for `POST /predict/batch`
///
/// Records are not range-checked: the backend reports per-record errors
/// in the batch response instead of failing the whole request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchPredictionInput {
    pub data: Vec<BTreeMap<String, f64>>,
}

impl BatchPredictionInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.data.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }
        Ok(())
    }
}

/// Client-side validation failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required features: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),

    #[error("{feature} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        feature: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{feature} must be a finite number")]
    NotFinite { feature: String },

    #[error("Batch must contain at least one record")]
    EmptyBatch,

    #[error("{field} = {value} is outside [{min}, {max}]")]
    Parameter {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}
