//! Prediction request inputs and client-side validation
//!
//! The serving backend validates features too, but checking them here lets
//! the dashboard reject an incomplete form without a round trip.

pub mod input;

pub use input::{
    BatchPredictionInput, FeatureSpec, PredictionInput, ValidationError, FEATURES,
};
