//! Feature vector assembly for the frozen classifier.
//!
//! The classifier was fitted against a fixed field order; this module is the
//! only place that order is spelled out. A record missing any required field
//! skips classification — it is never defaulted.

use thiserror::Error;

use crate::classify::{CategoricalField, ClassifierAdapter};
use crate::fusion::FusedRecord;

/// Width of the classifier's feature vector.
pub const FEATURE_COUNT: usize = 4;

/// Fixed-order numeric input to the classifier: texture code, elevation,
/// annual rainfall, hydrology code. The classifier is order-sensitive;
/// never reorder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

/// One or more required fields were absent or not numeric-convertible.
#[derive(Debug, Clone, Error)]
#[error("missing or unencodable feature(s): {}", fields.join(", "))]
pub struct MissingFeatureError {
    pub fields: Vec<String>,
}

/// Assemble the feature vector from a fused record. Categorical fields pass
/// through the adapter's fitted encoders; numeric fields must parse as
/// floating point. Every failing field is named in the error.
pub fn build(
    record: &FusedRecord,
    encoder: &dyn ClassifierAdapter,
) -> Result<FeatureVector, MissingFeatureError> {
    let mut missing = Vec::new();

    let texture = record
        .soil
        .as_ref()
        .and_then(|a| a.get("TEXTURE"))
        .and_then(|v| v.as_text())
        .and_then(|label| encoder.encode(CategoricalField::Texture, label));
    if texture.is_none() {
        missing.push("soil_data.TEXTURE".to_string());
    }

    let elevation = record
        .elevation
        .as_ref()
        .and_then(|a| a.get("Elevation"))
        .and_then(|v| v.as_f64());
    if elevation.is_none() {
        missing.push("elevation_data.Elevation".to_string());
    }

    let annual_rainfall = record
        .rainfall
        .as_ref()
        .and_then(|a| a.get("ANN"))
        .and_then(|v| v.as_f64());
    if annual_rainfall.is_none() {
        missing.push("rainfall_data.ANN".to_string());
    }

    let hydrology = record
        .hydrology
        .as_ref()
        .and_then(|a| a.get("CATEGORY"))
        .and_then(|v| v.as_text())
        .and_then(|label| encoder.encode(CategoricalField::HydrologyCategory, label));
    if hydrology.is_none() {
        missing.push("hydrology_data.CATEGORY".to_string());
    }

    if !missing.is_empty() {
        return Err(MissingFeatureError { fields: missing });
    }

    // Unwraps are guarded by the emptiness check above.
    Ok(FeatureVector([
        texture.unwrap(),
        elevation.unwrap(),
        annual_rainfall.unwrap(),
        hydrology.unwrap(),
    ]))
}
