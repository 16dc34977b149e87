//! Narrow interface over the frozen cluster classifier.
//!
//! The model, its label encoders and its scaler are versioned artifacts
//! fitted outside this crate; the core only encodes categoricals, scales
//! the assembled vector, and asks for a label. Model internals are never
//! inspected here.

use std::path::Path;

use serde::Deserialize;

use crate::dataset::DatasetError;
use crate::features::FEATURE_COUNT;

/// Cluster identifier produced by the classifier. Non-negative by type.
pub type ClusterLabel = u32;

/// The categorical slots of the feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoricalField {
    Texture,
    HydrologyCategory,
}

/// What the fusion pipeline needs from a frozen classifier.
pub trait ClassifierAdapter: Send + Sync {
    /// Encoder code for a categorical label, `None` when the label was not
    /// seen at fit time.
    fn encode(&self, field: CategoricalField, label: &str) -> Option<f64>;

    /// Apply the fitted scaler to a raw feature vector.
    fn scale(&self, vector: [f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT];

    /// Score an already-scaled feature vector into a cluster label.
    fn predict(&self, scaled: [f64; FEATURE_COUNT]) -> ClusterLabel;
}

/// Serialized form of the fitted artifact: encoder class lists (index =
/// code, mirroring a fitted label encoder), standard-scaler parameters per
/// vector slot, and per-cluster centroids in scaled feature space.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterArtifact {
    pub version: u32,
    texture_classes: Vec<String>,
    hydrology_classes: Vec<String>,
    scaler_mean: [f64; FEATURE_COUNT],
    scaler_scale: [f64; FEATURE_COUNT],
    centroids: Vec<[f64; FEATURE_COUNT]>,
}

impl ClusterArtifact {
    pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path).map_err(|e| DatasetError::BadArtifact {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let artifact: ClusterArtifact =
            serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| {
                DatasetError::BadArtifact {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                }
            })?;
        artifact.validate().map_err(|reason| DatasetError::BadArtifact {
            path: path.display().to_string(),
            reason,
        })?;
        tracing::info!(
            path = %path.display(),
            version = artifact.version,
            clusters = artifact.centroids.len(),
            "loaded classifier artifact"
        );
        Ok(artifact)
    }

    fn validate(&self) -> Result<(), String> {
        if self.centroids.is_empty() {
            return Err("no cluster centroids".to_string());
        }
        if self.texture_classes.is_empty() || self.hydrology_classes.is_empty() {
            return Err("empty encoder class list".to_string());
        }
        if self.scaler_scale.iter().any(|&s| s == 0.0 || !s.is_finite()) {
            return Err("degenerate scaler scale".to_string());
        }
        Ok(())
    }
}

impl ClassifierAdapter for ClusterArtifact {
    fn encode(&self, field: CategoricalField, label: &str) -> Option<f64> {
        let classes = match field {
            CategoricalField::Texture => &self.texture_classes,
            CategoricalField::HydrologyCategory => &self.hydrology_classes,
        };
        classes.iter().position(|c| c == label).map(|i| i as f64)
    }

    fn scale(&self, vector: [f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        let mut scaled = [0.0; FEATURE_COUNT];
        for i in 0..FEATURE_COUNT {
            scaled[i] = (vector[i] - self.scaler_mean[i]) / self.scaler_scale[i];
        }
        scaled
    }

    fn predict(&self, scaled: [f64; FEATURE_COUNT]) -> ClusterLabel {
        // Nearest centroid; ties go to the lowest cluster id.
        let mut best = 0usize;
        let mut best_d2 = f64::INFINITY;
        for (i, centroid) in self.centroids.iter().enumerate() {
            let d2: f64 = centroid
                .iter()
                .zip(scaled.iter())
                .map(|(c, v)| (c - v) * (c - v))
                .sum();
            if d2 < best_d2 {
                best = i;
                best_d2 = d2;
            }
        }
        best as ClusterLabel
    }
}
