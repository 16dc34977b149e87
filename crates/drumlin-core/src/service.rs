//! Pipeline orchestrator: transform → boundary gate → four-layer fusion →
//! feature vector → classification.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::boundary::BoundaryGate;
use crate::classify::{ClassifierAdapter, ClusterArtifact};
use crate::crs::{Coordinate, Crs, TransformError};
use crate::dataset::{
    self, DatasetError, ELEVATION_COLUMNS, RAINFALL_COLUMNS,
};
use crate::features;
use crate::fusion::{self, FusedRecord};
use crate::layers::{PointGridIndex, PolygonLayerIndex};
use crate::response::LookupResponse;

/// Request-fatal failures. Per-layer failures never appear here; they
/// surface as null sub-records in the response instead.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("coordinate ({easting}, {northing}) is outside the boundary")]
    OutOfBoundary { easting: f64, northing: f64 },
}

/// The assembled pipeline. Stateless per request; indices are built once
/// and shared by concurrent requests without locks.
pub struct LookupService {
    gate: BoundaryGate,
    soil: PolygonLayerIndex,
    hydrology: PolygonLayerIndex,
    elevation: PointGridIndex,
    rainfall: PointGridIndex,
    classifier: Box<dyn ClassifierAdapter>,
}

impl LookupService {
    /// Assemble a service from already-built parts. Dataset-backed
    /// construction goes through [`LookupServiceBuilder`].
    pub fn new(
        gate: BoundaryGate,
        soil: PolygonLayerIndex,
        hydrology: PolygonLayerIndex,
        elevation: PointGridIndex,
        rainfall: PointGridIndex,
        classifier: Box<dyn ClassifierAdapter>,
    ) -> Self {
        Self { gate, soil, hydrology, elevation, rainfall, classifier }
    }

    /// Resolve one coordinate. Reprojection happens exactly once, before any
    /// lookup; a boundary rejection short-circuits with no layer queries.
    pub fn lookup(
        &self,
        easting: f64,
        northing: f64,
        crs: Crs,
    ) -> Result<LookupResponse, LookupError> {
        let coord = Coordinate::new(easting, northing, crs).to_crs(self.gate.crs())?;

        if !self.gate.contains(&coord) {
            tracing::debug!(easting = coord.easting, northing = coord.northing, "boundary rejection");
            return Err(LookupError::OutOfBoundary {
                easting: coord.easting,
                northing: coord.northing,
            });
        }
        if let Some(region) = self.gate.region(&coord) {
            tracing::debug!(region, "boundary accepted");
        }

        let record =
            fusion::fuse(&self.soil, &self.hydrology, &self.elevation, &self.rainfall, &coord);
        Ok(self.classify(record))
    }

    /// Total layer queries served across all four indices. Diagnostic
    /// counter; a boundary rejection must leave it untouched.
    pub fn total_layer_queries(&self) -> usize {
        self.soil.query_count()
            + self.hydrology.query_count()
            + self.elevation.query_count()
            + self.rainfall.query_count()
    }

    /// Map a fused record to the response, classifying only when every
    /// required feature resolved.
    fn classify(&self, record: FusedRecord) -> LookupResponse {
        let (cluster_prediction, cluster_prediction_error) =
            match features::build(&record, self.classifier.as_ref()) {
                Ok(vector) => {
                    let scaled = self.classifier.scale(vector.0);
                    (Some(self.classifier.predict(scaled)), None)
                }
                Err(e) => {
                    tracing::debug!(error = %e, "classification skipped");
                    (None, Some(e.to_string()))
                }
            };

        LookupResponse {
            boundary_ok: true,
            soil_data: record.soil,
            hydrology_data: record.hydrology,
            elevation_data: record.elevation,
            rainfall_data: record.rainfall,
            cluster_prediction,
            cluster_prediction_error,
        }
    }
}

/// Explicit one-time construction: loads every layer, builds every index,
/// and fails fast when any backing store is unavailable.
pub struct LookupServiceBuilder {
    data_dir: PathBuf,
    artifact_path: PathBuf,
    boundary_crs: Crs,
}

impl LookupServiceBuilder {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let artifact_path = data_dir.join("cluster_classifier.json");
        Self { data_dir, artifact_path, boundary_crs: Crs::IrishGrid }
    }

    /// Override the classifier artifact location (default
    /// `<data_dir>/cluster_classifier.json`).
    pub fn artifact_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact_path = path.into();
        self
    }

    pub fn build(self) -> Result<LookupService, DatasetError> {
        let dir: &Path = &self.data_dir;

        let boundary = dataset::load_boundary_regions(&dir.join("boundary_data.csv"))?;
        let soil = dataset::load_polygon_features(&dir.join("soil_data.csv"))?;
        let hydrology = dataset::load_polygon_features(&dir.join("hydrology_data.csv"))?;
        let elevation =
            dataset::load_point_samples(&dir.join("elevation_data.csv"), ELEVATION_COLUMNS)?;
        let rainfall =
            dataset::load_point_samples(&dir.join("rainfall_data.csv"), RAINFALL_COLUMNS)?;
        let artifact = ClusterArtifact::from_path(&self.artifact_path)?;

        Ok(LookupService::new(
            BoundaryGate::new(self.boundary_crs, boundary),
            PolygonLayerIndex::build("soil", soil),
            PolygonLayerIndex::build("hydrology", hydrology),
            PointGridIndex::build("elevation", elevation),
            PointGridIndex::build("rainfall", rainfall),
            Box::new(artifact),
        ))
    }
}
