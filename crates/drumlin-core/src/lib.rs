//! drumlin-core: fused environmental lookup over Irish national-grid
//! coordinates.
//!
//! A request flows transform → boundary gate → four parallel layer queries
//! (soil and hydrology polygons, elevation and rainfall point grids) →
//! attribute fusion → feature vector → frozen cluster classifier. Layers
//! are loaded and indexed once at startup and shared immutably by
//! concurrent requests; per-layer failures degrade the record instead of
//! failing it.

pub mod boundary;
pub mod classify;
pub mod crs;
pub mod dataset;
pub mod features;
pub mod fusion;
pub mod layers;
pub mod response;
pub mod service;

pub use boundary::{BoundaryGate, BoundaryRegion};
pub use classify::{CategoricalField, ClassifierAdapter, ClusterArtifact, ClusterLabel};
pub use crs::{Coordinate, Crs, TransformError};
pub use dataset::DatasetError;
pub use features::{FeatureVector, MissingFeatureError, FEATURE_COUNT};
pub use fusion::{FusedRecord, LayerFailure, LayerKind};
pub use layers::{
    AttrValue, Attributes, LayerQueryError, PointGridIndex, PointSample, PolygonFeature,
    PolygonLayerIndex,
};
pub use response::LookupResponse;
pub use service::{LookupError, LookupService, LookupServiceBuilder};
