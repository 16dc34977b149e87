//! Multi-layer fusion: one record per request, tolerating per-layer absence.

use serde::Serialize;

use crate::crs::Coordinate;
use crate::layers::{Attributes, PointGridIndex, PolygonLayerIndex};

/// The four environmental layers a request fuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Soil,
    Hydrology,
    Elevation,
    Rainfall,
}

impl LayerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::Soil => "soil",
            LayerKind::Hydrology => "hydrology",
            LayerKind::Elevation => "elevation",
            LayerKind::Rainfall => "rainfall",
        }
    }
}

/// A recorded non-fatal per-layer failure.
#[derive(Debug, Clone, Serialize)]
pub struct LayerFailure {
    pub layer: LayerKind,
    pub reason: String,
}

/// Per-request aggregate of the four independent layer lookups. Sub-records
/// are independently nullable; absence is explicit, never defaulted.
#[derive(Debug, Clone, Default)]
pub struct FusedRecord {
    pub soil: Option<Attributes>,
    pub hydrology: Option<Attributes>,
    pub elevation: Option<Attributes>,
    pub rainfall: Option<Attributes>,
    pub failures: Vec<LayerFailure>,
}

/// Query all four layers for `coord` and merge the results. Each query is
/// isolated: a failure or empty result in one layer never aborts the other
/// three. The four reads are independent over immutable indices and run
/// concurrently. The boundary gate has already accepted `coord` by the time
/// this runs.
pub fn fuse(
    soil: &PolygonLayerIndex,
    hydrology: &PolygonLayerIndex,
    elevation: &PointGridIndex,
    rainfall: &PointGridIndex,
    coord: &Coordinate,
) -> FusedRecord {
    let ((soil_hit, hydrology_hit), (elevation_hit, rainfall_hit)) = rayon::join(
        || rayon::join(|| soil.resolve(coord).cloned(), || hydrology.resolve(coord).cloned()),
        || {
            rayon::join(
                || elevation.nearest(coord).map(Clone::clone),
                || rainfall.nearest(coord).map(Clone::clone),
            )
        },
    );

    let mut record = FusedRecord::default();

    match soil_hit {
        Some(attrs) => record.soil = Some(attrs),
        None => record.record_failure(LayerKind::Soil, "no features in layer"),
    }
    match hydrology_hit {
        Some(attrs) => record.hydrology = Some(attrs),
        None => record.record_failure(LayerKind::Hydrology, "no features in layer"),
    }
    match elevation_hit {
        Ok(attrs) => record.elevation = Some(attrs),
        Err(e) => record.record_failure(LayerKind::Elevation, &e.to_string()),
    }
    match rainfall_hit {
        Ok(attrs) => record.rainfall = Some(attrs),
        Err(e) => record.record_failure(LayerKind::Rainfall, &e.to_string()),
    }

    record
}

impl FusedRecord {
    fn record_failure(&mut self, layer: LayerKind, reason: &str) {
        tracing::warn!(layer = layer.as_str(), reason, "layer query failed");
        self.failures.push(LayerFailure { layer, reason: reason.to_string() });
    }

    /// All four sub-records resolved.
    pub fn is_complete(&self) -> bool {
        self.soil.is_some()
            && self.hydrology.is_some()
            && self.elevation.is_some()
            && self.rainfall.is_some()
    }
}
