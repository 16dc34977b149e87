//! Scattered point layer index: nearest sample by euclidean distance.

use std::sync::atomic::{AtomicUsize, Ordering};

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::crs::Coordinate;
use crate::layers::{Attributes, LayerQueryError};

/// One scattered sample of a persisted point layer.
#[derive(Debug, Clone)]
pub struct PointSample {
    /// Load order within the layer; the deterministic tie-break key.
    pub id: u32,
    pub easting: f64,
    pub northing: f64,
    pub attributes: Attributes,
}

impl RTreeObject for PointSample {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.easting, self.northing])
    }
}

impl PointDistance for PointSample {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.easting - point[0];
        let dy = self.northing - point[1];
        dx * dx + dy * dy
    }
}

/// Spatial index over one scattered point layer (elevation or rainfall).
pub struct PointGridIndex {
    name: String,
    tree: RTree<PointSample>,
    len: usize,
    queries: AtomicUsize,
}

impl PointGridIndex {
    pub fn build(name: impl Into<String>, samples: Vec<PointSample>) -> Self {
        let len = samples.len();
        Self {
            name: name.into(),
            tree: RTree::bulk_load(samples),
            len,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of `nearest` calls served so far. Diagnostic counter.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    /// Attributes of the sample nearest to `coord`; equal distances break to
    /// the lowest sample id. Fails only when the layer holds no samples.
    /// Idempotent for a fixed layer.
    pub fn nearest(&self, coord: &Coordinate) -> Result<&Attributes, LayerQueryError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let point = [coord.easting, coord.northing];
        let mut candidates = self.tree.nearest_neighbor_iter_with_distance_2(&point);
        let (first, nearest_d2) = candidates
            .next()
            .ok_or_else(|| LayerQueryError::EmptyLayer { layer: self.name.clone() })?;
        let mut best = first;
        for (sample, d2) in candidates {
            if d2 > nearest_d2 {
                break;
            }
            if sample.id < best.id {
                best = sample;
            }
        }
        Ok(&best.attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use crate::layers::AttrValue;

    fn sample(id: u32, easting: f64, northing: f64, elevation: f64) -> PointSample {
        let mut attributes = Attributes::new();
        attributes.insert("Elevation".into(), AttrValue::Number(elevation));
        PointSample { id, easting, northing, attributes }
    }

    fn coord(e: f64, n: f64) -> Coordinate {
        Coordinate::new(e, n, Crs::IrishGrid)
    }

    #[test]
    fn nearest_sample_by_euclidean_distance() {
        let index = PointGridIndex::build(
            "elevation",
            vec![
                sample(0, 0.0, 0.0, 12.0),
                sample(1, 100.0, 100.0, 85.0),
                sample(2, 200.0, 0.0, 40.0),
            ],
        );
        let attrs = index.nearest(&coord(110.0, 95.0)).unwrap();
        assert_eq!(attrs["Elevation"], AttrValue::Number(85.0));
    }

    #[test]
    fn equidistant_samples_tie_break_on_lowest_id() {
        let index = PointGridIndex::build(
            "elevation",
            vec![sample(1, 10.0, 0.0, 85.0), sample(0, -10.0, 0.0, 12.0)],
        );
        let attrs = index.nearest(&coord(0.0, 0.0)).unwrap();
        assert_eq!(attrs["Elevation"], AttrValue::Number(12.0));
    }

    #[test]
    fn repeated_queries_return_identical_attributes() {
        let index = PointGridIndex::build(
            "rainfall",
            vec![sample(0, 0.0, 0.0, 1123.4), sample(1, 1000.0, 1000.0, 980.2)],
        );
        let first = index.nearest(&coord(400.0, 450.0)).unwrap().clone();
        for _ in 0..10 {
            assert_eq!(index.nearest(&coord(400.0, 450.0)).unwrap(), &first);
        }
    }

    #[test]
    fn empty_layer_is_an_error() {
        let index = PointGridIndex::build("rainfall", vec![]);
        assert!(matches!(
            index.nearest(&coord(0.0, 0.0)),
            Err(LayerQueryError::EmptyLayer { .. })
        ));
    }
}
