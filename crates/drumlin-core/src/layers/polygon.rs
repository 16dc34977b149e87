//! Polygon layer index: containment with deterministic nearest fallback.

use std::sync::atomic::{AtomicUsize, Ordering};

use geo::{BoundingRect, Contains, Distance, Euclidean, MultiPolygon, Point};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::crs::Coordinate;
use crate::layers::Attributes;

/// One polygon feature of a persisted layer, immutable after index build.
#[derive(Debug, Clone)]
pub struct PolygonFeature {
    /// Load order within the layer; the deterministic tie-break key.
    pub id: u32,
    pub geometry: MultiPolygon<f64>,
    pub attributes: Attributes,
}

/// Indexed feature with its precomputed envelope.
#[derive(Debug, Clone)]
struct IndexedFeature {
    feature: PolygonFeature,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedFeature {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl PointDistance for IndexedFeature {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let p = Point::new(point[0], point[1]);
        let d = Euclidean.distance(&p, &self.feature.geometry);
        d * d
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        self.feature
            .geometry
            .contains(&Point::new(point[0], point[1]))
    }
}

/// Spatial index over one polygon layer (soil or hydrology).
pub struct PolygonLayerIndex {
    name: String,
    tree: RTree<IndexedFeature>,
    len: usize,
    queries: AtomicUsize,
}

impl PolygonLayerIndex {
    /// Build the index once from loaded features. Features whose geometry has
    /// no extent (empty multipolygons) are dropped.
    pub fn build(name: impl Into<String>, features: Vec<PolygonFeature>) -> Self {
        let name = name.into();
        let indexed: Vec<IndexedFeature> = features
            .into_iter()
            .filter_map(|feature| {
                let rect = feature.geometry.bounding_rect()?;
                Some(IndexedFeature {
                    feature,
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();
        let len = indexed.len();
        Self { name, tree: RTree::bulk_load(indexed), len, queries: AtomicUsize::new(0) }
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

    /// Number of `resolve` calls served so far. Diagnostic counter.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    /// Resolve the layer at `coord`: the containing polygon when one exists,
    /// otherwise the nearest polygon by point-to-geometry distance. Ties are
    /// broken by lowest feature id in both paths. `None` only for an empty
    /// layer.
    pub fn resolve(&self, coord: &Coordinate) -> Option<&Attributes> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let point = [coord.easting, coord.northing];

        let containing = self
            .tree
            .locate_all_at_point(&point)
            .min_by_key(|f| f.feature.id);
        if let Some(hit) = containing {
            return Some(&hit.feature.attributes);
        }

        let mut candidates = self.tree.nearest_neighbor_iter_with_distance_2(&point);
        let (first, nearest_d2) = candidates.next()?;
        let mut best = first;
        for (feature, d2) in candidates {
            if d2 > nearest_d2 {
                break;
            }
            if feature.feature.id < best.feature.id {
                best = feature;
            }
        }
        tracing::debug!(
            layer = %self.name,
            feature_id = best.feature.id,
            distance = nearest_d2.sqrt(),
            "no containing polygon, using nearest fallback"
        );
        Some(&best.feature.attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use crate::layers::AttrValue;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        let poly = geo::Polygon::new(
            geo::LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
            vec![],
        );
        MultiPolygon(vec![poly])
    }

    fn feature(id: u32, geometry: MultiPolygon<f64>, texture: &str) -> PolygonFeature {
        let mut attributes = Attributes::new();
        attributes.insert("TEXTURE".into(), AttrValue::Text(texture.into()));
        PolygonFeature { id, geometry, attributes }
    }

    fn coord(e: f64, n: f64) -> Coordinate {
        Coordinate::new(e, n, Crs::IrishGrid)
    }

    #[test]
    fn containment_wins_over_fallback() {
        let index = PolygonLayerIndex::build(
            "soil",
            vec![
                feature(0, square(0.0, 0.0, 5.0, 5.0), "Loam"),
                feature(1, square(6.0, 6.0, 7.0, 7.0), "Peat"),
            ],
        );
        let attrs = index.resolve(&coord(2.0, 2.0)).unwrap();
        assert_eq!(attrs["TEXTURE"], AttrValue::Text("Loam".into()));
    }

    #[test]
    fn nearest_fallback_when_nothing_contains() {
        let index =
            PolygonLayerIndex::build("soil", vec![feature(0, square(0.0, 0.0, 5.0, 5.0), "Loam")]);
        // (7, 7) is outside the only polygon; fallback still resolves it.
        let attrs = index.resolve(&coord(7.0, 7.0)).unwrap();
        assert_eq!(attrs["TEXTURE"], AttrValue::Text("Loam".into()));
    }

    #[test]
    fn fallback_picks_genuinely_nearest_polygon() {
        let index = PolygonLayerIndex::build(
            "soil",
            vec![
                feature(0, square(0.0, 0.0, 1.0, 1.0), "Loam"),
                feature(1, square(10.0, 10.0, 11.0, 11.0), "Peat"),
            ],
        );
        let attrs = index.resolve(&coord(9.5, 9.5)).unwrap();
        assert_eq!(attrs["TEXTURE"], AttrValue::Text("Peat".into()));
    }

    #[test]
    fn overlapping_polygons_tie_break_on_lowest_id() {
        let index = PolygonLayerIndex::build(
            "soil",
            vec![
                feature(1, square(0.0, 0.0, 5.0, 5.0), "Peat"),
                feature(0, square(0.0, 0.0, 5.0, 5.0), "Loam"),
            ],
        );
        let attrs = index.resolve(&coord(2.0, 2.0)).unwrap();
        assert_eq!(attrs["TEXTURE"], AttrValue::Text("Loam".into()));
    }

    #[test]
    fn equidistant_fallback_tie_break_on_lowest_id() {
        // Two unit squares symmetric about x = 5; (5, 0.5) is equidistant.
        let index = PolygonLayerIndex::build(
            "soil",
            vec![
                feature(1, square(6.0, 0.0, 7.0, 1.0), "Peat"),
                feature(0, square(3.0, 0.0, 4.0, 1.0), "Loam"),
            ],
        );
        let attrs = index.resolve(&coord(5.0, 0.5)).unwrap();
        assert_eq!(attrs["TEXTURE"], AttrValue::Text("Loam".into()));
    }

    #[test]
    fn empty_layer_resolves_to_none() {
        let index = PolygonLayerIndex::build("soil", vec![]);
        assert!(index.resolve(&coord(2.0, 2.0)).is_none());
        assert!(index.is_empty());
    }
}
