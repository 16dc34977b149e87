//! National boundary gate: authoritative point-in-polygon check that runs
//! before any layer query.

use geo::{Contains, MultiPolygon, Point};

use crate::crs::{Coordinate, Crs};

/// One named region of the national boundary set.
#[derive(Debug, Clone)]
pub struct BoundaryRegion {
    pub id: u32,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// The loaded boundary polygon set. Small enough that a linear scan beats
/// index upkeep; loaded once, immutable.
pub struct BoundaryGate {
    crs: Crs,
    regions: Vec<BoundaryRegion>,
}

impl BoundaryGate {
    pub fn new(crs: Crs, mut regions: Vec<BoundaryRegion>) -> Self {
        regions.sort_by_key(|r| r.id);
        Self { crs, regions }
    }

    /// The boundary's native reference system. Callers reproject into this
    /// exactly once before any containment test.
    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Whether `coord` (already in the gate's native CRS) falls inside any
    /// boundary region. Absence of containment is a hard rejection upstream;
    /// there is no nearest-neighbor approximation here.
    pub fn contains(&self, coord: &Coordinate) -> bool {
        let p = Point::new(coord.easting, coord.northing);
        self.regions.iter().any(|r| r.geometry.contains(&p))
    }

    /// Name of the first containing region by lowest id, for logging.
    pub fn region(&self, coord: &Coordinate) -> Option<&str> {
        let p = Point::new(coord.easting, coord.northing);
        self.regions
            .iter()
            .find(|r| r.geometry.contains(&p))
            .map(|r| r.name.as_str())
    }
}
