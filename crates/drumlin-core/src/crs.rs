//! Coordinate reference systems and reprojection.
//! All coordinate math uses f64 for precision.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reference systems the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crs {
    /// EPSG:29903 — Irish Grid (TM75), planar metres.
    IrishGrid,
    /// EPSG:4326 — WGS84 geographic degrees, stored easting = longitude,
    /// northing = latitude.
    Wgs84,
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::IrishGrid => write!(f, "EPSG:29903"),
            Crs::Wgs84 => write!(f, "EPSG:4326"),
        }
    }
}

impl FromStr for Crs {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "epsg:29903" | "29903" | "irish-grid" | "irishgrid" => Ok(Crs::IrishGrid),
            "epsg:4326" | "4326" | "wgs84" => Ok(Crs::Wgs84),
            other => Err(TransformError::UnsupportedCrs(other.to_string())),
        }
    }
}

/// A planar grid position tagged with its reference system. Immutable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub easting: f64,
    pub northing: f64,
    pub crs: Crs,
}

impl Coordinate {
    pub fn new(easting: f64, northing: f64, crs: Crs) -> Self {
        Self { easting, northing, crs }
    }

    /// Reproject into `target`, or return self unchanged when the systems
    /// already match.
    pub fn to_crs(self, target: Crs) -> Result<Coordinate, TransformError> {
        transform(self, target)
    }
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("unsupported reference system: {0:?}")]
    UnsupportedCrs(String),
    #[error("non-finite coordinate ({easting}, {northing})")]
    NonFinite { easting: f64, northing: f64 },
    #[error("projection did not converge for ({easting}, {northing})")]
    NoConvergence { easting: f64, northing: f64 },
}

/// Reproject `coord` into `target`. Pure and deterministic; the round trip
/// A→B→A lands within centimetres of the original point.
pub fn transform(coord: Coordinate, target: Crs) -> Result<Coordinate, TransformError> {
    if !coord.easting.is_finite() || !coord.northing.is_finite() {
        return Err(TransformError::NonFinite {
            easting: coord.easting,
            northing: coord.northing,
        });
    }
    if coord.crs == target {
        return Ok(coord);
    }
    let (easting, northing) = match (coord.crs, target) {
        (Crs::Wgs84, Crs::IrishGrid) => {
            let (lat, lon) = (coord.northing.to_radians(), coord.easting.to_radians());
            let (lat_tm75, lon_tm75) = shift_datum(lat, lon, &WGS84, &AIRY_MODIFIED, HelmertDirection::ToTm75);
            tmerc_forward(lat_tm75, lon_tm75)
        }
        (Crs::IrishGrid, Crs::Wgs84) => {
            let (lat_tm75, lon_tm75) = tmerc_inverse(coord.easting, coord.northing)?;
            let (lat, lon) = shift_datum(lat_tm75, lon_tm75, &AIRY_MODIFIED, &WGS84, HelmertDirection::ToWgs84);
            (lon.to_degrees(), lat.to_degrees())
        }
        // Both identity pairs are handled above.
        _ => unreachable!("identity transforms short-circuit"),
    };
    Ok(Coordinate::new(easting, northing, target))
}

// ── Ellipsoids and projection constants ──────────────────────────────────────

struct Ellipsoid {
    a: f64,
    b: f64,
}

impl Ellipsoid {
    fn e2(&self) -> f64 {
        (self.a * self.a - self.b * self.b) / (self.a * self.a)
    }
}

/// Airy Modified 1849, the TM75 datum ellipsoid.
const AIRY_MODIFIED: Ellipsoid = Ellipsoid { a: 6_377_340.189, b: 6_356_034.447_938_534 };

const WGS84: Ellipsoid = Ellipsoid { a: 6_378_137.0, b: 6_356_752.314_245_179 };

/// Irish Grid true origin and scale: lat 53.5N, lon 8W, k0 1.000035,
/// false origin (200000, 250000).
const LAT0_DEG: f64 = 53.5;
const LON0_DEG: f64 = -8.0;
const SCALE0: f64 = 1.000_035;
const FALSE_EASTING: f64 = 200_000.0;
const FALSE_NORTHING: f64 = 250_000.0;

/// TM75 → WGS84 Helmert parameters: metres, arc-seconds, ppm.
const HELMERT_TX: f64 = 482.530;
const HELMERT_TY: f64 = -130.596;
const HELMERT_TZ: f64 = 564.557;
const HELMERT_RX_SEC: f64 = -1.042;
const HELMERT_RY_SEC: f64 = -0.214;
const HELMERT_RZ_SEC: f64 = -0.631;
const HELMERT_S_PPM: f64 = 8.150;

enum HelmertDirection {
    ToWgs84,
    ToTm75,
}

// ── Transverse Mercator (Ordnance Survey series expansion) ───────────────────

/// Meridional arc from the true origin to latitude `lat`, on Airy Modified.
fn meridional_arc(lat: f64) -> f64 {
    let Ellipsoid { a, b } = AIRY_MODIFIED;
    let lat0 = LAT0_DEG.to_radians();
    let n = (a - b) / (a + b);
    let n2 = n * n;
    let n3 = n2 * n;
    let dlat = lat - lat0;
    let slat = lat + lat0;
    b * SCALE0
        * ((1.0 + n + 1.25 * n2 + 1.25 * n3) * dlat
            - (3.0 * n + 3.0 * n2 + 2.625 * n3) * dlat.sin() * slat.cos()
            + (1.875 * n2 + 1.875 * n3) * (2.0 * dlat).sin() * (2.0 * slat).cos()
            - (35.0 / 24.0) * n3 * (3.0 * dlat).sin() * (3.0 * slat).cos())
}

/// Geodetic (radians, TM75 datum) → Irish Grid easting/northing in metres.
fn tmerc_forward(lat: f64, lon: f64) -> (f64, f64) {
    let a = AIRY_MODIFIED.a;
    let e2 = AIRY_MODIFIED.e2();
    let lon0 = LON0_DEG.to_radians();

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();
    let tan2 = tan_lat * tan_lat;
    let tan4 = tan2 * tan2;

    let nu = a * SCALE0 / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let rho = a * SCALE0 * (1.0 - e2) / (1.0 - e2 * sin_lat * sin_lat).powf(1.5);
    let eta2 = nu / rho - 1.0;

    let m = meridional_arc(lat);
    let i = m + FALSE_NORTHING;
    let ii = (nu / 2.0) * sin_lat * cos_lat;
    let iii = (nu / 24.0) * sin_lat * cos_lat.powi(3) * (5.0 - tan2 + 9.0 * eta2);
    let iiia = (nu / 720.0) * sin_lat * cos_lat.powi(5) * (61.0 - 58.0 * tan2 + tan4);
    let iv = nu * cos_lat;
    let v = (nu / 6.0) * cos_lat.powi(3) * (nu / rho - tan2);
    let vi = (nu / 120.0)
        * cos_lat.powi(5)
        * (5.0 - 18.0 * tan2 + tan4 + 14.0 * eta2 - 58.0 * tan2 * eta2);

    let dl = lon - lon0;
    let northing = i + ii * dl.powi(2) + iii * dl.powi(4) + iiia * dl.powi(6);
    let easting = FALSE_EASTING + iv * dl + v * dl.powi(3) + vi * dl.powi(5);
    (easting, northing)
}

/// Irish Grid easting/northing in metres → geodetic (radians, TM75 datum).
fn tmerc_inverse(easting: f64, northing: f64) -> Result<(f64, f64), TransformError> {
    let a = AIRY_MODIFIED.a;
    let e2 = AIRY_MODIFIED.e2();
    let lat0 = LAT0_DEG.to_radians();
    let lon0 = LON0_DEG.to_radians();

    // Iterate the footpoint latitude until the meridional arc converges.
    // Bounded: a northing far beyond the grid can leave the fixed point
    // stuck above the tolerance at f64 resolution.
    let mut lat = (northing - FALSE_NORTHING) / (a * SCALE0) + lat0;
    let mut converged = false;
    for _ in 0..100 {
        let m = meridional_arc(lat);
        let delta = northing - FALSE_NORTHING - m;
        if delta.abs() < 1e-5 {
            converged = true;
            break;
        }
        lat += delta / (a * SCALE0);
    }
    if !converged {
        return Err(TransformError::NoConvergence { easting, northing });
    }

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();
    let tan2 = tan_lat * tan_lat;
    let tan4 = tan2 * tan2;
    let tan6 = tan4 * tan2;

    let nu = a * SCALE0 / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let rho = a * SCALE0 * (1.0 - e2) / (1.0 - e2 * sin_lat * sin_lat).powf(1.5);
    let eta2 = nu / rho - 1.0;

    let vii = tan_lat / (2.0 * rho * nu);
    let viii = tan_lat / (24.0 * rho * nu.powi(3))
        * (5.0 + 3.0 * tan2 + eta2 - 9.0 * tan2 * eta2);
    let ix = tan_lat / (720.0 * rho * nu.powi(5)) * (61.0 + 90.0 * tan2 + 45.0 * tan4);
    let x = 1.0 / (cos_lat * nu);
    let xi = 1.0 / (cos_lat * 6.0 * nu.powi(3)) * (nu / rho + 2.0 * tan2);
    let xii = 1.0 / (cos_lat * 120.0 * nu.powi(5)) * (5.0 + 28.0 * tan2 + 24.0 * tan4);
    let xiia = 1.0 / (cos_lat * 5040.0 * nu.powi(7))
        * (61.0 + 662.0 * tan2 + 1320.0 * tan4 + 720.0 * tan6);

    let de = easting - FALSE_EASTING;
    let lat_out = lat - vii * de.powi(2) + viii * de.powi(4) - ix * de.powi(6);
    let lon_out = lon0 + x * de - xi * de.powi(3) + xii * de.powi(5) - xiia * de.powi(7);
    Ok((lat_out, lon_out))
}

// ── Datum shift (7-parameter Helmert via geocentric cartesian) ───────────────

fn geodetic_to_cartesian(lat: f64, lon: f64, ell: &Ellipsoid) -> (f64, f64, f64) {
    let e2 = ell.e2();
    let sin_lat = lat.sin();
    let nu = ell.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let x = nu * lat.cos() * lon.cos();
    let y = nu * lat.cos() * lon.sin();
    let z = (1.0 - e2) * nu * sin_lat;
    (x, y, z)
}

fn cartesian_to_geodetic(x: f64, y: f64, z: f64, ell: &Ellipsoid) -> (f64, f64) {
    let e2 = ell.e2();
    let lon = y.atan2(x);
    let p = (x * x + y * y).sqrt();
    let mut lat = z.atan2(p * (1.0 - e2));
    // Converges in a handful of iterations for surface points.
    for _ in 0..10 {
        let sin_lat = lat.sin();
        let nu = ell.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let next = (z + e2 * nu * sin_lat).atan2(p);
        if (next - lat).abs() < 1e-12 {
            lat = next;
            break;
        }
        lat = next;
    }
    (lat, lon)
}

fn shift_datum(
    lat: f64,
    lon: f64,
    from: &Ellipsoid,
    to: &Ellipsoid,
    direction: HelmertDirection,
) -> (f64, f64) {
    const SEC_TO_RAD: f64 = std::f64::consts::PI / (180.0 * 3600.0);
    let sign = match direction {
        HelmertDirection::ToWgs84 => 1.0,
        HelmertDirection::ToTm75 => -1.0,
    };
    let tx = sign * HELMERT_TX;
    let ty = sign * HELMERT_TY;
    let tz = sign * HELMERT_TZ;
    let rx = sign * HELMERT_RX_SEC * SEC_TO_RAD;
    let ry = sign * HELMERT_RY_SEC * SEC_TO_RAD;
    let rz = sign * HELMERT_RZ_SEC * SEC_TO_RAD;
    let s = 1.0 + sign * HELMERT_S_PPM * 1e-6;

    let (x, y, z) = geodetic_to_cartesian(lat, lon, from);
    let xs = tx + s * x - rz * y + ry * z;
    let ys = ty + rz * x + s * y - rx * z;
    let zs = tz - ry * x + rx * y + s * z;
    cartesian_to_geodetic(xs, ys, zs, to)
}
