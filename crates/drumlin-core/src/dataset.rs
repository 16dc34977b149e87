//! Persisted layer loading.
//!
//! Layers are flat CSV files: polygon layers carry a `geometry` WKT column
//! plus named attribute columns, point layers carry `Easting`/`Northing`
//! plus named attribute columns. Headers are whitespace-trimmed; column
//! names are case-sensitive contract fields. Any unreadable source is fatal
//! at construction time — the service cannot start without its indices.

use std::path::Path;

use geo::{Geometry, MultiPolygon};
use thiserror::Error;
use wkt::TryFromWkt;

use crate::boundary::BoundaryRegion;
use crate::layers::{AttrValue, Attributes, PointSample, PolygonFeature};

/// Geometry column of polygon and boundary layers.
pub const GEOMETRY_COLUMN: &str = "geometry";
/// Region label column of the boundary layer.
pub const BOUNDARY_NAME_COLUMN: &str = "NAME";
/// Location columns of point layers.
pub const EASTING_COLUMN: &str = "Easting";
pub const NORTHING_COLUMN: &str = "Northing";

/// Required attribute columns, verified at load time.
pub const ELEVATION_COLUMNS: &[&str] = &["Elevation"];
pub const RAINFALL_COLUMNS: &[&str] = &["ANN", "DJF", "MAM", "JJA", "SON"];

/// Why a layer's backing store could not be turned into an index.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("cannot read {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("{path} is missing required column {column:?}")]
    MissingColumn { path: String, column: String },
    #[error("{path} row {row}: {reason}")]
    BadGeometry { path: String, row: usize, reason: String },
    #[error("{path} row {row}: column {column:?} is not numeric")]
    BadNumber { path: String, row: usize, column: String },
    #[error("classifier artifact {path}: {reason}")]
    BadArtifact { path: String, reason: String },
}

/// Parse one CSV cell: empty → null, numeric → number, anything else text.
fn parse_attr(raw: &str) -> AttrValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return AttrValue::Null;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => AttrValue::Number(n),
        _ => AttrValue::Text(trimmed.to_string()),
    }
}

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>, DatasetError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| DatasetError::Csv { path: path.display().to_string(), source })
}

fn parse_multipolygon(raw: &str, path: &Path, row: usize) -> Result<MultiPolygon<f64>, DatasetError> {
    let geometry = Geometry::<f64>::try_from_wkt_str(raw).map_err(|e| DatasetError::BadGeometry {
        path: path.display().to_string(),
        row,
        reason: format!("bad WKT: {e}"),
    })?;
    match geometry {
        Geometry::Polygon(p) => Ok(MultiPolygon(vec![p])),
        Geometry::MultiPolygon(mp) => Ok(mp),
        other => Err(DatasetError::BadGeometry {
            path: path.display().to_string(),
            row,
            reason: format!("expected POLYGON or MULTIPOLYGON, got {other:?}"),
        }),
    }
}

fn column_index(
    headers: &csv::StringRecord,
    column: &str,
    path: &Path,
) -> Result<usize, DatasetError> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| DatasetError::MissingColumn {
            path: path.display().to_string(),
            column: column.to_string(),
        })
}

/// Load a polygon layer (soil or hydrology). All non-geometry columns become
/// attributes; feature ids follow load order.
pub fn load_polygon_features(path: &Path) -> Result<Vec<PolygonFeature>, DatasetError> {
    let mut rdr = reader(path)?;
    let headers = rdr
        .headers()
        .map_err(|source| DatasetError::Csv { path: path.display().to_string(), source })?
        .clone();
    let geom_idx = column_index(&headers, GEOMETRY_COLUMN, path)?;

    let mut features = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record =
            record.map_err(|source| DatasetError::Csv { path: path.display().to_string(), source })?;
        let raw_geom = record.get(geom_idx).unwrap_or_default();
        let geometry = parse_multipolygon(raw_geom, path, row)?;

        let mut attributes = Attributes::new();
        for (idx, header) in headers.iter().enumerate() {
            if idx == geom_idx {
                continue;
            }
            attributes.insert(header.to_string(), parse_attr(record.get(idx).unwrap_or_default()));
        }
        features.push(PolygonFeature { id: row as u32, geometry, attributes });
    }
    tracing::info!(path = %path.display(), features = features.len(), "loaded polygon layer");
    Ok(features)
}

/// Load a scattered point layer. `required` columns must all be present;
/// `Easting`/`Northing` must be numeric in every row.
pub fn load_point_samples(
    path: &Path,
    required: &[&str],
) -> Result<Vec<PointSample>, DatasetError> {
    let mut rdr = reader(path)?;
    let headers = rdr
        .headers()
        .map_err(|source| DatasetError::Csv { path: path.display().to_string(), source })?
        .clone();
    let easting_idx = column_index(&headers, EASTING_COLUMN, path)?;
    let northing_idx = column_index(&headers, NORTHING_COLUMN, path)?;
    for column in required {
        column_index(&headers, column, path)?;
    }

    let parse_coord = |record: &csv::StringRecord, idx: usize, column: &str, row: usize| {
        record
            .get(idx)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .ok_or_else(|| DatasetError::BadNumber {
                path: path.display().to_string(),
                row,
                column: column.to_string(),
            })
    };

    let mut samples = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record =
            record.map_err(|source| DatasetError::Csv { path: path.display().to_string(), source })?;
        let easting = parse_coord(&record, easting_idx, EASTING_COLUMN, row)?;
        let northing = parse_coord(&record, northing_idx, NORTHING_COLUMN, row)?;

        let mut attributes = Attributes::new();
        for (idx, header) in headers.iter().enumerate() {
            if idx == easting_idx || idx == northing_idx {
                continue;
            }
            attributes.insert(header.to_string(), parse_attr(record.get(idx).unwrap_or_default()));
        }
        samples.push(PointSample { id: row as u32, easting, northing, attributes });
    }
    tracing::info!(path = %path.display(), samples = samples.len(), "loaded point layer");
    Ok(samples)
}

/// Load the national boundary set: `NAME` label plus `geometry` WKT.
pub fn load_boundary_regions(path: &Path) -> Result<Vec<BoundaryRegion>, DatasetError> {
    let mut rdr = reader(path)?;
    let headers = rdr
        .headers()
        .map_err(|source| DatasetError::Csv { path: path.display().to_string(), source })?
        .clone();
    let geom_idx = column_index(&headers, GEOMETRY_COLUMN, path)?;
    let name_idx = column_index(&headers, BOUNDARY_NAME_COLUMN, path)?;

    let mut regions = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record =
            record.map_err(|source| DatasetError::Csv { path: path.display().to_string(), source })?;
        let geometry = parse_multipolygon(record.get(geom_idx).unwrap_or_default(), path, row)?;
        regions.push(BoundaryRegion {
            id: row as u32,
            name: record.get(name_idx).unwrap_or_default().to_string(),
            geometry,
        });
    }
    tracing::info!(path = %path.display(), regions = regions.len(), "loaded boundary set");
    Ok(regions)
}
