//! Spatial indices over the persisted environmental layers.
//!
//! Two index shapes exist: polygon layers resolved by containment with a
//! nearest-geometry fallback (soil, hydrology) and scattered point layers
//! resolved by nearest sample (elevation, rainfall). Both are built once
//! and never mutated, so concurrent requests share them without locks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod point;
pub mod polygon;

pub use point::{PointGridIndex, PointSample};
pub use polygon::{PolygonFeature, PolygonLayerIndex};

/// A single attribute cell from a persisted layer. Column names are
/// case-sensitive contract fields; an empty cell is `Null`, never a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Number(f64),
    Text(String),
}

impl AttrValue {
    /// Numeric view: a number, or text that parses as one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            AttrValue::Text(s) => s.trim().parse().ok(),
            AttrValue::Null => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Named attribute columns of one feature or sample.
pub type Attributes = BTreeMap<String, AttrValue>;

#[derive(Debug, Error)]
pub enum LayerQueryError {
    #[error("layer {layer:?} has no samples")]
    EmptyLayer { layer: String },
}
