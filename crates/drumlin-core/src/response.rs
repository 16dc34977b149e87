//! The structured response record, one per request.

use serde::Serialize;

use crate::classify::ClusterLabel;
use crate::layers::Attributes;

/// Field-for-field external response contract. Null sub-records are
/// serialized explicitly; the three trailing fields appear only when set,
/// so a partial success is never disguised as a full one.
#[derive(Debug, Clone, Serialize)]
pub struct LookupResponse {
    pub boundary_ok: bool,
    pub soil_data: Option<Attributes>,
    pub hydrology_data: Option<Attributes>,
    pub elevation_data: Option<Attributes>,
    pub rainfall_data: Option<Attributes>,
    /// Present only when all four required features resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_prediction: Option<ClusterLabel>,
    /// Present only when classification was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_prediction_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::AttrValue;

    #[test]
    fn skipped_classification_omits_the_prediction_field() {
        let response = LookupResponse {
            boundary_ok: true,
            soil_data: None,
            hydrology_data: None,
            elevation_data: Some(
                [("Elevation".to_string(), AttrValue::Number(85.0))].into_iter().collect(),
            ),
            rainfall_data: None,
            cluster_prediction: None,
            cluster_prediction_error: Some("missing rainfall_data.ANN".to_string()),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["boundary_ok"], true);
        assert_eq!(json["soil_data"], serde_json::Value::Null);
        assert_eq!(json["elevation_data"]["Elevation"], 85.0);
        assert!(json.get("cluster_prediction").is_none());
        assert!(json["cluster_prediction_error"].as_str().unwrap().contains("rainfall"));
    }
}
