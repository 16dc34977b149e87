//! End-to-end pipeline test over CSV-backed layers: dataset loading,
//! boundary gating, fusion and classification through the public API.

use std::io::Write;
use std::path::PathBuf;

use drumlin_core::{AttrValue, Crs, LookupError, LookupServiceBuilder};

fn write_file(dir: &PathBuf, name: &str, contents: &str) {
    let mut f = std::fs::File::create(dir.join(name)).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
}

/// Lay down a complete miniature dataset: a 10x10 boundary square, one soil
/// polygon over [0,5]x[0,5], full hydrology coverage, and single-sample
/// point grids.
fn fixture_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("drumlin-pipeline-{}-{tag}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    write_file(
        &dir,
        "boundary_data.csv",
        "NAME,geometry\n\
         Test Square,\"POLYGON((0 0,10 0,10 10,0 10,0 0))\"\n",
    );
    write_file(
        &dir,
        "soil_data.csv",
        "geometry,TEXTURE,DEPTH,PlainEngli\n\
         \"POLYGON((0 0,5 0,5 5,0 5,0 0))\",Loam,80,Deep well drained mineral\n",
    );
    write_file(
        &dir,
        "hydrology_data.csv",
        "geometry,CATEGORY,ParMat_Des,SoilDraina\n\
         \"POLYGON((0 0,10 0,10 10,0 10,0 0))\",Well Drained,Glacial till,Good\n",
    );
    write_file(
        &dir,
        "elevation_data.csv",
        "Easting,Northing,Elevation\n5,5,60\n",
    );
    write_file(
        &dir,
        "rainfall_data.csv",
        "Easting,Northing,ANN,DJF,MAM,JJA,SON\n5,5,1100,320,240,230,310\n",
    );
    write_file(
        &dir,
        "cluster_classifier.json",
        r#"{
            "version": 1,
            "texture_classes": ["Clay", "Loam", "Peat"],
            "hydrology_classes": ["Poorly Drained", "Well Drained"],
            "scaler_mean": [1.0, 50.0, 1000.0, 0.5],
            "scaler_scale": [1.0, 25.0, 250.0, 0.5],
            "centroids": [[0.0, 0.0, 0.0, 0.0], [1.0, 1.0, 1.0, 1.0]]
        }"#,
    );
    dir
}

#[test]
fn complete_lookup_inside_boundary() {
    let service = LookupServiceBuilder::new(fixture_dir("complete")).build().unwrap();
    let response = service.lookup(2.0, 2.0, Crs::IrishGrid).unwrap();

    assert!(response.boundary_ok);
    let soil = response.soil_data.unwrap();
    assert_eq!(soil["TEXTURE"], AttrValue::Text("Loam".into()));
    assert_eq!(soil["DEPTH"], AttrValue::Number(80.0));
    let hydrology = response.hydrology_data.unwrap();
    assert_eq!(hydrology["CATEGORY"], AttrValue::Text("Well Drained".into()));
    assert_eq!(response.elevation_data.unwrap()["Elevation"], AttrValue::Number(60.0));
    let rainfall = response.rainfall_data.unwrap();
    assert_eq!(rainfall["ANN"], AttrValue::Number(1100.0));
    assert_eq!(rainfall["SON"], AttrValue::Number(310.0));

    assert!(response.cluster_prediction.is_some());
    assert!(response.cluster_prediction_error.is_none());
}

#[test]
fn soil_nearest_fallback_outside_polygon_coverage() {
    let service = LookupServiceBuilder::new(fixture_dir("fallback")).build().unwrap();
    // (7, 7) is inside the boundary but outside the only soil polygon.
    let response = service.lookup(7.0, 7.0, Crs::IrishGrid).unwrap();
    assert_eq!(response.soil_data.unwrap()["TEXTURE"], AttrValue::Text("Loam".into()));
}

#[test]
fn out_of_boundary_rejection() {
    let service = LookupServiceBuilder::new(fixture_dir("reject")).build().unwrap();
    let err = service.lookup(50.0, 50.0, Crs::IrishGrid).unwrap_err();
    assert!(matches!(err, LookupError::OutOfBoundary { .. }));
}

#[test]
fn missing_data_source_fails_construction() {
    let dir = fixture_dir("startup");
    std::fs::remove_file(dir.join("rainfall_data.csv")).unwrap();
    assert!(LookupServiceBuilder::new(dir).build().is_err());
}

#[test]
fn response_serializes_to_the_documented_shape() {
    let service = LookupServiceBuilder::new(fixture_dir("shape")).build().unwrap();
    let response = service.lookup(2.0, 2.0, Crs::IrishGrid).unwrap();
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["boundary_ok"], true);
    assert_eq!(json["soil_data"]["TEXTURE"], "Loam");
    assert_eq!(json["hydrology_data"]["SoilDraina"], "Good");
    assert_eq!(json["elevation_data"]["Elevation"], 60.0);
    assert_eq!(json["rainfall_data"]["ANN"], 1100.0);
    assert!(json["cluster_prediction"].as_u64().is_some());
    assert!(json.get("cluster_prediction_error").is_none());
}
