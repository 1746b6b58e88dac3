//! Feature-by-feature decoding of the GeoJSON datasets.
//!
//! A malformed feature is skipped with a warning; the rest still load.

use serde_json::Value;
use tracing::warn;

use super::{ApiError, Decoded};
use crate::model::{Coordinates, MonitoredPoint, Park};

pub fn decode_points(body: &Value) -> Result<Decoded<MonitoredPoint>, ApiError> {
    decode_features(body, point_from_feature)
}

pub fn decode_parks(body: &Value) -> Result<Decoded<Park>, ApiError> {
    decode_features(body, park_from_feature)
}

fn decode_features<T>(
    body: &Value,
    convert: impl Fn(&Value) -> Result<T, String>,
) -> Result<Decoded<T>, ApiError> {
    let features = body["features"]
        .as_array()
        .ok_or_else(|| ApiError::Decode("expected a FeatureCollection with a features array".into()))?;

    let mut decoded = Decoded::default();
    for (index, feature) in features.iter().enumerate() {
        match convert(feature) {
            Ok(item) => decoded.items.push(item),
            Err(reason) => {
                warn!(index, %reason, "skipping malformed feature");
                decoded.skipped += 1;
            }
        }
    }
    Ok(decoded)
}

/// Identifier that may arrive as a JSON string or number.
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn finite(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

/// `[lon, lat]` pair.
fn lon_lat(value: &Value) -> Option<Coordinates> {
    let pair = value.as_array()?;
    let lon = finite(pair.first()?)?;
    let lat = finite(pair.get(1)?)?;
    let coords = Coordinates::new(lat, lon);
    coords.in_wgs84_range().then_some(coords)
}

fn point_from_feature(feature: &Value) -> Result<MonitoredPoint, String> {
    let geometry = &feature["geometry"];
    if geometry["type"].as_str() != Some("Point") {
        return Err("geometry is not a Point".into());
    }
    let coordinates = lon_lat(&geometry["coordinates"]).ok_or("missing or invalid coordinates")?;

    let props = &feature["properties"];
    let tree_id = id_string(&props["tree_id"]);
    let id = id_string(&props["id"])
        .or_else(|| tree_id.clone())
        .ok_or("feature has no id")?;

    Ok(MonitoredPoint {
        id,
        tree_id,
        species: props["species"].as_str().map(str::to_string),
        coordinates,
        ndvi_current: finite(&props["ndvi"]),
        ndvi_previous_year: finite(&props["ndvi_prev_year"]),
        ndvi_delta: finite(&props["ndvi_diff"]),
    })
}

fn park_from_feature(feature: &Value) -> Result<Park, String> {
    let props = &feature["properties"];
    let id = id_string(&props["park_id"]).ok_or("park has no park_id")?;
    let name = props["park_name"].as_str().unwrap_or(&id).to_string();

    let geometry = &feature["geometry"];
    let centroid = match geometry["type"].as_str() {
        Some("Point") => lon_lat(&geometry["coordinates"]),
        Some("Polygon") => ring_centroid(&geometry["coordinates"][0]),
        _ => None,
    }
    .ok_or("park geometry has no usable coordinates")?;

    Ok(Park { id, name, centroid })
}

/// Vertex mean of a linear ring, ignoring the closing vertex.
fn ring_centroid(ring: &Value) -> Option<Coordinates> {
    let mut vertices: Vec<Coordinates> = ring.as_array()?.iter().filter_map(lon_lat).collect();
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    if vertices.is_empty() {
        return None;
    }
    let n = vertices.len() as f64;
    let (lat, lon) = vertices
        .iter()
        .fold((0.0, 0.0), |(lat, lon), c| (lat + c.lat, lon + c.lon));
    Some(Coordinates::new(lat / n, lon / n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bad_feature_is_skipped_not_fatal() {
        let body = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [139.70, 35.68]},
                 "properties": {"id": 7, "tree_id": "T7", "species": "Ginkgo", "ndvi": 0.61, "ndvi_prev_year": 0.70, "ndvi_diff": -0.09}},
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": ["x", 35.0]},
                 "properties": {"id": 8}},
                {"type": "Feature", "geometry": null, "properties": {"id": 9}}
            ]
        });
        let decoded = decode_points(&body).expect("collection");
        assert_eq!(decoded.items.len(), 1);
        assert_eq!(decoded.skipped, 2);
        let p = &decoded.items[0];
        assert_eq!(p.id, "7");
        assert_eq!(p.tree_id.as_deref(), Some("T7"));
        assert_eq!(p.ndvi_delta, Some(-0.09));
        assert_eq!(p.coordinates, Coordinates::new(35.68, 139.70));
    }

    #[test]
    fn polygon_park_uses_vertex_mean() {
        let body = json!({
            "features": [{
                "geometry": {"type": "Polygon", "coordinates": [[
                    [139.0, 35.0], [139.2, 35.0], [139.2, 35.2], [139.0, 35.2], [139.0, 35.0]
                ]]},
                "properties": {"park_id": "park_001", "park_name": "Central"}
            }]
        });
        let parks = decode_parks(&body).expect("collection").items;
        assert_eq!(parks[0].name, "Central");
        assert!((parks[0].centroid.lat - 35.1).abs() < 1e-9);
        assert!((parks[0].centroid.lon - 139.1).abs() < 1e-9);
    }

    #[test]
    fn non_collection_is_an_error() {
        assert!(decode_points(&json!({"type": "Feature"})).is_err());
    }
}
