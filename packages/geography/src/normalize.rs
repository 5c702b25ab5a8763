//! Normalizes raw `GeoJSON` features into [`Zone`] and [`SubZone`] values.
//!
//! Features with a missing identifier, missing name, or invalid boundary
//! are skipped with a warning. A few bad shapes never prevent the rest of a
//! dataset from loading.

use std::collections::BTreeMap;

use precinct_map_geography_models::{BoundingBox, Geometry, SubZone, Zone, ZoneAttributes};

use crate::GeoError;

/// Returns the `features` array of a `GeoJSON` `FeatureCollection`.
///
/// # Errors
///
/// Returns [`GeoError::Conversion`] if the value is not a feature
/// collection.
pub fn feature_collection(value: &serde_json::Value) -> Result<&[serde_json::Value], GeoError> {
    if value.get("type").and_then(serde_json::Value::as_str) != Some("FeatureCollection") {
        return Err(GeoError::Conversion {
            message: "Expected a GeoJSON FeatureCollection".to_string(),
        });
    }

    value
        .get("features")
        .and_then(serde_json::Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| GeoError::Conversion {
            message: "FeatureCollection has no features array".to_string(),
        })
}

/// Normalizes a list of zone features.
#[must_use]
pub fn normalize_zone_features(features: &[serde_json::Value]) -> Vec<Zone> {
    features
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| match normalize_zone_feature(feature) {
            Ok(zone) => Some(zone),
            Err(e) => {
                log::warn!("Skipping zone feature #{index}: {e}");
                None
            }
        })
        .collect()
}

/// Normalizes a list of sub-zone features.
#[must_use]
pub fn normalize_sub_zone_features(features: &[serde_json::Value]) -> Vec<SubZone> {
    features
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| match normalize_sub_zone_feature(feature) {
            Ok(sub_zone) => Some(sub_zone),
            Err(e) => {
                log::warn!("Skipping sub-zone feature #{index}: {e}");
                None
            }
        })
        .collect()
}

/// Normalizes a single zone feature.
///
/// Expected properties: `id` (integer or numeric string), `name`, and the
/// optional `address`, `phone`, `hours` (object of strings) and `bbox`
/// (`[minLat, minLng, maxLat, maxLng]`).
///
/// # Errors
///
/// Returns [`GeoError`] if a required property is missing or the geometry
/// is invalid.
pub fn normalize_zone_feature(feature: &serde_json::Value) -> Result<Zone, GeoError> {
    let props = properties(feature)?;

    let id = integer_property(props, "id")?;

    let name = string_property(props, "name").ok_or_else(|| GeoError::Conversion {
        message: format!("Zone {id} has no name"),
    })?;

    let hours: BTreeMap<String, String> = props
        .get("hours")
        .and_then(serde_json::Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(day, v)| v.as_str().map(|s| (day.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    let attributes = ZoneAttributes {
        name,
        address: string_property(props, "address"),
        phone: string_property(props, "phone"),
        hours,
    };

    let geometry = geometry(feature)?;
    let mut zone = crate::build_zone(id, geometry, attributes)?;

    if let Some(declared) = declared_bbox(props) {
        if declared.covers(&zone.bbox) {
            zone.bbox = declared;
        } else {
            log::debug!("Zone {id}: declared bbox does not cover its boundary, using computed");
        }
    }

    Ok(zone)
}

/// Normalizes a single sub-zone feature.
///
/// Expected properties: `id` (string or integer), `zone_id`, and an
/// optional `bbox`.
///
/// # Errors
///
/// Returns [`GeoError`] if a required property is missing or the geometry
/// is invalid.
pub fn normalize_sub_zone_feature(feature: &serde_json::Value) -> Result<SubZone, GeoError> {
    let props = properties(feature)?;

    let id = match props.get("id") {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => {
            return Err(GeoError::Conversion {
                message: "Sub-zone has no id".to_string(),
            });
        }
    };

    let zone_id = integer_property(props, "zone_id")?;

    let geometry = geometry(feature)?;
    let mut sub_zone = crate::build_sub_zone(id, zone_id, geometry)?;

    if let Some(declared) = declared_bbox(props)
        && declared.covers(&sub_zone.bbox)
    {
        sub_zone.bbox = declared;
    }

    Ok(sub_zone)
}

fn properties(
    feature: &serde_json::Value,
) -> Result<&serde_json::Map<String, serde_json::Value>, GeoError> {
    feature
        .get("properties")
        .and_then(serde_json::Value::as_object)
        .ok_or_else(|| GeoError::Conversion {
            message: "Feature has no properties".to_string(),
        })
}

fn geometry(feature: &serde_json::Value) -> Result<Geometry, GeoError> {
    let geom = feature
        .get("geometry")
        .filter(|g| !g.is_null())
        .ok_or_else(|| GeoError::Conversion {
            message: "Feature has no geometry".to_string(),
        })?;

    let geometry: geojson::Geometry = serde_json::from_value(geom.clone())?;
    Ok(Geometry::try_from(geometry)?)
}

fn string_property(props: &serde_json::Map<String, serde_json::Value>, key: &str) -> Option<String> {
    props
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn integer_property(
    props: &serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Result<i64, GeoError> {
    let value = props.get(key);
    value
        .and_then(serde_json::Value::as_i64)
        .or_else(|| {
            value
                .and_then(serde_json::Value::as_str)
                .and_then(|s| s.trim().parse().ok())
        })
        .ok_or_else(|| GeoError::Conversion {
            message: format!("Feature property {key:?} is missing or not an integer"),
        })
}

fn declared_bbox(props: &serde_json::Map<String, serde_json::Value>) -> Option<BoundingBox> {
    props
        .get("bbox")
        .and_then(|v| serde_json::from_value::<BoundingBox>(v.clone()).ok())
}
