#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zone, sub-zone and boundary geometry types.
//!
//! These types describe precinct-equivalent zones and their sectors as they
//! are stored and resolved. Boundaries travel as `GeoJSON` geometry objects
//! with `[longitude, latitude]` positions, while the in-memory [`Point`] is
//! ordered `(latitude, longitude)`. Every boundary is validated when it is
//! deserialized, so malformed shapes are rejected at the edge instead of
//! surfacing inside the resolver.

use std::collections::BTreeMap;

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum positions in a ring: three distinct vertices plus the closing
/// duplicate.
pub const MIN_RING_POSITIONS: usize = 4;

/// Errors produced while validating boundary geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// The geometry type is neither `Polygon` nor `MultiPolygon`.
    #[error("Unsupported geometry type: {0}")]
    UnsupportedType(String),

    /// A polygon without rings or a multipolygon without polygons.
    #[error("Empty {what}")]
    Empty {
        /// What was empty (`"polygon"`, `"multipolygon"`).
        what: &'static str,
    },

    /// A position with fewer than two ordinates.
    #[error("Position has {ordinates} ordinate(s), expected at least 2")]
    InvalidPosition {
        /// Number of ordinates found.
        ordinates: usize,
    },

    /// A NaN or infinite ordinate.
    #[error("Non-finite coordinate in boundary")]
    NonFinite,

    /// A ring with fewer than [`MIN_RING_POSITIONS`] positions.
    #[error("Ring has {count} position(s), expected at least {MIN_RING_POSITIONS}")]
    TooFewPositions {
        /// Number of positions found.
        count: usize,
    },

    /// A ring whose first and last positions differ.
    #[error("Ring is not closed")]
    UnclosedRing,

    /// A bounding box with min > max or non-finite values.
    #[error("Invalid bounding box [{min_lat}, {min_lng}, {max_lat}, {max_lng}]")]
    InvalidBoundingBox {
        /// Southern edge.
        min_lat: f64,
        /// Western edge.
        min_lng: f64,
        /// Northern edge.
        max_lat: f64,
        /// Eastern edge.
        max_lng: f64,
    },

    /// The boundary text was not valid JSON / `GeoJSON`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A geographic point in WGS84, ordered `(latitude, longitude)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl Point {
    /// Creates a point from latitude and longitude.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Squared planar distance in degree units.
    ///
    /// Not geodesic: a degree of longitude is shorter than a degree of
    /// latitude away from the equator. Only meaningful for comparing
    /// distances within a single city.
    #[must_use]
    pub fn squared_distance(&self, other: &Self) -> f64 {
        let d_lat = self.lat - other.lat;
        let d_lng = self.lng - other.lng;
        d_lat.mul_add(d_lat, d_lng * d_lng)
    }
}

impl From<Point> for Coord<f64> {
    fn from(point: Point) -> Self {
        Self {
            x: point.lng,
            y: point.lat,
        }
    }
}

impl From<Coord<f64>> for Point {
    fn from(coord: Coord<f64>) -> Self {
        Self {
            lat: coord.y,
            lng: coord.x,
        }
    }
}

/// An axis-aligned bounding box.
///
/// Serialized as `[minLat, minLng, maxLat, maxLng]`. Always a superset of
/// the extent it was computed from; containment is inclusive on all edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    min_lat: f64,
    min_lng: f64,
    max_lat: f64,
    max_lng: f64,
}

impl BoundingBox {
    /// Creates a bounding box, rejecting inverted or non-finite edges.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidBoundingBox`] if `min > max` on
    /// either axis or any edge is not finite.
    pub fn new(
        min_lat: f64,
        min_lng: f64,
        max_lat: f64,
        max_lng: f64,
    ) -> Result<Self, GeometryError> {
        let finite = [min_lat, min_lng, max_lat, max_lng]
            .iter()
            .all(|v| v.is_finite());

        if !finite || min_lat > max_lat || min_lng > max_lng {
            return Err(GeometryError::InvalidBoundingBox {
                min_lat,
                min_lng,
                max_lat,
                max_lng,
            });
        }

        Ok(Self {
            min_lat,
            min_lng,
            max_lat,
            max_lng,
        })
    }

    /// Southern edge.
    #[must_use]
    pub const fn min_lat(&self) -> f64 {
        self.min_lat
    }

    /// Western edge.
    #[must_use]
    pub const fn min_lng(&self) -> f64 {
        self.min_lng
    }

    /// Northern edge.
    #[must_use]
    pub const fn max_lat(&self) -> f64 {
        self.max_lat
    }

    /// Eastern edge.
    #[must_use]
    pub const fn max_lng(&self) -> f64 {
        self.max_lng
    }

    /// Inclusive point containment.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lng >= self.min_lng
            && point.lng <= self.max_lng
    }

    /// Whether `other` lies entirely within this box.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        other.min_lat >= self.min_lat
            && other.max_lat <= self.max_lat
            && other.min_lng >= self.min_lng
            && other.max_lng <= self.max_lng
    }

    /// Returns the `[minLat, minLng, maxLat, maxLng]` wire form.
    #[must_use]
    pub const fn to_array(&self) -> [f64; 4] {
        [self.min_lat, self.min_lng, self.max_lat, self.max_lng]
    }
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = GeometryError;

    fn try_from([min_lat, min_lng, max_lat, max_lng]: [f64; 4]) -> Result<Self, Self::Error> {
        Self::new(min_lat, min_lng, max_lat, max_lng)
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        bbox.to_array()
    }
}

/// A zone boundary: a single polygon or an ordered list of polygons.
///
/// Coordinates are stored as `geo` types with `x = longitude` and
/// `y = latitude`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "geojson::Geometry", into = "geojson::Geometry")]
pub enum Geometry {
    /// One exterior ring plus zero or more nested rings.
    Polygon(Polygon<f64>),
    /// Several ring-sets; a point inside any of them is inside the zone.
    MultiPolygon(MultiPolygon<f64>),
}

impl Geometry {
    /// The constituent polygons, in order.
    #[must_use]
    pub fn polygons(&self) -> &[Polygon<f64>] {
        match self {
            Self::Polygon(polygon) => std::slice::from_ref(polygon),
            Self::MultiPolygon(multi) => &multi.0,
        }
    }

    /// The `GeoJSON` type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Polygon(_) => "Polygon",
            Self::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Parses and validates a `GeoJSON` geometry object.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the text is not a valid `Polygon` or
    /// `MultiPolygon` geometry.
    pub fn from_geojson_str(text: &str) -> Result<Self, GeometryError> {
        let geometry: geojson::Geometry = serde_json::from_str(text)?;
        Self::try_from(geometry)
    }

    /// Serializes the geometry as a `GeoJSON` geometry object.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Json`] if serialization fails.
    pub fn to_geojson_string(&self) -> Result<String, GeometryError> {
        Ok(serde_json::to_string(&geojson::Geometry::from(self.clone()))?)
    }
}

impl TryFrom<geojson::Geometry> for Geometry {
    type Error = GeometryError;

    fn try_from(geometry: geojson::Geometry) -> Result<Self, Self::Error> {
        match geometry.value {
            geojson::Value::Polygon(rings) => Ok(Self::Polygon(polygon_from_positions(&rings)?)),
            geojson::Value::MultiPolygon(polygons) => {
                if polygons.is_empty() {
                    return Err(GeometryError::Empty {
                        what: "multipolygon",
                    });
                }
                let polygons = polygons
                    .iter()
                    .map(|rings| polygon_from_positions(rings))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::MultiPolygon(MultiPolygon::new(polygons)))
            }
            other => Err(GeometryError::UnsupportedType(
                value_type_name(&other).to_string(),
            )),
        }
    }
}

impl From<Geometry> for geojson::Geometry {
    fn from(geometry: Geometry) -> Self {
        let value = match &geometry {
            Geometry::Polygon(polygon) => geojson::Value::Polygon(polygon_positions(polygon)),
            Geometry::MultiPolygon(multi) => {
                geojson::Value::MultiPolygon(multi.0.iter().map(polygon_positions).collect())
            }
        };
        Self::new(value)
    }
}

const fn value_type_name(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn polygon_from_positions(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>, GeometryError> {
    let Some((exterior, interiors)) = rings.split_first() else {
        return Err(GeometryError::Empty { what: "polygon" });
    };

    let exterior = ring_from_positions(exterior)?;
    let interiors = interiors
        .iter()
        .map(|ring| ring_from_positions(ring))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Polygon::new(exterior, interiors))
}

fn ring_from_positions(positions: &[Vec<f64>]) -> Result<LineString<f64>, GeometryError> {
    if positions.len() < MIN_RING_POSITIONS {
        return Err(GeometryError::TooFewPositions {
            count: positions.len(),
        });
    }

    let coords = positions
        .iter()
        .map(|position| match position.as_slice() {
            [lng, lat, ..] if lng.is_finite() && lat.is_finite() => Ok(Coord { x: *lng, y: *lat }),
            [_, _, ..] => Err(GeometryError::NonFinite),
            short => Err(GeometryError::InvalidPosition {
                ordinates: short.len(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if coords.first() != coords.last() {
        return Err(GeometryError::UnclosedRing);
    }

    Ok(LineString::new(coords))
}

fn polygon_positions(polygon: &Polygon<f64>) -> Vec<Vec<Vec<f64>>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.coords().map(|c| vec![c.x, c.y]).collect())
        .collect()
}

/// Descriptive zone attributes. Opaque to resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneAttributes {
    /// Display name (e.g. "14th Precinct").
    pub name: String,
    /// Street address of the station house.
    pub address: Option<String>,
    /// Public contact number.
    pub phone: Option<String>,
    /// Operating hours keyed by day label (e.g. `"mon" -> "08:00-20:00"`).
    #[serde(default)]
    pub hours: BTreeMap<String, String>,
}

/// A precinct-equivalent zone.
///
/// Replaced wholesale when its dataset is reseeded; never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// Unique zone identifier.
    pub id: i64,
    /// Boundary geometry.
    pub geometry: Geometry,
    /// Bounding box covering `geometry`.
    pub bbox: BoundingBox,
    /// Vertex-mean centroid of the exterior ring(s).
    pub centroid: Point,
    /// Descriptive attributes.
    pub attributes: ZoneAttributes,
}

/// A sector within a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubZone {
    /// Identifier, unique within the parent zone.
    pub id: String,
    /// Owning zone identifier.
    pub zone_id: i64,
    /// Boundary geometry.
    pub geometry: Geometry,
    /// Bounding box covering `geometry`.
    pub bbox: BoundingBox,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"{"type":"Polygon","coordinates":[[[-74.0,40.7],[-73.9,40.7],[-73.9,40.8],[-74.0,40.8],[-74.0,40.7]]]}"#;

    #[test]
    fn parses_polygon_with_lng_lat_order() {
        let geometry = Geometry::from_geojson_str(SQUARE).unwrap();
        let Geometry::Polygon(polygon) = &geometry else {
            panic!("expected polygon, got {}", geometry.type_name());
        };
        let first = polygon.exterior().0[0];
        assert!((first.x - -74.0).abs() < f64::EPSILON);
        assert!((first.y - 40.7).abs() < f64::EPSILON);
        assert_eq!(Point::from(first), Point::new(40.7, -74.0));
    }

    #[test]
    fn parses_multipolygon() {
        let text = r#"{"type":"MultiPolygon","coordinates":[
            [[[0,0],[1,0],[1,1],[0,0]]],
            [[[5,5],[6,5],[6,6],[5,5]]]
        ]}"#;
        let geometry = Geometry::from_geojson_str(text).unwrap();
        assert_eq!(geometry.type_name(), "MultiPolygon");
        assert_eq!(geometry.polygons().len(), 2);
    }

    #[test]
    fn rejects_unclosed_ring() {
        let text = r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1]]]}"#;
        assert!(matches!(
            Geometry::from_geojson_str(text),
            Err(GeometryError::UnclosedRing)
        ));
    }

    #[test]
    fn rejects_short_ring() {
        let text = r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[0,0]]]}"#;
        assert!(matches!(
            Geometry::from_geojson_str(text),
            Err(GeometryError::TooFewPositions { count: 3 })
        ));
    }

    #[test]
    fn rejects_unsupported_type() {
        let text = r#"{"type":"Point","coordinates":[0,0]}"#;
        match Geometry::from_geojson_str(text) {
            Err(GeometryError::UnsupportedType(name)) => assert_eq!(name, "Point"),
            other => panic!("expected unsupported type error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_polygon_and_multipolygon() {
        assert!(matches!(
            Geometry::from_geojson_str(r#"{"type":"Polygon","coordinates":[]}"#),
            Err(GeometryError::Empty { what: "polygon" })
        ));
        assert!(matches!(
            Geometry::from_geojson_str(r#"{"type":"MultiPolygon","coordinates":[]}"#),
            Err(GeometryError::Empty {
                what: "multipolygon"
            })
        ));
    }

    #[test]
    fn rejects_garbage_text() {
        assert!(matches!(
            Geometry::from_geojson_str("not json"),
            Err(GeometryError::Json(_))
        ));
    }

    #[test]
    fn geometry_serializes_back_to_geojson() {
        let geometry = Geometry::from_geojson_str(SQUARE).unwrap();
        let text = geometry.to_geojson_string().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "Polygon");
        assert_eq!(value["coordinates"][0][1][0], -73.9);
        assert_eq!(value["coordinates"][0][1][1], 40.7);
    }

    #[test]
    fn bbox_wire_format_is_lat_first() {
        let bbox: BoundingBox = serde_json::from_str("[40.7, -74.0, 40.8, -73.9]").unwrap();
        assert!((bbox.min_lat() - 40.7).abs() < f64::EPSILON);
        assert!((bbox.min_lng() - -74.0).abs() < f64::EPSILON);
        assert_eq!(
            serde_json::to_string(&bbox).unwrap(),
            "[40.7,-74.0,40.8,-73.9]"
        );
    }

    #[test]
    fn bbox_rejects_inverted_edges() {
        assert!(BoundingBox::new(41.0, -74.0, 40.0, -73.0).is_err());
        assert!(BoundingBox::new(40.0, -73.0, 41.0, -74.0).is_err());
        assert!(BoundingBox::new(f64::NAN, -74.0, 41.0, -73.0).is_err());
        assert!(serde_json::from_str::<BoundingBox>("[2, 0, 1, 0]").is_err());
    }

    #[test]
    fn bbox_containment_is_inclusive() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        assert!(bbox.contains(Point::new(0.0, 0.0)));
        assert!(bbox.contains(Point::new(1.0, 1.0)));
        assert!(bbox.contains(Point::new(0.5, 1.0)));
        assert!(!bbox.contains(Point::new(1.000_001, 0.5)));
    }

    #[test]
    fn squared_distance_is_planar() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.squared_distance(&b) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn zone_attributes_default_hours() {
        let attrs: ZoneAttributes =
            serde_json::from_str(r#"{"name":"1st Precinct","address":null,"phone":"555"}"#)
                .unwrap();
        assert!(attrs.hours.is_empty());
        assert_eq!(attrs.phone.as_deref(), Some("555"));
    }
}
