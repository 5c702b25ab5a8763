//! Point containment, centroid and bounding-box primitives.
//!
//! All functions are total: a degenerate ring (fewer than four positions)
//! never matches and never panics, so one bad boundary cannot abort a scan
//! over the others.

use geo::{Coord, LineString};
use precinct_map_geography_models::{
    BoundingBox, Geometry, MIN_RING_POSITIONS, Point, SubZone, Zone, ZoneAttributes,
};

use crate::GeoError;

/// Inclusive bounding-box test.
#[must_use]
pub fn point_in_bounding_box(point: Point, bbox: &BoundingBox) -> bool {
    bbox.contains(point)
}

/// Crossing-number test against each polygon's exterior ring.
///
/// Nested rings are ignored. For a multipolygon the point is inside if any
/// constituent polygon contains it.
#[must_use]
pub fn point_in_polygon(point: Point, geometry: &Geometry) -> bool {
    geometry
        .polygons()
        .iter()
        .any(|polygon| point_in_ring(point, polygon.exterior()))
}

/// Crossing-number test against a single closed ring.
///
/// A horizontal ray is cast from the point towards increasing longitude;
/// each edge that straddles the point's latitude and crosses the ray to the
/// east toggles containment. Points exactly on an eastern edge count as
/// outside, points on a western edge count as inside, which makes the
/// result for a point on an edge shared by two neighbours deterministic.
#[must_use]
pub fn point_in_ring(point: Point, ring: &LineString<f64>) -> bool {
    let coords = &ring.0;
    if coords.len() < MIN_RING_POSITIONS {
        return false;
    }

    let mut inside = false;
    let mut j = coords.len() - 1;

    for i in 0..coords.len() {
        let Coord { x: xi, y: yi } = coords[i];
        let Coord { x: xj, y: yj } = coords[j];

        if (yi > point.lat) != (yj > point.lat) {
            let intersect = (xj - xi) * (point.lat - yi) / (yj - yi) + xi;
            if point.lng < intersect {
                inside = !inside;
            }
        }

        j = i;
    }

    inside
}

/// Distinct vertices of a ring (the closing duplicate dropped).
pub(crate) fn distinct_vertices(ring: &LineString<f64>) -> &[Coord<f64>] {
    let coords = ring.0.as_slice();
    match coords {
        [first, .., last] if first == last => &coords[..coords.len() - 1],
        _ => coords,
    }
}

/// Arithmetic mean of a ring's vertices, excluding the closing duplicate.
///
/// Not area-weighted, so it drifts towards densely-digitised edges on
/// irregular shapes. Returns `None` for an empty ring.
#[must_use]
pub fn compute_centroid(ring: &LineString<f64>) -> Option<Point> {
    mean_point(distinct_vertices(ring).iter())
}

/// Vertex-mean centroid across the exterior rings of every polygon.
#[must_use]
pub fn geometry_centroid(geometry: &Geometry) -> Option<Point> {
    mean_point(
        geometry
            .polygons()
            .iter()
            .flat_map(|polygon| distinct_vertices(polygon.exterior()).iter()),
    )
}

#[allow(clippy::cast_precision_loss)]
fn mean_point<'a>(coords: impl Iterator<Item = &'a Coord<f64>>) -> Option<Point> {
    let (count, sum_lng, sum_lat) = coords.fold((0usize, 0.0, 0.0), |(n, x, y), c| {
        (n + 1, x + c.x, y + c.y)
    });

    if count == 0 {
        return None;
    }

    let n = count as f64;
    Some(Point::new(sum_lat / n, sum_lng / n))
}

/// Min/max scan over every coordinate of every ring.
///
/// Returns `None` when there are no coordinates or any coordinate is not
/// finite.
#[must_use]
pub fn compute_bounding_box<'a>(
    rings: impl IntoIterator<Item = &'a LineString<f64>>,
) -> Option<BoundingBox> {
    let mut extent: Option<(f64, f64, f64, f64)> = None;

    for coord in rings.into_iter().flat_map(|ring| ring.0.iter()) {
        extent = Some(match extent {
            None => (coord.y, coord.x, coord.y, coord.x),
            Some((min_lat, min_lng, max_lat, max_lng)) => (
                min_lat.min(coord.y),
                min_lng.min(coord.x),
                max_lat.max(coord.y),
                max_lng.max(coord.x),
            ),
        });
    }

    let (min_lat, min_lng, max_lat, max_lng) = extent?;
    BoundingBox::new(min_lat, min_lng, max_lat, max_lng).ok()
}

/// Bounding box over all rings (exterior and nested) of a geometry.
#[must_use]
pub fn geometry_bounding_box(geometry: &Geometry) -> Option<BoundingBox> {
    compute_bounding_box(
        geometry
            .polygons()
            .iter()
            .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors())),
    )
}

/// Builds a [`Zone`], deriving its bounding box and centroid from the
/// geometry.
///
/// # Errors
///
/// Returns [`GeoError::EmptyGeometry`] if the geometry has no usable
/// coordinates.
pub fn build_zone(
    id: i64,
    geometry: Geometry,
    attributes: ZoneAttributes,
) -> Result<Zone, GeoError> {
    let (Some(bbox), Some(centroid)) = (
        geometry_bounding_box(&geometry),
        geometry_centroid(&geometry),
    ) else {
        return Err(GeoError::EmptyGeometry { id: id.to_string() });
    };

    Ok(Zone {
        id,
        geometry,
        bbox,
        centroid,
        attributes,
    })
}

/// Builds a [`SubZone`], deriving its bounding box from the geometry.
///
/// # Errors
///
/// Returns [`GeoError::EmptyGeometry`] if the geometry has no usable
/// coordinates.
pub fn build_sub_zone(id: String, zone_id: i64, geometry: Geometry) -> Result<SubZone, GeoError> {
    let Some(bbox) = geometry_bounding_box(&geometry) else {
        return Err(GeoError::EmptyGeometry { id });
    };

    Ok(SubZone {
        id,
        zone_id,
        geometry,
        bbox,
    })
}
