//! Linear-scan zone resolution.
//!
//! Each lookup filters by bounding box first and only runs the exact
//! crossing-number test on the survivors. Absence of a match is a normal
//! outcome and is reported as `None`.

use precinct_map_geography::{point_in_bounding_box, point_in_polygon};
use precinct_map_geography_models::{BoundingBox, Geometry, Point, SubZone, Zone};

/// Anything with a boundary and a bounding box covering it.
pub trait Region {
    /// Cheap rejection box; must cover [`Region::geometry`].
    fn bbox(&self) -> &BoundingBox;

    /// Exact boundary.
    fn geometry(&self) -> &Geometry;
}

impl Region for Zone {
    fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    fn geometry(&self) -> &Geometry {
        &self.geometry
    }
}

impl Region for SubZone {
    fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    fn geometry(&self) -> &Geometry {
        &self.geometry
    }
}

/// Counters describing how much work one lookup did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Regions considered.
    pub scanned: usize,
    /// Regions whose bounding box contained the point.
    pub bbox_candidates: usize,
    /// Exact polygon tests run.
    pub polygon_tests: usize,
    /// Regions whose polygon contained the point.
    pub matches: usize,
}

/// Two-stage containment scan, returning every match in input order.
pub fn containing<'a, R: Region>(
    point: Point,
    regions: impl IntoIterator<Item = &'a R>,
    stats: &mut ResolveStats,
) -> Vec<&'a R>
where
    R: 'a,
{
    let mut matches = Vec::new();

    for region in regions {
        stats.scanned += 1;

        if !point_in_bounding_box(point, region.bbox()) {
            continue;
        }
        stats.bbox_candidates += 1;

        stats.polygon_tests += 1;
        if point_in_polygon(point, region.geometry()) {
            stats.matches += 1;
            matches.push(region);
        }
    }

    matches
}

/// Resolves the zone containing `point`.
///
/// When overlapping zones both contain the point, the zone whose centroid
/// is closest (squared planar distance) wins; on an exact tie the earlier
/// zone in `zones` wins.
#[must_use]
pub fn resolve_zone(point: Point, zones: &[Zone]) -> Option<&Zone> {
    resolve_zone_with_stats(point, zones).0
}

/// [`resolve_zone`], also returning the work counters.
#[must_use]
pub fn resolve_zone_with_stats(point: Point, zones: &[Zone]) -> (Option<&Zone>, ResolveStats) {
    let mut stats = ResolveStats::default();
    let matches = containing(point, zones, &mut stats);

    let best = closest_centroid(point, matches.into_iter());

    if stats.matches > 1
        && let Some((zone, _)) = best
    {
        log::debug!(
            "{} overlapping zones contain ({}, {}); picked zone {} by centroid distance",
            stats.matches,
            point.lat,
            point.lng,
            zone.id
        );
    }

    log::trace!(
        "resolve ({}, {}): scanned={} bbox_candidates={} polygon_tests={} matches={}",
        point.lat,
        point.lng,
        stats.scanned,
        stats.bbox_candidates,
        stats.polygon_tests,
        stats.matches
    );

    (best.map(|(zone, _)| zone), stats)
}

/// Finds the sub-zone containing `point`.
///
/// When `parent` is given only that zone's sub-zones are considered.
/// Sub-zones of one parent do not overlap, so the first match wins.
#[must_use]
pub fn find_sub_zone(point: Point, sub_zones: &[SubZone], parent: Option<i64>) -> Option<&SubZone> {
    let mut stats = ResolveStats::default();
    let scoped = sub_zones
        .iter()
        .filter(|s| parent.is_none_or(|zone_id| s.zone_id == zone_id));

    containing(point, scoped, &mut stats).into_iter().next()
}

/// Returns the zone with the nearest centroid, if it lies within
/// `max_squared_distance` (squared degrees).
///
/// Ties keep the earlier zone in `zones`.
#[must_use]
pub fn find_nearest(point: Point, zones: &[Zone], max_squared_distance: f64) -> Option<&Zone> {
    let (zone, distance) = closest_centroid(point, zones.iter())?;

    if distance <= max_squared_distance {
        Some(zone)
    } else {
        log::debug!(
            "Nearest zone {} to ({}, {}) is beyond threshold ({distance} > {max_squared_distance})",
            zone.id,
            point.lat,
            point.lng
        );
        None
    }
}

fn closest_centroid<'a>(
    point: Point,
    zones: impl Iterator<Item = &'a Zone>,
) -> Option<(&'a Zone, f64)> {
    zones.fold(None, |best, zone| {
        let distance = point.squared_distance(&zone.centroid);
        if distance.is_nan() {
            return best;
        }
        match best {
            Some((_, best_distance)) if distance >= best_distance => best,
            _ => Some((zone, distance)),
        }
    })
}

#[cfg(test)]
mod tests {
    use geo::{Coord, LineString, Polygon};
    use precinct_map_geography::build_zone;
    use precinct_map_geography_models::ZoneAttributes;

    use super::*;

    fn rect(id: i64, x0: f64, y0: f64, w: f64, h: f64) -> Zone {
        let ring = LineString::new(vec![
            Coord { x: x0, y: y0 },
            Coord { x: x0 + w, y: y0 },
            Coord {
                x: x0 + w,
                y: y0 + h,
            },
            Coord { x: x0, y: y0 + h },
            Coord { x: x0, y: y0 },
        ]);
        build_zone(
            id,
            Geometry::Polygon(Polygon::new(ring, vec![])),
            ZoneAttributes {
                name: format!("Zone {id}"),
                ..ZoneAttributes::default()
            },
        )
        .unwrap()
    }

    /// Four quarter-degree cells; every edge is exactly representable.
    fn grid() -> Vec<Zone> {
        vec![
            rect(1, -74.0, 40.5, 0.25, 0.25),
            rect(2, -73.75, 40.5, 0.25, 0.25),
            rect(3, -74.0, 40.75, 0.25, 0.25),
            rect(4, -73.75, 40.75, 0.25, 0.25),
        ]
    }

    #[test]
    fn interior_points_resolve_to_their_zone() {
        let zones = grid();
        let cases = [
            (Point::new(40.625, -73.875), 1),
            (Point::new(40.625, -73.625), 2),
            (Point::new(40.875, -73.875), 3),
            (Point::new(40.875, -73.625), 4),
        ];
        for (point, expected) in cases {
            assert_eq!(resolve_zone(point, &zones).map(|z| z.id), Some(expected));
        }
    }

    #[test]
    fn outside_every_bbox_runs_no_polygon_test() {
        let zones = grid();
        let (zone, stats) = resolve_zone_with_stats(Point::new(41.5, -72.0), &zones);
        assert!(zone.is_none());
        assert_eq!(stats.scanned, 4);
        assert_eq!(stats.bbox_candidates, 0);
        assert_eq!(stats.polygon_tests, 0);
    }

    #[test]
    fn only_bbox_candidates_are_polygon_tested() {
        let zones = grid();
        let (_, stats) = resolve_zone_with_stats(Point::new(40.625, -73.875), &zones);
        assert_eq!(stats.bbox_candidates, 1);
        assert_eq!(stats.polygon_tests, 1);
        assert_eq!(stats.matches, 1);
    }

    #[test]
    fn shared_edge_resolves_deterministically_to_eastern_zone() {
        let zones = grid();
        let on_edge = Point::new(40.625, -73.75);
        for _ in 0..3 {
            let (zone, stats) = resolve_zone_with_stats(on_edge, &zones);
            assert_eq!(zone.map(|z| z.id), Some(2));
            assert_eq!(stats.bbox_candidates, 2);
        }
    }

    #[test]
    fn overlap_is_broken_by_centroid_distance() {
        let big = rect(10, 0.0, 0.0, 10.0, 10.0);
        let small = rect(11, 0.0, 0.0, 2.0, 2.0);
        let zones = vec![big, small];
        let (zone, stats) = resolve_zone_with_stats(Point::new(1.0, 1.0), &zones);
        assert_eq!(stats.matches, 2);
        assert_eq!(zone.map(|z| z.id), Some(11));
    }

    #[test]
    fn exact_centroid_tie_keeps_input_order() {
        let a = rect(20, 0.0, 0.0, 2.0, 2.0);
        let b = rect(21, 0.0, 0.0, 2.0, 2.0);
        let zones = vec![a, b];
        assert_eq!(resolve_zone(Point::new(0.5, 0.5), &zones).map(|z| z.id), Some(20));
    }

    #[test]
    fn malformed_zone_does_not_block_others() {
        let mut broken = rect(30, 0.0, 0.0, 1.0, 1.0);
        if let Geometry::Polygon(polygon) = &mut broken.geometry {
            *polygon = Polygon::new(LineString::new(vec![]), vec![]);
        }
        let good = rect(31, 0.0, 0.0, 1.0, 1.0);
        let zones = vec![broken, good];
        assert_eq!(resolve_zone(Point::new(0.5, 0.5), &zones).map(|z| z.id), Some(31));
    }

    #[test]
    fn find_nearest_respects_threshold() {
        let zones = grid();
        let gap = Point::new(40.45, -73.875);

        let nearest = find_nearest(gap, &zones, 0.05).map(|z| z.id);
        assert_eq!(nearest, Some(1));

        assert!(find_nearest(gap, &zones, 0.01).is_none());
        assert!(find_nearest(gap, &[], 1.0).is_none());
    }

    #[test]
    fn find_nearest_never_exceeds_threshold() {
        let zones = grid();
        for (lat, lng) in [(40.0, -74.0), (40.45, -74.1), (41.1, -73.4), (40.6, -73.9)] {
            let point = Point::new(lat, lng);
            for threshold in [0.0, 0.01, 0.05, 0.5] {
                if let Some(zone) = find_nearest(point, &zones, threshold) {
                    assert!(point.squared_distance(&zone.centroid) <= threshold);
                }
            }
        }
    }

    #[test]
    fn find_sub_zone_scopes_to_parent() {
        let sub = |id: &str, zone_id: i64, x0: f64| {
            let zone = rect(zone_id, x0, 0.0, 1.0, 1.0);
            SubZone {
                id: id.to_string(),
                zone_id,
                geometry: zone.geometry,
                bbox: zone.bbox,
            }
        };
        let sub_zones = vec![sub("A", 1, 0.0), sub("B", 2, 0.0), sub("C", 2, 1.0)];
        let point = Point::new(0.5, 0.5);

        assert_eq!(find_sub_zone(point, &sub_zones, None).map(|s| s.id.as_str()), Some("A"));
        assert_eq!(
            find_sub_zone(point, &sub_zones, Some(2)).map(|s| s.id.as_str()),
            Some("B")
        );
        assert!(find_sub_zone(point, &sub_zones, Some(3)).is_none());
    }
}
