//! Derives two sectors from a zone boundary.
//!
//! Used when a dataset ships zones without sector boundaries. Neither
//! strategy is a true administrative partition; they exist so that every
//! zone has addressable halves until authoritative sector data arrives.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use precinct_map_geography_models::{Geometry, SubZone, Zone};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::GeoError;
use crate::primitives::distinct_vertices;

/// How a zone boundary is cut into two sub-zones.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SplitStrategy {
    /// Cut each exterior ring's vertex list at its midpoint index.
    ///
    /// Both halves share the chord from the first vertex to the middle
    /// vertex. Exact for convex shapes whose vertices are evenly spread,
    /// wrong for concave or irregular ones. Kept for compatibility with
    /// datasets seeded before [`SplitStrategy::PrincipalAxis`] existed.
    VertexBisect,
    /// Cut along the line through the vertex centroid, perpendicular to
    /// the direction of greatest vertex spread.
    #[default]
    PrincipalAxis,
}

/// Splits a zone into the sub-zones `"<id>-A"` and `"<id>-B"`.
///
/// Every constituent polygon of the zone is split and the pieces are
/// grouped by side, so a multipolygon zone yields (possibly multipolygon)
/// halves.
///
/// # Errors
///
/// Returns [`GeoError::CannotSplit`] if a side ends up without a valid
/// ring (fewer than three distinct vertices), or if
/// [`SplitStrategy::VertexBisect`] meets a ring with fewer than four
/// distinct vertices.
pub fn derive_sub_zones(zone: &Zone, strategy: SplitStrategy) -> Result<Vec<SubZone>, GeoError> {
    let cannot_split = |reason: String| GeoError::CannotSplit {
        zone_id: zone.id,
        reason,
    };

    let (side_a, side_b) = match strategy {
        SplitStrategy::VertexBisect => {
            log::debug!("Zone {}: deriving sub-zones by vertex bisection", zone.id);
            bisect_vertices(&zone.geometry).map_err(cannot_split)?
        }
        SplitStrategy::PrincipalAxis => split_principal_axis(&zone.geometry),
    };

    let a = pieces_to_geometry(side_a).ok_or_else(|| cannot_split("side A is empty".into()))?;
    let b = pieces_to_geometry(side_b).ok_or_else(|| cannot_split("side B is empty".into()))?;

    Ok(vec![
        crate::build_sub_zone(format!("{}-A", zone.id), zone.id, a)?,
        crate::build_sub_zone(format!("{}-B", zone.id), zone.id, b)?,
    ])
}

type Pieces = Vec<Vec<Coord<f64>>>;

fn bisect_vertices(geometry: &Geometry) -> Result<(Pieces, Pieces), String> {
    let mut side_a = Vec::new();
    let mut side_b = Vec::new();

    for polygon in geometry.polygons() {
        let vertices = distinct_vertices(polygon.exterior());
        if vertices.len() < 4 {
            return Err(format!(
                "vertex bisection needs at least 4 distinct vertices, found {}",
                vertices.len()
            ));
        }

        let mid = vertices.len() / 2;

        side_a.push(vertices[..=mid].to_vec());

        let mut second = vertices[mid..].to_vec();
        second.push(vertices[0]);
        side_b.push(second);
    }

    Ok((side_a, side_b))
}

#[allow(clippy::cast_precision_loss)]
fn split_principal_axis(geometry: &Geometry) -> (Pieces, Pieces) {
    let vertices: Vec<Coord<f64>> = geometry
        .polygons()
        .iter()
        .flat_map(|polygon| distinct_vertices(polygon.exterior()).iter().copied())
        .collect();

    if vertices.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let n = vertices.len() as f64;
    let cx = vertices.iter().map(|c| c.x).sum::<f64>() / n;
    let cy = vertices.iter().map(|c| c.y).sum::<f64>() / n;

    let (sxx, syy, sxy) = vertices.iter().fold((0.0, 0.0, 0.0), |(xx, yy, xy), c| {
        let dx = c.x - cx;
        let dy = c.y - cy;
        (dx.mul_add(dx, xx), dy.mul_add(dy, yy), dx.mul_add(dy, xy))
    });

    let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    let (ay, ax) = theta.sin_cos();
    let side = |c: &Coord<f64>| (c.x - cx).mul_add(ax, (c.y - cy) * ay);

    let mut side_a = Vec::new();
    let mut side_b = Vec::new();

    for polygon in geometry.polygons() {
        let ring = distinct_vertices(polygon.exterior());

        let a = clip_half_plane(ring, side);
        if a.len() >= 3 {
            side_a.push(a);
        }

        let b = clip_half_plane(ring, |c| -side(c));
        if b.len() >= 3 {
            side_b.push(b);
        }
    }

    (side_a, side_b)
}

/// Sutherland-Hodgman clip of an open ring against `signed(c) >= 0`.
fn clip_half_plane(
    vertices: &[Coord<f64>],
    signed: impl Fn(&Coord<f64>) -> f64,
) -> Vec<Coord<f64>> {
    let mut out = Vec::with_capacity(vertices.len() + 2);

    let Some(&last) = vertices.last() else {
        return out;
    };

    let mut prev = last;
    let mut prev_d = signed(&prev);

    for &cur in vertices {
        let cur_d = signed(&cur);

        if (cur_d >= 0.0) != (prev_d >= 0.0) {
            let t = prev_d / (prev_d - cur_d);
            out.push(Coord {
                x: t.mul_add(cur.x - prev.x, prev.x),
                y: t.mul_add(cur.y - prev.y, prev.y),
            });
        }
        if cur_d >= 0.0 {
            out.push(cur);
        }

        prev = cur;
        prev_d = cur_d;
    }

    out.dedup();
    if out.len() > 1 && out.first() == out.last() {
        out.pop();
    }

    out
}

fn pieces_to_geometry(pieces: Pieces) -> Option<Geometry> {
    let mut polygons: Vec<Polygon<f64>> = pieces
        .into_iter()
        .filter(|piece| piece.len() >= 3)
        .map(|mut piece| {
            piece.push(piece[0]);
            Polygon::new(LineString::new(piece), vec![])
        })
        .collect();

    match polygons.len() {
        0 => None,
        1 => polygons.pop().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(MultiPolygon::new(polygons))),
    }
}

#[cfg(test)]
mod tests {
    use precinct_map_geography_models::{Point, ZoneAttributes};

    use super::*;
    use crate::{build_zone, point_in_polygon};

    fn zone_from(id: i64, points: &[(f64, f64)]) -> Zone {
        let ring = LineString::new(points.iter().map(|&(x, y)| Coord { x, y }).collect());
        build_zone(
            id,
            Geometry::Polygon(Polygon::new(ring, vec![])),
            ZoneAttributes::default(),
        )
        .unwrap()
    }

    fn unit_square() -> Zone {
        zone_from(
            1,
            &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)],
        )
    }

    fn owners(sub_zones: &[SubZone], point: Point) -> Vec<&str> {
        sub_zones
            .iter()
            .filter(|s| point_in_polygon(point, &s.geometry))
            .map(|s| s.id.as_str())
            .collect()
    }

    #[test]
    fn vertex_bisect_cuts_square_along_diagonal() {
        let subs = derive_sub_zones(&unit_square(), SplitStrategy::VertexBisect).unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].id, "1-A");
        assert_eq!(subs[1].id, "1-B");
        assert!(subs.iter().all(|s| s.zone_id == 1));

        assert_eq!(owners(&subs, Point::new(0.25, 0.75)), vec!["1-A"]);
        assert_eq!(owners(&subs, Point::new(0.75, 0.25)), vec!["1-B"]);
    }

    #[test]
    fn vertex_bisect_refuses_triangles() {
        let triangle = zone_from(2, &[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (0.0, 0.0)]);
        assert!(matches!(
            derive_sub_zones(&triangle, SplitStrategy::VertexBisect),
            Err(GeoError::CannotSplit { zone_id: 2, .. })
        ));
    }

    #[test]
    fn principal_axis_halves_long_rectangle() {
        let rect = zone_from(
            3,
            &[(0.0, 0.0), (4.0, 0.0), (4.0, 1.0), (0.0, 1.0), (0.0, 0.0)],
        );
        let subs = derive_sub_zones(&rect, SplitStrategy::PrincipalAxis).unwrap();

        assert_eq!(owners(&subs, Point::new(0.5, 3.0)), vec!["3-A"]);
        assert_eq!(owners(&subs, Point::new(0.5, 1.0)), vec!["3-B"]);

        let a = subs[0].bbox;
        assert!((a.min_lng() - 2.0).abs() < 1e-9);
        assert!((a.max_lng() - 4.0).abs() < 1e-9);
        let b = subs[1].bbox;
        assert!((b.min_lng() - 0.0).abs() < 1e-9);
        assert!((b.max_lng() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn principal_axis_handles_concave_shapes() {
        let ell = zone_from(
            4,
            &[
                (0.0, 0.0),
                (2.0, 0.0),
                (2.0, 1.0),
                (1.0, 1.0),
                (1.0, 2.0),
                (0.0, 2.0),
                (0.0, 0.0),
            ],
        );
        let subs = derive_sub_zones(&ell, SplitStrategy::PrincipalAxis).unwrap();
        assert_eq!(subs.len(), 2);

        for point in [
            Point::new(0.5, 1.5),
            Point::new(1.5, 0.5),
            Point::new(0.25, 0.75),
            Point::new(0.75, 0.25),
        ] {
            assert_eq!(
                owners(&subs, point).len(),
                1,
                "point {point:?} should belong to exactly one half"
            );
        }
        assert!(owners(&subs, Point::new(1.5, 1.5)).is_empty());
    }

    #[test]
    fn principal_axis_splits_multipolygons_per_side() {
        let square = |x0: f64| {
            Polygon::new(
                LineString::new(vec![
                    Coord { x: x0, y: 0.0 },
                    Coord { x: x0 + 1.0, y: 0.0 },
                    Coord { x: x0 + 1.0, y: 1.0 },
                    Coord { x: x0, y: 1.0 },
                    Coord { x: x0, y: 0.0 },
                ]),
                vec![],
            )
        };
        let zone = build_zone(
            5,
            Geometry::MultiPolygon(MultiPolygon::new(vec![square(0.0), square(10.0)])),
            ZoneAttributes::default(),
        )
        .unwrap();

        let subs = derive_sub_zones(&zone, SplitStrategy::PrincipalAxis).unwrap();
        assert_eq!(owners(&subs, Point::new(0.5, 10.5)), vec!["5-A"]);
        assert_eq!(owners(&subs, Point::new(0.5, 0.5)), vec!["5-B"]);
    }

    #[test]
    fn strategy_parses_from_snake_case() {
        assert_eq!(
            "vertex_bisect".parse::<SplitStrategy>().unwrap(),
            SplitStrategy::VertexBisect
        );
        assert_eq!(SplitStrategy::PrincipalAxis.as_ref(), "principal_axis");
        assert_eq!(SplitStrategy::default(), SplitStrategy::PrincipalAxis);
    }
}
