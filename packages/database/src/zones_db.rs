//! Zone and sub-zone boundary storage.
//!
//! Boundaries are stored as `GeoJSON` TEXT with the bounding box (and, for
//! zones, the centroid) in plain DOUBLE columns. Loading validates each
//! geometry again; rows that fail are skipped with a warning so one bad
//! boundary never hides the rest.

use std::collections::BTreeMap;

use duckdb::Connection;
use precinct_map_geography_models::{
    BoundingBox, Geometry, Point, SubZone, Zone, ZoneAttributes,
};

use crate::DbError;

/// Inserts zones. Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError`] if serialization or any insert fails (including a
/// duplicate zone id).
pub fn insert_zones(conn: &Connection, zones: &[Zone]) -> Result<u64, DbError> {
    let mut stmt = conn.prepare(
        "INSERT INTO zones (
            id, name, address, phone, hours_json, boundary_geojson,
            min_lat, min_lng, max_lat, max_lng, centroid_lat, centroid_lng
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )?;

    let mut inserted = 0u64;

    for zone in zones {
        let hours_json = serde_json::to_string(&zone.attributes.hours)?;
        let geojson = zone.geometry.to_geojson_string()?;

        stmt.execute(duckdb::params![
            zone.id,
            zone.attributes.name,
            zone.attributes.address,
            zone.attributes.phone,
            hours_json,
            geojson,
            zone.bbox.min_lat(),
            zone.bbox.min_lng(),
            zone.bbox.max_lat(),
            zone.bbox.max_lng(),
            zone.centroid.lat,
            zone.centroid.lng,
        ])?;
        inserted += 1;
    }

    log::debug!("Inserted {inserted} zones");
    Ok(inserted)
}

/// Inserts sub-zones. Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError`] if serialization or any insert fails (including a
/// duplicate `(zone_id, id)` pair).
pub fn insert_sub_zones(conn: &Connection, sub_zones: &[SubZone]) -> Result<u64, DbError> {
    let mut stmt = conn.prepare(
        "INSERT INTO sub_zones (
            id, zone_id, boundary_geojson, min_lat, min_lng, max_lat, max_lng
        ) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )?;

    let mut inserted = 0u64;

    for sub_zone in sub_zones {
        let geojson = sub_zone.geometry.to_geojson_string()?;

        stmt.execute(duckdb::params![
            sub_zone.id,
            sub_zone.zone_id,
            geojson,
            sub_zone.bbox.min_lat(),
            sub_zone.bbox.min_lng(),
            sub_zone.bbox.max_lat(),
            sub_zone.bbox.max_lng(),
        ])?;
        inserted += 1;
    }

    log::debug!("Inserted {inserted} sub-zones");
    Ok(inserted)
}

/// Deletes every zone.
///
/// # Errors
///
/// Returns [`DbError`] if the delete fails.
pub fn delete_zones(conn: &Connection) -> Result<usize, DbError> {
    Ok(conn.execute("DELETE FROM zones", [])?)
}

/// Deletes every sub-zone.
///
/// # Errors
///
/// Returns [`DbError`] if the delete fails.
pub fn delete_sub_zones(conn: &Connection) -> Result<usize, DbError> {
    Ok(conn.execute("DELETE FROM sub_zones", [])?)
}

/// Loads every valid zone, ordered by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails. Malformed rows are skipped.
pub fn load_zones(conn: &Connection) -> Result<Vec<Zone>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, address, phone, hours_json, boundary_geojson,
                min_lat, min_lng, max_lat, max_lng, centroid_lat, centroid_lng
         FROM zones ORDER BY id",
    )?;
    let mut rows = stmt.query([])?;
    let mut zones = Vec::new();

    while let Some(row) = rows.next()? {
        let id: i64 = row.get(0)?;
        let name: String = row.get(1)?;
        let address: Option<String> = row.get(2)?;
        let phone: Option<String> = row.get(3)?;
        let hours_json: String = row.get(4)?;
        let geojson: String = row.get(5)?;
        let bbox: [f64; 4] = [row.get(6)?, row.get(7)?, row.get(8)?, row.get(9)?];
        let centroid = Point::new(row.get(10)?, row.get(11)?);

        let parsed = serde_json::from_str::<BTreeMap<String, String>>(&hours_json)
            .map_err(DbError::from)
            .and_then(|hours| {
                Ok(Zone {
                    id,
                    geometry: Geometry::from_geojson_str(&geojson)?,
                    bbox: BoundingBox::try_from(bbox)?,
                    centroid,
                    attributes: ZoneAttributes {
                        name,
                        address,
                        phone,
                        hours,
                    },
                })
            });

        match parsed {
            Ok(zone) => zones.push(zone),
            Err(e) => log::warn!("Skipping stored zone {id}: {e}"),
        }
    }

    Ok(zones)
}

/// Loads every valid sub-zone, ordered by parent zone then id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails. Malformed rows are skipped.
pub fn load_sub_zones(conn: &Connection) -> Result<Vec<SubZone>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, zone_id, boundary_geojson, min_lat, min_lng, max_lat, max_lng
         FROM sub_zones ORDER BY zone_id, id",
    )?;
    let mut rows = stmt.query([])?;
    let mut sub_zones = Vec::new();

    while let Some(row) = rows.next()? {
        let id: String = row.get(0)?;
        let zone_id: i64 = row.get(1)?;
        let geojson: String = row.get(2)?;
        let bbox: [f64; 4] = [row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?];

        let parsed = Geometry::from_geojson_str(&geojson).and_then(|geometry| {
            Ok(SubZone {
                id: id.clone(),
                zone_id,
                geometry,
                bbox: BoundingBox::try_from(bbox)?,
            })
        });

        match parsed {
            Ok(sub_zone) => sub_zones.push(sub_zone),
            Err(e) => log::warn!("Skipping stored sub-zone {zone_id}/{id}: {e}"),
        }
    }

    Ok(sub_zones)
}

/// Number of stored zones.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn count_zones(conn: &Connection) -> Result<u64, DbError> {
    count(conn, "SELECT COUNT(*) FROM zones")
}

/// Number of stored sub-zones.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn count_sub_zones(conn: &Connection) -> Result<u64, DbError> {
    count(conn, "SELECT COUNT(*) FROM sub_zones")
}

pub(crate) fn count(conn: &Connection, sql: &str) -> Result<u64, DbError> {
    let count: i64 = conn.prepare(sql)?.query_row([], |row| row.get(0))?;
    u64::try_from(count).map_err(|e| DbError::Conversion {
        message: format!("negative row count {count}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use geo::{Coord, LineString, Polygon};

    use super::*;
    use crate::DatasetStore;

    fn square(x0: f64, y0: f64) -> Geometry {
        Geometry::Polygon(Polygon::new(
            LineString::new(vec![
                Coord { x: x0, y: y0 },
                Coord { x: x0 + 1.0, y: y0 },
                Coord {
                    x: x0 + 1.0,
                    y: y0 + 1.0,
                },
                Coord { x: x0, y: y0 + 1.0 },
                Coord { x: x0, y: y0 },
            ]),
            vec![],
        ))
    }

    fn zone(id: i64) -> Zone {
        #[allow(clippy::cast_precision_loss)]
        let x0 = id as f64;
        Zone {
            id,
            geometry: square(x0, 0.0),
            bbox: BoundingBox::new(0.0, x0, 1.0, x0 + 1.0).unwrap(),
            centroid: Point::new(0.5, x0 + 0.5),
            attributes: ZoneAttributes {
                name: format!("Precinct {id}"),
                address: Some("1 Police Plaza".to_string()),
                phone: None,
                hours: BTreeMap::from([("mon".to_string(), "24h".to_string())]),
            },
        }
    }

    #[test]
    fn zones_survive_a_store_round_trip() {
        let store = DatasetStore::open_in_memory().unwrap();
        let conn = store.connection().unwrap();

        let zones = vec![zone(7), zone(3)];
        assert_eq!(insert_zones(conn, &zones).unwrap(), 2);
        assert_eq!(count_zones(conn).unwrap(), 2);

        let loaded = load_zones(conn).unwrap();
        assert_eq!(loaded, vec![zone(3), zone(7)]);
    }

    #[test]
    fn malformed_rows_are_skipped_on_load() {
        let store = DatasetStore::open_in_memory().unwrap();
        let conn = store.connection().unwrap();
        insert_zones(conn, &[zone(1)]).unwrap();
        conn.execute(
            "INSERT INTO zones VALUES (2, 'Broken', NULL, NULL, '{}',
                '{\"type\":\"Point\",\"coordinates\":[0,0]}', 0, 0, 1, 1, 0.5, 0.5)",
            [],
        )
        .unwrap();

        let loaded = load_zones(conn).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, 1);
    }

    #[test]
    fn sub_zones_load_in_parent_order() {
        let store = DatasetStore::open_in_memory().unwrap();
        let conn = store.connection().unwrap();

        let sub = |id: &str, zone_id: i64| SubZone {
            id: id.to_string(),
            zone_id,
            geometry: square(0.0, 0.0),
            bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0).unwrap(),
        };
        insert_sub_zones(conn, &[sub("2-B", 2), sub("2-A", 2), sub("1-A", 1)]).unwrap();

        let ids: Vec<String> = load_sub_zones(conn).unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["1-A", "2-A", "2-B"]);
    }

    #[test]
    fn delete_clears_tables() {
        let store = DatasetStore::open_in_memory().unwrap();
        let conn = store.connection().unwrap();
        insert_zones(conn, &[zone(1), zone(2)]).unwrap();

        assert_eq!(delete_zones(conn).unwrap(), 2);
        assert_eq!(count_zones(conn).unwrap(), 0);
        assert_eq!(count_sub_zones(conn).unwrap(), 0);
    }

    #[test]
    fn duplicate_zone_id_is_rejected() {
        let store = DatasetStore::open_in_memory().unwrap();
        let conn = store.connection().unwrap();
        assert!(insert_zones(conn, &[zone(1), zone(1)]).is_err());
    }
}
