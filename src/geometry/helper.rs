//! Thin wrappers over the planar geometry engine.
//!
//! All polygon algebra (union, difference, intersection, validity,
//! point-in-polygon) is delegated to the `geo` crate; nothing here
//! reimplements it.

use geo::{coord, BooleanOps, Coord, MultiPolygon, Polygon, Rect, Relate};
use wkt::{ToWkt, Wkt};

use crate::error::{OsmemoryError, Result};
use crate::object::to_degrees;

/// Coordinate in degrees from a fixed-point (lat, lon) pair.
#[inline]
pub(crate) fn coord_of(lat: i32, lon: i32) -> Coord<f64> {
    coord! { x: to_degrees(lon), y: to_degrees(lat) }
}

/// Axis-aligned box polygon from degree extents.
pub(crate) fn box_rect(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Rect<f64> {
    Rect::new(coord! { x: min_x, y: min_y }, coord! { x: max_x, y: max_y })
}

pub(crate) fn subtract(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    a.difference(b)
}

pub(crate) fn union(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    a.union(b)
}

/// Topological equality, ignoring ring direction and start point.
pub fn equals_topo(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
    a.relate(b).is_equal_topo()
}

/// Parse a WKT `POLYGON` or `MULTIPOLYGON` string.
pub fn multipolygon_from_wkt(text: &str) -> Result<MultiPolygon<f64>> {
    let parsed: Wkt<f64> = text
        .parse()
        .map_err(|_| OsmemoryError::WktParse(text.to_owned()))?;
    match parsed {
        Wkt::Polygon(p) => {
            let polygon: Polygon<f64> = p.into();
            Ok(MultiPolygon::new(vec![polygon]))
        }
        Wkt::MultiPolygon(mp) => Ok(mp.into()),
        _ => Err(OsmemoryError::WktParse(text.to_owned())),
    }
}

pub fn to_wkt_string(geom: &MultiPolygon<f64>) -> String {
    geom.wkt_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wkt_round_trip() {
        let mp = multipolygon_from_wkt("POLYGON((0 0,10 0,10 10,0 10,0 0))").unwrap();
        assert_eq!(mp.0.len(), 1);
        let back = multipolygon_from_wkt(&to_wkt_string(&mp)).unwrap();
        assert!(equals_topo(&mp, &back));
    }

    #[test]
    fn wkt_rejects_non_area_geometry() {
        assert!(multipolygon_from_wkt("POINT(1 1)").is_err());
        assert!(multipolygon_from_wkt("nonsense").is_err());
    }

    #[test]
    fn topo_equality_ignores_ring_rotation() {
        let a = multipolygon_from_wkt("POLYGON((0 0,10 0,10 10,0 10,0 0))").unwrap();
        let b = multipolygon_from_wkt("POLYGON((10 0,10 10,0 10,0 0,10 0))").unwrap();
        assert!(equals_topo(&a, &b));
    }
}
