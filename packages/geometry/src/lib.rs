#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Planar geometry over parcel footprints.
//!
//! Coordinates are Web Mercator meters, so every computation here is plain
//! planar math on the polygon's outer ring. No geodesic corrections are
//! attempted; results are only used to compare candidate parcels against
//! each other and to build spatial query payloads.

use parcel_map_models::{Envelope, Point, Polygon};

/// Planar shoelace area of the polygon's outer ring, in square meters.
///
/// Handles both open and closed rings (a repeated closing vertex contributes
/// nothing). Returns `None` when there is no outer ring or it has fewer than
/// 3 points.
#[must_use]
pub fn area(polygon: &Polygon) -> Option<f64> {
    let ring = polygon.outer_ring()?;
    if ring.len() < 3 {
        return None;
    }
    let mut doubled = 0.0;
    for i in 0..ring.len() {
        let [x1, y1] = ring[i];
        let [x2, y2] = ring[(i + 1) % ring.len()];
        doubled += x1 * y2 - x2 * y1;
    }
    Some(doubled.abs() / 2.0)
}

/// Axis-aligned bounding box of the polygon's outer ring.
///
/// Returns `None` when there is no outer ring or it has fewer than 3 points.
#[must_use]
pub fn envelope(polygon: &Polygon) -> Option<Envelope> {
    let ring = polygon.outer_ring()?;
    if ring.len() < 3 {
        return None;
    }
    let mut env = Envelope {
        xmin: f64::INFINITY,
        ymin: f64::INFINITY,
        xmax: f64::NEG_INFINITY,
        ymax: f64::NEG_INFINITY,
    };
    for [x, y] in ring {
        env.xmin = env.xmin.min(*x);
        env.ymin = env.ymin.min(*y);
        env.xmax = env.xmax.max(*x);
        env.ymax = env.ymax.max(*y);
    }
    Some(env)
}

/// Representative point for the parcel: the midpoint of its bounding
/// envelope, not the center of mass. Stable under vertex density changes,
/// which matters because it doubles as a cache key for point-in-polygon
/// probes.
#[must_use]
pub fn centroid(polygon: &Polygon) -> Option<Point> {
    let env = envelope(polygon)?;
    Some(Point {
        x: env.xmin.midpoint(env.xmax),
        y: env.ymin.midpoint(env.ymax),
    })
}

/// Copy of the polygon with every coordinate rounded to whole meters and
/// consecutive duplicate vertices collapsed.
///
/// Sub-meter precision is noise at parcel scale and rounding keeps encoded
/// geometry payloads small enough for the county services' request limits.
#[must_use]
pub fn round_rings(polygon: &Polygon) -> Polygon {
    let rings = polygon
        .rings
        .iter()
        .map(|ring| {
            let mut rounded: Vec<[f64; 2]> = Vec::with_capacity(ring.len());
            for [x, y] in ring {
                let vertex = [x.round(), y.round()];
                if rounded.last() != Some(&vertex) {
                    rounded.push(vertex);
                }
            }
            rounded
        })
        .collect();
    Polygon { rings }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square_closed() -> Polygon {
        Polygon {
            rings: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]],
        }
    }

    fn unit_square_open() -> Polygon {
        Polygon {
            rings: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]],
        }
    }

    #[test]
    fn area_of_unit_square_is_one() {
        assert!((area(&unit_square_closed()).unwrap() - 1.0).abs() < f64::EPSILON);
        assert!((area(&unit_square_open()).unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn area_is_orientation_independent() {
        let clockwise = Polygon {
            rings: vec![vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]],
        };
        assert!((area(&clockwise).unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn degenerate_rings_have_no_area() {
        assert_eq!(area(&Polygon { rings: vec![] }), None);
        assert_eq!(area(&Polygon { rings: vec![vec![]] }), None);
        assert_eq!(
            area(&Polygon {
                rings: vec![vec![[0.0, 0.0], [1.0, 1.0]]],
            }),
            None
        );
    }

    #[test]
    fn envelope_of_unit_square() {
        let env = envelope(&unit_square_open()).unwrap();
        assert!((env.xmin - 0.0).abs() < f64::EPSILON);
        assert!((env.ymin - 0.0).abs() < f64::EPSILON);
        assert!((env.xmax - 1.0).abs() < f64::EPSILON);
        assert!((env.ymax - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn centroid_is_envelope_midpoint_not_center_of_mass() {
        // L-shaped ring whose center of mass sits well away from (2, 2).
        let polygon = Polygon {
            rings: vec![vec![
                [0.0, 0.0],
                [4.0, 0.0],
                [4.0, 1.0],
                [1.0, 1.0],
                [1.0, 4.0],
                [0.0, 4.0],
            ]],
        };
        let point = centroid(&polygon).unwrap();
        assert!((point.x - 2.0).abs() < f64::EPSILON);
        assert!((point.y - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn centroid_unavailable_for_degenerate_ring() {
        let polygon = Polygon {
            rings: vec![vec![[5.0, 5.0]]],
        };
        assert_eq!(centroid(&polygon), None);
        assert_eq!(envelope(&polygon), None);
    }

    #[test]
    fn round_rings_rounds_and_collapses_duplicates() {
        let polygon = Polygon {
            rings: vec![vec![
                [0.1, 0.1],
                [0.4, 0.2],
                [10.2, 0.1],
                [10.0, 9.9],
                [0.1, 10.4],
            ]],
        };
        let rounded = round_rings(&polygon);
        assert_eq!(
            rounded.rings[0],
            vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]]
        );
    }

    #[test]
    fn round_rings_keeps_every_ring() {
        let polygon = Polygon {
            rings: vec![
                vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]],
                vec![[2.2, 2.7], [3.9, 2.8], [3.1, 3.6]],
            ],
        };
        let rounded = round_rings(&polygon);
        assert_eq!(rounded.rings.len(), 2);
        assert_eq!(rounded.rings[1], vec![[2.0, 3.0], [4.0, 3.0], [3.0, 4.0]]);
    }
}
