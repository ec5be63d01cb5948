//! Geodesy primitives shared by the claim engines.
//!
//! Distances are great-circle (haversine) metres. Planar predicates
//! (orientation, segment crossing, containment) work directly on decimal
//! degrees with longitude as x and latitude as y; at claim scale the
//! orientation sign is unaffected by the unequal degree lengths.

use earthlord_env::GeoPoint;
use geo::{HaversineDistance, Point};

/// Earth radius used for spherical area (WGS-84 equatorial, m).
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Mean earth radius, as used by the haversine distance (m).
pub const MEAN_EARTH_RADIUS_M: f64 = 6_371_008.8;

#[inline]
fn to_geo(p: &GeoPoint) -> Point<f64> {
    Point::new(p.longitude, p.latitude)
}

/// Great-circle distance between two fixes in metres.
pub fn distance_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    to_geo(a).haversine_distance(&to_geo(b))
}

/// True when `a → b → c` turns counter-clockwise.
///
/// Collinear triples report false.
#[inline]
pub fn ccw(a: &GeoPoint, b: &GeoPoint, c: &GeoPoint) -> bool {
    (c.latitude - a.latitude) * (b.longitude - a.longitude)
        > (b.latitude - a.latitude) * (c.longitude - a.longitude)
}

/// Proper intersection test for segments AB and CD.
pub fn segments_intersect(a: &GeoPoint, b: &GeoPoint, c: &GeoPoint, d: &GeoPoint) -> bool {
    ccw(a, c, d) != ccw(b, c, d) && ccw(a, b, c) != ccw(a, b, d)
}

/// Even-odd ray casting containment test.
///
/// The polygon is implicitly closed; fewer than three vertices never
/// contain anything.
pub fn point_in_polygon(point: &GeoPoint, polygon: &[GeoPoint]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let (x, y) = (point.longitude, point.latitude);
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (polygon[i].longitude, polygon[i].latitude);
        let (xj, yj) = (polygon[j].longitude, polygon[j].latitude);

        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Iterates the edges of an implicitly closed polygon, closing edge last.
pub fn polygon_edges<'a>(
    polygon: &'a [GeoPoint],
) -> impl Iterator<Item = (&'a GeoPoint, &'a GeoPoint)> + 'a {
    let n = polygon.len();
    (0..n).map(move |i| (&polygon[i], &polygon[(i + 1) % n]))
}

/// Offsets `origin` by local east/north metres (equirectangular approximation).
///
/// Good to well under a metre over a few hundred metres, which is the scale
/// of a walked claim.
pub fn offset_m(origin: &GeoPoint, east_m: f64, north_m: f64) -> GeoPoint {
    let dlat = north_m / MEAN_EARTH_RADIUS_M;
    let dlon = east_m / (MEAN_EARTH_RADIUS_M * origin.latitude.to_radians().cos());
    GeoPoint::new(
        origin.latitude + dlat.to_degrees(),
        origin.longitude + dlon.to_degrees(),
    )
}
