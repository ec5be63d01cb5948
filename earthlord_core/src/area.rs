//! Path length and enclosed area.

use crate::geodesy::{distance_m, EARTH_RADIUS_M};
use earthlord_env::{BoundingBox, GeoPoint};

#[derive(Debug, Clone, Copy, Default)]
pub struct AreaCalculator;

impl AreaCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Sum of consecutive great-circle segment lengths (m).
    pub fn total_distance(&self, points: &[GeoPoint]) -> f64 {
        if points.len() < 2 {
            return 0.0;
        }
        points.windows(2).map(|w| distance_m(&w[0], &w[1])).sum()
    }

    /// Spherical-shoelace area of the implicitly closed polygon (m²).
    ///
    /// ```text
    /// A = |Σ Δλ(i,i+1) · (2 + sin φi + sin φi+1)| · R² / 2
    /// ```
    pub fn polygon_area(&self, points: &[GeoPoint]) -> f64 {
        let n = points.len();
        if n < 3 {
            return 0.0;
        }

        let mut sum = 0.0;
        for i in 0..n {
            let p1 = &points[i];
            let p2 = &points[(i + 1) % n];
            let dlon = (p2.longitude - p1.longitude).to_radians();
            sum += dlon * (2.0 + p1.latitude.to_radians().sin() + p2.latitude.to_radians().sin());
        }

        (sum * EARTH_RADIUS_M * EARTH_RADIUS_M / 2.0).abs()
    }

    /// Lat/lon bounds of the path, `None` when empty.
    pub fn bounding_box(&self, points: &[GeoPoint]) -> Option<BoundingBox> {
        BoundingBox::from_points(points)
    }
}
