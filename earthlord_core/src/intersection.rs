//! Self-intersection detection ("figure-8" claims).
//!
//! O(n²) scan over non-adjacent segment pairs. Segment pairs that join the
//! head of the path to its tail are skipped: a legitimately closed loop
//! ends next to where it began and its closing segments may touch the
//! opening ones.

use crate::geodesy::segments_intersect;
use earthlord_env::GeoPoint;
use tracing::debug;

/// Number of segments at each end of the path exempt from pairing with
/// the other end.
const HEAD_TAIL_EXCLUSION: usize = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct SelfIntersectionDetector;

impl SelfIntersectionDetector {
    pub fn new() -> Self {
        Self
    }

    /// Scans an immutable snapshot of the path for crossing segments.
    pub fn has_self_intersection(&self, points: &[GeoPoint]) -> bool {
        if points.len() < 4 {
            return false;
        }
        let segments = points.len() - 1;

        for i in 0..segments {
            for j in (i + 2)..segments {
                if i < HEAD_TAIL_EXCLUSION && j >= segments.saturating_sub(HEAD_TAIL_EXCLUSION) {
                    continue;
                }
                if segments_intersect(&points[i], &points[i + 1], &points[j], &points[j + 1]) {
                    debug!(i, j, "path segments cross");
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::offset_m;
    use proptest::prelude::*;

    const ORIGIN: GeoPoint = GeoPoint { latitude: 34.3416, longitude: 108.9398 };

    fn local(points: &[(f64, f64)]) -> Vec<GeoPoint> {
        points.iter().map(|&(e, n)| offset_m(&ORIGIN, e, n)).collect()
    }

    #[test]
    fn test_too_short_never_intersects() {
        let detector = SelfIntersectionDetector::new();
        assert!(!detector.has_self_intersection(&local(&[(0.0, 0.0), (10.0, 10.0), (0.0, 10.0)])));
    }

    #[test]
    fn test_simple_rectangle_loop() {
        let path = local(&[
            (0.0, 0.0), (5.0, 0.0), (10.0, 0.0), (15.0, 0.0), (20.0, 0.0),
            (20.0, 5.0), (20.0, 10.0), (15.0, 10.0), (10.0, 10.0), (5.0, 10.0),
            (0.0, 10.0), (0.0, 5.0),
        ]);
        assert!(!SelfIntersectionDetector::new().has_self_intersection(&path));
    }

    #[test]
    fn test_figure_eight_is_detected() {
        // Segment 2 (east along y=0) is crossed by segment 4
        let path = local(&[
            (0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (30.0, 0.0),
            (30.0, 10.0), (25.0, -10.0), (10.0, -10.0), (0.0, -5.0),
        ]);
        assert!(SelfIntersectionDetector::new().has_self_intersection(&path));
    }

    #[test]
    fn test_closing_overlap_is_tolerated() {
        // The final segment slips past the start and cuts across the first
        // segment; that overlap sits inside the head/tail exclusion.
        let path = local(&[
            (0.0, 0.0), (20.0, 0.0), (30.0, 0.0), (30.0, 20.0),
            (15.0, 30.0), (0.0, 20.0), (10.0, -5.0),
        ]);
        assert!(!SelfIntersectionDetector::new().has_self_intersection(&path));
    }

    #[test]
    fn test_crossing_outside_exclusion_with_head() {
        // Segment 0 is crossed by segment 3, far from the tail
        let path = local(&[
            (0.0, 0.0), (20.0, 0.0), (20.0, 10.0), (10.0, 10.0),
            (10.0, -10.0), (30.0, -10.0), (40.0, -10.0), (50.0, -10.0),
        ]);
        assert!(SelfIntersectionDetector::new().has_self_intersection(&path));
    }

    proptest! {
        #[test]
        fn prop_convex_traversal_never_intersects(n in 4usize..48, radius in 20.0f64..300.0) {
            let path: Vec<GeoPoint> = (0..n)
                .map(|k| {
                    let theta = std::f64::consts::TAU * k as f64 / n as f64;
                    offset_m(&ORIGIN, radius * theta.cos(), radius * theta.sin())
                })
                .collect();
            prop_assert!(!SelfIntersectionDetector::new().has_self_intersection(&path));
        }

        #[test]
        fn prop_star_shaped_loop_never_intersects(
            radii in prop::collection::vec(20.0f64..300.0, 4..48),
        ) {
            // One vertex per evenly spaced bearing with its own radius: concave
            // but simple, since each edge stays inside its own angular wedge
            let n = radii.len();
            let path: Vec<GeoPoint> = radii
                .iter()
                .enumerate()
                .map(|(k, r)| {
                    let theta = std::f64::consts::TAU * k as f64 / n as f64;
                    offset_m(&ORIGIN, r * theta.cos(), r * theta.sin())
                })
                .collect();
            prop_assert!(!SelfIntersectionDetector::new().has_self_intersection(&path));
        }
    }

    #[test]
    fn test_concave_loop_is_simple() {
        // Five-pointed star, alternating 100 m and 30 m radii
        let path: Vec<GeoPoint> = (0..10)
            .map(|k| {
                let theta = std::f64::consts::TAU * k as f64 / 10.0;
                let r = if k % 2 == 0 { 100.0 } else { 30.0 };
                offset_m(&ORIGIN, r * theta.cos(), r * theta.sin())
            })
            .collect();
        assert!(!SelfIntersectionDetector::new().has_self_intersection(&path));
    }
}
