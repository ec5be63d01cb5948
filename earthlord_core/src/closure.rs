//! Loop closure detection.

use crate::config::{CLOSURE_DISTANCE_M, MIN_PATH_POINTS};
use crate::geodesy::distance_m;
use earthlord_env::GeoPoint;
use serde::{Deserialize, Serialize};

/// Session-scoped closure flag. Goes false → true once and stays there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureState {
    pub is_closed: bool,
}

impl ClosureState {
    /// Marks the loop closed; returns true only on the transition.
    pub fn close(&mut self) -> bool {
        let transitioned = !self.is_closed;
        self.is_closed = true;
        transitioned
    }
}

/// Detects when the path head has come back near the start.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosureDetector;

impl ClosureDetector {
    pub fn new() -> Self {
        Self
    }

    /// True when the path has enough points and its head is within the
    /// closure radius of its first point.
    pub fn check_closure(&self, points: &[GeoPoint]) -> bool {
        if points.len() < MIN_PATH_POINTS {
            return false;
        }
        match (points.first(), points.last()) {
            (Some(first), Some(last)) => distance_m(first, last) <= CLOSURE_DISTANCE_M,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::offset_m;
    use proptest::prelude::*;

    const ORIGIN: GeoPoint = GeoPoint { latitude: 30.5728, longitude: 104.0668 };

    /// `n` points along a straight line heading east, ending `gap_m` from the start.
    fn loop_ending(n: usize, gap_m: f64) -> Vec<GeoPoint> {
        let mut points: Vec<GeoPoint> = (0..n - 1)
            .map(|i| offset_m(&ORIGIN, i as f64 * 15.0, 40.0))
            .collect();
        points[0] = ORIGIN;
        points.push(offset_m(&ORIGIN, 0.0, gap_m));
        points
    }

    #[test]
    fn test_closes_within_radius() {
        let detector = ClosureDetector::new();
        assert!(detector.check_closure(&loop_ending(10, 20.0)));
        assert!(!detector.check_closure(&loop_ending(10, 35.0)));
    }

    #[test]
    fn test_closure_state_is_monotonic() {
        let mut state = ClosureState::default();
        assert!(state.close());
        assert!(!state.close());
        assert!(state.is_closed);
    }

    proptest! {
        #[test]
        fn prop_short_paths_never_close(n in 1usize..10, gap in 0.0f64..5.0) {
            let points: Vec<GeoPoint> = (0..n).map(|i| offset_m(&ORIGIN, 0.0, gap * i as f64 / n as f64)).collect();
            prop_assert!(!ClosureDetector::new().check_closure(&points));
        }

        #[test]
        fn prop_closure_tracks_start_distance(n in 10usize..40, gap in 0.0f64..60.0) {
            let points = loop_ending(n, gap);
            let d = distance_m(&points[0], &points[points.len() - 1]);
            prop_assert_eq!(ClosureDetector::new().check_closure(&points), d <= CLOSURE_DISTANCE_M);
        }
    }
}
