//! The claim path and the recorder that grows it.
//!
//! Check order on every candidate is load-bearing:
//! 1. Distance debounce against the last path point (GPS jitter)
//! 2. Speed gate against the last accepted fix
//!
//! A jittering fix never reaches the speed gate, so standing still can't
//! produce a spurious overspeed.

use crate::config::MIN_SAMPLE_DISTANCE_M;
use crate::geodesy::distance_m;
use crate::speed_gate::{SpeedGate, SpeedTier};
use earthlord_env::{GeoPoint, TimedFix};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// PATH
// ============================================================================

/// Ordered claim path: first point is the claim start, last is the head.
#[derive(Debug, Clone, Default)]
pub struct Path {
    points: Vec<GeoPoint>,
    frozen: bool,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&GeoPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&GeoPoint> {
        self.points.last()
    }

    /// Frozen paths are kept for display and accept no more points.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Empties the path and unfreezes it.
    pub fn clear(&mut self) {
        self.points.clear();
        self.frozen = false;
    }

    /// Immutable copy for the read-heavy scans (intersection, area).
    pub fn snapshot(&self) -> Arc<[GeoPoint]> {
        Arc::from(self.points.as_slice())
    }

    fn push(&mut self, point: GeoPoint) -> bool {
        if self.frozen {
            return false;
        }
        self.points.push(point);
        true
    }
}

// ============================================================================
// RECORDER
// ============================================================================

/// What happened to a candidate fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AppendOutcome {
    /// First point of the session, appended without checks
    First,
    /// Appended after both checks
    Appended { tier: SpeedTier, speed_kmh: Option<f64> },
    /// Closer than the jitter floor to the last point; silently dropped
    Jitter { distance_m: f64 },
    /// Implied speed too high; dropped, tracking must stop
    Overspeed { speed_kmh: f64 },
    /// The path is frozen
    Frozen,
}

impl AppendOutcome {
    pub fn is_appended(&self) -> bool {
        matches!(self, AppendOutcome::First | AppendOutcome::Appended { .. })
    }
}

/// Applies the debounce and speed gate, appending accepted fixes.
#[derive(Debug, Clone, Default)]
pub struct PathRecorder {
    gate: SpeedGate,
    last_accepted: Option<TimedFix>,
}

impl PathRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fix behind the current path head.
    pub fn last_accepted(&self) -> Option<&TimedFix> {
        self.last_accepted.as_ref()
    }

    /// Forgets the last accepted fix (new session).
    pub fn reset(&mut self) {
        self.last_accepted = None;
    }

    /// Offers `fix` to the path.
    pub fn maybe_append(&mut self, fix: &TimedFix, path: &mut Path) -> AppendOutcome {
        if path.is_frozen() {
            return AppendOutcome::Frozen;
        }

        let Some(last_point) = path.last().copied() else {
            path.push(fix.point);
            self.last_accepted = Some(*fix);
            return AppendOutcome::First;
        };

        let moved = distance_m(&last_point, &fix.point);
        if moved < MIN_SAMPLE_DISTANCE_M {
            return AppendOutcome::Jitter { distance_m: moved };
        }

        let verdict = self.gate.evaluate(fix, self.last_accepted.as_ref());
        if !verdict.accept {
            return AppendOutcome::Overspeed {
                speed_kmh: verdict.speed_kmh.unwrap_or(f64::INFINITY),
            };
        }

        path.push(fix.point);
        self.last_accepted = Some(*fix);
        AppendOutcome::Appended { tier: verdict.tier, speed_kmh: verdict.speed_kmh }
    }
}
