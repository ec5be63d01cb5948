//! Common value types shared by the environment and the core engines.
//!
//! All angles are decimal degrees, all distances metres, all areas m².

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// A WGS-84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// One GPS fix.
///
/// `measured_at` comes from the GPS hardware clock. Velocity checks divide
/// by the elapsed hardware time, so this must never be the time at which
/// the fix happened to be processed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedFix {
    pub point: GeoPoint,
    pub measured_at: SystemTime,
}

impl TimedFix {
    pub fn new(point: GeoPoint, measured_at: SystemTime) -> Self {
        Self { point, measured_at }
    }

    /// Signed seconds from `earlier` to `self` in GPS time.
    ///
    /// Negative when the hardware delivered fixes out of order.
    pub fn secs_since(&self, earlier: &TimedFix) -> f64 {
        match self.measured_at.duration_since(earlier.measured_at) {
            Ok(elapsed) => elapsed.as_secs_f64(),
            Err(e) => -e.duration().as_secs_f64(),
        }
    }
}

/// Identifier of a player owning territories.
///
/// Backends disagree on UUID casing, so ownership checks go through
/// [`OwnerId::matches`] rather than `==`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Case-insensitive (ASCII) owner comparison.
    pub fn matches(&self, other: &OwnerId) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier assigned to a territory by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerritoryId(pub String);

impl TerritoryId {
    /// Mints a fresh random id (used by in-memory repositories).
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for TerritoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted, claimed polygon. The polygon is implicitly closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Territory {
    pub id: TerritoryId,
    pub owner_id: OwnerId,
    pub polygon: Vec<GeoPoint>,
    pub area_m2: f64,
}

/// Axis-aligned lat/lon bounds of a claim, stored alongside the polygon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Bounds of a point set, `None` when empty.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = Self {
            min_lat: first.latitude,
            max_lat: first.latitude,
            min_lon: first.longitude,
            max_lon: first.longitude,
        };
        for p in &points[1..] {
            bbox.min_lat = bbox.min_lat.min(p.latitude);
            bbox.max_lat = bbox.max_lat.max(p.latitude);
            bbox.min_lon = bbox.min_lon.min(p.longitude);
            bbox.max_lon = bbox.max_lon.max(p.longitude);
        }
        Some(bbox)
    }

    pub fn contains(&self, p: &GeoPoint) -> bool {
        p.latitude >= self.min_lat
            && p.latitude <= self.max_lat
            && p.longitude >= self.min_lon
            && p.longitude <= self.max_lon
    }
}

/// Upload payload for a validated claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritoryDraft {
    pub owner_id: OwnerId,
    pub polygon: Vec<GeoPoint>,
    pub area_m2: f64,
    pub path_length_m: f64,
    pub point_count: usize,
    pub bounding_box: BoundingBox,
    pub started_at: Option<SystemTime>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_owner_id_matches_ignores_case() {
        let a = OwnerId::new("9B2F1C3E-AAAA-4BBB-8CCC-0123456789AB");
        let b = OwnerId::new("9b2f1c3e-aaaa-4bbb-8ccc-0123456789ab");
        assert!(a.matches(&b));
        assert!(!a.matches(&OwnerId::new("someone-else")));
    }

    #[test]
    fn test_secs_since_is_signed() {
        let t0 = UNIX_EPOCH + Duration::from_secs(1_000);
        let p = GeoPoint::new(31.23, 121.47);
        let a = TimedFix::new(p, t0);
        let b = TimedFix::new(p, t0 + Duration::from_millis(2_500));

        assert!((b.secs_since(&a) - 2.5).abs() < 1e-9);
        assert!((a.secs_since(&b) + 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_bounding_box() {
        let points = [
            GeoPoint::new(1.0, 5.0),
            GeoPoint::new(-2.0, 7.0),
            GeoPoint::new(0.5, 4.0),
        ];
        let bbox = BoundingBox::from_points(&points).unwrap();
        assert_eq!(bbox.min_lat, -2.0);
        assert_eq!(bbox.max_lat, 1.0);
        assert_eq!(bbox.min_lon, 4.0);
        assert_eq!(bbox.max_lon, 7.0);
        assert!(bbox.contains(&GeoPoint::new(0.0, 6.0)));
        assert!(BoundingBox::from_points(&[]).is_none());
    }
}
