//! The "COLLISION" Engine - Rival Territory Proximity & Overlap
//!
//! Three checks against a read-only snapshot of persisted territories,
//! always excluding the acting player's own claims:
//! - A: is the claim start inside a rival territory?
//! - B: does the walked path cross a rival boundary, or end inside one?
//! - C: how far is the head from the nearest rival vertex?
//!
//! When no overlap is found, C is bucketed into a proximity tier.

use crate::config::{CAUTION_DISTANCE_M, SAFE_DISTANCE_M, WARNING_DISTANCE_M};
use crate::geodesy::{distance_m, point_in_polygon, polygon_edges, segments_intersect};
use earthlord_env::{GeoPoint, OwnerId, Territory, TerritoryId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ============================================================================
// RESULT TYPES
// ============================================================================

/// What kind of overlap was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionKind {
    None,
    PointInTerritory,
    PathCrossesTerritory,
}

/// Proximity tier, ordered from far to overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CollisionTier {
    Safe,
    Caution,
    Warning,
    Danger,
    Violation,
}

/// Haptic strength hint for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackIntensity {
    None,
    Light,
    Medium,
    Heavy,
    Error,
}

impl CollisionTier {
    /// Buckets a distance to the nearest rival vertex.
    pub fn from_distance(distance_m: f64) -> Self {
        if distance_m > SAFE_DISTANCE_M {
            CollisionTier::Safe
        } else if distance_m >= CAUTION_DISTANCE_M {
            CollisionTier::Caution
        } else if distance_m >= WARNING_DISTANCE_M {
            CollisionTier::Warning
        } else {
            CollisionTier::Danger
        }
    }

    pub fn feedback(&self) -> FeedbackIntensity {
        match self {
            CollisionTier::Safe => FeedbackIntensity::None,
            CollisionTier::Caution => FeedbackIntensity::Light,
            CollisionTier::Warning => FeedbackIntensity::Medium,
            CollisionTier::Danger => FeedbackIntensity::Heavy,
            CollisionTier::Violation => FeedbackIntensity::Error,
        }
    }

    /// Alert text for a non-violation tier; `None` when safe.
    fn proximity_message(&self, distance_m: f64) -> Option<String> {
        match self {
            CollisionTier::Safe => None,
            CollisionTier::Caution => {
                Some(format!("Caution: rival territory {distance_m:.0} m ahead"))
            }
            CollisionTier::Warning => {
                Some(format!("Warning: rival territory only {distance_m:.0} m away"))
            }
            CollisionTier::Danger => Some(format!(
                "Danger: {distance_m:.0} m from a rival border, turn back"
            )),
            CollisionTier::Violation => Some("Entered rival territory".to_string()),
        }
    }
}

/// Result of one collision evaluation. Recomputed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionResult {
    pub has_collision: bool,
    pub kind: CollisionKind,
    pub message: Option<String>,
    /// Distance to the nearest rival vertex; infinite when there is none
    pub distance_to_nearest_m: f64,
    pub tier: CollisionTier,
    /// The territory involved in a violation
    pub territory_id: Option<TerritoryId>,
}

impl CollisionResult {
    /// No overlap; tier from the nearest-vertex distance.
    pub fn proximity(distance_m: f64) -> Self {
        let tier = CollisionTier::from_distance(distance_m);
        Self {
            has_collision: false,
            kind: CollisionKind::None,
            message: tier.proximity_message(distance_m),
            distance_to_nearest_m: distance_m,
            tier,
            territory_id: None,
        }
    }

    fn violation(kind: CollisionKind, territory: &Territory, message: String) -> Self {
        Self {
            has_collision: true,
            kind,
            message: Some(message),
            distance_to_nearest_m: 0.0,
            tier: CollisionTier::Violation,
            territory_id: Some(territory.id.clone()),
        }
    }

    pub fn is_violation(&self) -> bool {
        self.tier == CollisionTier::Violation
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Stateless collision checks over a territory snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionEngine;

impl CollisionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Territories owned by someone else with a usable polygon.
    fn rivals<'a>(
        territories: &'a [Territory],
        acting: &'a OwnerId,
    ) -> impl Iterator<Item = &'a Territory> + 'a {
        territories.iter().filter(move |t| {
            if t.polygon.len() < 3 {
                debug!(territory = %t.id, "skipping degenerate territory");
                return false;
            }
            !t.owner_id.matches(acting)
        })
    }

    /// Contract A: may a claim start at `point`?
    pub fn check_start_point(
        &self,
        point: &GeoPoint,
        territories: &[Territory],
        acting: &OwnerId,
    ) -> CollisionResult {
        if let Some(t) = Self::rivals(territories, acting).find(|t| point_in_polygon(point, &t.polygon)) {
            warn!(territory = %t.id, owner = %t.owner_id, "claim start inside rival territory");
            return CollisionResult::violation(
                CollisionKind::PointInTerritory,
                t,
                "Cannot start a claim inside another player's territory".to_string(),
            );
        }
        CollisionResult::proximity(self.nearest_distance(point, territories, acting))
    }

    /// Contract B: does the walked path cross or enter a rival territory?
    pub fn check_path_against_territories(
        &self,
        path: &[GeoPoint],
        territories: &[Territory],
        acting: &OwnerId,
    ) -> CollisionResult {
        let Some(head) = path.last() else {
            return CollisionResult::proximity(f64::INFINITY);
        };

        for t in Self::rivals(territories, acting) {
            let crosses = path.windows(2).any(|seg| {
                polygon_edges(&t.polygon).any(|(c, d)| segments_intersect(&seg[0], &seg[1], c, d))
            });
            if crosses {
                warn!(territory = %t.id, owner = %t.owner_id, "path crosses rival border");
                return CollisionResult::violation(
                    CollisionKind::PathCrossesTerritory,
                    t,
                    "Your path crossed into another player's territory".to_string(),
                );
            }
        }

        if let Some(t) = Self::rivals(territories, acting).find(|t| point_in_polygon(head, &t.polygon)) {
            warn!(territory = %t.id, owner = %t.owner_id, "path head inside rival territory");
            return CollisionResult::violation(
                CollisionKind::PointInTerritory,
                t,
                "You are inside another player's territory".to_string(),
            );
        }

        CollisionResult::proximity(self.nearest_distance(head, territories, acting))
    }

    /// Contract C: distance to the nearest rival vertex (vertex sampling,
    /// not true edge distance). Infinite when there are no rivals.
    pub fn nearest_distance(
        &self,
        point: &GeoPoint,
        territories: &[Territory],
        acting: &OwnerId,
    ) -> f64 {
        Self::rivals(territories, acting)
            .flat_map(|t| t.polygon.iter())
            .map(|v| distance_m(point, v))
            .fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::offset_m;

    const ORIGIN: GeoPoint = GeoPoint { latitude: 31.2304, longitude: 121.4737 };

    fn local(e: f64, n: f64) -> GeoPoint {
        offset_m(&ORIGIN, e, n)
    }

    /// 100 m square with its south-west corner at (x0, 0).
    fn square_territory(id: &str, owner: &str, x0: f64) -> Territory {
        Territory {
            id: TerritoryId(id.to_string()),
            owner_id: OwnerId::new(owner),
            polygon: vec![
                local(x0, 0.0),
                local(x0 + 100.0, 0.0),
                local(x0 + 100.0, 100.0),
                local(x0, 100.0),
            ],
            area_m2: 10_000.0,
        }
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(CollisionTier::from_distance(150.0), CollisionTier::Safe);
        assert_eq!(CollisionTier::from_distance(100.0), CollisionTier::Caution);
        assert_eq!(CollisionTier::from_distance(50.0), CollisionTier::Caution);
        assert_eq!(CollisionTier::from_distance(49.9), CollisionTier::Warning);
        assert_eq!(CollisionTier::from_distance(25.0), CollisionTier::Warning);
        assert_eq!(CollisionTier::from_distance(10.0), CollisionTier::Danger);
        assert_eq!(CollisionTier::Danger.feedback(), FeedbackIntensity::Heavy);
    }

    #[test]
    fn test_start_inside_rival_is_violation() {
        let engine = CollisionEngine::new();
        let territories = vec![square_territory("t1", "rival", 0.0)];

        let result = engine.check_start_point(&local(50.0, 50.0), &territories, &OwnerId::new("me"));
        assert!(result.has_collision);
        assert_eq!(result.kind, CollisionKind::PointInTerritory);
        assert_eq!(result.tier, CollisionTier::Violation);
        assert_eq!(result.territory_id, Some(TerritoryId("t1".to_string())));
    }

    #[test]
    fn test_own_territory_is_excluded() {
        let engine = CollisionEngine::new();
        let territories = vec![square_territory("t1", "Player-ABC", 0.0)];

        let result = engine.check_start_point(&local(50.0, 50.0), &territories, &OwnerId::new("player-abc"));
        assert!(!result.has_collision);
        assert_eq!(result.tier, CollisionTier::Safe);
        assert!(result.distance_to_nearest_m.is_infinite());
    }

    #[test]
    fn test_path_crossing_rival_border() {
        let engine = CollisionEngine::new();
        let territories = vec![square_territory("t1", "rival", 100.0)];
        // Walks east from x=60 to x=130, crossing the west edge at x=100
        let path = vec![local(60.0, 50.0), local(80.0, 50.0), local(130.0, 50.0)];

        let result = engine.check_path_against_territories(&path, &territories, &OwnerId::new("me"));
        assert_eq!(result.kind, CollisionKind::PathCrossesTerritory);
        assert!(result.is_violation());
    }

    #[test]
    fn test_path_crossing_closing_edge() {
        let engine = CollisionEngine::new();
        let territories = vec![square_territory("t1", "rival", 0.0)];
        // Crosses the west edge (x=0), which is the polygon's implicit closing edge
        let path = vec![local(-30.0, 50.0), local(30.0, 50.0), local(-30.0, 60.0)];

        let result = engine.check_path_against_territories(&path, &territories, &OwnerId::new("me"));
        assert_eq!(result.kind, CollisionKind::PathCrossesTerritory);
    }

    #[test]
    fn test_single_point_path_inside_rival() {
        let engine = CollisionEngine::new();
        let territories = vec![square_territory("t1", "rival", 0.0)];

        let result = engine.check_path_against_territories(&[local(10.0, 10.0)], &territories, &OwnerId::new("me"));
        assert_eq!(result.kind, CollisionKind::PointInTerritory);
    }

    #[test]
    fn test_path_proximity_tiers() {
        let engine = CollisionEngine::new();
        let territories = vec![square_territory("t1", "rival", 100.0)];
        let me = OwnerId::new("me");

        // Head 40 m west of the (100, 0) vertex
        let path = vec![local(0.0, 0.0), local(60.0, 0.0)];
        let result = engine.check_path_against_territories(&path, &territories, &me);
        assert!(!result.has_collision);
        assert_eq!(result.tier, CollisionTier::Warning);
        assert!((result.distance_to_nearest_m - 40.0).abs() < 0.5);
        assert!(result.message.is_some());

        let far = vec![local(-300.0, 0.0), local(-200.0, 0.0)];
        let result = engine.check_path_against_territories(&far, &territories, &me);
        assert_eq!(result.tier, CollisionTier::Safe);
        assert!(result.message.is_none());
    }

    #[test]
    fn test_nearest_distance_samples_vertices() {
        let engine = CollisionEngine::new();
        let territories = vec![square_territory("t1", "rival", 0.0)];

        // 20 m south of the middle of the bottom edge: the nearest vertex is ~54 m away
        let d = engine.nearest_distance(&local(50.0, -20.0), &territories, &OwnerId::new("me"));
        assert!((d - 53.85).abs() < 0.5);
    }

    #[test]
    fn test_empty_path_is_safe() {
        let engine = CollisionEngine::new();
        let result = engine.check_path_against_territories(&[], &[], &OwnerId::new("me"));
        assert_eq!(result.tier, CollisionTier::Safe);
    }
}
