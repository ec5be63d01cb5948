//! Claim scenarios for the deterministic simulator.
//!
//! Each scenario is a walked route, a walking speed, a set of pre-existing
//! territories and the outcome the claim engine must produce.

use crate::walker::{route_length, LocalPoint};
use earthlord_core::geodesy::offset_m;
use earthlord_core::validation::ValidationFailure;
use earthlord_env::{GeoPoint, OwnerId, Territory, TerritoryId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Owner id the simulated player claims as.
pub const PLAYER_ID: &str = "player-1";

/// Owner id of the simulated rival.
pub const RIVAL_ID: &str = "rival-7";

/// Comfortable walking pace (m/s).
const WALK_MPS: f64 = 1.4;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScenarioId {
    /// Walk a 40 m square loop and claim it
    SquareClaim,

    /// Stand still under GPS noise; nothing is recorded
    JitterOnly,

    /// Walk a figure-8; validation rejects the crossing
    FigureEight,

    /// Move at vehicle speed; tracking halts on the first sample
    VehicleSpeed,

    /// Jog between the two speed thresholds; warned, never halted
    BriskJog,

    /// Walk into a rival's territory; tracking halts on the next poll
    RivalIntrusion,

    /// Try to start inside a rival's territory
    RivalStart,

    /// Start inside one's own territory (owner id in different case)
    OwnGround,
}

/// The outcome a scenario has to produce.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Expectation {
    /// Closed, valid and uploaded, with an area in range (m²)
    ValidClaim { min_area_m2: f64, max_area_m2: f64 },
    /// Tracking stays on with exactly this many path points
    PathLength(usize),
    /// The loop closes but validation fails with this reason
    Rejected(ValidationFailure),
    /// Tracking halts on overspeed
    OverspeedHalt,
    /// At least one speed warning and tracking never halts
    SpeedWarned,
    /// Tracking halts on a collision violation
    CollisionHalt,
    /// The start is refused
    StartBlocked,
    /// The start is allowed and no collision is ever raised
    StartAllowed,
}

/// Everything needed to run one scenario.
#[derive(Debug, Clone)]
pub struct ScenarioPlan {
    pub route: Vec<LocalPoint>,
    pub speed_mps: f64,
    /// Simulated seconds to run
    pub duration_secs: u64,
    pub territories: Vec<Territory>,
    pub expectation: Expectation,
}

#[derive(Debug, Error)]
#[error("Unknown scenario: {0}")]
pub struct UnknownScenario(pub String);

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::SquareClaim,
            ScenarioId::JitterOnly,
            ScenarioId::FigureEight,
            ScenarioId::VehicleSpeed,
            ScenarioId::BriskJog,
            ScenarioId::RivalIntrusion,
            ScenarioId::RivalStart,
            ScenarioId::OwnGround,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::SquareClaim => "square_claim",
            ScenarioId::JitterOnly => "jitter_only",
            ScenarioId::FigureEight => "figure_eight",
            ScenarioId::VehicleSpeed => "vehicle_speed",
            ScenarioId::BriskJog => "brisk_jog",
            ScenarioId::RivalIntrusion => "rival_intrusion",
            ScenarioId::RivalStart => "rival_start",
            ScenarioId::OwnGround => "own_ground",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::SquareClaim => "40 m square at walking pace, claimed and uploaded",
            ScenarioId::JitterOnly => "2 minutes standing still, noise below the jitter floor",
            ScenarioId::FigureEight => "crossing loop, rejected as self-intersecting",
            ScenarioId::VehicleSpeed => "12 m/s, halted on overspeed",
            ScenarioId::BriskJog => "4.5 m/s (16 km/h), warned but still recording",
            ScenarioId::RivalIntrusion => "walk east into a rival square, halted on collision",
            ScenarioId::RivalStart => "start inside a rival square, refused",
            ScenarioId::OwnGround => "start inside own territory, allowed",
        }
    }

    /// Builds the plan around `origin`.
    pub fn plan(&self, origin: &GeoPoint) -> ScenarioPlan {
        match self {
            ScenarioId::SquareClaim => walk(
                square(0.0, 0.0, 40.0),
                WALK_MPS,
                Vec::new(),
                Expectation::ValidClaim { min_area_m2: 1_400.0, max_area_m2: 1_700.0 },
            ),
            ScenarioId::JitterOnly => ScenarioPlan {
                route: vec![LocalPoint::new(0.0, 0.0)],
                speed_mps: 0.0,
                duration_secs: 120,
                territories: Vec::new(),
                expectation: Expectation::PathLength(1),
            },
            ScenarioId::FigureEight => walk(
                vec![
                    LocalPoint::new(0.0, 0.0),
                    LocalPoint::new(60.0, 30.0),
                    LocalPoint::new(60.0, 0.0),
                    LocalPoint::new(0.0, 30.0),
                    LocalPoint::new(0.0, 0.0),
                ],
                WALK_MPS,
                Vec::new(),
                Expectation::Rejected(ValidationFailure::SelfIntersecting),
            ),
            ScenarioId::VehicleSpeed => walk(
                straight(300.0),
                12.0,
                Vec::new(),
                Expectation::OverspeedHalt,
            ),
            ScenarioId::BriskJog => walk(straight(200.0), 4.5, Vec::new(), Expectation::SpeedWarned),
            ScenarioId::RivalIntrusion => walk(
                straight(160.0),
                WALK_MPS,
                vec![territory(origin, "rival-east", RIVAL_ID, square(100.0, -20.0, 40.0))],
                Expectation::CollisionHalt,
            ),
            ScenarioId::RivalStart => walk(
                straight(60.0),
                WALK_MPS,
                vec![territory(origin, "rival-home", RIVAL_ID, square(-20.0, -20.0, 40.0))],
                Expectation::StartBlocked,
            ),
            ScenarioId::OwnGround => walk(
                straight(60.0),
                WALK_MPS,
                vec![territory(
                    origin,
                    "own-home",
                    &PLAYER_ID.to_uppercase(),
                    square(-20.0, -20.0, 80.0),
                )],
                Expectation::StartAllowed,
            ),
        }
    }
}

/// Plan for a route walked end to end, plus a few seconds of standing.
fn walk(
    route: Vec<LocalPoint>,
    speed_mps: f64,
    territories: Vec<Territory>,
    expectation: Expectation,
) -> ScenarioPlan {
    let duration_secs = if speed_mps > 0.0 {
        (route_length(&route) / speed_mps).ceil() as u64 + 4
    } else {
        0
    };
    ScenarioPlan { route, speed_mps, duration_secs, territories, expectation }
}

/// Closed square loop with its south-west corner at (x0, y0).
fn square(x0: f64, y0: f64, side: f64) -> Vec<LocalPoint> {
    vec![
        LocalPoint::new(x0, y0),
        LocalPoint::new(x0 + side, y0),
        LocalPoint::new(x0 + side, y0 + side),
        LocalPoint::new(x0, y0 + side),
        LocalPoint::new(x0, y0),
    ]
}

/// Due-east line from the origin.
fn straight(length_m: f64) -> Vec<LocalPoint> {
    vec![LocalPoint::new(0.0, 0.0), LocalPoint::new(length_m, 0.0)]
}

fn territory(origin: &GeoPoint, id: &str, owner: &str, ring: Vec<LocalPoint>) -> Territory {
    // Drop the repeated closing vertex: polygons are implicitly closed
    let polygon: Vec<GeoPoint> = ring[..ring.len().saturating_sub(1)]
        .iter()
        .map(|p| offset_m(origin, p.east_m, p.north_m))
        .collect();
    let area_m2 = earthlord_core::AreaCalculator::new().polygon_area(&polygon);
    Territory {
        id: TerritoryId(id.to_string()),
        owner_id: OwnerId::new(owner),
        polygon,
        area_m2,
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = UnknownScenario;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "square_claim" | "square" => Ok(ScenarioId::SquareClaim),
            "jitter_only" | "jitter" => Ok(ScenarioId::JitterOnly),
            "figure_eight" | "figure8" => Ok(ScenarioId::FigureEight),
            "vehicle_speed" | "vehicle" => Ok(ScenarioId::VehicleSpeed),
            "brisk_jog" | "jog" => Ok(ScenarioId::BriskJog),
            "rival_intrusion" | "intrusion" => Ok(ScenarioId::RivalIntrusion),
            "rival_start" => Ok(ScenarioId::RivalStart),
            "own_ground" => Ok(ScenarioId::OwnGround),
            _ => Err(UnknownScenario(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: GeoPoint = GeoPoint { latitude: 31.2304, longitude: 121.4737 };

    #[test]
    fn test_names_round_trip() {
        for id in ScenarioId::all() {
            assert_eq!(id.name().parse::<ScenarioId>().unwrap(), id);
        }
        assert_eq!("Figure-Eight".parse::<ScenarioId>().unwrap(), ScenarioId::FigureEight);
        assert!("time_warp".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_square_plan_duration_covers_route() {
        let plan = ScenarioId::SquareClaim.plan(&ORIGIN);
        // 160 m at 1.4 m/s ≈ 115 s
        assert_eq!(plan.duration_secs, 119);
        assert!(plan.territories.is_empty());
    }

    #[test]
    fn test_rival_territories_are_closed_rings() {
        let plan = ScenarioId::RivalIntrusion.plan(&ORIGIN);
        let rival = &plan.territories[0];
        assert_eq!(rival.polygon.len(), 4);
        assert!((rival.area_m2 - 1_600.0).abs() < 50.0);
        assert!(!rival.owner_id.matches(&OwnerId::new(PLAYER_ID)));

        let own = &ScenarioId::OwnGround.plan(&ORIGIN).territories[0];
        assert!(own.owner_id.matches(&OwnerId::new(PLAYER_ID)));
        assert_ne!(own.owner_id, OwnerId::new(PLAYER_ID));
    }
}
