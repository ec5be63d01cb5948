//! Validation Module - Claim Acceptance Gate
//! ===========================================
//!
//! Runs a closed path through four sequential checks and stops at the first
//! failure:
//! 1. Point count (enough samples for a real loop)
//! 2. Total walked distance
//! 3. Self-intersection (no figure-8 claims)
//! 4. Enclosed area
//!
//! Usage:
//! ```ignore
//! use earthlord_core::validation::TerritoryValidator;
//!
//! let result = TerritoryValidator::new().validate(&path.snapshot());
//! if result.is_valid {
//!     let draft = TerritoryValidator::new().draft(owner, &points, &result, started_at);
//! }
//! ```

use crate::area::AreaCalculator;
use crate::config::{MIN_ENCLOSED_AREA_M2, MIN_PATH_POINTS, MIN_TOTAL_DISTANCE_M};
use crate::intersection::SelfIntersectionDetector;
use earthlord_env::{GeoPoint, OwnerId, TerritoryDraft};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tracing::{debug, info};

// =============================================================================
// VALIDATION RESULT
// =============================================================================

/// Which stage rejected the path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ValidationFailure {
    TooFewPoints { count: usize, required: usize },
    TooShort { distance_m: f64, required_m: f64 },
    SelfIntersecting,
    TooSmall { area_m2: f64, required_m2: f64 },
}

impl ValidationFailure {
    /// Human-readable reason shown to the player.
    pub fn reason(&self) -> String {
        match self {
            ValidationFailure::TooFewPoints { count, required } => {
                format!("not enough points: {count}/{required} recorded")
            }
            ValidationFailure::TooShort { distance_m, required_m } => {
                format!("path too short: {distance_m:.0} m walked, {required_m:.0} m required")
            }
            ValidationFailure::SelfIntersecting => "self-intersecting path".to_string(),
            ValidationFailure::TooSmall { area_m2, required_m2 } => {
                format!("enclosed area too small: {area_m2:.0} m², {required_m2:.0} m² required")
            }
        }
    }
}

/// Snapshot of one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub reason: Option<String>,
    /// Enclosed area (m²); 0 when the area stage was not reached
    pub area_m2: f64,
    pub failure: Option<ValidationFailure>,
}

impl ValidationResult {
    fn pass(area_m2: f64) -> Self {
        Self { is_valid: true, reason: None, area_m2, failure: None }
    }

    fn fail(failure: ValidationFailure, area_m2: f64) -> Self {
        Self {
            is_valid: false,
            reason: Some(failure.reason()),
            area_m2,
            failure: Some(failure),
        }
    }
}

// =============================================================================
// VALIDATOR
// =============================================================================

/// Sequential claim gate over fixed thresholds.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerritoryValidator {
    intersections: SelfIntersectionDetector,
    area: AreaCalculator,
}

impl TerritoryValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates an immutable path snapshot. Pure; repeated calls on the
    /// same points give identical results.
    pub fn validate(&self, points: &[GeoPoint]) -> ValidationResult {
        debug!(points = points.len(), "validating claim path");

        if points.len() < MIN_PATH_POINTS {
            let failure = ValidationFailure::TooFewPoints {
                count: points.len(),
                required: MIN_PATH_POINTS,
            };
            info!("claim rejected: {}", failure.reason());
            return ValidationResult::fail(failure, 0.0);
        }
        debug!("point count ok");

        let distance_m = self.area.total_distance(points);
        if distance_m < MIN_TOTAL_DISTANCE_M {
            let failure = ValidationFailure::TooShort {
                distance_m,
                required_m: MIN_TOTAL_DISTANCE_M,
            };
            info!("claim rejected: {}", failure.reason());
            return ValidationResult::fail(failure, 0.0);
        }
        debug!(distance_m, "distance ok");

        if self.intersections.has_self_intersection(points) {
            let failure = ValidationFailure::SelfIntersecting;
            info!("claim rejected: {}", failure.reason());
            return ValidationResult::fail(failure, 0.0);
        }
        debug!("no self-intersection");

        let area_m2 = self.area.polygon_area(points);
        if area_m2 < MIN_ENCLOSED_AREA_M2 {
            let failure = ValidationFailure::TooSmall {
                area_m2,
                required_m2: MIN_ENCLOSED_AREA_M2,
            };
            info!("claim rejected: {}", failure.reason());
            return ValidationResult::fail(failure, area_m2);
        }

        info!(area_m2, distance_m, points = points.len(), "claim path valid");
        ValidationResult::pass(area_m2)
    }

    /// Builds the upload payload for a valid result, `None` otherwise.
    pub fn draft(
        &self,
        owner_id: OwnerId,
        points: &[GeoPoint],
        result: &ValidationResult,
        started_at: Option<SystemTime>,
    ) -> Option<TerritoryDraft> {
        if !result.is_valid {
            return None;
        }
        Some(TerritoryDraft {
            owner_id,
            polygon: points.to_vec(),
            area_m2: result.area_m2,
            path_length_m: self.area.total_distance(points),
            point_count: points.len(),
            bounding_box: self.area.bounding_box(points)?,
            started_at,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
