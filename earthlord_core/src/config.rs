//! Claim thresholds and session timing.
//!
//! Thresholds are fixed product constants; only session timing is a
//! configurable struct.

use std::time::Duration;

// ============================================================================
// PATH & LOOP THRESHOLDS
// ============================================================================

/// Minimum recorded points before a loop can close or validate.
pub const MIN_PATH_POINTS: usize = 10;

/// Minimum walked path length (m).
pub const MIN_TOTAL_DISTANCE_M: f64 = 50.0;

/// Minimum enclosed area of a valid claim (m²).
pub const MIN_ENCLOSED_AREA_M2: f64 = 100.0;

/// The loop closes once the head is this close to the start (m).
pub const CLOSURE_DISTANCE_M: f64 = 30.0;

/// GPS jitter floor: candidates closer than this to the last point are dropped (m).
pub const MIN_SAMPLE_DISTANCE_M: f64 = 10.0;

// ============================================================================
// SPEED THRESHOLDS
// ============================================================================

/// Above this the user is warned but recording continues (km/h).
pub const WARN_SPEED_KMH: f64 = 15.0;

/// Above this the sample is rejected and tracking halts (km/h).
pub const STOP_SPEED_KMH: f64 = 30.0;

/// Fixes closer together than this in GPS time are timestamp noise (s).
pub const TIMESTAMP_NOISE_SECS: f64 = 0.5;

// ============================================================================
// COLLISION TIERS
// ============================================================================

/// Beyond this distance to a rival territory the path is safe (m).
pub const SAFE_DISTANCE_M: f64 = 100.0;

/// Caution band lower bound (m).
pub const CAUTION_DISTANCE_M: f64 = 50.0;

/// Warning band lower bound; anything closer is danger (m).
pub const WARNING_DISTANCE_M: f64 = 25.0;

// ============================================================================
// SESSION TIMING
// ============================================================================

/// Timer periods and notice lifetimes for a claim session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Session's logical name (for logging)
    pub name: String,

    /// Period of the sampling timer (default: 2s)
    pub sample_period: Duration,

    /// Period of the collision polling timer (default: 10s)
    pub collision_period: Duration,

    /// Lifetime of an overspeed warning (default: 3s)
    pub speed_warning_ttl: Duration,

    /// How long a collision violation stays on screen after the halt (default: 5s)
    pub violation_cooldown: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "claim-session".to_string(),
            sample_period: Duration::from_secs(2),
            collision_period: Duration::from_secs(10),
            speed_warning_ttl: Duration::from_secs(3),
            violation_cooldown: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.sample_period, Duration::from_secs(2));
        assert_eq!(config.collision_period, Duration::from_secs(10));
        assert_eq!(config.speed_warning_ttl, Duration::from_secs(3));
        assert_eq!(config.violation_cooldown, Duration::from_secs(5));
    }
}
