//! Speed gate - rejects samples that imply vehicle travel.
//!
//! Velocity is computed between the candidate and the last *accepted* fix
//! using GPS hardware time, so a delayed sampler never inflates the speed.

use crate::config::{STOP_SPEED_KMH, TIMESTAMP_NOISE_SECS, WARN_SPEED_KMH};
use crate::geodesy::distance_m;
use earthlord_env::TimedFix;
use serde::{Deserialize, Serialize};

/// Outcome class of a speed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedTier {
    /// Walking pace
    Normal,
    /// Faster than a walk; accepted with a transient warning
    Warn,
    /// Vehicle speed; the sample is dropped and tracking must stop
    Reject,
}

/// Result of [`SpeedGate::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedVerdict {
    pub accept: bool,
    pub tier: SpeedTier,
    /// Measured speed, `None` when no speed could be computed
    pub speed_kmh: Option<f64>,
}

impl SpeedVerdict {
    fn unmeasured() -> Self {
        Self { accept: true, tier: SpeedTier::Normal, speed_kmh: None }
    }
}

/// Two-threshold velocity gate (15 km/h warn, 30 km/h reject).
#[derive(Debug, Clone, Copy, Default)]
pub struct SpeedGate;

impl SpeedGate {
    pub fn new() -> Self {
        Self
    }

    /// Checks `candidate` against the last accepted fix.
    pub fn evaluate(&self, candidate: &TimedFix, last_accepted: Option<&TimedFix>) -> SpeedVerdict {
        let Some(last) = last_accepted else {
            return SpeedVerdict::unmeasured();
        };

        let elapsed = candidate.secs_since(last);
        if elapsed <= TIMESTAMP_NOISE_SECS {
            return SpeedVerdict::unmeasured();
        }

        let speed_kmh = distance_m(&last.point, &candidate.point) / elapsed * 3.6;
        let (accept, tier) = if speed_kmh > STOP_SPEED_KMH {
            (false, SpeedTier::Reject)
        } else if speed_kmh > WARN_SPEED_KMH {
            (true, SpeedTier::Warn)
        } else {
            (true, SpeedTier::Normal)
        };

        SpeedVerdict { accept, tier, speed_kmh: Some(speed_kmh) }
    }
}
