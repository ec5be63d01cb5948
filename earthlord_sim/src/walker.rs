//! Ground-truth walker for simulation.
//!
//! The walker owns the "true" position of the simulated player:
//! - A waypoint route in local east/north metres around an origin
//! - Constant-speed kinematics along the route
//! - GPS fix generation (with seeded Gaussian noise)

use earthlord_core::geodesy::offset_m;
use earthlord_env::{GeoPoint, TimedFix};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Local planar position (m east, m north of the origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalPoint {
    pub east_m: f64,
    pub north_m: f64,
}

impl LocalPoint {
    pub const fn new(east_m: f64, north_m: f64) -> Self {
        Self { east_m, north_m }
    }

    fn distance_to(&self, other: &LocalPoint) -> f64 {
        (other.east_m - self.east_m).hypot(other.north_m - self.north_m)
    }
}

/// Total length of a polyline route (m).
pub fn route_length(route: &[LocalPoint]) -> f64 {
    route.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
}

/// Walks a route at constant speed and reports noisy fixes.
pub struct GpsWalker {
    origin: GeoPoint,
    route: Vec<LocalPoint>,
    speed_mps: f64,

    /// Index of the waypoint the current leg starts from
    leg: usize,
    position: LocalPoint,
    walked_m: f64,

    /// RNG for GPS noise (separate stream from the context seed)
    rng: ChaCha8Rng,
    noise: Option<Normal<f64>>,
}

impl GpsWalker {
    /// Creates a walker standing on the first waypoint.
    ///
    /// An empty route stands still at the origin.
    pub fn new(origin: GeoPoint, route: Vec<LocalPoint>, speed_mps: f64, seed: u64) -> Self {
        let position = route.first().copied().unwrap_or(LocalPoint::new(0.0, 0.0));
        Self {
            origin,
            route,
            speed_mps: speed_mps.max(0.0),
            leg: 0,
            position,
            walked_m: 0.0,
            rng: ChaCha8Rng::seed_from_u64(seed.wrapping_mul(0x9e3779b97f4a7c15)),
            noise: None,
        }
    }

    /// Sets the per-axis GPS noise standard deviation (m). Zero disables it.
    pub fn with_noise(mut self, std_dev_m: f64) -> Self {
        self.noise = if std_dev_m > 0.0 {
            Normal::new(0.0, std_dev_m).ok()
        } else {
            None
        };
        self
    }

    pub fn position(&self) -> LocalPoint {
        self.position
    }

    pub fn walked_m(&self) -> f64 {
        self.walked_m
    }

    /// True once the last waypoint has been reached.
    pub fn is_finished(&self) -> bool {
        self.leg + 1 >= self.route.len()
    }

    /// Advances the walker by `dt` seconds along the route.
    pub fn step(&mut self, dt: f64) {
        let mut budget = self.speed_mps * dt;

        while budget > 0.0 && !self.is_finished() {
            let target = self.route[self.leg + 1];
            let remaining = self.position.distance_to(&target);

            if remaining <= budget {
                self.position = target;
                self.walked_m += remaining;
                budget -= remaining;
                self.leg += 1;
            } else {
                let t = budget / remaining;
                self.position = LocalPoint::new(
                    self.position.east_m + (target.east_m - self.position.east_m) * t,
                    self.position.north_m + (target.north_m - self.position.north_m) * t,
                );
                self.walked_m += budget;
                budget = 0.0;
            }
        }
    }

    /// Noise-free geographic position.
    pub fn true_point(&self) -> GeoPoint {
        offset_m(&self.origin, self.position.east_m, self.position.north_m)
    }

    /// A GPS fix of the current position stamped with `measured_at`.
    pub fn fix(&mut self, measured_at: SystemTime) -> TimedFix {
        let (dx, dy) = match &self.noise {
            Some(normal) => (normal.sample(&mut self.rng), normal.sample(&mut self.rng)),
            None => (0.0, 0.0),
        };
        let point = offset_m(
            &self.origin,
            self.position.east_m + dx,
            self.position.north_m + dy,
        );
        TimedFix::new(point, measured_at)
    }
}
