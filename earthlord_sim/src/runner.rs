//! Scenario runner - walks a simulated player through a claim scenario.
//!
//! The runner drives a [`ClaimSession`] by hand on the virtual clock:
//! one GPS fix per simulated second, session steps whenever the sampling
//! and collision timers come due.

use crate::context::SimContext;
use crate::scenarios::{Expectation, ScenarioId, PLAYER_ID};
use crate::territories::SimTerritoryStore;
use crate::walker::GpsWalker;

use earthlord_core::{
    ClaimSession, PeriodicTask, SessionConfig, SessionEvent, StartOutcome, StopReason,
    ValidationResult,
};
use earthlord_env::{EarthLordContext, GeoPoint, OwnerId, Territory};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default origin: People's Square, Shanghai.
pub const DEFAULT_ORIGIN: GeoPoint = GeoPoint { latitude: 31.2304, longitude: 121.4737 };

/// Default per-axis GPS noise (m).
pub const DEFAULT_NOISE_M: f64 = 1.5;

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether the scenario produced its expected outcome
    pub passed: bool,

    /// Simulated seconds stepped
    pub total_ticks: u64,

    /// Final virtual time in seconds
    pub final_time_secs: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioMetrics {
    /// GPS fixes fed to the session
    pub fixes: u64,

    /// Sampling steps fired
    pub samples: u64,

    /// Points appended to the path (including the start point)
    pub appended: u64,

    /// Fixes dropped under the jitter floor
    pub jitter_dropped: u64,

    /// Speed warnings raised
    pub speed_warnings: u64,

    /// Collision polls fired
    pub collision_checks: u64,

    /// Polls that fell back to the previous territory snapshot
    pub stale_snapshots: u64,

    /// Closest observed distance to a rival territory (m)
    pub closest_rival_m: Option<f64>,

    /// Path length when the run ended
    pub final_path_len: usize,

    /// Area of the validated loop, if one closed (m²)
    pub area_m2: Option<f64>,

    /// Id of the uploaded territory, if any
    pub uploaded_territory: Option<String>,
}

/// What the session reported during a run.
#[derive(Debug, Default)]
struct RunLog {
    started: bool,
    blocked: bool,
    violation: bool,
    validation: Option<ValidationResult>,
    stop_reason: Option<StopReason>,
    metrics: ScenarioMetrics,
}

impl RunLog {
    fn record(&mut self, events: Vec<SessionEvent>) {
        for event in events {
            match event {
                SessionEvent::PointAppended { count, .. } => {
                    self.metrics.appended += 1;
                    debug!(count, "point appended");
                }
                SessionEvent::JitterDropped { .. } => self.metrics.jitter_dropped += 1,
                SessionEvent::SpeedWarning { .. } => self.metrics.speed_warnings += 1,
                SessionEvent::Collision(result) => {
                    if result.is_violation() {
                        self.violation = true;
                    } else if result.distance_to_nearest_m.is_finite() {
                        let closest = self.metrics.closest_rival_m.get_or_insert(f64::INFINITY);
                        *closest = closest.min(result.distance_to_nearest_m);
                    }
                }
                SessionEvent::Validated(result) => {
                    self.metrics.area_m2 = Some(result.area_m2);
                    self.validation = Some(result);
                }
                SessionEvent::TrackingHalted(reason) => self.stop_reason = Some(reason),
                SessionEvent::Overspeed { .. }
                | SessionEvent::Closed { .. }
                | SessionEvent::NoticeCleared(_) => {}
            }
        }
    }
}

/// Runs claim scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Per-axis GPS noise (m)
    noise_std_m: f64,

    /// Where every scenario is laid out
    origin: GeoPoint,

    /// Take the territory store offline once tracking starts
    store_outage: bool,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            noise_std_m: DEFAULT_NOISE_M,
            origin: DEFAULT_ORIGIN,
            store_outage: false,
        }
    }

    /// Sets the GPS noise.
    pub fn with_noise(mut self, std_dev_m: f64) -> Self {
        self.noise_std_m = std_dev_m;
        self
    }

    /// Sets the origin scenarios are laid out around.
    pub fn with_origin(mut self, origin: GeoPoint) -> Self {
        self.origin = origin;
        self
    }

    /// Simulates a territory backend outage for the whole tracking phase.
    pub fn with_store_outage(mut self, outage: bool) -> Self {
        self.store_outage = outage;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let plan = scenario.plan(&self.origin);
        let context = SimContext::shared(self.seed);
        let store = SimTerritoryStore::new(plan.territories.clone(), self.seed);
        let mut walker = GpsWalker::new(self.origin, plan.route.clone(), plan.speed_mps, self.seed)
            .with_noise(self.noise_std_m);

        let config = SessionConfig {
            name: format!("sim-{}", scenario.name()),
            ..SessionConfig::default()
        };
        let mut sampler = PeriodicTask::new(config.sample_period);
        let mut collision_poll = PeriodicTask::new(config.collision_period);
        let mut session = ClaimSession::new(context.clone(), OwnerId::new(PLAYER_ID), config);
        let mut log = RunLog::default();

        // Start at the first fix
        session.update_location(walker.fix(context.system_time()));
        log.metrics.fixes += 1;
        let mut territories = Vec::new();
        self.refresh(&store, &mut territories, &mut log);

        match session.start(&territories) {
            Ok(StartOutcome::Started { proximity, .. }) => {
                debug!(tier = ?proximity.tier, "claim started");
                log.started = true;
                log.metrics.appended += 1;
                sampler.arm(context.now());
                collision_poll.arm(context.now());
            }
            Ok(StartOutcome::AwaitingFix) => {
                debug!("claim started before the first fix");
                log.started = true;
                sampler.arm(context.now());
                collision_poll.arm(context.now());
            }
            Ok(StartOutcome::Blocked(result)) => {
                info!(territory = ?result.territory_id, "start blocked");
                log.blocked = true;
            }
            Err(e) => {
                warn!(error = %e, "claim start failed");
                return self.result(scenario, &context, 0, false, Some(format!("start failed: {e}")), log.metrics);
            }
        }

        if self.store_outage {
            store.set_offline(true);
        }

        let mut ticks = 0;
        while log.started && session.is_tracking() && ticks < plan.duration_secs {
            ticks += 1;
            context.advance_time(Duration::from_secs(1));
            walker.step(1.0);
            session.update_location(walker.fix(context.system_time()));
            log.metrics.fixes += 1;

            let now = context.now();
            if sampler.due(now) {
                sampler.advance(now);
                log.metrics.samples += 1;
                log.record(session.on_sample_tick());
            }
            if collision_poll.due(now) && session.is_tracking() {
                collision_poll.advance(now);
                log.metrics.collision_checks += 1;
                self.refresh(&store, &mut territories, &mut log);
                log.record(session.on_collision_tick(&territories));
            }
        }
        log.metrics.final_path_len = session.path().len();
        store.set_offline(false);

        // Claim whatever validated
        if session.validation().is_some_and(|v| v.is_valid) {
            match session.upload_draft().map(|draft| store.insert(draft)) {
                Ok(Ok(territory)) => {
                    info!(territory = %territory.id, area_m2 = territory.area_m2, "claim uploaded");
                    log.metrics.uploaded_territory = Some(territory.id.0.clone());
                    session.mark_uploaded();
                }
                Ok(Err(e)) => warn!(error = %e, "claim upload failed"),
                Err(e) => warn!(error = %e, "no claim to upload"),
            }
        }

        let failure = Self::check(&plan.expectation, &log);
        if let Some(reason) = &failure {
            warn!(scenario = scenario.name(), reason = %reason, "expectation not met");
        }
        self.result(scenario, &context, ticks, failure.is_none(), failure, log.metrics)
    }

    fn refresh(&self, store: &SimTerritoryStore, territories: &mut Vec<Territory>, log: &mut RunLog) {
        match store.territories() {
            Ok(fresh) => *territories = fresh,
            Err(e) => {
                log.metrics.stale_snapshots += 1;
                debug!(error = %e, "territory refresh failed, keeping previous snapshot");
            }
        }
    }

    /// Returns the failure reason, `None` when the expectation holds.
    fn check(expectation: &Expectation, log: &RunLog) -> Option<String> {
        let failure = |msg: String| Some(msg);
        match *expectation {
            Expectation::ValidClaim { min_area_m2, max_area_m2 } => {
                let Some(validation) = &log.validation else {
                    return failure("loop never closed".to_string());
                };
                if !validation.is_valid {
                    return failure(format!(
                        "claim invalid: {}",
                        validation.reason.as_deref().unwrap_or("unknown")
                    ));
                }
                if !(min_area_m2..=max_area_m2).contains(&validation.area_m2) {
                    return failure(format!(
                        "area {:.0} m² outside {min_area_m2:.0}..{max_area_m2:.0}",
                        validation.area_m2
                    ));
                }
                if log.metrics.uploaded_territory.is_none() {
                    return failure("valid claim was not uploaded".to_string());
                }
                None
            }
            Expectation::PathLength(expected) => {
                if log.stop_reason.is_some() {
                    return failure(format!("tracking halted: {:?}", log.stop_reason));
                }
                if log.metrics.final_path_len != expected {
                    return failure(format!(
                        "path has {} points, expected {expected}",
                        log.metrics.final_path_len
                    ));
                }
                None
            }
            Expectation::Rejected(expected) => match &log.validation {
                None => failure("loop never closed".to_string()),
                Some(v) if v.failure == Some(expected) => None,
                Some(v) => failure(format!("expected {:?}, validation gave {:?}", expected, v.failure)),
            },
            Expectation::OverspeedHalt => match log.stop_reason {
                Some(StopReason::Overspeed { .. }) => None,
                other => failure(format!("expected overspeed halt, got {other:?}")),
            },
            Expectation::SpeedWarned => {
                if log.metrics.speed_warnings == 0 {
                    return failure("no speed warning raised".to_string());
                }
                if log.stop_reason.is_some() {
                    return failure(format!("tracking halted: {:?}", log.stop_reason));
                }
                None
            }
            Expectation::CollisionHalt => match log.stop_reason {
                Some(StopReason::CollisionViolation) => None,
                other => failure(format!("expected collision halt, got {other:?}")),
            },
            Expectation::StartBlocked => {
                if log.blocked {
                    None
                } else {
                    failure("start was not blocked".to_string())
                }
            }
            Expectation::StartAllowed => {
                if !log.started {
                    return failure("start was blocked".to_string());
                }
                if log.violation {
                    return failure("collision raised on own ground".to_string());
                }
                None
            }
        }
    }

    fn result(
        &self,
        scenario: ScenarioId,
        context: &SimContext,
        ticks: u64,
        passed: bool,
        failure_reason: Option<String>,
        metrics: ScenarioMetrics,
    ) -> ScenarioResult {
        ScenarioResult {
            scenario,
            seed: self.seed,
            passed,
            total_ticks: ticks,
            final_time_secs: context.now().as_secs_f64(),
            failure_reason,
            metrics,
        }
    }
}
