//! Claim Session - one player's territory-claiming run.
//!
//! The session is an explicit state object owned by its caller. Every
//! mutation goes through `&mut self`, which gives the single-writer
//! discipline the engines rely on: appends, closure checks and validation
//! can never interleave.
//!
//! # Lifecycle
//!
//! ```text
//!            start()                 closure
//!   Idle ───────────────► Tracking ──────────► Tracking (closed, validated)
//!     ▲     (blocked if       │  │                   │
//!     │    start is inside    │  │ overspeed /        │ mark_uploaded()
//!     │    rival territory)   │  │ collision          ▼
//!     │                       │  └──────────► Halted (frozen path) ──► Idle
//!     └──── cancel() ◄────────┘ stop()
//! ```
//!
//! Timers are not owned here: the caller invokes [`ClaimSession::on_sample_tick`]
//! every sampling period and [`ClaimSession::on_collision_tick`] every
//! polling period (see `runtime::SessionDriver`).

use crate::closure::{ClosureDetector, ClosureState};
use crate::collision::{CollisionEngine, CollisionResult};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::geodesy::distance_m;
use crate::path_recorder::{AppendOutcome, Path, PathRecorder};
use crate::speed_gate::SpeedTier;
use crate::validation::{TerritoryValidator, ValidationResult};
use earthlord_env::{EarthLordContext, GeoPoint, OwnerId, Territory, TerritoryDraft, TimedFix};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

// ============================================================================
// EVENTS & OUTCOMES
// ============================================================================

/// Why tracking ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StopReason {
    UserStopped,
    Cancelled,
    Overspeed { speed_kmh: f64 },
    CollisionViolation,
    Uploaded,
}

/// Transient on-screen messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    Speed,
    Collision,
}

/// A message that disappears on its own at `expires_at` (context clock).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub expires_at: Duration,
}

/// Everything the presentation layer may react to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    PointAppended { point: GeoPoint, count: usize, tier: SpeedTier, speed_kmh: Option<f64> },
    JitterDropped { distance_m: f64 },
    SpeedWarning { speed_kmh: f64, message: String },
    Overspeed { speed_kmh: f64 },
    Closed { points: usize, distance_to_start_m: f64 },
    Validated(ValidationResult),
    Collision(CollisionResult),
    TrackingHalted(StopReason),
    NoticeCleared(NoticeKind),
}

/// Result of [`ClaimSession::start`].
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// Tracking began; `proximity` is the start point's tier
    Started { first_point: GeoPoint, proximity: CollisionResult },
    /// Tracking began without a fix; the first sample becomes the start
    /// point and is checked against the territories given to `start`
    AwaitingFix,
    /// The start point is inside a rival territory
    Blocked(CollisionResult),
}

// ============================================================================
// SESSION
// ============================================================================

/// State of one claiming session.
pub struct ClaimSession<Ctx: EarthLordContext> {
    context: Arc<Ctx>,
    owner: OwnerId,
    config: SessionConfig,

    // Engines
    recorder: PathRecorder,
    closure_detector: ClosureDetector,
    validator: TerritoryValidator,
    collisions: CollisionEngine,

    // Claim state
    path: Path,
    closure: ClosureState,
    validation: Option<ValidationResult>,
    /// The exact points `validation` was computed from
    validated_path: Option<Arc<[GeoPoint]>>,
    latest_collision: Option<CollisionResult>,
    started_at: Option<SystemTime>,
    /// Snapshot for the start-point check when tracking began without a fix
    pending_start_check: Option<Vec<Territory>>,

    // Tracking state
    tracking: bool,
    latest_fix: Option<TimedFix>,
    stop_reason: Option<StopReason>,

    speed_notice: Option<Notice>,
    collision_notice: Option<Notice>,
}

impl<Ctx: EarthLordContext> ClaimSession<Ctx> {
    pub fn new(context: Arc<Ctx>, owner: OwnerId, config: SessionConfig) -> Self {
        Self {
            context,
            owner,
            config,
            recorder: PathRecorder::new(),
            closure_detector: ClosureDetector::new(),
            validator: TerritoryValidator::new(),
            collisions: CollisionEngine::new(),
            path: Path::new(),
            closure: ClosureState::default(),
            validation: None,
            validated_path: None,
            latest_collision: None,
            started_at: None,
            pending_start_check: None,
            tracking: false,
            latest_fix: None,
            stop_reason: None,
            speed_notice: None,
            collision_notice: None,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn closure(&self) -> ClosureState {
        self.closure
    }

    pub fn validation(&self) -> Option<&ValidationResult> {
        self.validation.as_ref()
    }

    pub fn latest_collision(&self) -> Option<&CollisionResult> {
        self.latest_collision.as_ref()
    }

    pub fn latest_fix(&self) -> Option<&TimedFix> {
        self.latest_fix.as_ref()
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// The live notice of `kind`, if it hasn't expired yet.
    pub fn notice(&self, kind: NoticeKind) -> Option<&Notice> {
        let now = self.context.now();
        let slot = match kind {
            NoticeKind::Speed => &self.speed_notice,
            NoticeKind::Collision => &self.collision_notice,
        };
        slot.as_ref().filter(|n| n.expires_at > now)
    }

    /// Earliest pending notice expiry on the context clock.
    pub fn next_notice_deadline(&self) -> Option<Duration> {
        [&self.speed_notice, &self.collision_notice]
            .into_iter()
            .flatten()
            .map(|n| n.expires_at)
            .min()
    }

    // ------------------------------------------------------------------
    // Inputs
    // ------------------------------------------------------------------

    /// Records the latest device fix. Never appends by itself.
    pub fn update_location(&mut self, fix: TimedFix) {
        self.latest_fix = Some(fix);
    }

    /// Begins a claim at the current fix, or at the first sampled fix when
    /// none has arrived yet.
    pub fn start(&mut self, territories: &[Territory]) -> Result<StartOutcome, SessionError> {
        if self.tracking {
            return Err(SessionError::AlreadyTracking);
        }

        let Some(fix) = self.latest_fix else {
            self.reset_claim();
            self.pending_start_check = Some(territories.to_vec());
            self.tracking = true;
            self.started_at = Some(self.context.system_time());
            info!(session = %self.config.name, owner = %self.owner, "claim tracking started, waiting for a fix");
            return Ok(StartOutcome::AwaitingFix);
        };

        let check = self.collisions.check_start_point(&fix.point, territories, &self.owner);
        if check.is_violation() {
            warn!(session = %self.config.name, "claim start blocked");
            self.raise_notice(NoticeKind::Collision, check.message.clone().unwrap_or_default());
            self.latest_collision = Some(check.clone());
            return Ok(StartOutcome::Blocked(check));
        }

        self.reset_claim();
        self.recorder.maybe_append(&fix, &mut self.path);
        self.tracking = true;
        self.started_at = Some(self.context.system_time());
        self.latest_collision = Some(check.clone());

        info!(session = %self.config.name, owner = %self.owner, "claim tracking started");
        Ok(StartOutcome::Started { first_point: fix.point, proximity: check })
    }

    /// Sampling step: offers the latest fix to the path.
    pub fn on_sample_tick(&mut self) -> Vec<SessionEvent> {
        let mut events = self.expire_notices();
        if !self.tracking {
            return events;
        }
        let Some(fix) = self.latest_fix else {
            return events;
        };

        match self.recorder.maybe_append(&fix, &mut self.path) {
            AppendOutcome::First => {
                events.push(self.appended_event(fix.point, SpeedTier::Normal, None));
                if let Some(territories) = self.pending_start_check.take() {
                    let check = self.collisions.check_start_point(&fix.point, &territories, &self.owner);
                    if check.is_violation() {
                        warn!(session = %self.config.name, "first fix inside rival territory, claim start blocked");
                        self.raise_notice(NoticeKind::Collision, check.message.clone().unwrap_or_default());
                        self.reset_claim();
                        self.latest_collision = Some(check.clone());
                        self.tracking = false;
                        self.stop_reason = Some(StopReason::CollisionViolation);
                        events.push(SessionEvent::Collision(check));
                        events.push(SessionEvent::TrackingHalted(StopReason::CollisionViolation));
                        return events;
                    }
                    self.latest_collision = Some(check);
                }
                self.after_append(&mut events);
            }
            AppendOutcome::Appended { tier, speed_kmh } => {
                events.push(self.appended_event(fix.point, tier, speed_kmh));
                if tier == SpeedTier::Warn {
                    let speed = speed_kmh.unwrap_or_default();
                    let message = format!("Moving too fast ({speed:.0} km/h), slow down");
                    self.raise_notice(NoticeKind::Speed, message.clone());
                    events.push(SessionEvent::SpeedWarning { speed_kmh: speed, message });
                }
                self.after_append(&mut events);
            }
            AppendOutcome::Jitter { distance_m } => {
                debug!(distance_m, "fix within jitter floor, dropped");
                events.push(SessionEvent::JitterDropped { distance_m });
            }
            AppendOutcome::Overspeed { speed_kmh } => {
                warn!(session = %self.config.name, speed_kmh, "overspeed, tracking halted");
                self.raise_notice(
                    NoticeKind::Speed,
                    format!("Speed {speed_kmh:.0} km/h is too fast, tracking stopped"),
                );
                let reason = StopReason::Overspeed { speed_kmh };
                self.halt(reason);
                events.push(SessionEvent::Overspeed { speed_kmh });
                events.push(SessionEvent::TrackingHalted(reason));
            }
            AppendOutcome::Frozen => {}
        }
        events
    }

    /// Collision polling step against a fresh territory snapshot.
    pub fn on_collision_tick(&mut self, territories: &[Territory]) -> Vec<SessionEvent> {
        let mut events = self.expire_notices();
        if !self.tracking {
            return events;
        }

        let result =
            self.collisions
                .check_path_against_territories(self.path.points(), territories, &self.owner);
        self.latest_collision = Some(result.clone());

        if result.is_violation() {
            warn!(session = %self.config.name, kind = ?result.kind, "collision violation, tracking halted");
            self.raise_notice(NoticeKind::Collision, result.message.clone().unwrap_or_default());
            self.halt(StopReason::CollisionViolation);
            events.push(SessionEvent::Collision(result));
            events.push(SessionEvent::TrackingHalted(StopReason::CollisionViolation));
        } else {
            debug!(tier = ?result.tier, distance_m = result.distance_to_nearest_m, "collision check");
            events.push(SessionEvent::Collision(result));
        }
        events
    }

    /// User stop: freezes the path for display and clears notices at once.
    pub fn stop(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        if !self.tracking {
            return Err(SessionError::NotTracking);
        }
        let mut events = self.clear_notices();
        self.halt(StopReason::UserStopped);
        events.push(SessionEvent::TrackingHalted(StopReason::UserStopped));
        info!(session = %self.config.name, points = self.path.len(), "claim tracking stopped");
        Ok(events)
    }

    /// Abandons the claim: clears the path, the closure and the validation.
    pub fn cancel(&mut self) -> Vec<SessionEvent> {
        let mut events = self.clear_notices();
        let was_tracking = self.tracking;
        self.reset_claim();
        self.tracking = false;
        self.stop_reason = Some(StopReason::Cancelled);
        if was_tracking {
            events.push(SessionEvent::TrackingHalted(StopReason::Cancelled));
        }
        info!(session = %self.config.name, "claim cancelled");
        events
    }

    /// Upload payload for a closed, valid claim.
    pub fn upload_draft(&self) -> Result<TerritoryDraft, SessionError> {
        let (Some(result), Some(points)) = (&self.validation, &self.validated_path) else {
            return Err(SessionError::NotValidated);
        };
        self.validator
            .draft(self.owner.clone(), points, result, self.started_at)
            .ok_or(SessionError::NotValidated)
    }

    /// The claim was persisted: end the session and clear its state.
    pub fn mark_uploaded(&mut self) -> Vec<SessionEvent> {
        let mut events = self.clear_notices();
        let was_tracking = self.tracking;
        self.reset_claim();
        self.tracking = false;
        self.stop_reason = Some(StopReason::Uploaded);
        if was_tracking {
            events.push(SessionEvent::TrackingHalted(StopReason::Uploaded));
        }
        info!(session = %self.config.name, "claim uploaded");
        events
    }

    /// Drops notices whose lifetime has passed.
    pub fn expire_notices(&mut self) -> Vec<SessionEvent> {
        let now = self.context.now();
        let mut events = Vec::new();
        for slot in [&mut self.speed_notice, &mut self.collision_notice] {
            if slot.as_ref().is_some_and(|n| n.expires_at <= now) {
                if let Some(notice) = slot.take() {
                    events.push(SessionEvent::NoticeCleared(notice.kind));
                }
            }
        }
        events
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn appended_event(&self, point: GeoPoint, tier: SpeedTier, speed_kmh: Option<f64>) -> SessionEvent {
        SessionEvent::PointAppended { point, count: self.path.len(), tier, speed_kmh }
    }

    /// Closure check, then validation exactly once on the transition.
    fn after_append(&mut self, events: &mut Vec<SessionEvent>) {
        if self.closure.is_closed || !self.closure_detector.check_closure(self.path.points()) {
            return;
        }
        if !self.closure.close() {
            return;
        }

        let snapshot = self.path.snapshot();
        let distance_to_start_m = match (snapshot.first(), snapshot.last()) {
            (Some(a), Some(b)) => distance_m(a, b),
            _ => 0.0,
        };
        info!(session = %self.config.name, points = snapshot.len(), distance_to_start_m, "loop closed");
        events.push(SessionEvent::Closed { points: snapshot.len(), distance_to_start_m });

        let result = self.validator.validate(&snapshot);
        self.validation = Some(result.clone());
        self.validated_path = Some(snapshot);
        events.push(SessionEvent::Validated(result));
    }

    /// Raising a kind that is already shown replaces it and restarts its TTL.
    fn raise_notice(&mut self, kind: NoticeKind, message: String) {
        let ttl = match kind {
            NoticeKind::Speed => self.config.speed_warning_ttl,
            NoticeKind::Collision => self.config.violation_cooldown,
        };
        let notice = Notice { kind, message, expires_at: self.context.now() + ttl };
        match kind {
            NoticeKind::Speed => self.speed_notice = Some(notice),
            NoticeKind::Collision => self.collision_notice = Some(notice),
        }
    }

    fn clear_notices(&mut self) -> Vec<SessionEvent> {
        [self.speed_notice.take(), self.collision_notice.take()]
            .into_iter()
            .flatten()
            .map(|n| SessionEvent::NoticeCleared(n.kind))
            .collect()
    }

    /// Forced or user halt: tracking ends, the path stays for display.
    fn halt(&mut self, reason: StopReason) {
        self.tracking = false;
        self.path.freeze();
        self.stop_reason = Some(reason);
    }

    fn reset_claim(&mut self) {
        self.path.clear();
        self.recorder.reset();
        self.closure = ClosureState::default();
        self.validation = None;
        self.validated_path = None;
        self.latest_collision = None;
        self.started_at = None;
        self.pending_start_check = None;
        self.stop_reason = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::offset_m;
    use crate::validation::ValidationFailure;
    use async_trait::async_trait;
    use earthlord_env::TerritoryId;
    use std::sync::Mutex;
    use std::time::UNIX_EPOCH;

    const ORIGIN: GeoPoint = GeoPoint { latitude: 31.2304, longitude: 121.4737 };

    /// Manually advanced clock.
    #[derive(Default)]
    struct ManualClock {
        now: Mutex<Duration>,
    }

    impl ManualClock {
        fn advance(&self, d: Duration) {
            *self.now.lock().unwrap() += d;
        }
    }

    #[async_trait]
    impl EarthLordContext for ManualClock {
        fn now(&self) -> Duration {
            *self.now.lock().unwrap()
        }

        fn system_time(&self) -> SystemTime {
            UNIX_EPOCH + self.now()
        }

        async fn sleep(&self, duration: Duration) {
            self.advance(duration);
        }

        fn spawn<F>(&self, _name: &str, future: F)
        where
            F: std::future::Future<Output = ()> + Send + 'static,
        {
            tokio::spawn(future);
        }
    }

    fn fix(east: f64, north: f64, secs: u64) -> TimedFix {
        TimedFix::new(offset_m(&ORIGIN, east, north), UNIX_EPOCH + Duration::from_secs(secs))
    }

    fn session() -> (Arc<ManualClock>, ClaimSession<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let s = ClaimSession::new(clock.clone(), OwnerId::new("player-1"), SessionConfig::default());
        (clock, s)
    }

    fn rival_square(x0: f64) -> Territory {
        Territory {
            id: TerritoryId("rival-1".to_string()),
            owner_id: OwnerId::new("rival"),
            polygon: vec![
                offset_m(&ORIGIN, x0, -50.0),
                offset_m(&ORIGIN, x0 + 100.0, -50.0),
                offset_m(&ORIGIN, x0 + 100.0, 50.0),
                offset_m(&ORIGIN, x0, 50.0),
            ],
            area_m2: 10_000.0,
        }
    }

    /// Walk around a 48 m square, 12 m steps every 10 s.
    fn square_walk() -> Vec<TimedFix> {
        let corners = [(0.0, 0.0), (48.0, 0.0), (48.0, 48.0), (0.0, 48.0), (0.0, 0.0)];
        let mut out = Vec::new();
        let mut secs = 0;
        for w in corners.windows(2) {
            let ((x0, y0), (x1, y1)) = (w[0], w[1]);
            for k in 0..4 {
                let t = k as f64 / 4.0;
                out.push(fix(x0 + (x1 - x0) * t, y0 + (y1 - y0) * t, secs));
                secs += 10;
            }
        }
        out
    }

    fn walk(clock: &ManualClock, s: &mut ClaimSession<ManualClock>, fixes: &[TimedFix]) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        for f in fixes {
            clock.advance(Duration::from_secs(2));
            s.update_location(*f);
            events.extend(s.on_sample_tick());
        }
        events
    }

    #[test]
    fn test_start_with_fix_appends_first_point() {
        let (_clock, mut s) = session();
        s.update_location(fix(0.0, 0.0, 0));
        assert!(matches!(s.start(&[]), Ok(StartOutcome::Started { .. })));
        assert_eq!(s.path().len(), 1);
        assert!(matches!(s.start(&[]), Err(SessionError::AlreadyTracking)));
    }

    #[test]
    fn test_start_without_fix_tracks_from_first_sample() {
        let (clock, mut s) = session();
        assert_eq!(s.start(&[]).unwrap(), StartOutcome::AwaitingFix);
        assert!(s.is_tracking());
        assert!(s.path().is_empty());

        // Nothing to sample yet
        clock.advance(Duration::from_secs(2));
        assert!(s.on_sample_tick().is_empty());

        let events = walk(&clock, &mut s, &[fix(0.0, 0.0, 4)]);
        assert!(matches!(events[0], SessionEvent::PointAppended { count: 1, .. }));
        assert_eq!(s.path().len(), 1);
        assert!(s.latest_collision().is_some_and(|c| !c.is_violation()));

        walk(&clock, &mut s, &[fix(12.0, 0.0, 14)]);
        assert_eq!(s.path().len(), 2);
    }

    #[test]
    fn test_first_fix_inside_rival_blocks_pending_start() {
        let (clock, mut s) = session();
        assert_eq!(s.start(&[rival_square(0.0)]).unwrap(), StartOutcome::AwaitingFix);

        let events = walk(&clock, &mut s, &[fix(50.0, 0.0, 2)]);
        assert!(matches!(
            events.last(),
            Some(SessionEvent::TrackingHalted(StopReason::CollisionViolation))
        ));
        assert!(!s.is_tracking());
        assert!(s.path().is_empty());
        assert!(s.notice(NoticeKind::Collision).is_some());
    }

    #[test]
    fn test_start_inside_rival_is_blocked() {
        let (clock, mut s) = session();
        s.update_location(fix(50.0, 0.0, 0));

        let outcome = s.start(&[rival_square(0.0)]).unwrap();
        assert!(matches!(outcome, StartOutcome::Blocked(_)));
        assert!(!s.is_tracking());
        assert!(s.notice(NoticeKind::Collision).is_some());

        clock.advance(Duration::from_secs(5));
        assert!(s.notice(NoticeKind::Collision).is_none());
    }

    #[test]
    fn test_square_walk_closes_and_validates_once() {
        let (clock, mut s) = session();
        let fixes = square_walk();
        s.update_location(fixes[0]);
        s.start(&[]).unwrap();

        let events = walk(&clock, &mut s, &fixes[1..]);

        let closed = events.iter().filter(|e| matches!(e, SessionEvent::Closed { .. })).count();
        let validated: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Validated(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(closed, 1);
        assert_eq!(validated.len(), 1);
        assert!(validated[0].is_valid, "{:?}", validated[0].reason);
        assert!(s.closure().is_closed);

        // Walking past the start does not re-trigger closure
        let more = walk(&clock, &mut s, &[fix(12.0, 0.0, 200), fix(24.0, 0.0, 210)]);
        assert!(!more.iter().any(|e| matches!(e, SessionEvent::Closed { .. })));

        let draft = s.upload_draft().unwrap();
        assert_eq!(draft.owner_id, OwnerId::new("player-1"));
        assert!(draft.area_m2 > 1_000.0);
        // The draft is the validated snapshot, not the grown path
        assert!(draft.point_count < s.path().len());

        s.mark_uploaded();
        assert!(s.path().is_empty());
        assert!(s.validation().is_none());
        assert!(matches!(s.upload_draft(), Err(SessionError::NotValidated)));
    }

    #[test]
    fn test_jitter_is_dropped_silently() {
        let (clock, mut s) = session();
        s.update_location(fix(0.0, 0.0, 0));
        s.start(&[]).unwrap();

        let events = walk(&clock, &mut s, &[fix(3.0, 2.0, 2), fix(-2.0, 4.0, 4)]);
        assert_eq!(s.path().len(), 1);
        assert!(events.iter().all(|e| matches!(e, SessionEvent::JitterDropped { .. })));
    }

    #[test]
    fn test_warn_speed_notice_expires_on_its_own() {
        let (clock, mut s) = session();
        s.update_location(fix(0.0, 0.0, 0));
        s.start(&[]).unwrap();

        // 11 m in 2 s = 19.8 km/h
        let events = walk(&clock, &mut s, &[fix(11.0, 0.0, 2)]);
        assert!(events.iter().any(|e| matches!(e, SessionEvent::SpeedWarning { .. })));
        assert!(s.is_tracking());
        assert!(s.notice(NoticeKind::Speed).is_some());

        clock.advance(Duration::from_secs(3));
        assert!(s.notice(NoticeKind::Speed).is_none());
        assert_eq!(s.expire_notices(), vec![SessionEvent::NoticeCleared(NoticeKind::Speed)]);
        assert!(s.next_notice_deadline().is_none());
    }

    #[test]
    fn test_repeat_warning_restarts_notice_window() {
        let (clock, mut s) = session();
        s.update_location(fix(0.0, 0.0, 0));
        s.start(&[]).unwrap();

        walk(&clock, &mut s, &[fix(11.0, 0.0, 2)]);
        assert_eq!(s.notice(NoticeKind::Speed).map(|n| n.expires_at), Some(Duration::from_secs(5)));

        walk(&clock, &mut s, &[fix(22.0, 0.0, 4)]);
        clock.advance(Duration::from_millis(1_500));
        let notice = s.notice(NoticeKind::Speed).unwrap();
        assert_eq!(notice.expires_at, Duration::from_secs(7));

        clock.advance(Duration::from_millis(1_500));
        assert!(s.notice(NoticeKind::Speed).is_none());
    }

    #[test]
    fn test_overspeed_halts_and_freezes() {
        let (clock, mut s) = session();
        s.update_location(fix(0.0, 0.0, 0));
        s.start(&[]).unwrap();

        // 40 m in 2 s = 72 km/h
        let events = walk(&clock, &mut s, &[fix(40.0, 0.0, 2)]);
        assert!(events.iter().any(|e| matches!(e, SessionEvent::Overspeed { .. })));
        assert!(!s.is_tracking());
        assert!(s.path().is_frozen());
        assert_eq!(s.path().len(), 1);
        assert!(matches!(s.stop_reason(), Some(StopReason::Overspeed { .. })));

        // Halted sessions ignore further ticks
        let later = walk(&clock, &mut s, &[fix(80.0, 0.0, 60)]);
        assert!(later.iter().all(|e| matches!(e, SessionEvent::NoticeCleared(_))));
        assert_eq!(s.path().len(), 1);
    }

    #[test]
    fn test_collision_violation_halts_with_cooldown() {
        let (clock, mut s) = session();
        s.update_location(fix(0.0, 0.0, 0));
        s.start(&[rival_square(20.0)]).unwrap();
        walk(&clock, &mut s, &[fix(12.0, 0.0, 10), fix(24.0, 0.0, 20)]);

        let events = s.on_collision_tick(&[rival_square(20.0)]);
        assert!(matches!(events.last(), Some(SessionEvent::TrackingHalted(StopReason::CollisionViolation))));
        assert!(!s.is_tracking());
        assert!(s.path().is_frozen());

        clock.advance(Duration::from_secs(4));
        assert!(s.notice(NoticeKind::Collision).is_some());
        clock.advance(Duration::from_secs(1));
        assert!(s.notice(NoticeKind::Collision).is_none());
    }

    #[test]
    fn test_cancel_clears_everything_immediately() {
        let (clock, mut s) = session();
        s.update_location(fix(0.0, 0.0, 0));
        s.start(&[]).unwrap();
        walk(&clock, &mut s, &[fix(11.0, 0.0, 2)]);
        assert!(s.notice(NoticeKind::Speed).is_some());

        let events = s.cancel();
        assert!(events.contains(&SessionEvent::NoticeCleared(NoticeKind::Speed)));
        assert!(events.contains(&SessionEvent::TrackingHalted(StopReason::Cancelled)));
        assert!(s.path().is_empty());
        assert!(s.notice(NoticeKind::Speed).is_none());
        assert!(!s.closure().is_closed);
    }

    #[test]
    fn test_stop_freezes_but_keeps_path() {
        let (clock, mut s) = session();
        s.update_location(fix(0.0, 0.0, 0));
        s.start(&[]).unwrap();
        walk(&clock, &mut s, &[fix(12.0, 0.0, 10)]);

        s.stop().unwrap();
        assert_eq!(s.path().len(), 2);
        assert!(s.path().is_frozen());
        assert!(matches!(s.stop(), Err(SessionError::NotTracking)));
    }

    #[test]
    fn test_short_closed_loop_reports_failure() {
        let (clock, mut s) = session();
        s.update_location(fix(0.0, 0.0, 0));
        s.start(&[]).unwrap();

        // Out-and-back along a line: closes near the start but encloses nothing
        let mut fixes = Vec::new();
        for k in 1..=5 {
            fixes.push(fix(k as f64 * 11.0, 0.0, k * 10));
        }
        for k in 1..=5 {
            fixes.push(fix(55.0 - k as f64 * 11.0, 1.0, 50 + k * 10));
        }
        let events = walk(&clock, &mut s, &fixes);

        let result = events.iter().find_map(|e| match e {
            SessionEvent::Validated(r) => Some(r.clone()),
            _ => None,
        });
        let result = result.expect("loop should close");
        assert!(!result.is_valid);
        assert!(matches!(result.failure, Some(ValidationFailure::TooSmall { .. })));
        // Failure is non-fatal
        assert!(s.is_tracking());
    }
}
