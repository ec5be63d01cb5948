//! Session Runtime - drives a [`ClaimSession`] with environment context.
//!
//! The driver task exclusively owns the session. Everything else talks to
//! it through a [`SessionHandle`] and listens on the event channel.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       SessionDriver task                     │
//! │                                                              │
//! │  LocationSource ──next_fix()──┐                              │
//! │                               ▼                              │
//! │  SessionHandle ──commands──► select! ──► ClaimSession        │
//! │                               ▲              │               │
//! │  sample (2s) / collision (10s)│              ▼               │
//! │  notice expiry ───────────────┘     SessionEvent channel     │
//! │                                                              │
//! │  TerritoryRepository ◄── snapshot() on start + each poll     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use earthlord_core::runtime::SessionDriver;
//! use earthlord_env::{ChannelLocationSource, MemoryTerritoryRepository, TokioContext};
//!
//! let (feed, source) = ChannelLocationSource::channel();
//! let (handle, mut events) = SessionDriver::spawn(
//!     TokioContext::shared(),
//!     Arc::new(source),
//!     Arc::new(MemoryTerritoryRepository::default()),
//!     OwnerId::new("player-1"),
//!     SessionConfig::default(),
//! );
//!
//! feed.push(fix);
//! handle.start().await?;
//! while let Some(event) = events.recv().await { /* render */ }
//! ```

use crate::collision::CollisionResult;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::session::{ClaimSession, Notice, NoticeKind, SessionEvent, StartOutcome, StopReason};
use crate::validation::ValidationResult;
use earthlord_env::{EarthLordContext, LocationSource, OwnerId, Territory, TerritoryRepository, TimedFix};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

// ============================================================================
// PERIODIC TASK
// ============================================================================

/// A cancellable fixed-period timer on the context clock.
#[derive(Debug, Clone, Copy)]
pub struct PeriodicTask {
    period: Duration,
    next_due: Option<Duration>,
}

impl PeriodicTask {
    pub fn new(period: Duration) -> Self {
        Self { period, next_due: None }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// First tick one period after `now`.
    pub fn arm(&mut self, now: Duration) {
        self.next_due = Some(now + self.period);
    }

    pub fn disarm(&mut self) {
        self.next_due = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.next_due
    }

    pub fn due(&self, now: Duration) -> bool {
        self.next_due.is_some_and(|t| t <= now)
    }

    /// Schedules the following tick. Missed ticks are skipped, not replayed.
    pub fn advance(&mut self, now: Duration) {
        if let Some(due) = self.next_due {
            let next = due + self.period;
            self.next_due = Some(if next <= now { now + self.period } else { next });
        }
    }
}

// ============================================================================
// COMMANDS & HANDLE
// ============================================================================

/// Point-in-time view of the session for callers outside the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub tracking: bool,
    pub path_len: usize,
    pub closed: bool,
    pub validation: Option<ValidationResult>,
    pub latest_collision: Option<CollisionResult>,
    pub stop_reason: Option<StopReason>,
    pub speed_notice: Option<Notice>,
    pub collision_notice: Option<Notice>,
}

/// Requests accepted by the driver. Each carries its acknowledgement.
#[derive(Debug)]
pub enum SessionCommand {
    Start { reply: oneshot::Sender<Result<StartOutcome, SessionError>> },
    Stop { reply: oneshot::Sender<Result<(), SessionError>> },
    Cancel { reply: oneshot::Sender<()> },
    ConfirmUpload { reply: oneshot::Sender<Result<Territory, SessionError>> },
    Status { reply: oneshot::Sender<SessionStatus> },
    Shutdown { reply: oneshot::Sender<()> },
}

/// Cloneable control surface of a running driver.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .map_err(|_| SessionError::DriverGone)?;
        rx.await.map_err(|_| SessionError::DriverGone)
    }

    /// Starts a claim at the latest fix (or the first one to arrive); arms
    /// both timers unless blocked.
    pub async fn start(&self) -> Result<StartOutcome, SessionError> {
        self.request(|reply| SessionCommand::Start { reply }).await?
    }

    /// Ends tracking. On return no further tick can fire.
    pub async fn stop(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Stop { reply }).await?
    }

    /// Abandons the claim. On return no further tick can fire.
    pub async fn cancel(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Cancel { reply }).await
    }

    /// Uploads the validated claim and, on success, ends the session.
    pub async fn confirm_upload(&self) -> Result<Territory, SessionError> {
        self.request(|reply| SessionCommand::ConfirmUpload { reply }).await?
    }

    pub async fn status(&self) -> Result<SessionStatus, SessionError> {
        self.request(|reply| SessionCommand::Status { reply }).await
    }

    /// Stops the driver task.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Shutdown { reply }).await
    }
}

// ============================================================================
// DRIVER
// ============================================================================

enum Wake {
    Fix(Option<TimedFix>),
    Command(Option<SessionCommand>),
    Timer,
}

/// Owns one [`ClaimSession`] and runs its timers.
pub struct SessionDriver<Ctx, Loc, Repo>
where
    Ctx: EarthLordContext,
    Loc: LocationSource,
    Repo: TerritoryRepository,
{
    context: Arc<Ctx>,
    location: Arc<Loc>,
    repository: Arc<Repo>,
    session: ClaimSession<Ctx>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
    territories: Vec<Territory>,
    sampler: PeriodicTask,
    collision_poll: PeriodicTask,
    location_open: bool,
}

impl<Ctx, Loc, Repo> SessionDriver<Ctx, Loc, Repo>
where
    Ctx: EarthLordContext,
    Loc: LocationSource,
    Repo: TerritoryRepository,
{
    /// Spawns the driver task through the context.
    pub fn spawn(
        context: Arc<Ctx>,
        location: Arc<Loc>,
        repository: Arc<Repo>,
        owner: OwnerId,
        config: SessionConfig,
    ) -> (SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let name = config.name.clone();
        let driver = Self {
            sampler: PeriodicTask::new(config.sample_period),
            collision_poll: PeriodicTask::new(config.collision_period),
            session: ClaimSession::new(context.clone(), owner, config),
            context: context.clone(),
            location,
            repository,
            commands: cmd_rx,
            events: event_tx,
            territories: Vec::new(),
            location_open: true,
        };

        context.spawn(&name, driver.run());
        (SessionHandle { commands: cmd_tx }, event_rx)
    }

    async fn run(mut self) {
        info!(session = %self.session.config().name, "session driver running");

        loop {
            let context = self.context.clone();
            let location = self.location.clone();
            let wait = self.next_deadline().map(|d| d.saturating_sub(context.now()));

            let timer = async move {
                match wait {
                    Some(d) => context.sleep(d).await,
                    None => std::future::pending::<()>().await,
                }
            };

            let wake = tokio::select! {
                biased;
                fix = location.next_fix(), if self.location_open => Wake::Fix(fix),
                cmd = self.commands.recv() => Wake::Command(cmd),
                _ = timer => Wake::Timer,
            };

            match wake {
                Wake::Fix(Some(fix)) => self.session.update_location(fix),
                Wake::Fix(None) => {
                    info!("location feed closed");
                    self.location_open = false;
                }
                Wake::Command(Some(cmd)) => {
                    if !self.handle_command(cmd).await {
                        break;
                    }
                }
                Wake::Command(None) => {
                    debug!("all session handles dropped");
                    break;
                }
                Wake::Timer => self.on_timers().await,
            }
        }

        info!(session = %self.session.config().name, "session driver stopped");
    }

    fn next_deadline(&self) -> Option<Duration> {
        [
            self.sampler.next_due(),
            self.collision_poll.next_due(),
            self.session.next_notice_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    async fn on_timers(&mut self) {
        let now = self.context.now();
        let mut events = self.session.expire_notices();

        if self.sampler.due(now) {
            self.sampler.advance(now);
            events.extend(self.session.on_sample_tick());
        }
        if self.collision_poll.due(now) && self.session.is_tracking() {
            self.collision_poll.advance(now);
            self.refresh_territories().await;
            events.extend(self.session.on_collision_tick(&self.territories));
        }

        // A forced halt ends the timers with it
        if !self.session.is_tracking() {
            self.disarm();
        }
        self.emit(events);
    }

    /// Returns false when the driver should exit.
    async fn handle_command(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::Start { reply } => {
                self.refresh_territories().await;
                let result = self.session.start(&self.territories);
                if let Ok(StartOutcome::Started { .. } | StartOutcome::AwaitingFix) = &result {
                    let now = self.context.now();
                    self.sampler.arm(now);
                    self.collision_poll.arm(now);
                    debug!(
                        sample_period = ?self.sampler.period(),
                        collision_period = ?self.collision_poll.period(),
                        "session timers armed"
                    );
                }
                let _ = reply.send(result);
            }
            SessionCommand::Stop { reply } => {
                self.disarm();
                let result = self.session.stop().map(|events| self.emit(events));
                let _ = reply.send(result);
            }
            SessionCommand::Cancel { reply } => {
                self.disarm();
                let events = self.session.cancel();
                self.emit(events);
                let _ = reply.send(());
            }
            SessionCommand::ConfirmUpload { reply } => {
                let _ = reply.send(self.upload().await);
            }
            SessionCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
            SessionCommand::Shutdown { reply } => {
                self.disarm();
                self.commands.close();
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    async fn upload(&mut self) -> Result<Territory, SessionError> {
        let draft = self.session.upload_draft()?;
        let territory = self.repository.upload(draft).await.map_err(|e| {
            warn!(error = %e, "territory upload failed, claim kept for retry");
            SessionError::from(e)
        })?;

        info!(territory = %territory.id, area_m2 = territory.area_m2, "territory claimed");
        self.disarm();
        let events = self.session.mark_uploaded();
        self.emit(events);
        Ok(territory)
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            tracking: self.session.is_tracking(),
            path_len: self.session.path().len(),
            closed: self.session.closure().is_closed,
            validation: self.session.validation().cloned(),
            latest_collision: self.session.latest_collision().cloned(),
            stop_reason: self.session.stop_reason(),
            speed_notice: self.session.notice(NoticeKind::Speed).cloned(),
            collision_notice: self.session.notice(NoticeKind::Collision).cloned(),
        }
    }

    /// Refreshes the territory snapshot; keeps the previous one on failure.
    async fn refresh_territories(&mut self) {
        match self.repository.snapshot().await {
            Ok(territories) => {
                debug!(count = territories.len(), "territory snapshot refreshed");
                self.territories = territories;
            }
            Err(e) => {
                warn!(error = %e, kept = self.territories.len(), "territory refresh failed, using previous snapshot");
            }
        }
    }

    fn disarm(&mut self) {
        self.sampler.disarm();
        self.collision_poll.disarm();
    }

    fn emit(&self, events: Vec<SessionEvent>) {
        for event in events {
            // Nobody listening is not an error
            let _ = self.events.send(event);
        }
    }
}
