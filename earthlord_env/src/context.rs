//! Core environment context trait for EarthLord sessions.

use async_trait::async_trait;
use std::future::Future;
use std::time::{Duration, SystemTime};

/// The central interface for environment interaction.
///
/// Abstracts the clock and task spawning so a claim session can run
/// against tokio in production and against a virtual clock in simulation.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`
/// - **Simulation**: `SimContext` - manually advanced virtual clock
#[async_trait]
pub trait EarthLordContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// Used for notice expiry and timer deadlines. Never used as the
    /// timestamp of a GPS fix; fixes carry their own hardware time.
    fn now(&self) -> Duration;

    /// Returns the wall-clock time (claim start stamps, logging).
    fn system_time(&self) -> SystemTime;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual clock
    async fn sleep(&self, duration: Duration);

    /// Spawns a background task.
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
