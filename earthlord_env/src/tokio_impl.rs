//! Production implementations backed by Tokio.

use crate::{EarthLordContext, EnvError, LocationSource, TerritoryRepository};
use crate::types::{Territory, TerritoryDraft, TerritoryId, TimedFix};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time::Instant;

/// Production context backed by the Tokio clock.
///
/// Uses `tokio::time::Instant` so a paused test runtime controls `now()`
/// and `sleep()` together.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl TokioContext {
    /// Creates a new TokioContext.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EarthLordContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn spawn<F>(&self, _name: &str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(future);
    }
}

// ============================================================================
// LOCATION FEED
// ============================================================================

/// Sending half of a channel-backed location source.
///
/// Hand this to the platform location delegate; every hardware callback
/// becomes one `push`.
#[derive(Debug, Clone)]
pub struct LocationFeed {
    tx: mpsc::UnboundedSender<TimedFix>,
}

impl LocationFeed {
    /// Queues a fix. Returns false once the receiving session is gone.
    pub fn push(&self, fix: TimedFix) -> bool {
        self.tx.send(fix).is_ok()
    }
}

/// Receiving half: a [`LocationSource`] fed by a [`LocationFeed`].
pub struct ChannelLocationSource {
    rx: Mutex<mpsc::UnboundedReceiver<TimedFix>>,
}

impl ChannelLocationSource {
    /// Creates a connected feed/source pair.
    pub fn channel() -> (LocationFeed, ChannelLocationSource) {
        let (tx, rx) = mpsc::unbounded_channel();
        (LocationFeed { tx }, ChannelLocationSource { rx: Mutex::new(rx) })
    }
}

#[async_trait]
impl LocationSource for ChannelLocationSource {
    async fn next_fix(&self) -> Option<TimedFix> {
        self.rx.lock().await.recv().await
    }
}

// ============================================================================
// TERRITORY CACHE
// ============================================================================

/// In-memory territory repository.
///
/// Serves as the local cache in front of the remote store: the caller
/// refreshes it with [`MemoryTerritoryRepository::replace`] and uploads are
/// appended locally with a freshly minted id.
#[derive(Default)]
pub struct MemoryTerritoryRepository {
    territories: RwLock<Vec<Territory>>,
}

impl MemoryTerritoryRepository {
    pub fn new(territories: Vec<Territory>) -> Self {
        Self {
            territories: RwLock::new(territories),
        }
    }

    /// Replaces the cached snapshot wholesale.
    pub async fn replace(&self, territories: Vec<Territory>) {
        *self.territories.write().await = territories;
    }

    pub async fn len(&self) -> usize {
        self.territories.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.territories.read().await.is_empty()
    }
}

#[async_trait]
impl TerritoryRepository for MemoryTerritoryRepository {
    async fn snapshot(&self) -> Result<Vec<Territory>, EnvError> {
        Ok(self.territories.read().await.clone())
    }

    async fn upload(&self, draft: TerritoryDraft) -> Result<Territory, EnvError> {
        if draft.polygon.len() < 3 {
            return Err(EnvError::upload(format!(
                "polygon has {} vertices, need at least 3",
                draft.polygon.len()
            )));
        }
        let territory = Territory {
            id: TerritoryId::random(),
            owner_id: draft.owner_id,
            polygon: draft.polygon,
            area_m2: draft.area_m2,
        };
        self.territories.write().await.push(territory.clone());
        Ok(territory)
    }
}
