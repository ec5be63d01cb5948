//! Simulated territory storage with fault injection.

use async_trait::async_trait;
use earthlord_env::{EnvError, Territory, TerritoryDraft, TerritoryId, TerritoryRepository};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::debug;

struct StoreState {
    territories: Vec<Territory>,
    /// Id minting stream, so uploads get the same ids on every run
    rng: ChaCha8Rng,
}

/// In-memory territory store.
///
/// Offers both a synchronous surface for the step-driven runner and the
/// async [`TerritoryRepository`] surface for drivers.
pub struct SimTerritoryStore {
    state: RwLock<StoreState>,

    /// While set, every call fails like an unreachable backend
    offline: AtomicBool,
}

impl SimTerritoryStore {
    pub fn new(territories: Vec<Territory>, seed: u64) -> Self {
        Self {
            state: RwLock::new(StoreState {
                territories,
                rng: ChaCha8Rng::seed_from_u64(seed ^ 0x5445_5252),
            }),
            offline: AtomicBool::new(false),
        }
    }

    /// Toggles the simulated outage.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Current snapshot of every owner's territories.
    pub fn territories(&self) -> Result<Vec<Territory>, EnvError> {
        if self.is_offline() {
            return Err(EnvError::fetch("territory store offline"));
        }
        let state = self
            .state
            .read()
            .map_err(|_| EnvError::fetch("territory store lock poisoned"))?;
        Ok(state.territories.clone())
    }

    /// Stores a claim under a freshly minted id.
    pub fn insert(&self, draft: TerritoryDraft) -> Result<Territory, EnvError> {
        if self.is_offline() {
            return Err(EnvError::upload("territory store offline"));
        }
        if draft.polygon.len() < 3 {
            return Err(EnvError::upload(format!(
                "polygon has {} vertices, need at least 3",
                draft.polygon.len()
            )));
        }

        let mut state = self
            .state
            .write()
            .map_err(|_| EnvError::upload("territory store lock poisoned"))?;
        let bytes: [u8; 16] = state.rng.gen();
        let territory = Territory {
            id: TerritoryId(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()),
            owner_id: draft.owner_id,
            polygon: draft.polygon,
            area_m2: draft.area_m2,
        };
        debug!(territory = %territory.id, area_m2 = territory.area_m2, "territory stored");
        state.territories.push(territory.clone());
        Ok(territory)
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.territories.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TerritoryRepository for SimTerritoryStore {
    async fn snapshot(&self) -> Result<Vec<Territory>, EnvError> {
        self.territories()
    }

    async fn upload(&self, draft: TerritoryDraft) -> Result<Territory, EnvError> {
        self.insert(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use earthlord_env::{BoundingBox, GeoPoint, OwnerId};

    fn draft(vertices: usize) -> TerritoryDraft {
        let polygon: Vec<GeoPoint> = (0..vertices)
            .map(|i| GeoPoint::new(40.0 + i as f64 * 1e-4, 116.0 + (i % 2) as f64 * 1e-4))
            .collect();
        TerritoryDraft {
            owner_id: OwnerId::new("player-1"),
            bounding_box: BoundingBox::from_points(&polygon).unwrap(),
            polygon,
            area_m2: 120.0,
            path_length_m: 60.0,
            point_count: vertices,
            started_at: None,
        }
    }

    #[test]
    fn test_ids_are_deterministic_per_seed() {
        let a = SimTerritoryStore::new(Vec::new(), 9);
        let b = SimTerritoryStore::new(Vec::new(), 9);

        let ta = a.insert(draft(4)).unwrap();
        let tb = b.insert(draft(4)).unwrap();
        assert_eq!(ta.id, tb.id);
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_offline_fails_both_ways() {
        let store = SimTerritoryStore::new(Vec::new(), 1);
        store.set_offline(true);

        assert!(matches!(store.territories(), Err(EnvError::TerritoryFetch(_))));
        assert!(matches!(store.insert(draft(4)), Err(EnvError::Upload(_))));
        assert!(store.is_empty());

        store.set_offline(false);
        assert!(store.territories().unwrap().is_empty());
    }

    #[test]
    fn test_degenerate_polygon_rejected() {
        let store = SimTerritoryStore::new(Vec::new(), 1);
        assert!(matches!(store.insert(draft(2)), Err(EnvError::Upload(_))));
    }

    #[tokio::test]
    async fn test_repository_surface() {
        let store = SimTerritoryStore::new(Vec::new(), 3);
        let stored = store.upload(draft(5)).await.unwrap();

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot, vec![stored]);
    }
}
