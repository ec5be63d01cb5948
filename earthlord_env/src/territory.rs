//! Territory persistence abstraction.

use async_trait::async_trait;
use crate::error::EnvError;
use crate::types::{Territory, TerritoryDraft};

/// Read/upload access to persisted territories.
///
/// The core treats the returned snapshot as read-only; it never edits a
/// persisted polygon, it only submits new claims.
#[async_trait]
pub trait TerritoryRepository: Send + Sync + 'static {
    /// Returns the current set of known territories (all owners).
    async fn snapshot(&self) -> Result<Vec<Territory>, EnvError>;

    /// Persists a validated claim and returns the stored record.
    async fn upload(&self, draft: TerritoryDraft) -> Result<Territory, EnvError>;
}
