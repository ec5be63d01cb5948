//! Error types for the EarthLord environment abstraction.

use thiserror::Error;

/// Errors raised by the territory storage collaborator.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The territory snapshot could not be fetched
    #[error("Territory fetch failed: {0}")]
    TerritoryFetch(String),

    /// The territory upload was rejected or failed in transit
    #[error("Territory upload failed: {0}")]
    Upload(String),
}

impl EnvError {
    /// Creates a territory fetch error.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::TerritoryFetch(msg.into())
    }

    /// Creates an upload error.
    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }
}
