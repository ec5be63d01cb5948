//! EarthLord Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" seam that lets the EarthLord territory
//! engine run against real hardware (tokio clock, platform GPS callbacks,
//! remote territory storage) or inside the deterministic simulator.
//!
//! # Core Concept: Explicit Collaborators
//!
//! Everything the core needs from the outside world is injected:
//! - Time (`now()`, `sleep()`, `spawn()`)
//! - GPS fixes (`LocationSource::next_fix()`)
//! - Existing territories (`TerritoryRepository::snapshot()` / `upload()`)
//!
//! # Example
//!
//! ```ignore
//! use earthlord_env::{EarthLordContext, LocationSource};
//!
//! async fn sampler<Ctx: EarthLordContext, Loc: LocationSource>(ctx: &Ctx, gps: &Loc) {
//!     loop {
//!         tokio::select! {
//!             fix = gps.next_fix() => remember(fix),
//!             _ = ctx.sleep(Duration::from_secs(2)) => sample(),
//!         }
//!     }
//! }
//! ```

mod context;
mod error;
mod location;
mod territory;
mod tokio_impl;
mod types;

pub use context::EarthLordContext;
pub use error::EnvError;
pub use location::LocationSource;
pub use territory::TerritoryRepository;
pub use tokio_impl::{ChannelLocationSource, LocationFeed, MemoryTerritoryRepository, TokioContext};
pub use types::{BoundingBox, GeoPoint, OwnerId, Territory, TerritoryDraft, TerritoryId, TimedFix};
