//! EarthLord Deterministic Simulation Harness
//!
//! Walks a simulated player through claim scenarios on a virtual clock so
//! the whole claim engine runs reproducibly from a single seed.
//!
//! # Core Principle: Controlled Inputs
//!
//! Every source of non-determinism is replaced:
//! - **Time**: a virtual clock that only moves when the runner steps it
//! - **GPS**: a ground-truth walker with seeded Gaussian noise
//! - **Storage**: an in-memory territory store with an outage switch
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ScenarioRunner                         │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ SimContext (virtual clock, 1 s steps)                │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │       │ fixes                    │ snapshot / insert        │
//! │  ┌────▼─────┐  1 Hz   ┌────────────────┐  ┌──────────────┐  │
//! │  │GpsWalker │────────►│  ClaimSession  │◄►│SimTerritory- │  │
//! │  │ (noise)  │         │ sample / poll  │  │    Store     │  │
//! │  └──────────┘         └────────────────┘  └──────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use earthlord_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::SquareClaim);
//! assert!(result.passed);
//! ```

mod context;
mod runner;
mod territories;
mod walker;
pub mod scenarios;

pub use context::SimContext;
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner, DEFAULT_NOISE_M, DEFAULT_ORIGIN};
pub use territories::SimTerritoryStore;
pub use walker::{route_length, GpsWalker, LocalPoint};
