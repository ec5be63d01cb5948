//! EarthLord Core - Territory claiming engine
//!
//! Turns a stream of GPS fixes into an owned polygon:
//! 1. **Noisy fixes**: distance debounce plus a two-threshold speed gate
//! 2. **Bad loops**: closure detection and a four-stage validator
//!    (points, distance, self-intersection, area)
//! 3. **Overlapping claims**: collision checks against rival territories
//!    with graded proximity warnings

pub mod area;
pub mod closure;
pub mod collision;
pub mod config;
pub mod error;
pub mod geodesy;
pub mod intersection;
pub mod path_recorder;
pub mod runtime;
pub mod session;
pub mod speed_gate;
pub mod validation;

// Re-export key types for convenience
pub use area::AreaCalculator;
pub use closure::{ClosureDetector, ClosureState};
pub use collision::{CollisionEngine, CollisionKind, CollisionResult, CollisionTier, FeedbackIntensity};
pub use config::SessionConfig;
pub use error::SessionError;
pub use intersection::SelfIntersectionDetector;
pub use path_recorder::{AppendOutcome, Path, PathRecorder};
pub use runtime::{PeriodicTask, SessionCommand, SessionDriver, SessionHandle, SessionStatus};
pub use session::{ClaimSession, Notice, NoticeKind, SessionEvent, StartOutcome, StopReason};
pub use speed_gate::{SpeedGate, SpeedTier, SpeedVerdict};
pub use validation::{TerritoryValidator, ValidationFailure, ValidationResult};
