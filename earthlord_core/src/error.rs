//! Session error types.
//!
//! Domain outcomes (validation failure, overspeed, collision) are result
//! values, not errors. These variants cover misuse of the session and
//! collaborator failures.

use earthlord_env::EnvError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// `start` called while a claim is being tracked
    #[error("Session is already tracking")]
    AlreadyTracking,

    /// `stop` called with nothing being tracked
    #[error("Session is not tracking")]
    NotTracking,

    /// Upload requested without a closed, valid claim
    #[error("No validated claim to upload")]
    NotValidated,

    /// Collaborator failure (territory storage)
    #[error("Environment error: {0}")]
    Env(#[from] EnvError),

    /// The session driver task has exited
    #[error("Session driver has shut down")]
    DriverGone,
}
