//! GPS fix delivery abstraction.

use async_trait::async_trait;
use crate::types::TimedFix;

/// A stream of GPS fixes supplied by the location-services collaborator.
///
/// Platform SDKs deliver fixes through delegate callbacks; implementations
/// bridge those callbacks into a queue so the session suspends at
/// "await next fix" instead of registering callbacks.
///
/// ```text
/// GPS hardware --callback--> LocationFeed --queue--> next_fix().await
/// ```
#[async_trait]
pub trait LocationSource: Send + Sync + 'static {
    /// Waits for the next fix.
    ///
    /// # Returns
    /// * `Some(fix)` - A new fix arrived
    /// * `None` - The feed was closed (location services shut down)
    ///
    /// Must be cancel-safe: dropping the future must not lose a fix.
    async fn next_fix(&self) -> Option<TimedFix>;
}
