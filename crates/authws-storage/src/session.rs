//! Session store trait.

use async_trait::async_trait;

use crate::error::StorageResult;

/// Store of active login sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Invalidates every active session of the given identity.
    ///
    /// Returns the number of sessions terminated.
    async fn kill_sessions(&self, user_id: i64) -> StorageResult<usize>;
}
