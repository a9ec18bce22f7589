//! Federation error types.

use thiserror::Error;

/// Errors that can occur during authentication and synchronisation.
#[derive(Debug, Error)]
pub enum FederationError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The remote directory could not be reached or returned a fault.
    #[error("Remote directory unavailable: {0}")]
    RemoteUnavailable(String),

    /// Nothing was staged, so reconciliation was refused.
    #[error("Safety abort: no users were staged from the remote directory, refusing to reconcile")]
    SafetyAbort,

    /// A candidate repeated a key already staged.
    #[error("Duplicate {field} '{value}' in remote data")]
    DuplicateKey {
        /// Staging key field.
        field: &'static str,
        /// Repeated value.
        value: String,
    },

    /// A local identity could not be created.
    #[error("Could not create user '{username}': {reason}")]
    RecordCreate {
        /// Username of the candidate.
        username: String,
        /// Failure reason.
        reason: String,
    },

    /// Matched identities could not be updated.
    #[error("Could not update: {0}")]
    RecordUpdate(String),

    /// A local identity could not be suspended.
    #[error("Could not suspend user {user_id}: {reason}")]
    RecordSuspend {
        /// Local identity id.
        user_id: i64,
        /// Failure reason.
        reason: String,
    },

    /// Sessions of a suspended identity could not be terminated.
    #[error("Could not kill sessions of user {user_id}: {reason}")]
    SessionKill {
        /// Local identity id.
        user_id: i64,
        /// Failure reason.
        reason: String,
    },

    /// Local directory error.
    #[error("Storage error: {0}")]
    Storage(#[from] authws_storage::StorageError),
}

impl FederationError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a remote unavailable error.
    #[must_use]
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::RemoteUnavailable(msg.into())
    }

    /// Creates a record creation error.
    #[must_use]
    pub fn record_create(username: impl Into<String>, reason: impl ToString) -> Self {
        Self::RecordCreate {
            username: username.into(),
            reason: reason.to_string(),
        }
    }

    /// Checks if this is a safety abort.
    #[must_use]
    pub const fn is_safety_abort(&self) -> bool {
        matches!(self, Self::SafetyAbort)
    }

    /// Checks if this is a remote directory error.
    #[must_use]
    pub const fn is_remote_error(&self) -> bool {
        matches!(self, Self::RemoteUnavailable(_))
    }

    /// Checks if this error affects a single record only.
    ///
    /// Per-record errors are logged and the run continues.
    #[must_use]
    pub const fn is_per_record(&self) -> bool {
        matches!(
            self,
            Self::DuplicateKey { .. }
                | Self::RecordCreate { .. }
                | Self::RecordUpdate(_)
                | Self::RecordSuspend { .. }
                | Self::SessionKill { .. }
        )
    }
}

/// Result type for federation operations.
pub type FederationResult<T> = Result<T, FederationError>;
