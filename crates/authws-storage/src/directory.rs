//! Local directory provider trait.

use async_trait::async_trait;
use authws_model::{IdentityUpdate, LocalIdentity, NewIdentity};

use crate::error::StorageResult;

/// An update the directory refused to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedUpdate {
    /// External idnumber of the update.
    pub idnumber: String,
    /// Username the update asked for.
    pub username: String,
    /// Identity targeted by the update.
    pub target_id: i64,
    /// Identity already holding the username.
    pub holder_id: i64,
}

impl RejectedUpdate {
    /// Describes why the update was refused.
    #[must_use]
    pub fn reason(&self) -> String {
        format!("username already used by id={}", self.holder_id)
    }
}

/// Result of a bulk update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkUpdateOutcome {
    /// Number of identities updated.
    pub updated: usize,
    /// Updates skipped because their username is taken.
    pub rejected: Vec<RejectedUpdate>,
}

/// The local user directory as seen by the synchroniser.
///
/// Implementations own the identity records; callers only read them and
/// request mutations. Bulk updates are restricted to identities owned by
/// the given auth method.
#[async_trait]
pub trait LocalDirectory: Send + Sync {
    /// Gets an identity by external idnumber.
    async fn find_by_idnumber(&self, idnumber: &str) -> StorageResult<Option<LocalIdentity>>;

    /// Gets an identity by username.
    async fn find_by_username(&self, username: &str) -> StorageResult<Option<LocalIdentity>>;

    /// Gets an identity by email.
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<LocalIdentity>>;

    /// Creates a new identity and returns the stored record.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if the username is taken.
    async fn create_user(&self, identity: NewIdentity) -> StorageResult<LocalIdentity>;

    /// Applies profile updates keyed by idnumber.
    ///
    /// Only identities owned by `auth_method` are touched. An update whose
    /// username is held by another identity, or was taken by an earlier
    /// update of the same call, is skipped and listed in
    /// [`BulkUpdateOutcome::rejected`].
    async fn bulk_update_by_idnumber(
        &self,
        auth_method: &str,
        updates: &[IdentityUpdate],
    ) -> StorageResult<BulkUpdateOutcome>;

    /// Applies profile updates keyed by username.
    ///
    /// Legacy counterpart of [`LocalDirectory::bulk_update_by_idnumber`].
    ///
    /// Stored usernames are compared in sanitised form.
    async fn bulk_update_by_username(
        &self,
        auth_method: &str,
        updates: &[IdentityUpdate],
    ) -> StorageResult<BulkUpdateOutcome>;

    /// Marks an identity as suspended.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the identity doesn't exist.
    async fn suspend_user(&self, id: i64) -> StorageResult<()>;

    /// Returns every identity in the directory.
    async fn snapshot(&self) -> StorageResult<Vec<LocalIdentity>>;
}
