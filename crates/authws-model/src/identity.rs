//! Local identity model.
//!
//! A local identity is a user record persisted by the local directory.
//! The synchroniser never owns these records: it reads them through a
//! snapshot and requests mutations through the directory interface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user record in the local directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalIdentity {
    // === Identity ===
    /// Directory-assigned identifier.
    pub id: i64,
    /// Realm (host) the identity belongs to.
    pub realm_id: Uuid,
    /// Unique username within the directory.
    pub username: String,
    /// Stable identifier issued by the external registry.
    #[serde(default)]
    pub idnumber: String,

    // === Profile ===
    /// First name.
    #[serde(default)]
    pub first_name: String,
    /// Last name.
    #[serde(default)]
    pub last_name: String,
    /// Email address.
    #[serde(default)]
    pub email: String,

    // === Account state ===
    /// Authentication method that owns this identity (e.g. `ws`, `manual`).
    pub auth_method: String,
    /// Whether the account is suspended.
    #[serde(default)]
    pub suspended: bool,
    /// Whether the account is flagged as deleted.
    #[serde(default)]
    pub deleted: bool,
    /// Whether the account is confirmed.
    #[serde(default)]
    pub confirmed: bool,

    // === Timestamps ===
    /// When the identity was created.
    pub created_at: DateTime<Utc>,
    /// When the identity was last modified.
    pub updated_at: DateTime<Utc>,
}

impl LocalIdentity {
    /// Creates a confirmed, active identity with the given id and username.
    #[must_use]
    pub fn new(
        id: i64,
        realm_id: Uuid,
        username: impl Into<String>,
        auth_method: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            realm_id,
            username: username.into(),
            idnumber: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            auth_method: auth_method.into(),
            suspended: false,
            deleted: false,
            confirmed: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Materialises a creation request under the given id.
    #[must_use]
    pub fn from_new(id: i64, new: NewIdentity) -> Self {
        let now = Utc::now();
        Self {
            id,
            realm_id: new.realm_id,
            username: new.username,
            idnumber: new.idnumber,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            auth_method: new.auth_method,
            suspended: false,
            deleted: false,
            confirmed: new.confirmed,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the external idnumber.
    #[must_use]
    pub fn with_idnumber(mut self, idnumber: impl Into<String>) -> Self {
        self.idnumber = idnumber.into();
        self
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Sets first and last name.
    #[must_use]
    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    /// Sets the suspended flag.
    #[must_use]
    pub const fn with_suspended(mut self, suspended: bool) -> Self {
        self.suspended = suspended;
        self
    }

    /// Sets the deleted flag.
    #[must_use]
    pub const fn with_deleted(mut self, deleted: bool) -> Self {
        self.deleted = deleted;
        self
    }

    /// Gets the full name, `None` when both parts are blank.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (false, false) => Some(format!("{} {}", self.first_name, self.last_name)),
            (false, true) => Some(self.first_name.clone()),
            (true, false) => Some(self.last_name.clone()),
            (true, true) => None,
        }
    }

    /// Checks if the identity is owned by the given auth method.
    #[must_use]
    pub fn is_owned_by(&self, auth_method: &str) -> bool {
        self.auth_method == auth_method
    }

    /// Checks if the identity can currently log in.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.confirmed && !self.suspended && !self.deleted
    }

    /// Applies a sync update.
    ///
    /// A re-verified identity is always reactivated: suspended and deleted
    /// are cleared and the account is confirmed.
    pub fn apply_update(&mut self, update: &IdentityUpdate) {
        self.username.clone_from(&update.username);
        self.idnumber.clone_from(&update.idnumber);
        self.first_name.clone_from(&update.first_name);
        self.last_name.clone_from(&update.last_name);
        self.email.clone_from(&update.email);
        self.suspended = false;
        self.deleted = false;
        self.confirmed = true;
        self.updated_at = Utc::now();
    }
}

/// Request to create a new local identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIdentity {
    /// Realm (host) to create the identity in.
    pub realm_id: Uuid,
    /// Username, already sanitised for the directory.
    pub username: String,
    /// External idnumber.
    pub idnumber: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email address.
    pub email: String,
    /// Owning auth method.
    pub auth_method: String,
    /// Whether the account starts confirmed.
    pub confirmed: bool,
}

/// Field update for an identity matched by the synchroniser.
///
/// The update is keyed by `idnumber` (or `username` in legacy matching);
/// the remaining fields overwrite the stored profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityUpdate {
    /// External idnumber.
    pub idnumber: String,
    /// Username.
    pub username: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email address.
    pub email: String,
}
