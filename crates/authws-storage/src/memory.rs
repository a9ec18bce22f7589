//! In-memory directory backend.
//!
//! Holds identities and sessions behind a lock. Used by the CLI (through
//! [`crate::JsonDirectoryFile`]) and by tests, which can also inject
//! per-record failures.

use std::collections::HashSet;

use async_trait::async_trait;
use authws_model::{sanitize_username, IdentityUpdate, LocalIdentity, NewIdentity, UserSession};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::directory::{BulkUpdateOutcome, LocalDirectory, RejectedUpdate};
use crate::error::{StorageError, StorageResult};
use crate::session::SessionStore;

/// Serializable contents of a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryState {
    /// Identity records.
    #[serde(default)]
    pub identities: Vec<LocalIdentity>,
    /// Login sessions.
    #[serde(default)]
    pub sessions: Vec<UserSession>,
}

/// Failures to inject into directory operations.
#[derive(Debug, Default)]
struct FailurePlan {
    create_usernames: HashSet<String>,
    suspend_ids: HashSet<i64>,
    kill_session_ids: HashSet<i64>,
    bulk_update: bool,
}

/// Directory kept entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<DirectoryState>,
    failures: RwLock<FailurePlan>,
    mutations: RwLock<usize>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory from previously stored contents.
    #[must_use]
    pub fn from_state(state: DirectoryState) -> Self {
        Self {
            state: RwLock::new(state),
            ..Self::default()
        }
    }

    /// Creates a directory seeded with the given identities.
    #[must_use]
    pub fn with_identities(identities: Vec<LocalIdentity>) -> Self {
        Self::from_state(DirectoryState {
            identities,
            sessions: Vec::new(),
        })
    }

    /// Adds an identity without counting it as a mutation.
    pub fn insert_identity(&self, identity: LocalIdentity) {
        self.state.write().identities.push(identity);
    }

    /// Adds a session without counting it as a mutation.
    pub fn insert_session(&self, session: UserSession) {
        self.state.write().sessions.push(session);
    }

    /// Returns a copy of the current contents.
    #[must_use]
    pub fn state(&self) -> DirectoryState {
        self.state.read().clone()
    }

    /// Gets an identity by id.
    #[must_use]
    pub fn get(&self, id: i64) -> Option<LocalIdentity> {
        self.state
            .read()
            .identities
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    /// Counts the active sessions of an identity.
    #[must_use]
    pub fn active_sessions(&self, user_id: i64) -> usize {
        self.state
            .read()
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.is_active())
            .count()
    }

    /// Number of mutating calls served so far (creates, updates, suspensions, session kills).
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        *self.mutations.read()
    }

    /// Makes `create_user` fail for the given username.
    pub fn fail_create_for(&self, username: impl Into<String>) {
        self.failures.write().create_usernames.insert(username.into());
    }

    /// Makes `suspend_user` fail for the given identity.
    pub fn fail_suspend_for(&self, id: i64) {
        self.failures.write().suspend_ids.insert(id);
    }

    /// Makes `kill_sessions` fail for the given identity.
    pub fn fail_kill_sessions_for(&self, id: i64) {
        self.failures.write().kill_session_ids.insert(id);
    }

    /// Makes bulk updates fail.
    pub fn fail_bulk_update(&self) {
        self.failures.write().bulk_update = true;
    }

    fn record_mutation(&self) {
        *self.mutations.write() += 1;
    }

    fn find_by<F>(&self, predicate: F) -> Option<LocalIdentity>
    where
        F: Fn(&LocalIdentity) -> bool,
    {
        self.state
            .read()
            .identities
            .iter()
            .find(|&i| predicate(i))
            .cloned()
    }

    fn bulk_update<K>(
        &self,
        auth_method: &str,
        updates: &[IdentityUpdate],
        key: K,
    ) -> StorageResult<BulkUpdateOutcome>
    where
        K: Fn(&LocalIdentity, &IdentityUpdate) -> bool,
    {
        if self.failures.read().bulk_update {
            return Err(StorageError::Internal("bulk update rejected".to_string()));
        }
        self.record_mutation();

        let mut state = self.state.write();
        let mut outcome = BulkUpdateOutcome::default();
        for update in updates {
            let Some(target) = state
                .identities
                .iter()
                .position(|i| i.is_owned_by(auth_method) && key(i, update))
            else {
                continue;
            };
            let target_id = state.identities[target].id;

            // Earlier updates of this batch are already applied, so they count as holders.
            let username = sanitize_username(&update.username);
            if let Some(holder) = state
                .identities
                .iter()
                .find(|i| i.id != target_id && sanitize_username(&i.username) == username)
            {
                tracing::warn!(
                    target_id,
                    holder_id = holder.id,
                    username = %update.username,
                    "Update skipped, username taken"
                );
                outcome.rejected.push(RejectedUpdate {
                    idnumber: update.idnumber.clone(),
                    username: update.username.clone(),
                    target_id,
                    holder_id: holder.id,
                });
                continue;
            }

            state.identities[target].apply_update(update);
            outcome.updated += 1;
        }
        Ok(outcome)
    }
}

#[async_trait]
impl LocalDirectory for InMemoryDirectory {
    async fn find_by_idnumber(&self, idnumber: &str) -> StorageResult<Option<LocalIdentity>> {
        if idnumber.is_empty() {
            return Ok(None);
        }
        Ok(self.find_by(|i| i.idnumber == idnumber))
    }

    async fn find_by_username(&self, username: &str) -> StorageResult<Option<LocalIdentity>> {
        Ok(self.find_by(|i| i.username == username))
    }

    async fn find_by_email(&self, email: &str) -> StorageResult<Option<LocalIdentity>> {
        if email.is_empty() {
            return Ok(None);
        }
        let email = email.to_lowercase();
        Ok(self.find_by(|i| i.email.to_lowercase() == email))
    }

    async fn create_user(&self, identity: NewIdentity) -> StorageResult<LocalIdentity> {
        if identity.username.is_empty() {
            return Err(StorageError::InvalidData("username cannot be empty".to_string()));
        }
        if self.failures.read().create_usernames.contains(&identity.username) {
            return Err(StorageError::Internal(format!(
                "create rejected for '{}'",
                identity.username
            )));
        }
        self.record_mutation();

        let mut state = self.state.write();
        if state.identities.iter().any(|i| i.username == identity.username) {
            return Err(StorageError::duplicate(
                "Identity",
                "username",
                identity.username,
            ));
        }

        let id = state.identities.iter().map(|i| i.id).max().unwrap_or(0) + 1;
        let stored = LocalIdentity::from_new(id, identity);
        state.identities.push(stored.clone());
        tracing::debug!(id, username = %stored.username, "Identity created");
        Ok(stored)
    }

    async fn bulk_update_by_idnumber(
        &self,
        auth_method: &str,
        updates: &[IdentityUpdate],
    ) -> StorageResult<BulkUpdateOutcome> {
        self.bulk_update(auth_method, updates, |identity, update| {
            !update.idnumber.is_empty() && identity.idnumber == update.idnumber
        })
    }

    async fn bulk_update_by_username(
        &self,
        auth_method: &str,
        updates: &[IdentityUpdate],
    ) -> StorageResult<BulkUpdateOutcome> {
        self.bulk_update(auth_method, updates, |identity, update| {
            sanitize_username(&identity.username) == update.username
        })
    }

    async fn suspend_user(&self, id: i64) -> StorageResult<()> {
        if self.failures.read().suspend_ids.contains(&id) {
            return Err(StorageError::Internal(format!("suspend rejected for {id}")));
        }
        self.record_mutation();

        let mut state = self.state.write();
        let identity = state
            .identities
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| StorageError::identity_not_found(id))?;
        identity.suspended = true;
        identity.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn snapshot(&self) -> StorageResult<Vec<LocalIdentity>> {
        Ok(self.state.read().identities.clone())
    }
}

#[async_trait]
impl SessionStore for InMemoryDirectory {
    async fn kill_sessions(&self, user_id: i64) -> StorageResult<usize> {
        if self.failures.read().kill_session_ids.contains(&user_id) {
            return Err(StorageError::Session(format!(
                "session store unavailable for {user_id}"
            )));
        }
        self.record_mutation();

        let mut state = self.state.write();
        let mut killed = 0;
        for session in state
            .sessions
            .iter_mut()
            .filter(|s| s.user_id == user_id && s.is_active())
        {
            session.kill();
            killed += 1;
        }
        Ok(killed)
    }
}
