//! Plan execution.
//!
//! The applier performs the planned actions against the local directory and
//! session store. Failures are per record: they are logged, traced and
//! collected in the [`ApplyReport`], and the remaining actions still run.

use authws_storage::{LocalDirectory, SessionStore};
use serde::Serialize;
use uuid::Uuid;

use crate::config::{MatchKey, WsConfig};
use crate::error::{FederationError, FederationResult};
use crate::normalize::CandidateIdentity;
use crate::planner::ReconciliationPlan;
use crate::sync::SyncError;
use crate::trace::{TraceEvent, TraceLog};

/// Outcome of applying a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Identities created.
    pub created: usize,
    /// Identities updated.
    pub updated: usize,
    /// Identities suspended.
    pub suspended: usize,
    /// Sessions terminated.
    pub sessions_killed: usize,
    /// Per-record failures.
    pub errors: Vec<SyncError>,
}

impl ApplyReport {
    /// Returns true if any action failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Executes reconciliation plans.
pub struct Applier<'a> {
    directory: &'a dyn LocalDirectory,
    sessions: &'a dyn SessionStore,
    auth_method: &'a str,
    realm_id: Uuid,
    match_key: MatchKey,
}

impl<'a> Applier<'a> {
    /// Creates an applier for the given collaborators.
    #[must_use]
    pub fn new(
        config: &'a WsConfig,
        directory: &'a dyn LocalDirectory,
        sessions: &'a dyn SessionStore,
    ) -> Self {
        Self {
            directory,
            sessions,
            auth_method: &config.auth_method,
            realm_id: config.realm_id,
            match_key: config.match_key,
        }
    }

    /// Applies a plan: creations, then the bulk update, then suspensions.
    pub async fn apply(&self, plan: &ReconciliationPlan, trace: &mut TraceLog) -> ApplyReport {
        let mut report = ApplyReport::default();
        self.create_all(plan, trace, &mut report).await;
        self.update_all(plan, trace, &mut report).await;
        self.suspend_all(plan, trace, &mut report).await;

        tracing::info!(
            created = report.created,
            updated = report.updated,
            suspended = report.suspended,
            failed = report.errors.len(),
            "Plan applied"
        );
        report
    }

    // ========================================================================
    // Create
    // ========================================================================

    async fn create_all(
        &self,
        plan: &ReconciliationPlan,
        trace: &mut TraceLog,
        report: &mut ApplyReport,
    ) {
        for candidate in &plan.to_create {
            match self.create_one(candidate, trace).await {
                Ok((id, username)) => {
                    report.created += 1;
                    trace.record(TraceEvent::UserCreated { id, username });
                }
                Err(e) => {
                    let username = match &e {
                        FederationError::RecordCreate { username, .. } => username.clone(),
                        _ => candidate.username.clone(),
                    };
                    trace.record(TraceEvent::CreateFailed {
                        username: username.clone(),
                        reason: create_reason(&e),
                    });
                    report.errors.push(
                        SyncError::new(&candidate.idnumber, e.to_string()).with_username(username),
                    );
                }
            }
        }
    }

    async fn create_one(
        &self,
        candidate: &CandidateIdentity,
        trace: &mut TraceLog,
    ) -> FederationResult<(i64, String)> {
        let new = candidate.to_new_identity(self.realm_id, self.auth_method);
        let fail = |reason: String| FederationError::record_create(&new.username, reason);

        if new.username.is_empty() {
            return Err(FederationError::record_create(
                &candidate.username,
                "username has no characters allowed in the local directory",
            ));
        }
        if let Some(existing) = self.directory.find_by_username(&new.username).await? {
            return Err(fail(format!("username already used by id={}", existing.id)));
        }
        if self.match_key == MatchKey::Idnumber {
            if let Some(existing) = self.directory.find_by_idnumber(&new.idnumber).await? {
                return Err(fail(format!("idnumber already used by id={}", existing.id)));
            }
        }
        if let Some(holder) = self.directory.find_by_email(&new.email).await? {
            trace.record(TraceEvent::EmailInUse {
                username: new.username.clone(),
                email: new.email.clone(),
                holder_id: holder.id,
            });
        }

        let username = new.username.clone();
        let created = self
            .directory
            .create_user(new)
            .await
            .map_err(|e| FederationError::record_create(&username, e))?;
        Ok((created.id, created.username))
    }

    // ========================================================================
    // Update
    // ========================================================================

    async fn update_all(
        &self,
        plan: &ReconciliationPlan,
        trace: &mut TraceLog,
        report: &mut ApplyReport,
    ) {
        if plan.to_update.is_empty() {
            return;
        }

        let updates = plan.updates();
        trace.record(TraceEvent::UpdatingUsers {
            count: updates.len(),
        });

        let result = match self.match_key {
            MatchKey::Idnumber => {
                self.directory
                    .bulk_update_by_idnumber(self.auth_method, &updates)
                    .await
            }
            MatchKey::Username => {
                self.directory
                    .bulk_update_by_username(self.auth_method, &updates)
                    .await
            }
        };

        match result {
            Ok(outcome) => {
                report.updated = outcome.updated;
                trace.record(TraceEvent::UsersUpdated {
                    updated: outcome.updated,
                });
                for rejected in outcome.rejected {
                    let reason = rejected.reason();
                    let err = FederationError::RecordUpdate(format!(
                        "user id={}: {reason}",
                        rejected.target_id
                    ));
                    trace.record(TraceEvent::UserUpdateFailed {
                        id: rejected.target_id,
                        username: rejected.username.clone(),
                        reason,
                    });
                    report.errors.push(
                        SyncError::new(&rejected.idnumber, err.to_string())
                            .with_username(rejected.username),
                    );
                }
                let foreign = plan.foreign_updates(self.auth_method);
                if foreign > 0 {
                    trace.record(TraceEvent::ForeignUsersSkipped { count: foreign });
                }
            }
            Err(e) => {
                let err = FederationError::RecordUpdate(e.to_string());
                trace.record(TraceEvent::UpdateFailed {
                    reason: e.to_string(),
                });
                report
                    .errors
                    .push(SyncError::new("*", err.to_string()));
            }
        }
    }

    // ========================================================================
    // Suspend
    // ========================================================================

    async fn suspend_all(
        &self,
        plan: &ReconciliationPlan,
        trace: &mut TraceLog,
        report: &mut ApplyReport,
    ) {
        for identity in &plan.to_suspend {
            if let Err(e) = self.directory.suspend_user(identity.id).await {
                let err = FederationError::RecordSuspend {
                    user_id: identity.id,
                    reason: e.to_string(),
                };
                trace.record(TraceEvent::SuspendFailed {
                    id: identity.id,
                    username: identity.username.clone(),
                    reason: e.to_string(),
                });
                report.errors.push(
                    SyncError::new(&identity.idnumber, err.to_string())
                        .with_username(&identity.username),
                );
                continue;
            }
            report.suspended += 1;
            trace.record(TraceEvent::UserSuspended {
                id: identity.id,
                username: identity.username.clone(),
            });

            match self.sessions.kill_sessions(identity.id).await {
                Ok(count) => {
                    report.sessions_killed += count;
                    trace.record(TraceEvent::SessionsKilled {
                        id: identity.id,
                        count,
                    });
                }
                Err(e) => {
                    let err = FederationError::SessionKill {
                        user_id: identity.id,
                        reason: e.to_string(),
                    };
                    trace.record(TraceEvent::SessionKillFailed {
                        id: identity.id,
                        reason: e.to_string(),
                    });
                    report.errors.push(
                        SyncError::new(&identity.idnumber, err.to_string())
                            .with_username(&identity.username),
                    );
                }
            }
        }
    }
}

fn create_reason(err: &FederationError) -> String {
    match err {
        FederationError::RecordCreate { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}
