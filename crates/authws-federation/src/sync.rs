//! Synchronisation of the local directory with the remote registry.
//!
//! A pass fetches the student population, normalises and stages it, and
//! only then looks at the local directory. An empty staging set stops the
//! pass with [`FederationError::SafetyAbort`] before anything is read or
//! written locally.

use authws_storage::{LocalDirectory, SessionStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::applier::{ApplyReport, Applier};
use crate::client::{DirectoryClient, DirectoryTransport, RemoteValue};
use crate::config::WsConfig;
use crate::error::FederationResult;
use crate::normalize::{extract_records, normalize};
use crate::planner::{plan, LocalSnapshot, PlannerPolicy, ReconciliationPlan};
use crate::staging::{offer_traced, Stager, StagingSet};
use crate::trace::{TraceEvent, TraceLog};

// ============================================================================
// Sync Results
// ============================================================================

/// Result of a synchronisation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    /// Records returned by the registry.
    pub fetched: usize,

    /// Records dropped by the normalizer.
    pub rejected: usize,

    /// Candidates dropped as duplicates.
    pub duplicates: usize,

    /// Candidates staged.
    pub staged: usize,

    /// Identities created.
    pub created: usize,

    /// Identities updated.
    pub updated: usize,

    /// Identities suspended.
    pub suspended: usize,

    /// Sessions terminated.
    pub sessions_killed: usize,

    /// Number of failed actions.
    pub failed: usize,

    /// Whether the plan was computed without being applied.
    pub dry_run: bool,

    /// When the pass started.
    pub started_at: DateTime<Utc>,

    /// When the pass completed.
    pub completed_at: DateTime<Utc>,

    /// Status message.
    pub status: String,

    /// Errors encountered (if any).
    pub errors: Vec<SyncError>,
}

impl SyncReport {
    /// Creates a new report.
    #[must_use]
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            fetched: 0,
            rejected: 0,
            duplicates: 0,
            staged: 0,
            created: 0,
            updated: 0,
            suspended: 0,
            sessions_killed: 0,
            failed: 0,
            dry_run: false,
            started_at,
            completed_at: started_at,
            status: String::new(),
            errors: Vec::new(),
        }
    }

    /// Folds an apply report into this one.
    pub fn record_apply(&mut self, applied: ApplyReport) {
        self.created = applied.created;
        self.updated = applied.updated;
        self.suspended = applied.suspended;
        self.sessions_killed = applied.sessions_killed;
        self.failed = applied.errors.len();
        self.errors = applied.errors;
    }

    /// Marks the pass as complete.
    #[must_use]
    pub fn complete(mut self) -> Self {
        self.completed_at = Utc::now();
        self.status = if self.dry_run {
            format!("Dry run completed: {} staged, nothing applied", self.staged)
        } else {
            format!(
                "Sync completed: {} created, {} updated, {} suspended, {} failed",
                self.created, self.updated, self.suspended, self.failed
            )
        };
        self
    }

    /// Returns true if the pass had any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Error encountered during sync for a specific record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncError {
    /// External id of the record, `*` for bulk operations.
    pub external_id: String,

    /// Username (if available).
    pub username: Option<String>,

    /// Error message.
    pub message: String,
}

impl SyncError {
    /// Creates a new sync error.
    #[must_use]
    pub fn new(external_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            username: None,
            message: message.into(),
        }
    }

    /// Sets the username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

// ============================================================================
// Sync Engine
// ============================================================================

/// Runs synchronisation passes against a remote directory.
#[derive(Debug, Clone)]
pub struct SyncEngine<T> {
    config: WsConfig,
    client: DirectoryClient<T>,
}

impl<T: DirectoryTransport> SyncEngine<T> {
    /// Creates an engine from a configuration and a transport.
    #[must_use]
    pub fn new(config: WsConfig, transport: T) -> Self {
        let client = DirectoryClient::from_config(transport, &config);
        Self { config, client }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &WsConfig {
        &self.config
    }

    /// Runs one full pass: fetch, stage, plan and apply.
    ///
    /// Per-record failures are reported in the result. Only a safety abort
    /// or a failure to read the local directory is an error.
    pub async fn run(
        &self,
        directory: &dyn LocalDirectory,
        sessions: &dyn SessionStore,
        trace: &mut TraceLog,
    ) -> FederationResult<SyncReport> {
        let mut report = SyncReport::new(Utc::now());
        let plan = self.prepare(directory, trace, &mut report).await?;

        let applied = Applier::new(&self.config, directory, sessions)
            .apply(&plan, trace)
            .await;
        report.record_apply(applied);

        let report = report.complete();
        tracing::info!(status = %report.status, "Synchronisation finished");
        Ok(report)
    }

    /// Computes the plan of a pass without applying it.
    pub async fn plan_only(
        &self,
        directory: &dyn LocalDirectory,
        trace: &mut TraceLog,
    ) -> FederationResult<(ReconciliationPlan, SyncReport)> {
        let mut report = SyncReport::new(Utc::now());
        report.dry_run = true;
        let plan = self.prepare(directory, trace, &mut report).await?;
        Ok((plan, report.complete()))
    }

    async fn prepare(
        &self,
        directory: &dyn LocalDirectory,
        trace: &mut TraceLog,
        report: &mut SyncReport,
    ) -> FederationResult<ReconciliationPlan> {
        let staging = self.stage(trace, report).await?;

        let snapshot = LocalSnapshot::new(directory.snapshot().await?);
        tracing::debug!(local = snapshot.len(), "Local directory loaded");

        Ok(plan(
            &staging,
            &snapshot,
            &PlannerPolicy::from_config(&self.config),
        ))
    }

    async fn stage(
        &self,
        trace: &mut TraceLog,
        report: &mut SyncReport,
    ) -> FederationResult<StagingSet> {
        let fetch = &self.config.fetch;

        trace.record(TraceEvent::StagingCreated);
        let mut stager = Stager::new(self.config.match_key);

        trace.record(TraceEvent::FetchStarted {
            operation: fetch.operation.clone(),
        });
        let response = match self.client.fetch(&fetch.operation, &fetch.params()).await {
            Ok(response) => response,
            Err(e) => {
                trace.record(TraceEvent::RemoteUnavailable {
                    message: e.to_string(),
                });
                RemoteValue::Null
            }
        };

        let records = extract_records(&response, fetch);
        report.fetched = records.len();

        trace.record(TraceEvent::Staging);
        for outcome in normalize(records) {
            match outcome {
                Ok(candidate) => {
                    if !offer_traced(&mut stager, candidate, trace) {
                        report.duplicates += 1;
                    }
                }
                Err(rejected) => {
                    report.rejected += 1;
                    trace.record(TraceEvent::RecordRejected {
                        login: rejected.login,
                        reason: rejected.reason,
                    });
                }
            }
        }

        if stager.is_empty() {
            trace.record(TraceEvent::EmptyFetch);
        }
        let staging = stager.finish()?;
        report.staged = staging.len();
        trace.record(TraceEvent::RecordsStaged {
            count: staging.len(),
        });
        Ok(staging)
    }
}
