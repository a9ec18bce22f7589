//! Sync trace log.
//!
//! Every step of a sync pass appends a [`TraceEvent`] to a [`TraceLog`].
//! Events are mirrored to `tracing` at their severity when recorded.

use std::fmt;

use serde::Serialize;

/// Severity of a trace event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    /// Progress.
    Info,
    /// Skipped record.
    Warn,
    /// Failed action.
    Error,
}

/// Why the normalizer dropped a remote record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The record is not a structure.
    Malformed,
    /// Blank external id.
    MissingExternalId,
    /// Blank login.
    MissingLogin,
    /// Blank email.
    MissingEmail,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Malformed => "record is not a structure",
            Self::MissingExternalId => "external id is blank",
            Self::MissingLogin => "login is blank",
            Self::MissingEmail => "email is blank",
        })
    }
}

/// A single event of a sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// A fresh staging set was created.
    StagingCreated,
    /// The bulk fetch started.
    FetchStarted {
        /// Remote operation.
        operation: String,
    },
    /// The bulk fetch failed.
    RemoteUnavailable {
        /// Failure description.
        message: String,
    },
    /// Normalised candidates are being staged.
    Staging,
    /// A remote record was dropped by the normalizer.
    RecordRejected {
        /// Login of the record, possibly blank.
        login: String,
        /// Rejection reason.
        reason: RejectReason,
    },
    /// A candidate repeated an already staged key.
    DuplicateSkipped {
        /// Key field.
        field: String,
        /// Repeated value.
        value: String,
        /// Login of the dropped candidate.
        username: String,
    },
    /// Nothing was staged.
    EmptyFetch,
    /// Number of staged candidates.
    RecordsStaged {
        /// Staged count.
        count: usize,
    },
    /// A local identity was created.
    UserCreated {
        /// Local id.
        id: i64,
        /// Username.
        username: String,
    },
    /// A local identity could not be created.
    CreateFailed {
        /// Username.
        username: String,
        /// Failure reason.
        reason: String,
    },
    /// A candidate's email is already used by another identity.
    EmailInUse {
        /// Username of the candidate.
        username: String,
        /// Email address.
        email: String,
        /// Id of the identity holding the email.
        holder_id: i64,
    },
    /// The bulk update started.
    UpdatingUsers {
        /// Planned update count.
        count: usize,
    },
    /// The bulk update finished.
    UsersUpdated {
        /// Identities updated.
        updated: usize,
    },
    /// Matched identities owned by another auth method were left alone.
    ForeignUsersSkipped {
        /// Skipped count.
        count: usize,
    },
    /// The bulk update failed.
    UpdateFailed {
        /// Failure reason.
        reason: String,
    },
    /// One update of the bulk update was refused.
    UserUpdateFailed {
        /// Local id.
        id: i64,
        /// Requested username.
        username: String,
        /// Failure reason.
        reason: String,
    },
    /// A local identity was suspended.
    UserSuspended {
        /// Local id.
        id: i64,
        /// Username.
        username: String,
    },
    /// A local identity could not be suspended.
    SuspendFailed {
        /// Local id.
        id: i64,
        /// Username.
        username: String,
        /// Failure reason.
        reason: String,
    },
    /// Sessions of a suspended identity were terminated.
    SessionsKilled {
        /// Local id.
        id: i64,
        /// Terminated session count.
        count: usize,
    },
    /// Sessions of a suspended identity could not be terminated.
    SessionKillFailed {
        /// Local id.
        id: i64,
        /// Failure reason.
        reason: String,
    },
}

impl TraceEvent {
    /// Returns the severity of the event.
    #[must_use]
    pub const fn level(&self) -> TraceLevel {
        match self {
            Self::RecordRejected { .. }
            | Self::DuplicateSkipped { .. }
            | Self::EmailInUse { .. }
            | Self::ForeignUsersSkipped { .. } => TraceLevel::Warn,
            Self::RemoteUnavailable { .. }
            | Self::EmptyFetch
            | Self::CreateFailed { .. }
            | Self::UpdateFailed { .. }
            | Self::UserUpdateFailed { .. }
            | Self::SuspendFailed { .. }
            | Self::SessionKillFailed { .. } => TraceLevel::Error,
            _ => TraceLevel::Info,
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StagingCreated => write!(f, "creating staging set"),
            Self::FetchStarted { operation } => {
                write!(f, "fetching students from webservice ({operation})")
            }
            Self::RemoteUnavailable { message } => {
                write!(f, "webservice call failed: {message}")
            }
            Self::Staging => write!(f, "saving to staging set"),
            Self::RecordRejected { login, reason } => {
                write!(f, "skipping record '{login}': {reason}")
            }
            Self::DuplicateSkipped {
                field,
                value,
                username,
            } => write!(f, "duplicate {field} '{value}', skipping user '{username}'"),
            Self::EmptyFetch => write!(f, "did not get any users from the webservice"),
            Self::RecordsStaged { count } => write!(f, "got {count} records from the webservice"),
            Self::UserCreated { id, username } => write!(f, "created user '{username}' (id={id})"),
            Self::CreateFailed { username, reason } => {
                write!(f, "error creating user '{username}': {reason}")
            }
            Self::EmailInUse {
                username,
                email,
                holder_id,
            } => write!(
                f,
                "email '{email}' of user '{username}' is already used by id={holder_id}"
            ),
            Self::UpdatingUsers { count } => write!(f, "updating {count} users"),
            Self::UsersUpdated { updated } => write!(f, "updated {updated} users"),
            Self::ForeignUsersSkipped { count } => write!(
                f,
                "{count} matched users belong to another auth method and were not updated"
            ),
            Self::UpdateFailed { reason } => write!(f, "error updating users: {reason}"),
            Self::UserUpdateFailed {
                id,
                username,
                reason,
            } => write!(f, "error updating user id={id} to '{username}': {reason}"),
            Self::UserSuspended { id, username } => {
                write!(f, "suspended user '{username}' (id={id})")
            }
            Self::SuspendFailed {
                id,
                username,
                reason,
            } => write!(f, "error suspending user '{username}' (id={id}): {reason}"),
            Self::SessionsKilled { id, count } => {
                write!(f, "killed {count} sessions of user id={id}")
            }
            Self::SessionKillFailed { id, reason } => {
                write!(f, "error killing sessions of user id={id}: {reason}")
            }
        }
    }
}

/// Ordered, append-only log of a sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TraceLog {
    events: Vec<TraceEvent>,
}

impl TraceLog {
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Appends an event and mirrors it to `tracing`.
    pub fn record(&mut self, event: TraceEvent) {
        match event.level() {
            TraceLevel::Info => tracing::info!(target: "authws::sync", "{event}"),
            TraceLevel::Warn => tracing::warn!(target: "authws::sync", "{event}"),
            TraceLevel::Error => tracing::error!(target: "authws::sync", "{event}"),
        }
        self.events.push(event);
    }

    /// Returns the recorded events.
    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Returns the events rendered as text lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.events.iter().map(ToString::to_string).collect()
    }

    /// Counts events at or above a severity.
    #[must_use]
    pub fn count_at_least(&self, level: TraceLevel) -> usize {
        self.events.iter().filter(|e| e.level() >= level).count()
    }

    /// Returns the number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
