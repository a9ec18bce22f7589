//! User session model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State of a user session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Session is active and valid.
    #[default]
    Active,
    /// Session was terminated administratively (e.g. account suspended).
    Killed,
}

/// A login session held by a local identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    /// Unique session identifier.
    pub id: Uuid,
    /// Identity that owns the session.
    pub user_id: i64,
    /// Current state.
    pub state: SessionState,
    /// When the session was created.
    pub started_at: DateTime<Utc>,
    /// Last activity timestamp.
    pub last_activity: DateTime<Utc>,
}

impl UserSession {
    /// Creates a new active session for the given identity.
    #[must_use]
    pub fn new(user_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            state: SessionState::Active,
            started_at: now,
            last_activity: now,
        }
    }

    /// Checks if the session is still usable.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active)
    }

    /// Terminates the session administratively.
    pub fn kill(&mut self) {
        self.state = SessionState::Killed;
        self.last_activity = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_deactivates_session() {
        let mut session = UserSession::new(42);
        assert!(session.is_active());

        session.kill();

        assert!(!session.is_active());
        assert_eq!(session.state, SessionState::Killed);
        assert_eq!(session.user_id, 42);
    }

    #[test]
    fn state_serializes_screaming_case() {
        let json = serde_json::to_string(&SessionState::Killed).unwrap();
        assert_eq!(json, "\"KILLED\"");
        assert!(serde_json::from_str::<SessionState>("\"LOGGED_OUT\"").is_err());
    }
}
