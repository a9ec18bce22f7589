//! Storage error types.

use thiserror::Error;

/// Errors that can occur during directory and session operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Entity not found.
    #[error("Entity not found: {entity_type} with {field} '{value}'")]
    NotFound {
        /// Type of entity (e.g., "Identity").
        entity_type: &'static str,
        /// Field used for the lookup.
        field: &'static str,
        /// Lookup value.
        value: String,
    },

    /// Duplicate entity (unique constraint violation).
    #[error("Duplicate {entity_type}: {field} '{value}' already exists")]
    Duplicate {
        /// Type of entity.
        entity_type: &'static str,
        /// Field that caused the conflict.
        field: &'static str,
        /// Conflicting value.
        value: String,
    },

    /// Invalid data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Session store error.
    #[error("Session store error: {0}")]
    Session(String),

    /// Backend I/O error.
    #[error("Directory I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error.
    #[error("Internal storage error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Creates a not found error for an identity looked up by id.
    #[must_use]
    pub fn identity_not_found(id: i64) -> Self {
        Self::NotFound {
            entity_type: "Identity",
            field: "id",
            value: id.to_string(),
        }
    }

    /// Creates a duplicate error.
    #[must_use]
    pub fn duplicate(
        entity_type: &'static str,
        field: &'static str,
        value: impl Into<String>,
    ) -> Self {
        Self::Duplicate {
            entity_type,
            field,
            value: value.into(),
        }
    }

    /// Checks if this is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Checks if this is a duplicate error.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
