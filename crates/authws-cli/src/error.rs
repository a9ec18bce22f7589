//! CLI error types.

use authws_federation::FederationError;
use authws_federation_soap::SoapError;
use authws_storage::StorageError;
use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The provider is disabled in the configuration.
    #[error("auth_ws plugin is disabled, synchronisation stopped")]
    Disabled,

    /// The webservice returned no usable records.
    #[error("safety abort: the webservice returned no usable records, nothing was changed")]
    SafetyAbort,

    /// The webservice rejected the credentials.
    #[error("authentication failed for {0}")]
    InvalidCredentials(String),

    /// Federation error.
    #[error(transparent)]
    Federation(FederationError),

    /// SOAP transport setup error.
    #[error("transport error: {0}")]
    Transport(#[from] SoapError),

    /// Local directory error.
    #[error("directory error: {0}")]
    Storage(#[from] StorageError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<FederationError> for CliError {
    fn from(err: FederationError) -> Self {
        if err.is_safety_abort() {
            Self::SafetyAbort
        } else {
            Self::Federation(err)
        }
    }
}

impl CliError {
    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Disabled => 2,
            Self::SafetyAbort => 3,
            _ => 1,
        }
    }
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
