//! SOAP transport error types.
//!
//! Error messages must not contain request bodies: credential checks carry
//! the user's password.

use authws_federation::FederationError;
use thiserror::Error;

/// SOAP transport errors.
#[derive(Debug, Error)]
pub enum SoapError {
    /// Invalid configuration.
    #[error("SOAP configuration error: {0}")]
    Configuration(String),

    /// The HTTP request could not be completed.
    #[error("SOAP request failed: {0}")]
    Transport(String),

    /// The request timed out.
    #[error("SOAP request timed out")]
    Timeout,

    /// The endpoint answered with a non-success status.
    #[error("SOAP endpoint returned HTTP {status}")]
    Http {
        /// HTTP status code.
        status: u16,
    },

    /// The endpoint returned a SOAP fault.
    #[error("SOAP fault {code}: {message}")]
    Fault {
        /// Fault code.
        code: String,
        /// Fault message.
        message: String,
    },

    /// The response body is not well-formed XML.
    #[error("Invalid SOAP response: {0}")]
    Xml(String),

    /// The response has no usable body element.
    #[error("SOAP response has no body")]
    MissingBody,
}

impl SoapError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Converts a reqwest error, dropping the endpoint URL.
    #[must_use]
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.without_url().to_string())
        }
    }

    /// Checks if this is a connection-related error.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout | Self::Http { .. })
    }

    /// Checks if the remote service reported a fault.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::Fault { .. })
    }
}

/// Result type for SOAP operations.
pub type SoapResult<T> = Result<T, SoapError>;

impl From<SoapError> for FederationError {
    fn from(err: SoapError) -> Self {
        match err {
            SoapError::Configuration(msg) => FederationError::Configuration(msg),
            other => FederationError::RemoteUnavailable(other.to_string()),
        }
    }
}
