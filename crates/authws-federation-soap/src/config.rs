//! SOAP transport configuration.

use std::time::Duration;

use authws_federation::WsConfig;
use serde::{Deserialize, Serialize};

use crate::error::{SoapError, SoapResult};

/// SOAP endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoapConfig {
    /// Endpoint URL (http or https).
    pub endpoint: String,

    /// Target namespace of the service operations.
    pub namespace: String,

    /// Connection timeout.
    pub connection_timeout: Duration,

    /// Read timeout for a whole call.
    pub read_timeout: Duration,
}

impl SoapConfig {
    /// Creates a configuration with default namespace and timeouts.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            namespace: "http://tempuri.org/".to_string(),
            connection_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(120),
        }
    }

    /// Derives the transport configuration from the provider configuration.
    pub fn from_ws_config(config: &WsConfig) -> SoapResult<Self> {
        let soap = Self {
            endpoint: config.endpoint().to_string(),
            namespace: config.namespace.clone(),
            connection_timeout: config.connection_timeout,
            read_timeout: config.read_timeout,
        };
        soap.validate()?;
        Ok(soap)
    }

    /// Sets the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets both timeouts.
    #[must_use]
    pub const fn with_timeouts(mut self, connection: Duration, read: Duration) -> Self {
        self.connection_timeout = connection;
        self.read_timeout = read;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SoapResult<()> {
        let url = url::Url::parse(&self.endpoint)
            .map_err(|e| SoapError::config(format!("invalid endpoint: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SoapError::config(format!(
                "endpoint must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(SoapError::config("endpoint has no host"));
        }
        if self.namespace.trim().is_empty() {
            return Err(SoapError::config("namespace cannot be empty"));
        }
        Ok(())
    }

    /// SOAPAction header value for an operation.
    #[must_use]
    pub fn soap_action(&self, operation: &str) -> String {
        format!("\"{}{operation}\"", self.namespace)
    }
}
