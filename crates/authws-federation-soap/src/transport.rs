//! HTTP transport for SOAP calls.

use std::sync::Arc;

use authws_federation::{DirectoryTransport, FederationResult, RemoteValue, RequestParams, WsConfig};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::config::SoapConfig;
use crate::envelope::build_request;
use crate::error::{SoapError, SoapResult};
use crate::response::parse_response;

/// SOAP 1.1 transport over a shared HTTP client.
#[derive(Debug, Clone)]
pub struct SoapTransport {
    config: Arc<SoapConfig>,
    client: Client,
}

impl SoapTransport {
    /// Creates a transport.
    pub fn new(config: SoapConfig) -> SoapResult<Self> {
        config.validate()?;
        let client = Self::build_client(&config)?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Creates a transport for a provider configuration.
    pub fn from_ws_config(config: &WsConfig) -> SoapResult<Self> {
        Self::new(SoapConfig::from_ws_config(config)?)
    }

    fn build_client(config: &SoapConfig) -> SoapResult<Client> {
        Client::builder()
            .timeout(config.read_timeout)
            .connect_timeout(config.connection_timeout)
            .build()
            .map_err(|e| SoapError::config(format!("failed to build HTTP client: {e}")))
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SoapConfig {
        &self.config
    }

    /// Calls an operation and decodes its response.
    pub async fn call(&self, operation: &str, params: &RequestParams) -> SoapResult<RemoteValue> {
        let body = build_request(&self.config.namespace, operation, params)?;

        tracing::debug!(
            endpoint = %self.config.endpoint,
            operation,
            "Sending SOAP request"
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", self.config.soap_action(operation))
            .body(body)
            .send()
            .await
            .map_err(SoapError::from_reqwest)?;

        let status = response.status();
        let text = response.text().await.map_err(SoapError::from_reqwest)?;

        if !status.is_success() {
            tracing::warn!(operation, status = status.as_u16(), "SOAP endpoint returned an error status");
            return match parse_response(&text, operation) {
                Err(fault @ SoapError::Fault { .. }) => Err(fault),
                _ => Err(SoapError::Http {
                    status: status.as_u16(),
                }),
            };
        }

        parse_response(&text, operation)
    }
}

impl DirectoryTransport for SoapTransport {
    async fn invoke(
        &self,
        operation: &str,
        params: &RequestParams,
    ) -> FederationResult<RemoteValue> {
        self.call(operation, params).await.map_err(Into::into)
    }
}
