//! Authentication provider backed by the remote registry.
//!
//! Passwords are checked by the registry itself; the local directory never
//! stores them. The password is passed through to the transport and never
//! logged.

use std::collections::HashMap;

use crate::client::{DirectoryClient, DirectoryTransport, RequestParams};
use crate::config::WsConfig;
use crate::error::FederationResult;

// ============================================================================
// Provider Capabilities
// ============================================================================

/// Capabilities an auth provider exposes to the host application.
pub trait AuthProvider: Send + Sync {
    /// Returns the auth method identifier.
    fn auth_method(&self) -> &str;

    /// Whether passwords are stored locally.
    fn is_internal(&self) -> bool {
        false
    }

    /// Whether local password storage is disabled.
    fn prevents_local_passwords(&self) -> bool {
        true
    }

    /// Whether profile fields are synchronised back to the remote store.
    fn is_synchronised_with_external(&self) -> bool {
        false
    }

    /// Whether users can change their password locally.
    fn can_change_password(&self) -> bool {
        false
    }

    /// Whether users can reset their password locally.
    fn can_reset_password(&self) -> bool {
        false
    }

    /// External URL where users change their password.
    fn change_password_url(&self) -> Option<&str> {
        None
    }

    /// Profile attributes fetched on login.
    fn user_info(&self, _username: &str) -> HashMap<String, String> {
        HashMap::new()
    }
}

// ============================================================================
// Credential Validator
// ============================================================================

/// Trait for validating credentials against external systems.
#[allow(async_fn_in_trait)]
pub trait CredentialValidator: Send + Sync {
    /// Validates a password credential.
    ///
    /// Returns true if the password is valid for the given user. The
    /// password must never be logged.
    async fn validate_password(&self, username: &str, password: &str) -> FederationResult<bool>;

    /// Checks if the provider supports password validation.
    fn supports_password_validation(&self) -> bool {
        true
    }

    /// Checks if the provider supports password updates.
    fn supports_password_update(&self) -> bool {
        false
    }
}

// ============================================================================
// Webservice Provider
// ============================================================================

/// Auth provider that verifies credentials with the registry.
#[derive(Debug, Clone)]
pub struct WsAuthProvider<T> {
    config: WsConfig,
    client: DirectoryClient<T>,
}

impl<T: DirectoryTransport> WsAuthProvider<T> {
    /// Creates a provider from a configuration and a transport.
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
}

impl<T: DirectoryTransport> AuthProvider for WsAuthProvider<T> {
    fn auth_method(&self) -> &str {
        &self.config.auth_method
    }

    fn change_password_url(&self) -> Option<&str> {
        self.config.change_password_url()
    }
}

impl<T: DirectoryTransport> CredentialValidator for WsAuthProvider<T> {
    async fn validate_password(&self, username: &str, password: &str) -> FederationResult<bool> {
        if username.trim().is_empty() || password.is_empty() {
            return Ok(false);
        }

        let login = &self.config.login;
        let params = RequestParams::new()
            .with(&login.username_param, username)
            .with(&login.password_param, password);

        let response = match self.client.fetch(&login.operation, &params).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(username, error = %e, "Credential check failed, denying login");
                return Ok(false);
            }
        };

        let valid = response
            .path(&[login.result_class.as_str(), login.result_field.as_str()])
            .is_some_and(crate::client::RemoteValue::is_truthy);
        tracing::info!(username, valid, "Credential check completed");
        Ok(valid)
    }
}
