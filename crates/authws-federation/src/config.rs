//! Federation provider configuration.
//!
//! [`WsConfig`] is the complete, read-only configuration of the webservice
//! auth provider. It is built once (from a builder or a deserialised file)
//! and handed explicitly to every component that needs it.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::RequestParams;
use crate::error::{FederationError, FederationResult};

/// Key used to match remote candidates against local identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKey {
    /// Match on the registry's stable idnumber.
    #[default]
    Idnumber,

    /// Match on the (sanitised) username. Legacy behaviour.
    Username,
}

impl MatchKey {
    /// Returns the field name used in logs and errors.
    #[must_use]
    pub const fn field_name(&self) -> &'static str {
        match self {
            Self::Idnumber => "idnumber",
            Self::Username => "username",
        }
    }
}

/// Remote field names of a student record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordFields {
    /// Field holding the external id.
    pub external_id: String,
    /// Field holding the login identifier.
    pub login: String,
    /// Field holding the full name.
    pub full_name: String,
    /// Field holding the email address.
    pub email: String,
}

impl Default for RecordFields {
    fn default() -> Self {
        Self {
            external_id: "Codigo".to_string(),
            login: "LoginPortal".to_string(),
            full_name: "Nome".to_string(),
            email: "Email".to_string(),
        }
    }
}

/// Bulk fetch operation mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Remote operation returning the student population.
    pub operation: String,
    /// Name of the search filter parameter.
    pub filter_param: String,
    /// Search filter value.
    pub filter: String,
    /// Path from the response root to the record list.
    pub result_path: Vec<String>,
    /// Record field names.
    pub fields: RecordFields,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            operation: "GetAlunos".to_string(),
            filter_param: "sParametrosBusca".to_string(),
            filter: "Inadimplente=0".to_string(),
            result_path: vec!["GetAlunosResult".to_string(), "wsAluno".to_string()],
            fields: RecordFields::default(),
        }
    }
}

impl FetchConfig {
    /// Parameters of the fetch call.
    #[must_use]
    pub fn params(&self) -> RequestParams {
        let mut params = RequestParams::new();
        params.insert(&self.filter_param, &self.filter);
        params
    }
}

/// Credential verification operation mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// Remote operation that verifies credentials.
    pub operation: String,
    /// Parameter name carrying the username.
    pub username_param: String,
    /// Parameter name carrying the password.
    pub password_param: String,
    /// Outer element of the result flag.
    pub result_class: String,
    /// Inner element of the result flag.
    pub result_field: String,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            operation: "ValidarLogin".to_string(),
            username_param: "sLogin".to_string(),
            password_param: "sSenha".to_string(),
            result_class: "ValidarLoginResult".to_string(),
            result_field: "Sucesso".to_string(),
        }
    }
}

/// Configuration of the webservice auth provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsConfig {
    /// Remote endpoint URL.
    pub server_url: String,

    /// SOAP target namespace.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Parameters sent with every remote call (`name:value,name:value`).
    #[serde(default)]
    pub default_params: RequestParams,

    /// Credential verification mapping.
    #[serde(default)]
    pub login: LoginConfig,

    /// Bulk fetch mapping.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Password change URL shown to users instead of the local form.
    #[serde(default)]
    pub change_password_url: Option<String>,

    /// Local auth method owned by this provider.
    #[serde(default = "default_auth_method")]
    pub auth_method: String,

    /// Realm assigned to created identities.
    #[serde(default)]
    pub realm_id: Uuid,

    /// Match key between remote and local records.
    #[serde(default)]
    pub match_key: MatchKey,

    /// Identities that are never suspended.
    #[serde(default = "default_protected_ids")]
    pub protected_ids: BTreeSet<i64>,

    /// Whether the provider is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Connection timeout.
    #[serde(with = "duration_secs", default = "default_connection_timeout")]
    pub connection_timeout: Duration,

    /// Read timeout.
    #[serde(with = "duration_secs", default = "default_read_timeout")]
    pub read_timeout: Duration,
}

fn default_namespace() -> String {
    "http://tempuri.org/".to_string()
}

fn default_auth_method() -> String {
    "ws".to_string()
}

// guest and primary admin
fn default_protected_ids() -> BTreeSet<i64> {
    BTreeSet::from([1, 2])
}

const fn default_enabled() -> bool {
    true
}

const fn default_connection_timeout() -> Duration {
    Duration::from_secs(10)
}

const fn default_read_timeout() -> Duration {
    Duration::from_secs(120)
}

impl WsConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> WsConfigBuilder {
        WsConfigBuilder::new()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> FederationResult<()> {
        let endpoint = self.endpoint();
        if endpoint.is_empty() {
            return Err(FederationError::config("server_url cannot be empty"));
        }
        let url = url::Url::parse(endpoint)
            .map_err(|e| FederationError::config(format!("invalid server_url: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FederationError::config(format!(
                "server_url must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.login.operation.is_empty() {
            return Err(FederationError::config("login operation cannot be empty"));
        }
        if self.fetch.operation.is_empty() {
            return Err(FederationError::config("fetch operation cannot be empty"));
        }
        if self.fetch.result_path.is_empty() {
            return Err(FederationError::config("fetch result_path cannot be empty"));
        }
        if self.auth_method.is_empty() {
            return Err(FederationError::config("auth_method cannot be empty"));
        }

        Ok(())
    }

    /// Endpoint URL without a trailing `?wsdl` query.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        let url = self.server_url.trim();
        match url.len().checked_sub(5) {
            Some(split) if url.is_char_boundary(split) && url[split..].eq_ignore_ascii_case("?wsdl") => {
                &url[..split]
            }
            _ => url,
        }
    }

    /// Password change URL override, if one is configured.
    #[must_use]
    pub fn change_password_url(&self) -> Option<&str> {
        self.change_password_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    /// Checks if an identity id is protected from suspension.
    #[must_use]
    pub fn is_protected(&self, id: i64) -> bool {
        self.protected_ids.contains(&id)
    }
}

/// Builder for [`WsConfig`].
#[derive(Debug)]
pub struct WsConfigBuilder {
    config: WsConfig,
    default_params: Option<String>,
}

impl Default for WsConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WsConfigBuilder {
    /// Creates a new builder with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: WsConfig {
                server_url: String::new(),
                namespace: default_namespace(),
                default_params: RequestParams::new(),
                login: LoginConfig::default(),
                fetch: FetchConfig::default(),
                change_password_url: None,
                auth_method: default_auth_method(),
                realm_id: Uuid::nil(),
                match_key: MatchKey::default(),
                protected_ids: default_protected_ids(),
                enabled: true,
                connection_timeout: default_connection_timeout(),
                read_timeout: default_read_timeout(),
            },
            default_params: None,
        }
    }

    /// Sets the endpoint URL.
    #[must_use]
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server_url = url.into();
        self
    }

    /// Sets the SOAP namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// Sets the default parameters in `name:value,name:value` form.
    ///
    /// Parsed when the configuration is built.
    #[must_use]
    pub fn default_params(mut self, raw: impl Into<String>) -> Self {
        self.default_params = Some(raw.into());
        self
    }

    /// Sets the credential verification mapping.
    #[must_use]
    pub fn login(mut self, login: LoginConfig) -> Self {
        self.config.login = login;
        self
    }

    /// Sets the bulk fetch mapping.
    #[must_use]
    pub fn fetch(mut self, fetch: FetchConfig) -> Self {
        self.config.fetch = fetch;
        self
    }

    /// Sets the password change URL override.
    #[must_use]
    pub fn change_password_url(mut self, url: impl Into<String>) -> Self {
        self.config.change_password_url = Some(url.into());
        self
    }

    /// Sets the owned auth method.
    #[must_use]
    pub fn auth_method(mut self, auth_method: impl Into<String>) -> Self {
        self.config.auth_method = auth_method.into();
        self
    }

    /// Sets the realm for created identities.
    #[must_use]
    pub const fn realm_id(mut self, realm_id: Uuid) -> Self {
        self.config.realm_id = realm_id;
        self
    }

    /// Sets the match key.
    #[must_use]
    pub const fn match_key(mut self, match_key: MatchKey) -> Self {
        self.config.match_key = match_key;
        self
    }

    /// Replaces the protected identity ids.
    #[must_use]
    pub fn protected_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.config.protected_ids = ids.into_iter().collect();
        self
    }

    /// Sets whether the provider is enabled.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    /// Sets the read timeout.
    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(mut self) -> FederationResult<WsConfig> {
        if let Some(raw) = self.default_params.take() {
            self.config.default_params = raw.parse()?;
        }
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Serde support for Duration as whole seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let realm_id = Uuid::now_v7();

        let config = WsConfig::builder()
            .server_url("https://registry.example.edu/Service.asmx?WSDL")
            .default_params("sChave:abc123, sOrigem:moodle")
            .change_password_url("https://portal.example.edu/senha")
            .realm_id(realm_id)
            .build()
            .unwrap();

        assert_eq!(config.endpoint(), "https://registry.example.edu/Service.asmx");
        assert_eq!(config.default_params.get("sChave"), Some("abc123"));
        assert_eq!(config.default_params.get("sOrigem"), Some("moodle"));
        assert_eq!(
            config.change_password_url(),
            Some("https://portal.example.edu/senha")
        );
        assert_eq!(config.realm_id, realm_id);
        assert_eq!(config.match_key, MatchKey::Idnumber);
        assert!(config.is_protected(1));
        assert!(config.is_protected(2));
        assert!(!config.is_protected(3));
    }

    #[test]
    fn rejects_missing_or_unsupported_url() {
        assert!(WsConfig::builder().build().is_err());

        let err = WsConfig::builder()
            .server_url("ftp://registry.example.edu/")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn rejects_malformed_default_params() {
        let result = WsConfig::builder()
            .server_url("https://registry.example.edu/Service.asmx")
            .default_params("sChave")
            .build();

        assert!(matches!(result, Err(FederationError::Configuration(_))));
    }

    #[test]
    fn blank_change_password_url_is_none() {
        let config = WsConfig::builder()
            .server_url("https://registry.example.edu/Service.asmx")
            .change_password_url("   ")
            .build()
            .unwrap();

        assert_eq!(config.change_password_url(), None);
    }

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{
            "server_url": "https://registry.example.edu/Service.asmx",
            "default_params": "sChave:abc",
            "connection_timeout": 5
        }"#;

        let config: WsConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.fetch.operation, "GetAlunos");
        assert_eq!(config.fetch.fields.login, "LoginPortal");
        assert_eq!(config.auth_method, "ws");
        assert_eq!(config.connection_timeout, Duration::from_secs(5));
        assert_eq!(config.read_timeout, Duration::from_secs(120));
        assert_eq!(config.default_params.get("sChave"), Some("abc"));
        assert!(config.enabled);
        assert!(config.validate().is_ok());
    }
}
