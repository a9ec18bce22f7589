//! Remote directory client.
//!
//! The client merges the configured default parameters into every call and
//! hands the request to a [`DirectoryTransport`]. Transport failures of any
//! kind surface as [`FederationError::RemoteUnavailable`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::WsConfig;
use crate::error::{FederationError, FederationResult};

// ============================================================================
// Remote Values
// ============================================================================

/// Decoded response of a remote operation.
///
/// A node that repeats under the same parent becomes a [`RemoteValue::List`];
/// a single occurrence stays a plain value and is treated as a one-element
/// list by [`RemoteValue::items`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RemoteValue {
    /// Missing or nil value.
    #[default]
    Null,
    /// Text content.
    Text(String),
    /// Named children.
    Struct(BTreeMap<String, RemoteValue>),
    /// Repeated children.
    List(Vec<RemoteValue>),
}

impl RemoteValue {
    /// Creates a text value.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Creates a struct value from name/value pairs.
    #[must_use]
    pub fn record<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, RemoteValue)>,
    {
        Self::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Adds a named child, turning repeated names into a list.
    ///
    /// Does nothing unless this value is a struct.
    pub fn push_child(&mut self, name: impl Into<String>, value: RemoteValue) {
        let Self::Struct(fields) = self else {
            return;
        };
        match fields.entry(name.into()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
            }
            std::collections::btree_map::Entry::Occupied(mut slot) => match slot.get_mut() {
                Self::List(items) => items.push(value),
                existing => {
                    let first = std::mem::take(existing);
                    *existing = Self::List(vec![first, value]);
                }
            },
        }
    }

    /// Returns a named child of a struct.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RemoteValue> {
        match self {
            Self::Struct(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Follows a path of child names.
    #[must_use]
    pub fn path<S: AsRef<str>>(&self, segments: &[S]) -> Option<&RemoteValue> {
        segments
            .iter()
            .try_fold(self, |value, segment| value.get(segment.as_ref()))
    }

    /// Returns the text content, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the items of a list-like value.
    ///
    /// Null has no items and any non-list value is a single item.
    #[must_use]
    pub fn items(&self) -> Vec<&RemoteValue> {
        match self {
            Self::Null => Vec::new(),
            Self::List(items) => items.iter().collect(),
            other => vec![other],
        }
    }

    /// Checks if the value is a truthy flag (`true` or `1`).
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        self.as_text()
            .map(str::trim)
            .is_some_and(|text| text == "1" || text.eq_ignore_ascii_case("true"))
    }

    /// Checks if the value is null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

// ============================================================================
// Request Parameters
// ============================================================================

/// Ordered name/value parameters of a remote call.
///
/// Inserting an existing name replaces its value in place, so merged
/// parameters keep the order of the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestParams(Vec<(String, String)>);

impl RequestParams {
    /// Creates empty parameters.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Sets a parameter, replacing any existing value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    /// Sets a parameter, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns a parameter value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns these parameters overridden by `overrides`.
    #[must_use]
    pub fn merged(&self, overrides: &RequestParams) -> Self {
        let mut merged = self.clone();
        for (name, value) in overrides.iter() {
            merged.insert(name, value);
        }
        merged
    }

    /// Iterates over name/value pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Iterates over parameter names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for RequestParams {
    type Err = FederationError;

    /// Parses `name:value,name:value`.
    ///
    /// Segments are trimmed and empty ones are skipped. The value is
    /// everything after the first colon.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut params = Self::new();
        for segment in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (name, value) = segment.split_once(':').ok_or_else(|| {
                FederationError::config(format!(
                    "default parameter '{segment}' is not in name:value form"
                ))
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(FederationError::config(format!(
                    "default parameter '{segment}' has an empty name"
                )));
            }
            params.insert(name, value.trim());
        }
        Ok(params)
    }
}

impl fmt::Display for RequestParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{name}:{value}")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for RequestParams {
    type Error = FederationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<RequestParams> for String {
    fn from(params: RequestParams) -> Self {
        params.to_string()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

// ============================================================================
// Transport and Client
// ============================================================================

/// Wire transport to the remote directory.
///
/// Implementations perform one remote call and decode the response body.
#[allow(async_fn_in_trait)]
pub trait DirectoryTransport: Send + Sync {
    /// Invokes a remote operation with fully merged parameters.
    async fn invoke(&self, operation: &str, params: &RequestParams)
        -> FederationResult<RemoteValue>;
}

/// Client for the remote student directory.
#[derive(Debug, Clone)]
pub struct DirectoryClient<T> {
    transport: T,
    defaults: RequestParams,
}

impl<T: DirectoryTransport> DirectoryClient<T> {
    /// Creates a client with explicit default parameters.
    #[must_use]
    pub const fn new(transport: T, defaults: RequestParams) -> Self {
        Self {
            transport,
            defaults,
        }
    }

    /// Creates a client using the configured default parameters.
    #[must_use]
    pub fn from_config(transport: T, config: &WsConfig) -> Self {
        Self::new(transport, config.default_params.clone())
    }

    /// Returns the default parameters.
    #[must_use]
    pub const fn defaults(&self) -> &RequestParams {
        &self.defaults
    }

    /// Returns the transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Calls a remote operation.
    ///
    /// Call parameters override defaults of the same name.
    pub async fn fetch(
        &self,
        operation: &str,
        params: &RequestParams,
    ) -> FederationResult<RemoteValue> {
        let merged = self.defaults.merged(params);
        tracing::debug!(
            operation,
            params = ?merged.names().collect::<Vec<_>>(),
            "Calling remote directory"
        );

        self.transport
            .invoke(operation, &merged)
            .await
            .map_err(|e| {
                tracing::warn!(operation, error = %e, "Remote directory call failed");
                match e {
                    FederationError::RemoteUnavailable(_) => e,
                    other => FederationError::RemoteUnavailable(other.to_string()),
                }
            })
    }
}
