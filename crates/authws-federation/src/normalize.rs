//! Remote record mapping.
//!
//! Raw records are pulled out of the fetch response by field name and
//! normalised into [`CandidateIdentity`] values. Anything that does not map
//! cleanly is rejected rather than guessed at.

use std::borrow::Cow;

use authws_model::{sanitize_username, IdentityUpdate, NewIdentity};
use serde::Serialize;
use uuid::Uuid;

use crate::client::RemoteValue;
use crate::config::{FetchConfig, MatchKey, RecordFields};
use crate::trace::RejectReason;

// ============================================================================
// Remote Records
// ============================================================================

/// Raw fields of one remote student record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteRecord {
    /// External unique id.
    pub external_id: Option<String>,
    /// Login identifier.
    pub login: Option<String>,
    /// Full name.
    pub full_name: Option<String>,
    /// Email address.
    pub email: Option<String>,
}

impl RemoteRecord {
    /// Extracts a record from a remote structure.
    ///
    /// Returns `None` for anything other than a structure. Missing and
    /// non-text fields are `None`.
    #[must_use]
    pub fn from_value(value: &RemoteValue, fields: &RecordFields) -> Option<Self> {
        if !matches!(value, RemoteValue::Struct(_)) {
            return None;
        }
        let text = |name: &str| value.get(name).and_then(RemoteValue::as_text).map(str::to_string);

        Some(Self {
            external_id: text(&fields.external_id),
            login: text(&fields.login),
            full_name: text(&fields.full_name),
            email: text(&fields.email),
        })
    }
}

/// Outcome of extracting one list item from the fetch response.
pub type Extracted = Result<RemoteRecord, RejectReason>;

/// Extracts the record list from a fetch response.
///
/// A missing result path yields no records.
#[must_use]
pub fn extract_records(response: &RemoteValue, fetch: &FetchConfig) -> Vec<Extracted> {
    response
        .path(fetch.result_path.as_slice())
        .map(|list| {
            list.items()
                .into_iter()
                .map(|item| RemoteRecord::from_value(item, &fetch.fields).ok_or(RejectReason::Malformed))
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// Candidate Identities
// ============================================================================

/// A normalised remote identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateIdentity {
    /// External unique id.
    pub idnumber: String,
    /// Login identifier as sent by the registry.
    pub username: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email address.
    pub email: String,
}

impl CandidateIdentity {
    /// Username in the local directory's character policy.
    #[must_use]
    pub fn local_username(&self) -> String {
        sanitize_username(&self.username)
    }

    /// Value of the given match key.
    #[must_use]
    pub fn key(&self, match_key: MatchKey) -> Cow<'_, str> {
        match match_key {
            MatchKey::Idnumber => Cow::Borrowed(&self.idnumber),
            MatchKey::Username => Cow::Owned(self.local_username()),
        }
    }

    /// Field update applied to a matched local identity.
    #[must_use]
    pub fn to_update(&self) -> IdentityUpdate {
        IdentityUpdate {
            idnumber: self.idnumber.clone(),
            username: self.local_username(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
        }
    }

    /// Creation request for a new local identity.
    #[must_use]
    pub fn to_new_identity(&self, realm_id: Uuid, auth_method: &str) -> NewIdentity {
        NewIdentity {
            realm_id,
            username: self.local_username(),
            idnumber: self.idnumber.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            auth_method: auth_method.to_string(),
            confirmed: true,
        }
    }
}

/// A record dropped by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    /// Login of the record, blank when unknown.
    pub login: String,
    /// Rejection reason.
    pub reason: RejectReason,
}

/// Splits a full name into first and last name.
///
/// The last whitespace-separated token is the last name; the remaining
/// tokens, joined by single spaces, are the first name.
#[must_use]
pub fn split_full_name(full_name: &str) -> (String, String) {
    let mut tokens: Vec<&str> = full_name.split_whitespace().collect();
    let last = tokens.pop().unwrap_or_default().to_string();
    (tokens.join(" "), last)
}

fn present(field: Option<&String>) -> Option<&str> {
    field.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Normalises a single record.
pub fn normalize_record(record: &RemoteRecord) -> Result<CandidateIdentity, Rejected> {
    let login = present(record.login.as_ref());
    let reject = |reason| Rejected {
        login: login.unwrap_or_default().to_string(),
        reason,
    };

    let email = present(record.email.as_ref()).ok_or_else(|| reject(RejectReason::MissingEmail))?;
    let login = login.ok_or_else(|| reject(RejectReason::MissingLogin))?;
    let idnumber = present(record.external_id.as_ref())
        .ok_or_else(|| reject(RejectReason::MissingExternalId))?;

    let (first_name, last_name) = split_full_name(record.full_name.as_deref().unwrap_or_default());

    Ok(CandidateIdentity {
        idnumber: idnumber.to_string(),
        username: login.to_string(),
        first_name,
        last_name,
        email: email.to_string(),
    })
}

/// Lazy normalizer over extracted records.
///
/// Yields one outcome per input record, in order.
#[derive(Debug)]
pub struct Normalizer<I> {
    records: I,
}

impl<I> Iterator for Normalizer<I>
where
    I: Iterator<Item = Extracted>,
{
    type Item = Result<CandidateIdentity, Rejected>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next().map(|extracted| match extracted {
            Ok(record) => normalize_record(&record),
            Err(reason) => Err(Rejected {
                login: String::new(),
                reason,
            }),
        })
    }
}

/// Normalises extracted records.
pub fn normalize<I>(records: I) -> Normalizer<I::IntoIter>
where
    I: IntoIterator<Item = Extracted>,
{
    Normalizer {
        records: records.into_iter(),
    }
}
