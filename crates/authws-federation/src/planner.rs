//! Reconciliation planning.
//!
//! [`plan`] compares the staging set against a snapshot of the local
//! directory and decides which candidates to create, which identities to
//! update and which to suspend. It is pure and deterministic: the same
//! inputs always give the same plan.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};

use authws_model::{sanitize_username, IdentityUpdate, LocalIdentity};
use serde::Serialize;

use crate::config::{MatchKey, WsConfig};
use crate::normalize::CandidateIdentity;
use crate::staging::StagingSet;

/// Snapshot of the local directory, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct LocalSnapshot {
    identities: Vec<LocalIdentity>,
}

impl LocalSnapshot {
    /// Creates a snapshot, sorting identities by id.
    #[must_use]
    pub fn new(mut identities: Vec<LocalIdentity>) -> Self {
        identities.sort_by_key(|i| i.id);
        Self { identities }
    }

    /// Returns the identities in id order.
    #[must_use]
    pub fn identities(&self) -> &[LocalIdentity] {
        &self.identities
    }

    /// Returns the number of identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Returns true if the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Indexes identities by match key value.
    ///
    /// Blank keys are skipped. When several identities share a key the
    /// lowest id wins.
    fn index(&self, match_key: MatchKey) -> HashMap<Cow<'_, str>, &LocalIdentity> {
        let mut index = HashMap::new();
        for identity in &self.identities {
            let key = local_key(identity, match_key);
            if !key.is_empty() {
                index.entry(key).or_insert(identity);
            }
        }
        index
    }
}

/// Match key value of a local identity, in the same form as
/// [`CandidateIdentity::key`].
fn local_key(identity: &LocalIdentity, match_key: MatchKey) -> Cow<'_, str> {
    match match_key {
        MatchKey::Idnumber => Cow::Borrowed(&identity.idnumber),
        MatchKey::Username => Cow::Owned(sanitize_username(&identity.username)),
    }
}

/// Rules the planner applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerPolicy {
    /// Auth method owned by the provider.
    pub auth_method: String,
    /// Match key.
    pub match_key: MatchKey,
    /// Identities that are never suspended.
    pub protected_ids: BTreeSet<i64>,
}

impl PlannerPolicy {
    /// Creates the policy of a provider configuration.
    #[must_use]
    pub fn from_config(config: &WsConfig) -> Self {
        Self {
            auth_method: config.auth_method.clone(),
            match_key: config.match_key,
            protected_ids: config.protected_ids.clone(),
        }
    }

    fn may_suspend(&self, identity: &LocalIdentity) -> bool {
        identity.is_owned_by(&self.auth_method)
            && !identity.suspended
            && !identity.deleted
            && !self.protected_ids.contains(&identity.id)
    }
}

/// A staged candidate matched to a local identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedUpdate {
    /// Matched local identity.
    pub local: LocalIdentity,
    /// Remote candidate.
    pub candidate: CandidateIdentity,
}

/// Actions computed for one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    /// Candidates with no local match.
    pub to_create: Vec<CandidateIdentity>,
    /// Candidates matched to a local identity.
    pub to_update: Vec<PlannedUpdate>,
    /// Local identities absent from the staging set.
    pub to_suspend: Vec<LocalIdentity>,
}

impl ReconciliationPlan {
    /// Returns the total number of actions.
    #[must_use]
    pub fn total(&self) -> usize {
        self.to_create.len() + self.to_update.len() + self.to_suspend.len()
    }

    /// Returns true if there is nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Field updates for the bulk update call.
    #[must_use]
    pub fn updates(&self) -> Vec<IdentityUpdate> {
        self.to_update
            .iter()
            .map(|planned| planned.candidate.to_update())
            .collect()
    }

    /// Number of planned updates whose identity belongs to another auth method.
    #[must_use]
    pub fn foreign_updates(&self, auth_method: &str) -> usize {
        self.to_update
            .iter()
            .filter(|planned| !planned.local.is_owned_by(auth_method))
            .count()
    }
}

/// Computes the reconciliation plan.
#[must_use]
pub fn plan(staging: &StagingSet, local: &LocalSnapshot, policy: &PlannerPolicy) -> ReconciliationPlan {
    let index = local.index(policy.match_key);
    let mut result = ReconciliationPlan::default();

    for candidate in staging {
        let key = candidate.key(policy.match_key);
        match index.get(&*key).filter(|_| !key.is_empty()) {
            Some(&identity) => result.to_update.push(PlannedUpdate {
                local: identity.clone(),
                candidate: candidate.clone(),
            }),
            None => result.to_create.push(candidate.clone()),
        }
    }

    result.to_suspend = local
        .identities()
        .iter()
        .filter(|identity| policy.may_suspend(identity))
        .filter(|identity| {
            let key = local_key(identity, policy.match_key);
            key.is_empty() || !staging.contains_key(policy.match_key, &key)
        })
        .cloned()
        .collect();

    tracing::debug!(
        create = result.to_create.len(),
        update = result.to_update.len(),
        suspend = result.to_suspend.len(),
        "Reconciliation planned"
    );
    result
}
