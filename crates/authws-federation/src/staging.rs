//! Staging set for one sync pass.
//!
//! Candidates are buffered in arrival order and indexed by idnumber and
//! email (and by username when matching on usernames). Emails are compared
//! case-insensitively. The first candidate
//! holding a key wins; later ones are dropped as duplicates.

use std::collections::HashMap;

use crate::config::MatchKey;
use crate::error::{FederationError, FederationResult};
use crate::normalize::CandidateIdentity;
use crate::trace::{TraceEvent, TraceLog};

/// Deduplicated candidates of the current pass.
#[derive(Debug, Clone, Default)]
pub struct StagingSet {
    candidates: Vec<CandidateIdentity>,
    by_idnumber: HashMap<String, usize>,
    by_email: HashMap<String, usize>,
    by_username: HashMap<String, usize>,
}

impl StagingSet {
    /// Returns the number of staged candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Returns true if nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Iterates over candidates in staging order.
    pub fn iter(&self) -> std::slice::Iter<'_, CandidateIdentity> {
        self.candidates.iter()
    }

    /// Looks up a candidate by idnumber.
    #[must_use]
    pub fn get_by_idnumber(&self, idnumber: &str) -> Option<&CandidateIdentity> {
        self.by_idnumber.get(idnumber).map(|&i| &self.candidates[i])
    }

    /// Looks up a candidate by email, ignoring case.
    #[must_use]
    pub fn get_by_email(&self, email: &str) -> Option<&CandidateIdentity> {
        self.by_email
            .get(&email.to_lowercase())
            .map(|&i| &self.candidates[i])
    }

    /// Checks if a key value is staged.
    ///
    /// Username keys are compared in sanitised form.
    #[must_use]
    pub fn contains_key(&self, match_key: MatchKey, value: &str) -> bool {
        match match_key {
            MatchKey::Idnumber => self.by_idnumber.contains_key(value),
            MatchKey::Username => self.by_username.contains_key(value),
        }
    }
}

impl<'a> IntoIterator for &'a StagingSet {
    type Item = &'a CandidateIdentity;
    type IntoIter = std::slice::Iter<'a, CandidateIdentity>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Builds a [`StagingSet`] one candidate at a time.
#[derive(Debug)]
pub struct Stager {
    set: StagingSet,
    match_key: MatchKey,
}

impl Stager {
    /// Creates a stager for a fresh staging set.
    #[must_use]
    pub fn new(match_key: MatchKey) -> Self {
        Self {
            set: StagingSet::default(),
            match_key,
        }
    }

    /// Offers a candidate.
    ///
    /// Returns [`FederationError::DuplicateKey`] if its idnumber or email
    /// (or username, when matching on usernames) is already staged.
    pub fn offer(&mut self, candidate: CandidateIdentity) -> FederationResult<()> {
        let duplicate = |field: &'static str, value: &str| FederationError::DuplicateKey {
            field,
            value: value.to_string(),
        };

        if self.set.by_idnumber.contains_key(&candidate.idnumber) {
            return Err(duplicate("idnumber", &candidate.idnumber));
        }
        let email = candidate.email.to_lowercase();
        if self.set.by_email.contains_key(&email) {
            return Err(duplicate("email", &candidate.email));
        }
        let username = candidate.local_username();
        if self.match_key == MatchKey::Username && self.set.by_username.contains_key(&username) {
            return Err(duplicate("username", &username));
        }

        let index = self.set.candidates.len();
        self.set.by_idnumber.insert(candidate.idnumber.clone(), index);
        self.set.by_email.insert(email, index);
        self.set.by_username.entry(username).or_insert(index);
        self.set.candidates.push(candidate);
        Ok(())
    }

    /// Returns the number of candidates staged so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Returns true if nothing has been staged yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Finishes staging.
    ///
    /// An empty set is a [`FederationError::SafetyAbort`].
    pub fn finish(self) -> FederationResult<StagingSet> {
        if self.set.is_empty() {
            return Err(FederationError::SafetyAbort);
        }
        Ok(self.set)
    }
}

/// Stages candidates, recording dropped duplicates in the trace.
pub fn stage<I>(candidates: I, match_key: MatchKey, trace: &mut TraceLog) -> FederationResult<StagingSet>
where
    I: IntoIterator<Item = CandidateIdentity>,
{
    let mut stager = Stager::new(match_key);
    for candidate in candidates {
        offer_traced(&mut stager, candidate, trace);
    }
    stager.finish()
}

/// Offers a candidate and records a duplicate in the trace.
///
/// Returns whether the candidate was staged.
pub(crate) fn offer_traced(
    stager: &mut Stager,
    candidate: CandidateIdentity,
    trace: &mut TraceLog,
) -> bool {
    let username = candidate.username.clone();
    match stager.offer(candidate) {
        Ok(()) => true,
        Err(FederationError::DuplicateKey { field, value }) => {
            trace.record(TraceEvent::DuplicateSkipped {
                field: field.to_string(),
                value,
                username,
            });
            false
        }
        Err(e) => {
            tracing::error!(error = %e, "Unexpected staging error");
            false
        }
    }
}
