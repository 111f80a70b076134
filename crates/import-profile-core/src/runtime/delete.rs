// crates/import-profile-core/src/runtime/delete.rs
// ============================================================================
// Module: Delete Handler
// Description: Removes profiles matching a source URL and owner identity.
// Purpose: Turn approximate store matches into exact, safe deletions.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The store lookup over-matches, so every candidate is re-checked with
//! exact string equality before it is removed. Only candidates whose
//! `source_url` equals the requested URL and whose screen name or client
//! host equals a supplied identity value are deleted.
//!
//! ## Invariants
//! - A candidate that fails [`DeleteCriteria::matches_exactly`] is never
//!   passed to [`ProfileStore::delete_by_id`].
//! - The first failed removal aborts the request; earlier removals stay.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::ConstraintField;
use crate::core::ConstraintSet;
use crate::core::ImportProfileEntry;
use crate::core::ResultOrder;
use crate::core::SourceType;
use crate::interfaces::ProfileStore;
use crate::runtime::error::ProfileError;
use crate::runtime::update::MutationReport;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Delete request inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteRequest {
    /// Source URL of the profiles to remove.
    pub source_url: Option<String>,
    /// Owning screen name.
    pub screen_name: Option<String>,
    /// Owning client host, used when no screen name is given.
    pub client_host: Option<String>,
    /// Optional source type narrowing the match.
    pub source_type: Option<String>,
}

/// Validated delete criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteCriteria {
    /// Exact source URL.
    pub source_url: String,
    /// Exact screen name, when supplied.
    pub screen_name: Option<String>,
    /// Exact client host, when supplied.
    pub client_host: Option<String>,
    /// Required source type, when supplied.
    pub source_type: Option<SourceType>,
}

impl DeleteCriteria {
    /// Validates a request into criteria.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::RequestFormat`] when the URL or both identity
    /// values are missing, or when the source type is unknown.
    pub fn from_request(request: &DeleteRequest) -> Result<Self, ProfileError> {
        let source_url = non_empty(request.source_url.as_deref()).ok_or_else(|| {
            ProfileError::RequestFormat(
                "your request must contain a source_url parameter.".to_string(),
            )
        })?;
        let screen_name = non_empty(request.screen_name.as_deref());
        let client_host = non_empty(request.client_host.as_deref());
        if screen_name.is_none() && client_host.is_none() {
            return Err(ProfileError::RequestFormat(
                "your request must contain either a screen_name or a client_host parameter."
                    .to_string(),
            ));
        }
        let source_type = non_empty(request.source_type.as_deref())
            .map(|label| {
                SourceType::parse(&label).ok_or_else(|| {
                    ProfileError::RequestFormat(
                        "your request must contain a valid source_type parameter.".to_string(),
                    )
                })
            })
            .transpose()?;
        Ok(Self {
            source_url,
            screen_name,
            client_host,
            source_type,
        })
    }

    /// Builds the approximate store query.
    ///
    /// The identity constraint uses the screen name when present, otherwise
    /// the client host.
    #[must_use]
    pub fn constraints(&self) -> ConstraintSet {
        let mut constraints =
            ConstraintSet::new().with(ConstraintField::SourceUrl, self.source_url.as_str());
        if let Some(screen_name) = &self.screen_name {
            constraints = constraints.with(ConstraintField::ScreenName, screen_name.as_str());
        } else if let Some(client_host) = &self.client_host {
            constraints = constraints.with(ConstraintField::ClientHost, client_host.as_str());
        }
        if let Some(source_type) = self.source_type {
            constraints = constraints.with(ConstraintField::SourceType, source_type.as_str());
        }
        constraints
    }

    /// Returns true when `candidate` matches by exact string equality.
    #[must_use]
    pub fn matches_exactly(&self, candidate: &ImportProfileEntry) -> bool {
        if candidate.source_url.as_str() != self.source_url {
            return false;
        }
        if self.source_type.is_some_and(|source_type| source_type != candidate.source_type) {
            return false;
        }
        let screen_name_match = self
            .screen_name
            .as_deref()
            .is_some_and(|wanted| candidate.screen_name.as_deref() == Some(wanted));
        let client_host_match = self
            .client_host
            .as_deref()
            .is_some_and(|wanted| candidate.client_host.as_deref() == Some(wanted));
        screen_name_match || client_host_match
    }
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Delete action handler.
pub struct DeleteHandler<'a, S: ProfileStore + ?Sized> {
    /// Backing store.
    store: &'a S,
}

impl<'a, S: ProfileStore + ?Sized> DeleteHandler<'a, S> {
    /// Creates a handler over `store`.
    pub const fn new(store: &'a S) -> Self {
        Self {
            store,
        }
    }

    /// Removes every exactly matching profile.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::RequestFormat`] for invalid parameters and
    /// [`ProfileError::Store`] when the lookup or a removal fails. Removals
    /// that completed before the failure are not rolled back.
    pub fn handle(&self, request: &DeleteRequest) -> Result<MutationReport, ProfileError> {
        let criteria = DeleteCriteria::from_request(request)?;
        let candidates =
            self.store.find_by_constraints(&criteria.constraints(), ResultOrder::Unordered)?;
        let mut removed = 0usize;
        for candidate in candidates.iter().filter(|candidate| criteria.matches_exactly(candidate))
        {
            let unable = || {
                ProfileError::Store(format!("Unable to delete import profile : {}", candidate.id))
            };
            match self.store.delete_by_id(&candidate.id, candidate.source_type) {
                Ok(true) => removed += 1,
                Ok(false) | Err(_) => return Err(unable()),
            }
        }
        Ok(MutationReport::deleted(removed))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns an owned copy of `value` unless it is absent or empty.
fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|value| !value.is_empty()).map(str::to_string)
}
