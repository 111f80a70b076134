// crates/import-profile-core/src/runtime/search.rs
// ============================================================================
// Module: Search Handler
// Description: Lists import profiles, optionally filtered by source type.
// Purpose: Serve the read-only, approximate lookup path.
// Dependencies: crate::core, crate::interfaces, serde
// ============================================================================

//! ## Overview
//! Search validates the optional `source_type` filter against the registry
//! before touching the store, then returns every approximate match as-is.
//! No exact re-filtering happens here because the path is non-destructive.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::core::ConstraintField;
use crate::core::ConstraintSet;
use crate::core::ImportProfileEntry;
use crate::core::ResultOrder;
use crate::core::SourceType;
use crate::interfaces::ProfileStore;
use crate::runtime::error::ProfileError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Search request inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    /// Optional source type filter; empty means unconstrained.
    pub source_type: Option<String>,
    /// Identity of the requesting client, echoed in the metadata.
    pub client: String,
}

/// Metadata envelope for search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMetadata {
    /// Number of returned profiles.
    pub count: usize,
    /// Identity of the requesting client.
    pub client: String,
}

/// Search response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// Result metadata.
    #[serde(rename = "search_metadata")]
    pub metadata: SearchMetadata,
    /// Matching profiles, newest first.
    pub profiles: Vec<ImportProfileEntry>,
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Search action handler.
pub struct SearchHandler<'a, S: ProfileStore + ?Sized> {
    /// Backing store.
    store: &'a S,
}

impl<'a, S: ProfileStore + ?Sized> SearchHandler<'a, S> {
    /// Creates a handler over `store`.
    pub const fn new(store: &'a S) -> Self {
        Self {
            store,
        }
    }

    /// Runs a search.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::RequestFormat`] for an unknown source type and
    /// [`ProfileError::Store`] when the lookup fails.
    pub fn handle(&self, request: &SearchRequest) -> Result<SearchResult, ProfileError> {
        let mut constraints = ConstraintSet::new();
        if let Some(label) = request.source_type.as_deref().filter(|label| !label.is_empty()) {
            let source_type = SourceType::parse(label).ok_or_else(|| {
                ProfileError::RequestFormat(
                    "your request must contain a valid source_type parameter.".to_string(),
                )
            })?;
            constraints = constraints.with(ConstraintField::SourceType, source_type.as_str());
        }
        let profiles = self.store.find_by_constraints(&constraints, ResultOrder::LatestFirst)?;
        Ok(SearchResult {
            metadata: SearchMetadata {
                count: profiles.len(),
                client: request.client.clone(),
            },
            profiles,
        })
    }
}
