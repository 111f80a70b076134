// crates/import-profile-core/src/core/query.rs
// ============================================================================
// Module: Profile Constraint Queries
// Description: Constraint sets and the term analyzer used for approximate lookup.
// Purpose: Describe store queries and their deliberately imprecise matching.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Store lookups take a [`ConstraintSet`] mapping profile fields to values.
//! Matching is approximate: values are analyzed into lowercase alphanumeric
//! terms and a field matches when it contains every query term. This
//! over-matches relative to string equality (case folding, punctuation,
//! extra path segments), so destructive callers must re-check candidates
//! with exact comparisons.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::profile::ImportProfileEntry;

// ============================================================================
// SECTION: Constraint Fields
// ============================================================================

/// Profile field usable as a lookup constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintField {
    /// `source_type` field.
    SourceType,
    /// `source_url` field.
    SourceUrl,
    /// `screen_name` field.
    ScreenName,
    /// `client_host` field.
    ClientHost,
}

impl ConstraintField {
    /// Returns the wire/column name of the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SourceType => "source_type",
            Self::SourceUrl => "source_url",
            Self::ScreenName => "screen_name",
            Self::ClientHost => "client_host",
        }
    }

    /// Reads the field value from an entry.
    #[must_use]
    pub fn value_of(self, entry: &ImportProfileEntry) -> Option<&str> {
        match self {
            Self::SourceType => Some(entry.source_type.as_str()),
            Self::SourceUrl => Some(entry.source_url.as_str()),
            Self::ScreenName => entry.screen_name.as_deref(),
            Self::ClientHost => entry.client_host.as_deref(),
        }
    }
}

// ============================================================================
// SECTION: Constraint Set
// ============================================================================

/// Field constraints for a store lookup. An empty set matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSet {
    /// Constraint values keyed by field.
    constraints: BTreeMap<ConstraintField, String>,
}

impl ConstraintSet {
    /// Creates an empty constraint set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the set with `field` constrained to `value`.
    #[must_use]
    pub fn with(mut self, field: ConstraintField, value: impl Into<String>) -> Self {
        self.constraints.insert(field, value.into());
        self
    }

    /// Returns the constraint value for `field`, if any.
    #[must_use]
    pub fn get(&self, field: ConstraintField) -> Option<&str> {
        self.constraints.get(&field).map(String::as_str)
    }

    /// Iterates constraints in field order.
    pub fn iter(&self) -> impl Iterator<Item = (ConstraintField, &str)> {
        self.constraints.iter().map(|(field, value)| (*field, value.as_str()))
    }

    /// Returns true when no constraint is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Applies approximate term matching to an entry.
    #[must_use]
    pub fn approximately_matches(&self, entry: &ImportProfileEntry) -> bool {
        self.iter().all(|(field, value)| {
            field.value_of(entry).is_some_and(|actual| terms_contained(value, actual))
        })
    }
}

/// Ordering requested from a constraint lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultOrder {
    /// Most recently modified first.
    LatestFirst,
    /// Backend order; callers must not depend on it.
    #[default]
    Unordered,
}

// ============================================================================
// SECTION: Analyzer
// ============================================================================

/// Splits text into lowercase alphanumeric terms.
#[must_use]
pub fn analyze(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Returns true when every term of `query` appears among the terms of `field`.
#[must_use]
pub fn terms_contained(query: &str, field: &str) -> bool {
    let field_terms = analyze(field);
    analyze(query).iter().all(|term| field_terms.contains(term))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
