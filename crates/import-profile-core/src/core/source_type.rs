// crates/import-profile-core/src/core/source_type.rs
// ============================================================================
// Module: Source Type Registry
// Description: Closed set of harvester source types.
// Purpose: Validate source type identifiers without dynamic registration.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A source type names the harvester that consumes an import profile. The set
//! is closed: membership is a case-sensitive exact match against the
//! identifiers below, and nothing can be registered at runtime.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Source Types
// ============================================================================

/// Harvester source type for an import profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    /// Entries authored by a local user.
    User,
    /// Twitter timelines, bound to an account screen name.
    Twitter,
    /// RSS or Atom feeds.
    Rss,
    /// `GeoJSON` feature collections.
    Geojson,
    /// FOSSASIA API endpoints.
    FossasiaApi,
    /// `OpenWifiMap` node listings.
    Openwifimap,
    /// Community node lists.
    Nodelist,
    /// Netmon node listings.
    Netmon,
    /// Freifunk node feeds.
    FreifunkNode,
    /// Ninux node feeds.
    Ninux,
}

impl SourceType {
    /// Every recognized source type, in registry order.
    pub const ALL: [Self; 10] = [
        Self::User,
        Self::Twitter,
        Self::Rss,
        Self::Geojson,
        Self::FossasiaApi,
        Self::Openwifimap,
        Self::Nodelist,
        Self::Netmon,
        Self::FreifunkNode,
        Self::Ninux,
    ];

    /// Returns the canonical identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Twitter => "TWITTER",
            Self::Rss => "RSS",
            Self::Geojson => "GEOJSON",
            Self::FossasiaApi => "FOSSASIA_API",
            Self::Openwifimap => "OPENWIFIMAP",
            Self::Nodelist => "NODELIST",
            Self::Netmon => "NETMON",
            Self::FreifunkNode => "FREIFUNK_NODE",
            Self::Ninux => "NINUX",
        }
    }

    /// Parses a canonical identifier. Matching is exact and case-sensitive.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|source_type| source_type.as_str() == value)
    }

    /// Returns true when `value` names a recognized source type.
    #[must_use]
    pub fn has_value(value: &str) -> bool {
        Self::parse(value).is_some()
    }

    /// Returns true when profiles of this type are bound to an account and
    /// must carry a screen name.
    #[must_use]
    pub const fn requires_screen_name(self) -> bool {
        matches!(self, Self::Twitter)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
