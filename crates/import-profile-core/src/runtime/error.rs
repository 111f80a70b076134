// crates/import-profile-core/src/runtime/error.rs
// ============================================================================
// Module: Import Profile Handler Errors
// Description: Error taxonomy shared by the search, update, and delete handlers.
// Purpose: Keep request-format, validation, and store failures distinguishable.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every handler failure is a [`ProfileError`]. The variants keep request
//! format and validation problems apart from store failures, and
//! [`ProfileError::kind`] gives each one a stable audit label.

use thiserror::Error;

use crate::core::ValidationError;
use crate::interfaces::StoreError;

/// Handler failure.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// A required payload was empty or missing.
    #[error("{0}")]
    MissingData(String),
    /// A parameter was missing, empty, malformed, or unknown.
    #[error("{0}")]
    RequestFormat(String),
    /// The update target does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The payload failed a profile field rule.
    #[error("{0}")]
    Validation(String),
    /// A store call failed.
    #[error("{0}")]
    Store(String),
}

impl ProfileError {
    /// Returns a stable label for audit and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingData(_) => "missing_data",
            Self::RequestFormat(_) => "request_format",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Store(_) => "store",
        }
    }
}

impl From<StoreError> for ProfileError {
    fn from(error: StoreError) -> Self {
        Self::Store(error.to_string())
    }
}

impl From<ValidationError> for ProfileError {
    fn from(error: ValidationError) -> Self {
        Self::Validation(format!("Error updating import profile : {}", error.message()))
    }
}
