// crates/import-profile-core/src/runtime/dispatcher.rs
// ============================================================================
// Module: Action Dispatcher
// Description: Routes import profile requests to the matching handler.
// Purpose: Single entry point that honors the abuse gate before any work.
// Dependencies: crate::core, crate::interfaces, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`ActionDispatcher`] receives a flat parameter map plus the abuse gate's
//! verdict, classifies the `action` parameter, and invokes exactly one
//! handler. A blocked request or an unknown action never reaches the store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::interfaces::Clock;
use crate::runtime::delete::DeleteHandler;
use crate::runtime::delete::DeleteRequest;
use crate::runtime::error::ProfileError;
use crate::runtime::search::SearchHandler;
use crate::runtime::search::SearchRequest;
use crate::runtime::search::SearchResult;
use crate::runtime::store::SharedProfileStore;
use crate::runtime::update::MutationReport;
use crate::runtime::update::UpdateHandler;
use crate::runtime::update::UpdateRequest;

// ============================================================================
// SECTION: Actions
// ============================================================================

/// Classified request action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// List profiles (empty or absent `action`).
    Search,
    /// Replace an existing profile.
    Update,
    /// Remove matching profiles.
    Delete,
    /// Unrecognized action value.
    Invalid(String),
}

impl Action {
    /// Classifies a raw `action` value. Matching is exact and case-sensitive.
    #[must_use]
    pub fn classify(value: &str) -> Self {
        match value {
            "" => Self::Search,
            "update" => Self::Update,
            "delete" => Self::Delete,
            other => Self::Invalid(other.to_string()),
        }
    }

    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Invalid(_) => "invalid",
        }
    }
}

/// Abuse gate decision for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    /// Request may proceed.
    Admitted,
    /// Caller is over its request budget.
    Blocked,
}

// ============================================================================
// SECTION: Request
// ============================================================================

/// Request parameters understood by the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileRequest {
    /// Raw `action` value.
    pub action: String,
    /// Update payload.
    pub data: Option<String>,
    /// Delete source URL.
    pub source_url: Option<String>,
    /// Delete screen name.
    pub screen_name: Option<String>,
    /// Delete client host.
    pub client_host: Option<String>,
    /// Search or delete source type filter.
    pub source_type: Option<String>,
    /// Identity of the requesting client.
    pub client: String,
}

impl ProfileRequest {
    /// Builds a request from a flat parameter map.
    #[must_use]
    pub fn from_params(params: &BTreeMap<String, String>, client: impl Into<String>) -> Self {
        let get = |key: &str| params.get(key).cloned();
        Self {
            action: get("action").unwrap_or_default(),
            data: get("data"),
            source_url: get("source_url"),
            screen_name: get("screen_name"),
            client_host: get("client_host"),
            source_type: get("source_type"),
            client: client.into(),
        }
    }
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Successful dispatch outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResponse {
    /// Search results.
    Search(SearchResult),
    /// Update report.
    Update(MutationReport),
    /// Delete report.
    Delete(MutationReport),
}

impl ActionResponse {
    /// Returns the response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when a profile cannot be serialized.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Search(result) => serde_json::to_value(result),
            Self::Update(report) | Self::Delete(report) => serde_json::to_value(report),
        }
    }

    /// Returns true when the body should be pretty-printed regardless of
    /// the caller's `minified` flag.
    #[must_use]
    pub const fn always_pretty(&self) -> bool {
        matches!(self, Self::Update(_) | Self::Delete(_))
    }
}

/// Dispatch failure.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The abuse gate blocked the caller.
    #[error("your request frequency is too high")]
    GateBlocked,
    /// A handler rejected the request.
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

impl DispatchError {
    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::GateBlocked => "gate_blocked",
            Self::Profile(error) => error.kind(),
        }
    }
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Routes requests to the search, update, and delete handlers.
#[derive(Clone)]
pub struct ActionDispatcher {
    /// Backing store.
    store: SharedProfileStore,
    /// Time source for update stamps.
    clock: Arc<dyn Clock + Send + Sync>,
}

impl ActionDispatcher {
    /// Creates a dispatcher over `store` and `clock`.
    #[must_use]
    pub fn new(store: SharedProfileStore, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            store,
            clock,
        }
    }

    /// Dispatches one request.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::GateBlocked`] when the verdict is blocked and
    /// [`DispatchError::Profile`] when classification or the handler fails.
    pub fn dispatch(
        &self,
        request: &ProfileRequest,
        verdict: GateVerdict,
    ) -> Result<ActionResponse, DispatchError> {
        if verdict == GateVerdict::Blocked {
            return Err(DispatchError::GateBlocked);
        }
        match Action::classify(&request.action) {
            Action::Search => {
                let search = SearchRequest {
                    source_type: request.source_type.clone(),
                    client: request.client.clone(),
                };
                Ok(ActionResponse::Search(SearchHandler::new(&self.store).handle(&search)?))
            }
            Action::Update => {
                let update = UpdateRequest {
                    data: request.data.clone(),
                };
                let handler = UpdateHandler::new(&self.store, self.clock.as_ref());
                Ok(ActionResponse::Update(handler.handle(&update)?))
            }
            Action::Delete => {
                let delete = DeleteRequest {
                    source_url: request.source_url.clone(),
                    screen_name: request.screen_name.clone(),
                    client_host: request.client_host.clone(),
                    source_type: request.source_type.clone(),
                };
                Ok(ActionResponse::Delete(DeleteHandler::new(&self.store).handle(&delete)?))
            }
            Action::Invalid(value) => Err(DispatchError::Profile(ProfileError::RequestFormat(
                format!("invalid 'action' value : {value}"),
            ))),
        }
    }
}
