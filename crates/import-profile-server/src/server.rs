// crates/import-profile-server/src/server.rs
// ============================================================================
// Module: Import Profile HTTP Server
// Description: HTTP transport for the import profile action dispatcher.
// Purpose: Bind the configured route and encode dispatcher results.
// Dependencies: import-profile-core, import-profile-config, axum, tokio, url
// ============================================================================

//! ## Overview
//! The server accepts GET and POST on a single configured route. Parameters
//! come from the query string, with `application/x-www-form-urlencoded`
//! bodies merged over them. The abuse gate runs before dispatch, store work
//! runs on the blocking pool, and results are encoded as JSON or JSONP.
//! Errors always use a plain JSON envelope.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Write;
use std::net::IpAddr;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::DefaultBodyLimit;
use axum::extract::RawQuery;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use import_profile_config::ImportProfileConfig;
use import_profile_config::ProfileStoreConfig;
use import_profile_config::ProfileStoreType;
use import_profile_config::ServerAuditConfig;
use import_profile_core::Action;
use import_profile_core::ActionDispatcher;
use import_profile_core::ActionResponse;
use import_profile_core::DispatchError;
use import_profile_core::GateVerdict;
use import_profile_core::InMemoryProfileStore;
use import_profile_core::ProfileRequest;
use import_profile_core::SharedProfileStore;
use import_profile_core::SystemClock;
use import_profile_store_sqlite::SqliteProfileStore;
use import_profile_store_sqlite::SqliteStoreConfig;
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::audit::FileAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::ProfileAuditEvent;
use crate::audit::ProfileAuditEventParams;
use crate::audit::ProfileAuditSink;
use crate::audit::RequestOutcome;
use crate::audit::StderrAuditSink;
use crate::gate::AbuseGate;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum accepted length of a JSONP callback name.
const MAX_CALLBACK_LENGTH: usize = 128;
/// Media type of form-encoded request bodies.
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

// ============================================================================
// SECTION: Server
// ============================================================================

/// Import profile HTTP server.
pub struct ImportProfileServer {
    /// Validated configuration.
    config: ImportProfileConfig,
    /// Shared handler state.
    state: Arc<ServerState>,
}

impl ImportProfileServer {
    /// Builds a server from configuration, opening the configured store and
    /// audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration is invalid or the store or
    /// audit sink cannot be opened.
    pub fn from_config(config: ImportProfileConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let store = build_profile_store(&config.store)?;
        let audit = build_audit_sink(&config.server.audit)?;
        Ok(Self::with_parts(config, store, audit))
    }

    /// Builds a server over an explicit store and audit sink.
    ///
    /// The configuration is used as given; call
    /// [`ImportProfileConfig::validate`] first when it is untrusted.
    #[must_use]
    pub fn with_parts(
        config: ImportProfileConfig,
        store: SharedProfileStore,
        audit: Arc<dyn ProfileAuditSink>,
    ) -> Self {
        let state = Arc::new(ServerState {
            dispatcher: ActionDispatcher::new(store, Arc::new(SystemClock)),
            gate: config.server.abuse_gate.clone().map(AbuseGate::new),
            audit,
            max_body_bytes: config.server.max_body_bytes,
        });
        Self {
            config,
            state,
        }
    }

    /// Returns the axum router serving the configured route.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route(&self.config.server.route, get(handle_http).post(handle_http))
            .layer(DefaultBodyLimit::max(self.state.max_body_bytes))
            .with_state(Arc::clone(&self.state))
    }

    /// Binds the configured address and serves until the transport fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr =
            self.config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|_| ServerError::Transport("http bind failed".to_string()))?;
        self.serve_on(listener).await
    }

    /// Serves on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when the server fails.
    pub async fn serve_on(self, listener: TcpListener) -> Result<(), ServerError> {
        if let Ok(addr) = listener.local_addr() {
            emit_local_only_warning(addr);
        }
        let app = self.router();
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|_| ServerError::Transport("http server failed".to_string()))
    }
}

/// Builds the configured profile store.
fn build_profile_store(config: &ProfileStoreConfig) -> Result<SharedProfileStore, ServerError> {
    match config.store_type {
        ProfileStoreType::Memory => Ok(SharedProfileStore::from_store(InMemoryProfileStore::new())),
        ProfileStoreType::Sqlite => {
            let path = config
                .path
                .as_ref()
                .ok_or_else(|| ServerError::Config("sqlite store requires path".to_string()))?;
            let sqlite_config = SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: config.busy_timeout_ms,
                journal_mode: config.journal_mode,
                sync_mode: config.sync_mode,
            };
            let store = SqliteProfileStore::new(&sqlite_config)
                .map_err(|err| ServerError::Init(err.to_string()))?;
            Ok(SharedProfileStore::from_store(store))
        }
    }
}

/// Builds the configured audit sink.
fn build_audit_sink(config: &ServerAuditConfig) -> Result<Arc<dyn ProfileAuditSink>, ServerError> {
    if !config.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.path {
        Some(path) => {
            let sink = FileAuditSink::new(Path::new(path))
                .map_err(|err| ServerError::Init(format!("audit log: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Shared server state for HTTP handlers.
struct ServerState {
    /// Action dispatcher over the profile store.
    dispatcher: ActionDispatcher,
    /// Abuse gate when enabled.
    gate: Option<AbuseGate>,
    /// Request audit sink.
    audit: Arc<dyn ProfileAuditSink>,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

/// Handles GET and POST requests on the profile route.
async fn handle_http(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    bytes: Bytes,
) -> Response {
    handle_request(&state, peer.ip(), query.as_deref(), &headers, &bytes).into_response()
}

/// Encoded HTTP reply.
#[derive(Debug)]
struct HttpReply {
    /// Response status.
    status: StatusCode,
    /// Response media type.
    content_type: &'static str,
    /// Response body.
    body: String,
}

impl IntoResponse for HttpReply {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(self.content_type));
        response
    }
}

/// Rejected or failed request.
#[derive(Debug)]
struct RequestFailure {
    /// Response status.
    status: StatusCode,
    /// Message returned to the caller.
    message: String,
    /// Error kind label for audit records.
    kind: &'static str,
}

impl RequestFailure {
    /// Builds a 400 failure.
    fn bad_request(message: impl Into<String>, kind: &'static str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            kind,
        }
    }
}

impl From<DispatchError> for RequestFailure {
    fn from(error: DispatchError) -> Self {
        let status = match error {
            DispatchError::GateBlocked => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::Profile(_) => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: error.to_string(),
            kind: error.kind(),
        }
    }
}

/// JSON error envelope.
#[derive(Serialize)]
struct ErrorBody<'a> {
    /// Always `error`.
    status: &'static str,
    /// Failure description.
    message: &'a str,
}

/// Processes one request and records its audit event.
fn handle_request(
    state: &ServerState,
    peer: IpAddr,
    query: Option<&str>,
    headers: &HeaderMap,
    bytes: &Bytes,
) -> HttpReply {
    let (action, result) = process_request(state, peer, query, headers, bytes);
    let (reply, outcome, records, error_kind) = match result {
        Ok((reply, records)) => (reply, RequestOutcome::Ok, Some(records), None),
        Err(failure) => {
            let outcome = if failure.status == StatusCode::SERVICE_UNAVAILABLE {
                RequestOutcome::Blocked
            } else {
                RequestOutcome::Error
            };
            (error_reply(&failure), outcome, None, Some(failure.kind))
        }
    };
    state.audit.record(&ProfileAuditEvent::new(ProfileAuditEventParams {
        peer_ip: Some(peer.to_string()),
        action: action.as_ref().map_or("unknown", Action::label),
        outcome,
        status: reply.status.as_u16(),
        records,
        error_kind,
    }));
    reply
}

/// Runs extraction, gating, dispatch, and encoding for one request.
///
/// The classified action is returned alongside the result once parameters
/// have been read.
fn process_request(
    state: &ServerState,
    peer: IpAddr,
    query: Option<&str>,
    headers: &HeaderMap,
    bytes: &Bytes,
) -> (Option<Action>, Result<(HttpReply, usize), RequestFailure>) {
    if bytes.len() > state.max_body_bytes {
        let failure = RequestFailure {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "request body too large".to_string(),
            kind: "payload_too_large",
        };
        return (None, Err(failure));
    }
    let params = collect_params(query, headers, bytes);
    let action = Action::classify(params.get("action").map_or("", String::as_str));
    (Some(action), respond(state, peer, &params))
}

/// Consults the gate, validates the callback, dispatches, and encodes.
fn respond(
    state: &ServerState,
    peer: IpAddr,
    params: &BTreeMap<String, String>,
) -> Result<(HttpReply, usize), RequestFailure> {
    let verdict = state.gate.as_ref().map_or(GateVerdict::Admitted, |gate| gate.check_now(peer));
    if verdict == GateVerdict::Blocked {
        return Err(DispatchError::GateBlocked.into());
    }
    let callback = params.get("callback").map(String::as_str).filter(|value| !value.is_empty());
    if let Some(callback) = callback
        && !is_valid_callback(callback)
    {
        return Err(RequestFailure::bad_request("invalid 'callback' value", "request_format"));
    }
    let request = ProfileRequest::from_params(params, peer.to_string());
    let response = dispatch_with_blocking(&state.dispatcher, &request, verdict)?;
    let minified =
        params.get("minified").is_some_and(|value| value.trim().eq_ignore_ascii_case("true"));
    let records = match &response {
        ActionResponse::Search(result) => result.metadata.count,
        ActionResponse::Update(report) | ActionResponse::Delete(report) => report.records,
    };
    let reply = encode_response(&response, minified, callback)?;
    Ok((reply, records))
}

/// Executes a dispatch, shifting to a blocking context when available.
fn dispatch_with_blocking(
    dispatcher: &ActionDispatcher,
    request: &ProfileRequest,
    verdict: GateVerdict,
) -> Result<ActionResponse, DispatchError> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| dispatcher.dispatch(request, verdict))
        }
        _ => dispatcher.dispatch(request, verdict),
    }
}

/// Merges query string and form body parameters; body values win.
fn collect_params(
    query: Option<&str>,
    headers: &HeaderMap,
    bytes: &Bytes,
) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    if let Some(query) = query {
        merge_form(&mut params, query.as_bytes());
    }
    let is_form = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim().to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE));
    if is_form && !bytes.is_empty() {
        let mut body = BTreeMap::new();
        merge_form(&mut body, bytes);
        params.extend(body);
    }
    params
}

/// Adds form-encoded pairs; the first occurrence of a key wins.
fn merge_form(params: &mut BTreeMap<String, String>, input: &[u8]) {
    for (key, value) in url::form_urlencoded::parse(input) {
        params.entry(key.into_owned()).or_insert_with(|| value.into_owned());
    }
}

/// Returns true when `callback` is a safe JSONP function name.
fn is_valid_callback(callback: &str) -> bool {
    if callback.len() > MAX_CALLBACK_LENGTH {
        return false;
    }
    let mut chars = callback.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_' || first == '$')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '$' | '.'))
}

/// Encodes a successful dispatch as JSON or JSONP.
fn encode_response(
    response: &ActionResponse,
    minified: bool,
    callback: Option<&str>,
) -> Result<HttpReply, RequestFailure> {
    let value = response
        .to_value()
        .map_err(|_| RequestFailure::bad_request("serialization failed", "serialization"))?;
    let pretty = response.always_pretty() || !minified;
    let encoded =
        if pretty { serde_json::to_string_pretty(&value) } else { serde_json::to_string(&value) };
    let json = encoded
        .map_err(|_| RequestFailure::bad_request("serialization failed", "serialization"))?;
    Ok(match callback {
        Some(callback) => HttpReply {
            status: StatusCode::OK,
            content_type: "application/javascript; charset=utf-8",
            body: format!("{callback}({json});\n"),
        },
        None => HttpReply {
            status: StatusCode::OK,
            content_type: "application/json; charset=utf-8",
            body: json,
        },
    })
}

/// Encodes a failure as the JSON error envelope.
fn error_reply(failure: &RequestFailure) -> HttpReply {
    let body = serde_json::to_string(&ErrorBody {
        status: "error",
        message: &failure.message,
    })
    .unwrap_or_else(|_| r#"{"status":"error","message":"internal error"}"#.to_string());
    HttpReply {
        status: failure.status,
        content_type: "application/json; charset=utf-8",
        body,
    }
}

/// Warns when the server is only reachable from the local host.
fn emit_local_only_warning(addr: SocketAddr) {
    if addr.ip().is_loopback() {
        let _ = writeln!(
            std::io::stderr(),
            "import-profile-server: WARNING: listening on loopback address {addr}; remote \
             harvesters cannot reach this server"
        );
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization failure.
    #[error("init error: {0}")]
    Init(String),
    /// Transport failure.
    #[error("transport error: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests;
