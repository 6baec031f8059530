// crates/query-gate-server/src/server.rs
// ============================================================================
// Module: Gateway HTTP Server
// Description: axum routes and shared state for the query gateway.
// Purpose: Serve the query endpoint and a health check over HTTP.
// Dependencies: axum, query-gate-config, query-gate-core, tokio
// ============================================================================

//! ## Overview
//! Routes:
//! - `GET|POST /api/db` runs one query from query-string parameters.
//! - `GET /health` reports liveness.
//!
//! Every query request settles one outcome, emits one audit event, and
//! records one metric event. Security posture: all request inputs are
//! untrusted; identity comes from a header set by the fronting platform.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::extract::Query;
use axum::extract::State;
use axum::extract::rejection::QueryRejection;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use query_gate_config::QueryGateConfig;
use query_gate_core::ConfigLookup;
use query_gate_core::ANONYMOUS_CALLER;
use query_gate_core::ConnectionResolver;
use query_gate_core::ErrorKind;
use query_gate_core::Failure;
use query_gate_core::FailureReason;
use query_gate_core::GatewayReport;
use query_gate_core::OperationOutcome;
use query_gate_core::QueryBackend;
use query_gate_core::QueryGateway;
use query_gate_core::executor::UNEXPECTED_FAILURE_MESSAGE;
use serde_json::Value;
use serde_json::json;
use tokio::net::TcpListener;

use crate::adapter::QueryParams;
use crate::adapter::caller_identity;
use crate::adapter::render;
use crate::adapter::to_request;
use crate::audit::FileAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::QueryAuditEvent;
use crate::audit::QueryAuditSink;
use crate::audit::StderrAuditSink;
use crate::telemetry::GatewayMetrics;
use crate::telemetry::NoopMetrics;
use crate::telemetry::QueryMetricEvent;
use crate::telemetry::QueryOutcome;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Query endpoint path.
pub const QUERY_PATH: &str = "/api/db";
/// Health check path.
pub const HEALTH_PATH: &str = "/health";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server setup and transport failures.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Server state could not be built.
    #[error("server init error: {0}")]
    Init(String),
    /// Listener or connection handling failed.
    #[error("server transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: State
// ============================================================================

/// Shared state for request handlers.
pub struct ServerState {
    /// Request pipeline.
    gateway: QueryGateway<Box<dyn ConfigLookup>>,
    /// Header holding the caller identity.
    identity_header: String,
    /// Audit sink for request events.
    audit: Arc<dyn QueryAuditSink>,
    /// Metrics sink.
    metrics: Arc<dyn GatewayMetrics>,
    /// Include statement text in audit events.
    log_statements: bool,
}

impl ServerState {
    /// Creates state with no-op audit and metrics sinks.
    #[must_use]
    pub fn new(gateway: QueryGateway<Box<dyn ConfigLookup>>, identity_header: impl Into<String>) -> Self {
        Self {
            gateway,
            identity_header: identity_header.into(),
            audit: Arc::new(NoopAuditSink),
            metrics: Arc::new(NoopMetrics),
            log_statements: false,
        }
    }

    /// Builds state from configuration, a lookup, and a backend.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Init`] when the audit log cannot be opened.
    pub fn from_config(
        config: &QueryGateConfig,
        lookup: Box<dyn ConfigLookup>,
        backend: Arc<dyn QueryBackend>,
    ) -> Result<Self, ServerError> {
        let resolver = ConnectionResolver::new(lookup, config.connections.resolver_config());
        let audit: Arc<dyn QueryAuditSink> = match (&config.audit.path, config.audit.enabled) {
            (_, false) => Arc::new(NoopAuditSink),
            (Some(path), true) => Arc::new(
                FileAuditSink::new(Path::new(path.trim()))
                    .map_err(|err| ServerError::Init(format!("audit log open failed: {err}")))?,
            ),
            (None, true) => Arc::new(StderrAuditSink),
        };
        Ok(Self::new(QueryGateway::new(resolver, backend), config.server.identity_header.clone())
            .with_audit(audit)
            .with_statement_logging(config.audit.log_statements))
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn QueryAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Replaces the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn GatewayMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Enables or disables statement text in audit events.
    #[must_use]
    pub const fn with_statement_logging(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    /// Runs one query request and returns the response status and body.
    pub async fn handle_query(&self, headers: &HeaderMap, params: &QueryParams) -> (StatusCode, Value) {
        let started = Instant::now();
        let caller = caller_identity(headers, &self.identity_header);
        let report = self.gateway.run(to_request(caller.as_deref(), params)).await;
        self.settle(&report, started.elapsed())
    }

    /// Settles a request whose query string could not be decoded.
    ///
    /// The caller receives the generic unknown-error body; `detail` is kept
    /// for the audit record only.
    pub fn reject_query(&self, headers: &HeaderMap, detail: impl Into<String>) -> (StatusCode, Value) {
        let started = Instant::now();
        let caller = caller_identity(headers, &self.identity_header)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| ANONYMOUS_CALLER.to_string());
        let failure =
            Failure::new(ErrorKind::Unknown, FailureReason::MalformedQuery, UNEXPECTED_FAILURE_MESSAGE)
                .with_detail(detail);
        let report = GatewayReport::new(caller, OperationOutcome::Failure(failure));
        self.settle(&report, started.elapsed())
    }

    /// Records audit and metrics for a settled report and renders it.
    fn settle(&self, report: &GatewayReport, elapsed: Duration) -> (StatusCode, Value) {
        self.audit.record(&QueryAuditEvent::from_report(report, elapsed, self.log_statements));
        let failure = report.outcome.failure();
        let metric = QueryMetricEvent {
            outcome: match report.outcome {
                OperationOutcome::Success(_) => QueryOutcome::Ok,
                OperationOutcome::Failure(_) => QueryOutcome::Error,
            },
            error_kind: failure.map(|failure| failure.kind.label()),
            resolution: report.resolution,
            row_count: report.outcome.row_count(),
        };
        self.metrics.record_request(&metric);
        self.metrics.record_latency(&metric, elapsed);

        render(&report.outcome, &report.caller)
    }
}

// ============================================================================
// SECTION: Routes
// ============================================================================

/// Builds the application router.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route(QUERY_PATH, get(handle_query).post(handle_query))
        .route(HEALTH_PATH, get(handle_health))
        .with_state(state)
}

/// Binds `addr` and serves until the listener fails.
///
/// # Errors
///
/// Returns [`ServerError::Transport`] when binding or serving fails.
pub async fn serve(addr: SocketAddr, state: Arc<ServerState>) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
    serve_listener(listener, state).await
}

/// Serves on an already-bound listener.
///
/// # Errors
///
/// Returns [`ServerError::Transport`] when serving fails.
pub async fn serve_listener(listener: TcpListener, state: Arc<ServerState>) -> Result<(), ServerError> {
    let app = router(state);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|_| ServerError::Transport("http server failed".to_string()))
}

/// Handles query requests.
async fn handle_query(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> impl IntoResponse {
    let (status, body) = match params {
        Ok(Query(params)) => state.handle_query(&headers, &params).await,
        Err(rejection) => state.reject_query(&headers, rejection.body_text()),
    };
    (status, Json(body))
}

/// Handles health checks.
async fn handle_health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
