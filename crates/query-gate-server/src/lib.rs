// crates/query-gate-server/src/lib.rs
// ============================================================================
// Module: Query Gate Server
// Description: HTTP adapter, audit logging, and telemetry for the gateway.
// Purpose: Expose the query pipeline over HTTP.
// Dependencies: axum, query-gate-config, query-gate-core, serde, tokio
// ============================================================================

//! ## Overview
//! This crate wraps [`query_gate_core::QueryGateway`] in an axum server.
//! [`adapter`] maps HTTP to gateway requests and outcomes to responses,
//! [`audit`] records one structured event per request, and [`telemetry`]
//! exposes metric hooks.
//! Invariants:
//! - Success responses are `200`; every failure is `400` with the usage hint.
//! - Internal failure detail is logged, never returned.
//!
//! Security posture: request inputs and the identity header are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod adapter;
pub mod audit;
pub mod server;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use adapter::QueryParams;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::QueryAuditEvent;
pub use audit::QueryAuditSink;
pub use audit::StderrAuditSink;
pub use server::ServerError;
pub use server::ServerState;
pub use server::router;
pub use server::serve;
pub use server::serve_listener;
pub use telemetry::GatewayMetrics;
pub use telemetry::NoopMetrics;
pub use telemetry::QueryMetricEvent;
pub use telemetry::QueryOutcome;
