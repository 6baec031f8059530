// crates/query-gate-server/src/telemetry.rs
// ============================================================================
// Module: Gateway Telemetry
// Description: Observability hooks for query requests.
// Purpose: Provide metric events without hard deps.
// Dependencies: query-gate-core
// ============================================================================

//! ## Overview
//! A thin metrics interface for request counters and latency histograms.
//! Deployments plug in their own exporter by implementing
//! [`GatewayMetrics`]; the default discards everything.
//! Security posture: labels never carry caller identities or statement text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use query_gate_core::ResolutionSource;

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// Request outcome classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOutcome {
    /// Rows returned.
    Ok,
    /// Failure returned.
    Error,
}

/// Request metric event payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMetricEvent {
    /// Request outcome.
    pub outcome: QueryOutcome,
    /// Error kind label on failure.
    pub error_kind: Option<&'static str>,
    /// Which entry served the request, once resolved.
    pub resolution: Option<ResolutionSource>,
    /// Rows returned on success.
    pub row_count: Option<usize>,
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for query requests and latencies.
pub trait GatewayMetrics: Send + Sync {
    /// Records a request counter event.
    fn record_request(&self, event: &QueryMetricEvent);
    /// Records a latency observation for the request.
    fn record_latency(&self, event: &QueryMetricEvent, latency: Duration);
}

/// No-op metrics sink.
pub struct NoopMetrics;

impl GatewayMetrics for NoopMetrics {
    fn record_request(&self, _event: &QueryMetricEvent) {}

    fn record_latency(&self, _event: &QueryMetricEvent, _latency: Duration) {}
}
