// crates/query-gate-server/src/audit.rs
// ============================================================================
// Module: Gateway Audit Logging
// Description: Structured audit events for query request handling.
// Purpose: Emit one redacted JSON-line event per request.
// Dependencies: query-gate-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Each request produces one [`QueryAuditEvent`]. Events carry routing and
//! outcome metadata plus internal failure detail that callers never see.
//! Credentials and filter text are never recorded; the assembled statement
//! is included only when explicitly enabled.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use query_gate_core::FailureReason;
use query_gate_core::GatewayReport;
use query_gate_core::OperationOutcome;
use query_gate_core::ResolutionSource;
use serde::Serialize;

use crate::telemetry::QueryOutcome;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Query request audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Access line naming the caller.
    pub access: String,
    /// Caller identity.
    pub caller: String,
    /// Tenant key derived from the caller.
    pub tenant_key: Option<String>,
    /// Connection entry name used.
    pub entry_name: Option<String>,
    /// Which rule selected the entry.
    pub resolution: Option<ResolutionSource>,
    /// Request outcome.
    pub outcome: QueryOutcome,
    /// External error code on failure.
    pub error_code: Option<i32>,
    /// Error kind label on failure.
    pub error_kind: Option<&'static str>,
    /// Internal failure cause.
    pub failure_reason: Option<FailureReason>,
    /// Internal failure detail.
    pub detail: Option<String>,
    /// Rows returned on success.
    pub row_count: Option<usize>,
    /// Wall-clock time spent on the request.
    pub elapsed_ms: u128,
    /// Statement text (explicit opt-in only).
    pub statement: Option<String>,
}

impl QueryAuditEvent {
    /// Builds the event for a settled request.
    #[must_use]
    pub fn from_report(report: &GatewayReport, elapsed: Duration, log_statements: bool) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        let failure = report.outcome.failure();
        let outcome = match report.outcome {
            OperationOutcome::Success(_) => QueryOutcome::Ok,
            OperationOutcome::Failure(_) => QueryOutcome::Error,
        };
        Self {
            event: "query_request",
            timestamp_ms,
            access: format!("db accessed by {}", report.caller),
            caller: report.caller.clone(),
            tenant_key: report.tenant_key.clone(),
            entry_name: report.entry_name.clone(),
            resolution: report.resolution,
            outcome,
            error_code: failure.map(|failure| failure.kind.code()),
            error_kind: failure.map(|failure| failure.kind.label()),
            failure_reason: failure.map(|failure| failure.reason),
            detail: failure.and_then(|failure| failure.detail.clone()),
            row_count: report.outcome.row_count(),
            elapsed_ms: elapsed.as_millis(),
            statement: if log_statements {
                report.statement.as_ref().map(|statement| statement.sql().to_string())
            } else {
                None
            },
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for query request events.
pub trait QueryAuditSink: Send + Sync {
    /// Records a request event.
    fn record(&self, event: &QueryAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl QueryAuditSink for StderrAuditSink {
    fn record(&self, event: &QueryAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// Append-only audit log file.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens (or creates) the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl QueryAuditSink for FileAuditSink {
    fn record(&self, event: &QueryAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl QueryAuditSink for NoopAuditSink {
    fn record(&self, _event: &QueryAuditEvent) {}
}
