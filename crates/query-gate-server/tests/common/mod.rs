// crates/query-gate-server/tests/common/mod.rs
// ============================================================================
// Module: Server Test Fixtures
// Description: Fixed-result backend, recording metrics, and state builders.
// Purpose: Exercise the HTTP layer without a database.
// Dependencies: query-gate-core, query-gate-server, async-trait, futures
// ============================================================================

//! ## Overview
//! [`FixedBackend`] answers every statement with the same customer rows, or
//! refuses every connection. [`RecordingMetrics`] keeps each metric event.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use query_gate_core::BackendError;
use query_gate_core::BackendEvent;
use query_gate_core::BackendSession;
use query_gate_core::BuiltStatement;
use query_gate_core::ColumnMeta;
use query_gate_core::ConfigLookup;
use query_gate_core::ConnectionDescriptor;
use query_gate_core::ConnectionResolver;
use query_gate_core::DeclaredType;
use query_gate_core::EventStream;
use query_gate_core::NativeValue;
use query_gate_core::QueryBackend;
use query_gate_core::QueryGateway;
use query_gate_core::ResolverConfig;
use query_gate_core::StaticLookup;
use query_gate_server::GatewayMetrics;
use query_gate_server::QueryMetricEvent;
use query_gate_server::ServerState;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Identity header used by the fixtures.
pub const IDENTITY_HEADER: &str = "x-ms-client-principal-name";

/// Descriptor JSON for a SQL-login connection to `server`.
pub fn descriptor_json(server: &str) -> String {
    format!(
        r#"{{"server":"{server}","authentication":{{"type":"default","options":{{"userName":"reader","password":"pw"}}}},"options":{{"database":"AdventureWorks"}}}}"#
    )
}

/// Lookup with a default entry and one tenant entry.
pub fn lookup() -> Box<dyn ConfigLookup> {
    Box::new(
        StaticLookup::new()
            .with_entry("SQLAZURECONNSTR_AdventureWorks", descriptor_json("default.db"))
            .with_entry("SQLAZURECONNSTR_tenant_example_com", descriptor_json("tenant.db")),
    )
}

/// State over [`lookup`] and `backend` with no-op sinks.
pub fn state(backend: Arc<FixedBackend>) -> ServerState {
    let resolver = ConnectionResolver::new(lookup(), ResolverConfig::default());
    ServerState::new(QueryGateway::new(resolver, backend), IDENTITY_HEADER)
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Backend answering every statement with two customer rows.
#[derive(Debug, Default)]
pub struct FixedBackend {
    refuse: bool,
    statements: Arc<Mutex<Vec<String>>>,
    servers: Mutex<Vec<String>>,
}

impl FixedBackend {
    pub fn rows() -> Self {
        Self::default()
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    /// Statements received, in order.
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    /// Servers connected to, in order.
    pub fn servers(&self) -> Vec<String> {
        self.servers.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryBackend for FixedBackend {
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn BackendSession>, BackendError> {
        self.servers.lock().unwrap().push(descriptor.server.clone());
        if self.refuse {
            return Err(BackendError::Connect("login failed for user 'reader'".to_string()));
        }
        Ok(Box::new(FixedSession {
            statements: Arc::clone(&self.statements),
        }))
    }
}

/// Session handed out by [`FixedBackend`].
struct FixedSession {
    statements: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl BackendSession for FixedSession {
    async fn execute<'a>(
        &'a mut self,
        statement: &BuiltStatement,
    ) -> Result<EventStream<'a>, BackendError> {
        self.statements.lock().unwrap().push(statement.sql().to_string());
        let events = vec![
            Ok(BackendEvent::Columns(vec![
                ColumnMeta::new("FirstName", DeclaredType::Other),
                ColumnMeta::new("LastName", DeclaredType::Other),
            ])),
            Ok(BackendEvent::Row(vec![
                NativeValue::Text("Orlando".to_string()),
                NativeValue::Text("Gee".to_string()),
            ])),
            Ok(BackendEvent::Row(vec![
                NativeValue::Text("Keith".to_string()),
                NativeValue::Null,
            ])),
            Ok(BackendEvent::Done {
                row_count: Some(2),
            }),
        ];
        Ok(futures::stream::iter(events).boxed())
    }
}

// ============================================================================
// SECTION: Metrics
// ============================================================================

/// Metrics sink keeping every event.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    requests: Mutex<Vec<QueryMetricEvent>>,
    latencies: Mutex<Vec<Duration>>,
}

impl RecordingMetrics {
    pub fn requests(&self) -> Vec<QueryMetricEvent> {
        self.requests.lock().unwrap().clone()
    }

    pub fn latency_count(&self) -> usize {
        self.latencies.lock().unwrap().len()
    }
}

impl GatewayMetrics for RecordingMetrics {
    fn record_request(&self, event: &QueryMetricEvent) {
        self.requests.lock().unwrap().push(event.clone());
    }

    fn record_latency(&self, _event: &QueryMetricEvent, latency: Duration) {
        self.latencies.lock().unwrap().push(latency);
    }
}
