// crates/query-gate-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Scripted in-memory backend and descriptor fixtures.
// Purpose: Drive the executor and gateway without a database.
// Dependencies: query-gate-core, async-trait, futures
// ============================================================================

//! ## Overview
//! [`ScriptedBackend`] replays a fixed script: fail the connect, fail the
//! execute, panic, or yield a list of events. It records every statement it
//! receives and counts how many events the executor actually pulled.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use futures::StreamExt;
use query_gate_core::BackendError;
use query_gate_core::BackendEvent;
use query_gate_core::BackendSession;
use query_gate_core::BuiltStatement;
use query_gate_core::ColumnMeta;
use query_gate_core::ConnectionDescriptor;
use query_gate_core::DeclaredType;
use query_gate_core::EventStream;
use query_gate_core::NativeValue;
use query_gate_core::QueryBackend;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Descriptor JSON for a SQL-login connection to `server`.
pub fn descriptor_json(server: &str) -> String {
    format!(
        r#"{{"server":"{server}","authentication":{{"type":"default","options":{{"userName":"reader","password":"pw"}}}},"options":{{"database":"AdventureWorks","encrypt":true}}}}"#
    )
}

/// Parsed descriptor for `server`.
pub fn descriptor(server: &str) -> ConnectionDescriptor {
    ConnectionDescriptor::parse(&descriptor_json(server)).unwrap()
}

/// Column metadata plus two customer rows, then completion.
pub fn customer_events() -> Vec<Result<BackendEvent, BackendError>> {
    vec![
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
            NativeValue::Text("Harris".to_string()),
        ])),
        Ok(BackendEvent::Done {
            row_count: Some(2),
        }),
    ]
}

// ============================================================================
// SECTION: Scripted Backend
// ============================================================================

/// Behavior replayed by [`ScriptedBackend`].
#[derive(Debug, Clone)]
pub enum Script {
    /// `connect` fails with this message.
    ConnectFails(String),
    /// `execute` fails with this message.
    ExecuteFails(String),
    /// `connect` panics.
    ConnectPanics,
    /// The stream yields these events.
    Events(Vec<Result<BackendEvent, BackendError>>),
}

/// In-memory backend replaying a [`Script`].
#[derive(Debug)]
pub struct ScriptedBackend {
    script: Script,
    connects: AtomicUsize,
    pulled: Arc<AtomicUsize>,
    statements: Arc<Mutex<Vec<String>>>,
    servers: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            connects: AtomicUsize::new(0),
            pulled: Arc::new(AtomicUsize::new(0)),
            statements: Arc::new(Mutex::new(Vec::new())),
            servers: Mutex::new(Vec::new()),
        }
    }

    pub fn events(events: Vec<Result<BackendEvent, BackendError>>) -> Self {
        Self::new(Script::Events(events))
    }

    /// Number of connection attempts.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Number of events the executor pulled from the stream.
    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
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
impl QueryBackend for ScriptedBackend {
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn BackendSession>, BackendError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.servers.lock().unwrap().push(descriptor.server.clone());
        match &self.script {
            Script::ConnectFails(message) => Err(BackendError::Connect(message.clone())),
            Script::ConnectPanics => panic!("driver exploded"),
            Script::ExecuteFails(message) => Ok(Box::new(ScriptedSession {
                execute_error: Some(message.clone()),
                events: Vec::new(),
                pulled: Arc::clone(&self.pulled),
                statements: Arc::clone(&self.statements),
            })),
            Script::Events(events) => Ok(Box::new(ScriptedSession {
                execute_error: None,
                events: events.clone(),
                pulled: Arc::clone(&self.pulled),
                statements: Arc::clone(&self.statements),
            })),
        }
    }
}

/// Session handed out by [`ScriptedBackend`].
struct ScriptedSession {
    execute_error: Option<String>,
    events: Vec<Result<BackendEvent, BackendError>>,
    pulled: Arc<AtomicUsize>,
    statements: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl BackendSession for ScriptedSession {
    async fn execute<'a>(
        &'a mut self,
        statement: &BuiltStatement,
    ) -> Result<EventStream<'a>, BackendError> {
        self.statements.lock().unwrap().push(statement.sql().to_string());
        if let Some(message) = &self.execute_error {
            return Err(BackendError::Execute(message.clone()));
        }
        let pulled = Arc::clone(&self.pulled);
        let events = std::mem::take(&mut self.events);
        Ok(futures::stream::iter(events)
            .inspect(move |_| {
                pulled.fetch_add(1, Ordering::SeqCst);
            })
            .boxed())
    }
}
