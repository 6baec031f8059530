// crates/query-gate-core/src/executor.rs
// ============================================================================
// Module: Query Executor
// Description: Connection lifecycle, row streaming, and single settlement.
// Purpose: Run one statement against one backend and settle exactly once.
// Dependencies: async-trait, futures, crate::{builder, descriptor, outcome}
// ============================================================================

//! ## Overview
//! The executor drives the `Idle -> Connecting -> Executing -> Settled`
//! state machine for a single request. Backends plug in through
//! [`QueryBackend`] and [`BackendSession`]; a session reports its results as
//! a stream of [`BackendEvent`]s.
//! Invariants:
//! - [`SettlementGuard::settle`] succeeds once; later completion or error
//!   signals are discarded and leave the outcome unchanged.
//! - Once settled the row stream is not polled again.
//! - Panics anywhere in the pipeline settle `Failure(Unknown)`.
//!
//! Each call opens its own connection and drops it when done; there is no
//! pooling, retry, or timeout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use futures::StreamExt;
use futures::stream::BoxStream;

use crate::builder::BuiltStatement;
use crate::descriptor::ConnectionDescriptor;
use crate::outcome::ColumnMeta;
use crate::outcome::ErrorKind;
use crate::outcome::Failure;
use crate::outcome::FailureReason;
use crate::outcome::NativeValue;
use crate::outcome::OperationOutcome;
use crate::outcome::ResultRow;
use crate::outcome::convert_value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Caller-facing message for connection failures.
pub const CONNECTION_FAILED_MESSAGE: &str = "Connection error";
/// Caller-facing message for statement failures.
pub const SELECT_FAILED_MESSAGE: &str = "Select error";
/// Caller-facing message for unexpected failures.
pub const UNEXPECTED_FAILURE_MESSAGE: &str = "Unexpected exception occured";

// ============================================================================
// SECTION: Backend Interfaces
// ============================================================================

/// Items reported while a statement runs.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// Column metadata for the rows that follow.
    Columns(Vec<ColumnMeta>),
    /// One row of native values, in column order.
    Row(Vec<NativeValue>),
    /// The statement completed.
    Done {
        /// Row count reported by the server, when known.
        row_count: Option<u64>,
    },
}

/// Row event stream borrowed from a session.
pub type EventStream<'a> = BoxStream<'a, Result<BackendEvent, BackendError>>;

/// Database driver able to open connections from descriptors.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Opens a connection described by `descriptor`.
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn BackendSession>, BackendError>;
}

/// An open connection.
#[async_trait]
pub trait BackendSession: Send {
    /// Submits `statement` and returns its event stream.
    async fn execute<'a>(
        &'a mut self,
        statement: &BuiltStatement,
    ) -> Result<EventStream<'a>, BackendError>;
}

/// Backend failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The connection could not be established.
    #[error("connect failed: {0}")]
    Connect(String),
    /// The statement failed to run or stream.
    #[error("execute failed: {0}")]
    Execute(String),
}

impl BackendError {
    /// Returns the driver message without the stage prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Connect(message) | Self::Execute(message) => message,
        }
    }
}

// ============================================================================
// SECTION: Settlement
// ============================================================================

/// Executor lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Nothing started.
    Idle,
    /// Waiting for the connection.
    Connecting,
    /// Statement submitted, rows streaming.
    Executing,
    /// Outcome fixed; terminal.
    Settled,
}

/// Holds the lifecycle state and the single settled outcome.
///
/// # Invariants
/// - `outcome` is `Some` exactly when `state` is [`ExecutionState::Settled`].
/// - Settlement is terminal.
#[derive(Debug)]
pub struct SettlementGuard {
    /// Current state.
    state: ExecutionState,
    /// Settled outcome.
    outcome: Option<OperationOutcome>,
}

impl Default for SettlementGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl SettlementGuard {
    /// Creates an idle guard.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: ExecutionState::Idle,
            outcome: None,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> ExecutionState {
        self.state
    }

    /// Returns true once an outcome is fixed.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self.state, ExecutionState::Settled)
    }

    /// Moves `Idle -> Connecting`; returns false from any other state.
    pub fn begin_connect(&mut self) -> bool {
        self.advance(ExecutionState::Idle, ExecutionState::Connecting)
    }

    /// Moves `Connecting -> Executing`; returns false from any other state.
    pub fn begin_execute(&mut self) -> bool {
        self.advance(ExecutionState::Connecting, ExecutionState::Executing)
    }

    /// Fixes the outcome. Returns false, changing nothing, when already
    /// settled.
    pub fn settle(&mut self, outcome: OperationOutcome) -> bool {
        if self.is_settled() {
            return false;
        }
        self.state = ExecutionState::Settled;
        self.outcome = Some(outcome);
        true
    }

    /// Returns the settled outcome, if any.
    #[must_use]
    pub const fn outcome(&self) -> Option<&OperationOutcome> {
        self.outcome.as_ref()
    }

    /// Consumes the guard. An unsettled guard yields `Failure(Unknown)`.
    #[must_use]
    pub fn into_outcome(self) -> OperationOutcome {
        self.outcome.unwrap_or_else(|| {
            OperationOutcome::Failure(
                Failure::new(ErrorKind::Unknown, FailureReason::Panic, UNEXPECTED_FAILURE_MESSAGE)
                    .with_detail("executor finished without settling"),
            )
        })
    }

    /// Applies a transition when the guard is in `from`.
    fn advance(&mut self, from: ExecutionState, to: ExecutionState) -> bool {
        if self.state != from {
            return false;
        }
        self.state = to;
        true
    }
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Runs built statements against a backend.
pub struct QueryExecutor<'b> {
    /// Driver used to open connections.
    backend: &'b dyn QueryBackend,
}

impl<'b> QueryExecutor<'b> {
    /// Creates an executor over `backend`.
    #[must_use]
    pub const fn new(backend: &'b dyn QueryBackend) -> Self {
        Self {
            backend,
        }
    }

    /// Connects, executes `statement`, collects rows, and settles once.
    pub async fn execute(
        &self,
        descriptor: &ConnectionDescriptor,
        statement: &BuiltStatement,
    ) -> OperationOutcome {
        let mut guard = SettlementGuard::new();
        let run = AssertUnwindSafe(self.drive(&mut guard, descriptor, statement))
            .catch_unwind()
            .await;
        if let Err(payload) = run {
            guard.settle(OperationOutcome::Failure(
                Failure::new(ErrorKind::Unknown, FailureReason::Panic, UNEXPECTED_FAILURE_MESSAGE)
                    .with_detail(panic_detail(payload.as_ref())),
            ));
        }
        guard.into_outcome()
    }

    /// Drives the state machine until the guard settles.
    async fn drive(
        &self,
        guard: &mut SettlementGuard,
        descriptor: &ConnectionDescriptor,
        statement: &BuiltStatement,
    ) {
        guard.begin_connect();
        let mut session = match self.backend.connect(descriptor).await {
            Ok(session) => session,
            Err(err) => {
                guard.settle(OperationOutcome::Failure(
                    Failure::new(
                        ErrorKind::ConnectionError,
                        FailureReason::Connect,
                        CONNECTION_FAILED_MESSAGE,
                    )
                    .with_detail(err.message()),
                ));
                return;
            }
        };
        guard.begin_execute();
        let mut stream = match session.execute(statement).await {
            Ok(stream) => stream,
            Err(err) => {
                guard.settle(select_failure(&err));
                return;
            }
        };
        let mut collector = RowCollector::default();
        while !guard.is_settled() {
            match stream.next().await {
                None | Some(Ok(BackendEvent::Done { .. })) => {
                    guard.settle(OperationOutcome::Success(collector.take_rows()));
                }
                Some(Ok(BackendEvent::Columns(columns))) => collector.set_columns(columns),
                Some(Ok(BackendEvent::Row(values))) => {
                    if let Err(failure) = collector.push(values) {
                        guard.settle(OperationOutcome::Failure(failure));
                    }
                }
                Some(Err(err)) => {
                    guard.settle(select_failure(&err));
                }
            }
        }
    }
}

/// Builds the statement-level failure outcome.
fn select_failure(err: &BackendError) -> OperationOutcome {
    OperationOutcome::Failure(
        Failure::new(ErrorKind::ConnectionError, FailureReason::Execute, SELECT_FAILED_MESSAGE)
            .with_detail(err.message()),
    )
}

/// Renders a caught panic payload.
pub(crate) fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return format!("panic: {message}");
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return format!("panic: {message}");
    }
    "panic".to_string()
}

// ============================================================================
// SECTION: Row Collection
// ============================================================================

/// Accumulates converted rows in arrival order.
#[derive(Debug, Default)]
struct RowCollector {
    /// Metadata for the current result set.
    columns: Option<Vec<ColumnMeta>>,
    /// Converted rows.
    rows: Vec<ResultRow>,
}

impl RowCollector {
    /// Replaces the active column metadata.
    fn set_columns(&mut self, columns: Vec<ColumnMeta>) {
        self.columns = Some(columns);
    }

    /// Converts and appends one row.
    fn push(&mut self, values: Vec<NativeValue>) -> Result<(), Failure> {
        let Some(columns) = &self.columns else {
            return Err(malformed_row("row arrived before column metadata"));
        };
        if columns.len() != values.len() {
            return Err(malformed_row(&format!(
                "row has {} values for {} columns",
                values.len(),
                columns.len()
            )));
        }
        let mut row = ResultRow::new();
        for (column, value) in columns.iter().zip(values) {
            row.insert(column.name.clone(), convert_value(column.declared_type, value));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Takes the collected rows.
    fn take_rows(&mut self) -> Vec<ResultRow> {
        std::mem::take(&mut self.rows)
    }
}

/// Builds the failure for rows that disagree with their metadata.
fn malformed_row(detail: &str) -> Failure {
    Failure::new(ErrorKind::Unknown, FailureReason::MalformedRow, UNEXPECTED_FAILURE_MESSAGE)
        .with_detail(detail)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
