// crates/query-gate-core/src/outcome.rs
// ============================================================================
// Module: Operation Outcome
// Description: Error taxonomy, result rows, and value conversion.
// Purpose: Define the single settled result handed to the request adapter.
// Dependencies: base64, serde, serde_json
// ============================================================================

//! ## Overview
//! Every request settles to exactly one [`OperationOutcome`]: a sequence of
//! [`ResultRow`]s or a [`Failure`]. Failures carry a coarse, externally
//! visible [`ErrorKind`] plus a finer internal [`FailureReason`] so that
//! rejections sharing an external code (source vs. filter) stay
//! distinguishable in audit logs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde_json::Map;
use serde_json::Number;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Usage hint attached to every failure response.
pub const USAGE_HINT: &str =
    "Supported parameters: ?select=FirstName,LastName&top=20&from=SalesLT.Customer";

// ============================================================================
// SECTION: Error Taxonomy
// ============================================================================

/// Externally visible failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Any unexpected failure.
    Unknown,
    /// The required source identifier is absent.
    MissingFromParameter,
    /// A projection column failed validation.
    InvalidSelectColumns,
    /// The source identifier or the filter failed validation.
    InvalidFrom,
    /// No connection descriptor resolved for the caller.
    MissingConnection,
    /// Connecting or executing the statement failed.
    ConnectionError,
}

impl ErrorKind {
    /// Returns the numeric code reported to callers.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Unknown => -1,
            Self::MissingFromParameter => 101,
            Self::InvalidSelectColumns => 102,
            Self::InvalidFrom => 103,
            Self::MissingConnection => 200,
            Self::ConnectionError => 201,
        }
    }

    /// Returns a stable label for audit logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::MissingFromParameter => "missing_from_parameter",
            Self::InvalidSelectColumns => "invalid_select_columns",
            Self::InvalidFrom => "invalid_from",
            Self::MissingConnection => "missing_connection",
            Self::ConnectionError => "connection_error",
        }
    }
}

/// Internal cause of a failure; never shown to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The request parameters could not be decoded.
    MalformedQuery,
    /// A select column matched the denylist.
    UnsafeColumn,
    /// The `from` parameter was absent or empty.
    MissingSource,
    /// The source identifier matched the denylist.
    UnsafeSource,
    /// The filter clause matched the denylist.
    UnsafeFilter,
    /// Neither tenant nor default entry produced a descriptor.
    NoDescriptor,
    /// The backend refused or failed the connection.
    Connect,
    /// The backend failed the statement or the row stream.
    Execute,
    /// The backend produced rows inconsistent with its column metadata.
    MalformedRow,
    /// A panic was caught inside the pipeline.
    Panic,
}

/// A settled failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// External error kind.
    pub kind: ErrorKind,
    /// Internal cause.
    pub reason: FailureReason,
    /// Message returned to the caller.
    pub message: String,
    /// Internal detail (driver text, matched pattern) for audit only.
    pub detail: Option<String>,
}

impl Failure {
    /// Creates a failure without internal detail.
    #[must_use]
    pub fn new(kind: ErrorKind, reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            kind,
            reason,
            message: message.into(),
            detail: None,
        }
    }

    /// Attaches internal detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ============================================================================
// SECTION: Rows
// ============================================================================

/// One result row: column name to JSON value, in column order.
///
/// A later column with a duplicate name replaces the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultRow(Map<String, Value>);

impl ResultRow {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Sets a column value.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.0.insert(column.into(), value);
    }

    /// Returns a column value.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Returns the column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Final result of one request.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    /// Rows in database return order.
    Success(Vec<ResultRow>),
    /// The request failed.
    Failure(Failure),
}

impl OperationOutcome {
    /// Returns the failure, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }

    /// Returns the row count for successful outcomes.
    #[must_use]
    pub fn row_count(&self) -> Option<usize> {
        match self {
            Self::Success(rows) => Some(rows.len()),
            Self::Failure(_) => None,
        }
    }
}

// ============================================================================
// SECTION: Value Conversion
// ============================================================================

/// Declared column type, as far as conversion cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredType {
    /// Variable-length binary (`varbinary`); re-encoded as base64 text.
    VarBinary,
    /// Fixed-length or legacy binary (`binary`, `image`).
    Binary,
    /// Any other type; values pass through.
    Other,
}

/// Column metadata reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Column name.
    pub name: String,
    /// Declared type class.
    pub declared_type: DeclaredType,
}

impl ColumnMeta {
    /// Creates column metadata.
    #[must_use]
    pub fn new(name: impl Into<String>, declared_type: DeclaredType) -> Self {
        Self {
            name: name.into(),
            declared_type,
        }
    }
}

/// A native value as produced by a backend driver.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    /// SQL NULL.
    Null,
    /// Bit value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value (including rendered temporal, GUID, and XML values).
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

/// Converts one native value according to its declared column type.
///
/// `varbinary` bytes become standard base64 text; other binary columns become
/// arrays of byte values; non-finite floats become null.
#[must_use]
pub fn convert_value(declared_type: DeclaredType, value: NativeValue) -> Value {
    match (declared_type, value) {
        (_, NativeValue::Null) => Value::Null,
        (DeclaredType::VarBinary, NativeValue::Bytes(bytes)) => Value::String(STANDARD.encode(bytes)),
        (_, NativeValue::Bytes(bytes)) => {
            Value::Array(bytes.into_iter().map(Value::from).collect())
        }
        (_, NativeValue::Bool(value)) => Value::Bool(value),
        (_, NativeValue::Int(value)) => Value::from(value),
        (_, NativeValue::Float(value)) => Number::from_f64(value).map_or(Value::Null, Value::Number),
        (_, NativeValue::Text(value)) => Value::String(value),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
