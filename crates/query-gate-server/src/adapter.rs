// crates/query-gate-server/src/adapter.rs
// ============================================================================
// Module: Request Adapter
// Description: HTTP request and response mapping for the gateway.
// Purpose: Extract caller identity and parameters; shape response bodies.
// Dependencies: axum, query-gate-core, serde, serde_json
// ============================================================================

//! ## Overview
//! The adapter is the only place that knows about HTTP. It reads the caller
//! identity from a configured header, takes `select`, `top`, `from`, and
//! `where` from the query string, and maps the settled outcome to a status
//! code and JSON body:
//! - success: `200 {"data": [...], "user": "<caller>"}`
//! - failure: `400 {"code": n, "message": "...", "help": "<usage hint>"}`
//!
//! Internal failure detail never reaches the response body.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::http::HeaderMap;
use axum::http::StatusCode;
use query_gate_core::OperationOutcome;
use query_gate_core::RawQueryRequest;
use query_gate_core::ResultRow;
use query_gate_core::USAGE_HINT;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Request
// ============================================================================

/// Query-string parameters accepted by the query endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QueryParams {
    /// Comma-separated column list.
    #[serde(default)]
    pub select: Option<String>,
    /// Row limit.
    #[serde(default)]
    pub top: Option<String>,
    /// Dotted source identifier.
    #[serde(default)]
    pub from: Option<String>,
    /// Raw predicate.
    #[serde(default, rename = "where")]
    pub filter: Option<String>,
}

/// Reads the caller identity header.
///
/// Absent, empty, and non-text values yield `None`; the gateway then runs
/// the request as the anonymous caller.
#[must_use]
pub fn caller_identity(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Builds the gateway request from HTTP inputs.
#[must_use]
pub fn to_request(caller: Option<&str>, params: &QueryParams) -> RawQueryRequest {
    RawQueryRequest::from_params(
        caller,
        params.select.as_deref(),
        params.top.as_deref(),
        params.from.as_deref(),
        params.filter.as_deref(),
    )
}

// ============================================================================
// SECTION: Response
// ============================================================================

/// Success response body.
#[derive(Debug, Serialize)]
pub struct SuccessBody<'a> {
    /// Rows in database order.
    pub data: &'a [ResultRow],
    /// Caller identity the query ran as.
    pub user: &'a str,
}

/// Failure response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    /// Numeric error code.
    pub code: i32,
    /// Caller-facing message.
    pub message: &'a str,
    /// Usage hint.
    pub help: &'static str,
}

/// Maps a settled outcome to a status code and JSON body.
#[must_use]
pub fn render(outcome: &OperationOutcome, caller: &str) -> (StatusCode, Value) {
    let body = match outcome {
        OperationOutcome::Success(rows) => serde_json::to_value(SuccessBody {
            data: rows,
            user: caller,
        }),
        OperationOutcome::Failure(failure) => serde_json::to_value(ErrorBody {
            code: failure.kind.code(),
            message: &failure.message,
            help: USAGE_HINT,
        }),
    };
    match (outcome, body) {
        (OperationOutcome::Success(_), Ok(body)) => (StatusCode::OK, body),
        (OperationOutcome::Failure(_), Ok(body)) => (StatusCode::BAD_REQUEST, body),
        (_, Err(_)) => (StatusCode::BAD_REQUEST, serialization_failure()),
    }
}

/// Body used when a response cannot be serialized.
fn serialization_failure() -> Value {
    serde_json::json!({
        "code": query_gate_core::ErrorKind::Unknown.code(),
        "message": query_gate_core::executor::UNEXPECTED_FAILURE_MESSAGE,
        "help": USAGE_HINT,
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use axum::http::HeaderMap;
    use axum::http::HeaderValue;
    use axum::http::StatusCode;
    use query_gate_core::ErrorKind;
    use query_gate_core::Failure;
    use query_gate_core::FailureReason;
    use query_gate_core::OperationOutcome;
    use query_gate_core::ResultRow;
    use serde_json::json;

    use super::caller_identity;
    use super::render;

    #[test]
    fn identity_header_is_optional() {
        let mut headers = HeaderMap::new();
        assert_eq!(caller_identity(&headers, "x-ms-client-principal-name"), None);
        headers.insert("x-ms-client-principal-name", HeaderValue::from_static(""));
        assert_eq!(caller_identity(&headers, "x-ms-client-principal-name"), None);
        headers.insert("x-ms-client-principal-name", HeaderValue::from_static("a@b.com"));
        assert_eq!(
            caller_identity(&headers, "x-ms-client-principal-name").as_deref(),
            Some("a@b.com")
        );
    }

    #[test]
    fn success_renders_data_and_user() {
        let mut row = ResultRow::new();
        row.insert("Name", json!("Bob"));
        let (status, body) = render(&OperationOutcome::Success(vec![row]), "a@b.com");
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"data": [{"Name": "Bob"}], "user": "a@b.com"}));
    }

    #[test]
    fn failure_renders_code_message_and_help_without_detail() {
        let failure =
            Failure::new(ErrorKind::ConnectionError, FailureReason::Connect, "Connection error")
                .with_detail("login failed for user 'sa'");
        let (status, body) = render(&OperationOutcome::Failure(failure), "a@b.com");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({
                "code": 201,
                "message": "Connection error",
                "help": "Supported parameters: ?select=FirstName,LastName&top=20&from=SalesLT.Customer"
            })
        );
    }
}
