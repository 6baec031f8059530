// crates/query-gate-core/tests/gateway_pipeline.rs
// ============================================================================
// Module: Gateway Pipeline Tests
// Description: End-to-end request scenarios through validation and routing.
// Purpose: Ensure check ordering and that rejected requests never connect.
// ============================================================================

//! Gateway pipeline tests with a static lookup and a scripted backend.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::sync::Arc;

use common::ScriptedBackend;
use common::customer_events;
use common::descriptor_json;
use query_gate_core::ConnectionResolver;
use query_gate_core::ErrorKind;
use query_gate_core::FailureReason;
use query_gate_core::GatewayReport;
use query_gate_core::QueryGateway;
use query_gate_core::RawQueryRequest;
use query_gate_core::ResolutionSource;
use query_gate_core::ResolverConfig;
use query_gate_core::StaticLookup;

fn lookup() -> StaticLookup {
    StaticLookup::new()
        .with_entry("SQLAZURECONNSTR_AdventureWorks", descriptor_json("default.db"))
        .with_entry("SQLAZURECONNSTR_tenant_example_com", descriptor_json("tenant.db"))
}

async fn run(
    lookup: StaticLookup,
    request: RawQueryRequest,
) -> (GatewayReport, Arc<ScriptedBackend>) {
    let backend = Arc::new(ScriptedBackend::events(customer_events()));
    let resolver = ConnectionResolver::new(lookup, ResolverConfig::default());
    let gateway = QueryGateway::new(resolver, backend.clone());
    (gateway.run(request).await, backend)
}

fn request(caller: Option<&str>, select: Option<&str>, from: Option<&str>) -> RawQueryRequest {
    RawQueryRequest::from_params(caller, select, Some("20"), from, None)
}

#[tokio::test]
async fn tenant_request_runs_built_statement_on_tenant_database() {
    let (report, backend) = run(
        lookup(),
        request(Some("alice@tenant.example.com"), Some("FirstName,LastName"), Some("SalesLT.Customer")),
    )
    .await;
    assert_eq!(report.outcome.row_count(), Some(2));
    assert_eq!(report.resolution, Some(ResolutionSource::Tenant));
    assert_eq!(report.entry_name.as_deref(), Some("SQLAZURECONNSTR_tenant_example_com"));
    assert_eq!(report.tenant_key.as_deref(), Some("tenant_example_com"));
    assert_eq!(backend.servers(), vec!["tenant.db"]);
    assert_eq!(
        backend.statements(),
        vec!["SELECT TOP (20)  [FirstName],[LastName] FROM [SalesLT].[Customer]"]
    );
}

#[tokio::test]
async fn anonymous_request_uses_default_entry() {
    let (report, backend) = run(lookup(), request(None, None, Some("SalesLT.Customer"))).await;
    assert_eq!(report.caller, "Anonymous user");
    assert_eq!(report.tenant_key, None);
    assert_eq!(report.resolution, Some(ResolutionSource::Default));
    assert_eq!(backend.servers(), vec!["default.db"]);
}

#[tokio::test]
async fn unknown_tenant_falls_back_to_default() {
    let (report, backend) =
        run(lookup(), request(Some("bob@other.org"), None, Some("dbo.T"))).await;
    assert_eq!(report.resolution, Some(ResolutionSource::Default));
    assert_eq!(backend.servers(), vec!["default.db"]);
}

#[tokio::test]
async fn invalid_tenant_entry_falls_back_to_default() {
    let lookup = lookup().with_entry("SQLAZURECONNSTR_broken_org", r#"{"server":"x"}"#);
    let (report, backend) = run(lookup, request(Some("eve@broken.org"), None, Some("dbo.T"))).await;
    assert_eq!(report.resolution, Some(ResolutionSource::Default));
    assert_eq!(backend.servers(), vec!["default.db"]);
}

#[tokio::test]
async fn missing_source_fails_before_connecting() {
    let (report, backend) = run(lookup(), request(None, Some("Name"), None)).await;
    let failure = report.outcome.failure().unwrap();
    assert_eq!(failure.kind, ErrorKind::MissingFromParameter);
    assert_eq!(failure.kind.code(), 101);
    assert_eq!(failure.message, "Missing from parameter for query");
    assert_eq!(backend.connects(), 0);
}

#[tokio::test]
async fn dangerous_source_is_rejected_before_building() {
    let (report, backend) =
        run(lookup(), request(None, None, Some("Customer;DROP TABLE x"))).await;
    let failure = report.outcome.failure().unwrap();
    assert_eq!(failure.kind, ErrorKind::InvalidFrom);
    assert_eq!(failure.reason, FailureReason::UnsafeSource);
    assert_eq!(failure.message, "From contains a potentially dangerous value");
    assert!(report.statement.is_none());
    assert_eq!(backend.connects(), 0);
}

#[tokio::test]
async fn dangerous_filter_shares_code_but_keeps_reason() {
    let request = RawQueryRequest::from_params(
        None,
        None,
        None,
        Some("dbo.T"),
        Some("1=1; WAITFOR DELAY '0:0:5'"),
    );
    let (report, backend) = run(lookup(), request).await;
    let failure = report.outcome.failure().unwrap();
    assert_eq!(failure.kind, ErrorKind::InvalidFrom);
    assert_eq!(failure.reason, FailureReason::UnsafeFilter);
    assert_eq!(failure.message, "Where contains a potentially dangerous value");
    assert_eq!(backend.connects(), 0);
}

#[tokio::test]
async fn dangerous_column_wins_over_missing_source() {
    let (report, _) = run(lookup(), request(None, Some("a,b]--"), None)).await;
    let failure = report.outcome.failure().unwrap();
    assert_eq!(failure.kind, ErrorKind::InvalidSelectColumns);
    assert_eq!(failure.kind.code(), 102);
    assert_eq!(failure.message, "Select columns contains a potentially dangerous value");
}

#[tokio::test]
async fn no_configuration_settles_missing_connection() {
    let (report, backend) =
        run(StaticLookup::new(), request(Some("alice@tenant.example.com"), None, Some("dbo.T")))
            .await;
    let failure = report.outcome.failure().unwrap();
    assert_eq!(failure.kind, ErrorKind::MissingConnection);
    assert_eq!(failure.kind.code(), 200);
    assert_eq!(failure.message, "Could not find a connection configuration");
    assert_eq!(backend.connects(), 0);
}

#[tokio::test]
async fn filter_is_appended_verbatim() {
    let request = RawQueryRequest::from_params(
        None,
        Some("Name"),
        None,
        Some("dbo.T"),
        Some("Id > 5 AND Name = 'x'"),
    );
    let (report, backend) = run(lookup(), request).await;
    assert_eq!(report.outcome.row_count(), Some(2));
    assert_eq!(backend.statements(), vec!["SELECT [Name] FROM [dbo].[T] WHERE Id > 5 AND Name = 'x'"]);
}
