// crates/query-gate-mssql/tests/connect_failures.rs
// ============================================================================
// Module: MSSQL Connect Failure Tests
// Description: Connection failures surface as backend connect errors.
// Purpose: Ensure bad descriptors and unreachable servers fail closed.
// ============================================================================

//! Connection failure tests for the SQL Server backend.

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

use query_gate_core::BackendError;
use query_gate_core::ConnectionDescriptor;
use query_gate_core::ErrorKind;
use query_gate_core::QueryBackend;
use query_gate_core::QueryExecutor;
use query_gate_core::SafeFragment;
use query_gate_core::build_statement;
use query_gate_mssql::MssqlBackend;
use tokio::net::TcpListener;
use tokio::net::UdpSocket;

async fn connect_error(raw: &str) -> BackendError {
    let descriptor = ConnectionDescriptor::parse(raw).unwrap();
    match MssqlBackend::new().connect(&descriptor).await {
        Ok(_) => panic!("expected connect failure"),
        Err(err) => err,
    }
}

/// Returns a loopback port with nothing listening on it.
async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

#[tokio::test]
async fn unsupported_mode_fails_before_io() {
    let err = connect_error(r#"{"server":"db","authentication":{"type":"kerberos"}}"#).await;
    assert_eq!(
        err,
        BackendError::Connect("unsupported authentication mode: kerberos".to_string())
    );
}

#[tokio::test]
async fn refused_connection_is_a_connect_error() {
    let port = closed_port().await;
    let raw = format!(
        r#"{{"server":"127.0.0.1","authentication":{{"type":"default",
            "options":{{"userName":"u","password":"p"}}}},"options":{{"port":{port}}}}}"#
    );
    assert!(matches!(connect_error(&raw).await, BackendError::Connect(_)));
}

#[tokio::test]
async fn executor_maps_refused_connection_to_connection_error() {
    let port = closed_port().await;
    let raw = format!(
        r#"{{"server":"127.0.0.1","authentication":{{"type":"default",
            "options":{{"userName":"u","password":"p"}}}},"options":{{"port":{port}}}}}"#
    );
    let descriptor = ConnectionDescriptor::parse(&raw).unwrap();
    let source = SafeFragment::new("dbo.T").unwrap();
    let statement = build_statement(None, &[], &source, None);
    let backend = MssqlBackend::new();
    let outcome = QueryExecutor::new(&backend).execute(&descriptor, &statement).await;
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.kind, ErrorKind::ConnectionError);
    assert_eq!(failure.message, "Connection error");
}

#[tokio::test]
async fn named_instance_resolves_port_through_browser() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let tds_port = listener.local_addr().unwrap().port();
    let browser = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let browser_port = browser.local_addr().unwrap().port();

    let browser_task = tokio::spawn(async move {
        let mut buf = [0u8; 256];
        let (len, peer) = browser.recv_from(&mut buf).await.unwrap();
        let request = buf[1..len].to_vec();
        let reply = format!(
            "ServerName;HOST;InstanceName;SQLEXPRESS;IsClustered;No;Version;16.0;tcp;{tds_port};;"
        );
        let mut datagram = vec![0x05, 0x00, 0x00];
        datagram.extend_from_slice(reply.as_bytes());
        browser.send_to(&datagram, peer).await.unwrap();
        request
    });
    let accept_task = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);
    });

    let raw = format!(
        r#"{{"server":"127.0.0.1","authentication":{{"type":"default",
            "options":{{"userName":"u","password":"p"}}}},
            "options":{{"port":{browser_port},"instanceName":"SQLEXPRESS"}}}}"#
    );
    let err = connect_error(&raw).await;
    assert!(matches!(err, BackendError::Connect(_)));

    let request = browser_task.await.unwrap();
    assert_eq!(request, b"SQLEXPRESS".to_vec());
    accept_task.await.unwrap();
}
