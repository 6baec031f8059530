// crates/query-gate-mssql/src/backend.rs
// ============================================================================
// Module: SQL Server Backend
// Description: TDS connections and statement streaming via tiberius.
// Purpose: Implement the gateway backend interfaces for SQL Server.
// Dependencies: async-trait, futures, tiberius, tokio, tokio-util
// ============================================================================

//! ## Overview
//! Each [`MssqlBackend::connect`] call opens one TCP connection and logs in;
//! sessions are never pooled or reused. Azure SQL gateway redirects are
//! followed once. Statements run through the simple-query path, so the
//! text is sent as-is without parameter binding.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use futures::StreamExt;
use query_gate_core::BackendError;
use query_gate_core::BackendEvent;
use query_gate_core::BackendSession;
use query_gate_core::BuiltStatement;
use query_gate_core::ConnectionDescriptor;
use query_gate_core::EventStream;
use query_gate_core::QueryBackend;
use tiberius::Client;
use tiberius::Config;
use tiberius::QueryItem;
use tiberius::SqlBrowser;
use tokio::net::TcpStream;
use tokio_util::compat::Compat;
use tokio_util::compat::TokioAsyncWriteCompatExt;

use crate::config::tds_config;
use crate::values::column_meta;
use crate::values::row_values;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Client over a tokio TCP stream.
type TdsClient = Client<Compat<TcpStream>>;

/// SQL Server backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlBackend;

impl MssqlBackend {
    /// Creates the backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl QueryBackend for MssqlBackend {
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn BackendSession>, BackendError> {
        let config = tds_config(descriptor).map_err(|err| BackendError::Connect(err.to_string()))?;
        let client = open_client(config).await?;
        Ok(Box::new(MssqlSession {
            client,
        }))
    }
}

/// One open SQL Server connection.
struct MssqlSession {
    /// Logged-in client.
    client: TdsClient,
}

#[async_trait]
impl BackendSession for MssqlSession {
    async fn execute<'a>(
        &'a mut self,
        statement: &BuiltStatement,
    ) -> Result<EventStream<'a>, BackendError> {
        let stream = self
            .client
            .simple_query(statement.sql().to_string())
            .await
            .map_err(|err| BackendError::Execute(err.to_string()))?;
        let events = stream.map(|item| match item {
            Ok(QueryItem::Metadata(metadata)) => {
                Ok(BackendEvent::Columns(column_meta(metadata.columns())))
            }
            Ok(QueryItem::Row(row)) => row_values(row).map(BackendEvent::Row),
            Err(err) => Err(BackendError::Execute(err.to_string())),
        });
        Ok(events.boxed())
    }
}

// ============================================================================
// SECTION: Connection
// ============================================================================

/// Connects and logs in, following one routing redirect.
async fn open_client(config: Config) -> Result<TdsClient, BackendError> {
    let client = match connect_once(config.clone()).await {
        Err(tiberius::error::Error::Routing {
            host,
            port,
        }) => {
            let mut redirected = config;
            redirected.host(&host);
            redirected.port(port);
            connect_once(redirected).await
        }
        other => other,
    };
    client.map_err(|err| BackendError::Connect(err.to_string()))
}

/// Opens the TCP stream and performs the TDS login.
///
/// Named instances resolve their TCP port through the SQL Server Browser
/// before the stream is opened.
async fn connect_once(config: Config) -> Result<TdsClient, tiberius::error::Error> {
    let tcp = TcpStream::connect_named(&config).await?;
    tcp.set_nodelay(true)?;
    Client::connect(config, tcp.compat_write()).await
}
