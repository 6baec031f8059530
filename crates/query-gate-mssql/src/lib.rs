// crates/query-gate-mssql/src/lib.rs
// ============================================================================
// Module: Query Gate MSSQL
// Description: SQL Server backend for the query gateway.
// Purpose: Open TDS connections from descriptors and stream typed rows.
// Dependencies: query-gate-core, tiberius, tokio, tokio-util, chrono
// ============================================================================

//! ## Overview
//! [`MssqlBackend`] implements [`query_gate_core::QueryBackend`] on top of
//! `tiberius`. Descriptor fields map onto the driver configuration in
//! [`config`]; driver cells map onto native values in [`values`].
//! Invariants:
//! - One connection per request; nothing is pooled.
//! - Variable-length binary columns are reported as
//!   [`query_gate_core::DeclaredType::VarBinary`].
//!
//! Security posture: credentials flow from the descriptor straight into the
//! driver and are never logged.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod backend;
pub mod config;
pub mod values;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use backend::MssqlBackend;
pub use config::MappingError;
pub use config::tds_config;
