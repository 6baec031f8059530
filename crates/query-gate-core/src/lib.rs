// crates/query-gate-core/src/lib.rs
// ============================================================================
// Module: Query Gate Core
// Description: Tenant-routed, read-only SQL query pipeline.
// Purpose: Turn untrusted query parameters into one settled outcome.
// Dependencies: async-trait, base64, futures, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Query Gate accepts a projection, a dotted source, an optional filter, and
//! an optional row limit from an untrusted caller, rejects obviously
//! dangerous fragments, routes the caller to a tenant database, assembles a
//! single `SELECT`, and streams the rows back as JSON objects.
//! Invariants:
//! - Every request settles exactly once to [`OperationOutcome`].
//! - No configuration read or connection happens for rejected parameters.
//! - Database drivers plug in through [`QueryBackend`]; this crate performs
//!   no I/O of its own beyond the injected [`ConfigLookup`].
//!
//! Security posture: request parameters are untrusted and validated by a
//! substring denylist, which is a heuristic and not a SQL parser.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod builder;
pub mod descriptor;
pub mod executor;
pub mod gateway;
pub mod outcome;
pub mod resolver;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use builder::BuiltStatement;
pub use builder::RowLimit;
pub use builder::build_statement;
pub use builder::split_select;
pub use descriptor::AuthenticationConfig;
pub use descriptor::AuthenticationOptions;
pub use descriptor::ConnectionDescriptor;
pub use descriptor::ConnectionOptions;
pub use descriptor::DescriptorError;
pub use executor::BackendError;
pub use executor::BackendEvent;
pub use executor::BackendSession;
pub use executor::EventStream;
pub use executor::ExecutionState;
pub use executor::QueryBackend;
pub use executor::QueryExecutor;
pub use executor::SettlementGuard;
pub use gateway::ANONYMOUS_CALLER;
pub use gateway::GatewayReport;
pub use gateway::QueryGateway;
pub use gateway::RawQueryRequest;
pub use gateway::prepare_statement;
pub use outcome::ColumnMeta;
pub use outcome::DeclaredType;
pub use outcome::ErrorKind;
pub use outcome::Failure;
pub use outcome::FailureReason;
pub use outcome::NativeValue;
pub use outcome::OperationOutcome;
pub use outcome::ResultRow;
pub use outcome::USAGE_HINT;
pub use outcome::convert_value;
pub use resolver::ConfigLookup;
pub use resolver::ConnectionResolver;
pub use resolver::ProcessEnvLookup;
pub use resolver::ResolutionSource;
pub use resolver::ResolvedConnection;
pub use resolver::ResolverConfig;
pub use resolver::StaticLookup;
pub use resolver::tenant_key;
pub use validator::SafeFragment;
pub use validator::UnsafeFragment;
pub use validator::first_violation;
pub use validator::is_safe;
