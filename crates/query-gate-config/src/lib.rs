// crates/query-gate-config/src/lib.rs
// ============================================================================
// Module: Query Gate Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for query-gate.toml semantics.
// Dependencies: query-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! `query-gate-config` defines the configuration model for the gateway
//! server: listener settings, connection entry naming, and audit logging.
//! Loading is strict and fail-closed; a missing default file yields the
//! built-in defaults.
//!
//! Security posture: config inputs are untrusted and size-limited.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuditConfig;
pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::ConnectionsConfig;
pub use config::DEFAULT_BIND;
pub use config::DEFAULT_CONFIG_NAME;
pub use config::DEFAULT_IDENTITY_HEADER;
pub use config::QueryGateConfig;
pub use config::ServerConfig;
pub use examples::config_toml_example;
