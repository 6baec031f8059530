// crates/query-gate-cli/src/serve_policy.rs
// ============================================================================
// Module: Serve Policy
// Description: Network exposure policy checks for the CLI server launcher.
// Purpose: Enforce loopback-by-default bind behavior with explicit opt-in.
// Dependencies: query-gate-config, thiserror
// ============================================================================

//! ## Overview
//! The gateway trusts the identity header it is given, so it must only be
//! reachable through the fronting platform. The policy is fail-closed:
//! binding a non-loopback address requires the `--allow-non-loopback` flag
//! or [`ALLOW_NON_LOOPBACK_ENV`].

use std::env;
use std::net::SocketAddr;

use query_gate_config::QueryGateConfig;

/// Environment variable enabling non-loopback server binds.
pub const ALLOW_NON_LOOPBACK_ENV: &str = "QUERY_GATE_ALLOW_NON_LOOPBACK";

/// Bind outcome metadata for startup warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindOutcome {
    /// Socket address to bind.
    pub bind_addr: SocketAddr,
    /// True when the address is not loopback.
    pub network_exposed: bool,
    /// Whether audit logging is enabled.
    pub audit_enabled: bool,
}

/// Serve policy failures for bind safety.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServePolicyError {
    /// Environment variable was set to an invalid value.
    #[error("invalid QUERY_GATE_ALLOW_NON_LOOPBACK value: {value}")]
    InvalidEnv {
        /// Raw environment value.
        value: String,
    },
    /// Bind string failed to parse.
    #[error("invalid bind address {bind}: {error}")]
    InvalidBind {
        /// Raw bind value.
        bind: String,
        /// Parse error message.
        error: String,
    },
    /// Non-loopback binding requires explicit opt-in.
    #[error(
        "refusing to bind {bind}: non-loopback binds require --allow-non-loopback or \
         QUERY_GATE_ALLOW_NON_LOOPBACK=1"
    )]
    NonLoopbackOptInRequired {
        /// Bind address.
        bind: String,
    },
}

/// Resolves the non-loopback opt-in flag from CLI and environment.
///
/// # Errors
/// Returns [`ServePolicyError::InvalidEnv`] when the environment value is invalid.
pub fn resolve_allow_non_loopback(flag: bool) -> Result<bool, ServePolicyError> {
    if flag {
        return Ok(true);
    }
    let Some(value) = env::var_os(ALLOW_NON_LOOPBACK_ENV) else {
        return Ok(false);
    };
    let value = value.to_string_lossy().to_string();
    parse_allow_non_loopback_value(&value)
}

/// Checks the configured bind address against the exposure policy.
///
/// # Errors
/// Returns [`ServePolicyError`] when the bind is invalid or not permitted.
pub fn enforce_bind_policy(
    config: &QueryGateConfig,
    allow_non_loopback: bool,
) -> Result<BindOutcome, ServePolicyError> {
    let bind = config.server.bind.trim();
    let bind_addr: SocketAddr =
        bind.parse().map_err(|err: std::net::AddrParseError| ServePolicyError::InvalidBind {
            bind: bind.to_string(),
            error: err.to_string(),
        })?;
    let network_exposed = !bind_addr.ip().is_loopback();
    if network_exposed && !allow_non_loopback {
        return Err(ServePolicyError::NonLoopbackOptInRequired {
            bind: bind.to_string(),
        });
    }
    Ok(BindOutcome {
        bind_addr,
        network_exposed,
        audit_enabled: config.audit.enabled,
    })
}

/// Parses a bool-ish string (true/false/1/0/yes/no/on/off).
fn parse_boolish(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Parses an env value for allow-non-loopback.
fn parse_allow_non_loopback_value(value: &str) -> Result<bool, ServePolicyError> {
    parse_boolish(value).ok_or_else(|| ServePolicyError::InvalidEnv {
        value: value.to_string(),
    })
}
