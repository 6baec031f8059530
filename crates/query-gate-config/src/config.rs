// crates/query-gate-config/src/config.rs
// ============================================================================
// Module: Query Gate Configuration
// Description: Configuration loading and validation for the gateway.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: query-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, else [`CONFIG_ENV_VAR`], else
//! [`DEFAULT_CONFIG_NAME`]. Only the last case tolerates a missing file.
//! Unknown keys and out-of-range values are rejected.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use query_gate_core::ResolverConfig;
use query_gate_core::resolver::DEFAULT_ENTRY_PREFIX;
use query_gate_core::resolver::DEFAULT_MAX_ENTRY_BYTES;
use query_gate_core::resolver::DEFAULT_TENANT_KEY;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "query-gate.toml";
/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "QUERY_GATE_CONFIG";
/// Default listener address.
pub const DEFAULT_BIND: &str = "127.0.0.1:7071";
/// Default header carrying the authenticated caller identity.
pub const DEFAULT_IDENTITY_HEADER: &str = "x-ms-client-principal-name";
/// Maximum configuration file size.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of one path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum header name length.
const MAX_HEADER_NAME_LENGTH: usize = 256;
/// Maximum entry prefix length.
const MAX_ENTRY_PREFIX_LENGTH: usize = 128;
/// Maximum default key length.
const MAX_DEFAULT_KEY_LENGTH: usize = 256;
/// Upper bound for `connections.max_entry_bytes`.
const MAX_ENTRY_BYTES_LIMIT: usize = 1024 * 1024;

// ============================================================================
// SECTION: Configuration Model
// ============================================================================

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryGateConfig {
    /// HTTP listener configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Connection entry naming.
    #[serde(default)]
    pub connections: ConnectionsConfig,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Request header holding the caller identity.
    #[serde(default = "default_identity_header")]
    pub identity_header: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            identity_header: default_identity_header(),
        }
    }
}

impl ServerConfig {
    /// Validates listener settings.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        let header = self.identity_header.as_str();
        if header.is_empty() || header.len() > MAX_HEADER_NAME_LENGTH {
            return Err(ConfigError::Invalid(
                "server.identity_header must be 1..=256 bytes".to_string(),
            ));
        }
        if !header.bytes().all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-') {
            return Err(ConfigError::Invalid(
                "server.identity_header must be a lower-case header name".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }
}

/// Connection entry naming and limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionsConfig {
    /// Prefix for connection entry names.
    #[serde(default = "default_env_prefix")]
    pub env_prefix: String,
    /// Fallback tenant key.
    #[serde(default = "default_key")]
    pub default_key: String,
    /// Entries larger than this are ignored.
    #[serde(default = "default_max_entry_bytes")]
    pub max_entry_bytes: usize,
}

impl Default for ConnectionsConfig {
    fn default() -> Self {
        Self {
            env_prefix: default_env_prefix(),
            default_key: default_key(),
            max_entry_bytes: default_max_entry_bytes(),
        }
    }
}

impl ConnectionsConfig {
    /// Validates entry naming.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_entry_token("connections.env_prefix", &self.env_prefix, MAX_ENTRY_PREFIX_LENGTH)?;
        validate_entry_token("connections.default_key", &self.default_key, MAX_DEFAULT_KEY_LENGTH)?;
        if self.max_entry_bytes == 0 || self.max_entry_bytes > MAX_ENTRY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "connections.max_entry_bytes must be between 1 and {MAX_ENTRY_BYTES_LIMIT}"
            )));
        }
        Ok(())
    }

    /// Returns the resolver naming policy.
    #[must_use]
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            entry_prefix: self.env_prefix.clone(),
            default_key: self.default_key.clone(),
            max_entry_bytes: self.max_entry_bytes,
        }
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Emit one audit event per request.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Append events to this file instead of stderr.
    #[serde(default)]
    pub path: Option<String>,
    /// Include the built statement text in events.
    #[serde(default)]
    pub log_statements: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
            log_statements: false,
        }
    }
}

impl AuditConfig {
    /// Validates the audit sink settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

impl QueryGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = match fs::read(&resolved) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound && !explicit => {
                let mut config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(err) => return Err(ConfigError::Io(err.to_string())),
        };
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.server.bind = self.server.bind.trim().to_string();
        self.server.validate()?;
        self.connections.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Default listener address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default identity header.
fn default_identity_header() -> String {
    DEFAULT_IDENTITY_HEADER.to_string()
}

/// Default entry prefix.
fn default_env_prefix() -> String {
    DEFAULT_ENTRY_PREFIX.to_string()
}

/// Default fallback tenant key.
fn default_key() -> String {
    DEFAULT_TENANT_KEY.to_string()
}

/// Default entry size limit.
const fn default_max_entry_bytes() -> usize {
    DEFAULT_MAX_ENTRY_BYTES
}

/// Audit logging is on unless disabled.
const fn default_audit_enabled() -> bool {
    true
}

/// Resolves the config path; the flag is true when it was requested
/// explicitly.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an entry-name token: non-empty, bounded, `[A-Za-z0-9_]`.
fn validate_entry_token(field: &str, value: &str, max_len: usize) -> Result<(), ConfigError> {
    if value.is_empty() || value.len() > max_len {
        return Err(ConfigError::Invalid(format!("{field} must be 1..={max_len} bytes")));
    }
    if !value.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'_') {
        return Err(ConfigError::Invalid(format!(
            "{field} may only contain ASCII letters, digits, and underscores"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
