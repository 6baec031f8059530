// crates/query-gate-core/src/descriptor.rs
// ============================================================================
// Module: Connection Descriptor
// Description: Structured database connection configuration.
// Purpose: Parse stored connection entries and reject partial descriptors.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`ConnectionDescriptor`] is the JSON document stored in a connection
//! entry: server address, authentication mode plus credentials, and driver
//! options. A descriptor is only usable when it names a non-empty
//! authentication mode; anything else is treated as absent by the resolver.
//! Credentials never appear in `Debug` output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// SECTION: Descriptor Types
// ============================================================================

/// Connection configuration for one database backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDescriptor {
    /// Server host name or address.
    #[serde(default)]
    pub server: String,
    /// Authentication mode and credentials.
    #[serde(default)]
    pub authentication: Option<AuthenticationConfig>,
    /// Driver options.
    #[serde(default)]
    pub options: ConnectionOptions,
}

/// Authentication section of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthenticationConfig {
    /// Authentication mode (for example `default` or
    /// `azure-active-directory-access-token`).
    #[serde(rename = "type", default)]
    pub mode: String,
    /// Mode-specific credentials.
    #[serde(default)]
    pub options: AuthenticationOptions,
}

/// Credentials for an authentication mode.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    /// SQL login name.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Login password.
    #[serde(default)]
    pub password: Option<String>,
    /// Pre-acquired access token.
    #[serde(default)]
    pub token: Option<String>,
}

impl fmt::Debug for AuthenticationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationOptions")
            .field("user_name", &self.user_name)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Driver options section of a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionOptions {
    /// Initial database.
    #[serde(default)]
    pub database: Option<String>,
    /// TCP port (driver default when absent).
    #[serde(default)]
    pub port: Option<u16>,
    /// Whether the transport must be encrypted.
    #[serde(default)]
    pub encrypt: Option<bool>,
    /// Accept the server certificate without validation.
    #[serde(default)]
    pub trust_server_certificate: Option<bool>,
    /// Named instance on the server.
    #[serde(default)]
    pub instance_name: Option<String>,
    /// Application name reported to the server.
    #[serde(default)]
    pub app_name: Option<String>,
}

impl ConnectionDescriptor {
    /// Parses a stored entry and checks it is structurally valid.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] when the entry is not JSON of the expected
    /// shape or carries no authentication mode.
    pub fn parse(raw: &str) -> Result<Self, DescriptorError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|err| DescriptorError::Parse(err.to_string()))?;
        if !value.is_object() {
            return Err(DescriptorError::Parse("descriptor must be a JSON object".to_string()));
        }
        if value.get("authentication").is_some_and(|auth| !auth.is_object() && !auth.is_null()) {
            return Err(DescriptorError::Parse("authentication must be a JSON object".to_string()));
        }
        let descriptor: Self =
            serde_json::from_value(value).map_err(|err| DescriptorError::Parse(err.to_string()))?;
        if descriptor.auth_mode().is_none() {
            return Err(DescriptorError::MissingAuthMode);
        }
        Ok(descriptor)
    }

    /// Returns the authentication mode when it is present and non-empty.
    #[must_use]
    pub fn auth_mode(&self) -> Option<&str> {
        self.authentication
            .as_ref()
            .map(|auth| auth.mode.as_str())
            .filter(|mode| !mode.is_empty())
    }

    /// Returns the credentials section, or empty credentials when absent.
    #[must_use]
    pub fn credentials(&self) -> AuthenticationOptions {
        self.authentication.as_ref().map(|auth| auth.options.clone()).unwrap_or_default()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Reasons a stored entry does not yield a usable descriptor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    /// Entry is not valid descriptor JSON.
    #[error("descriptor parse error: {0}")]
    Parse(String),
    /// Entry lacks a non-empty authentication mode.
    #[error("descriptor has no authentication mode")]
    MissingAuthMode,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
