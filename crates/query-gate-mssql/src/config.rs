// crates/query-gate-mssql/src/config.rs
// ============================================================================
// Module: TDS Configuration Mapping
// Description: Connection descriptor to tiberius client configuration.
// Purpose: Translate stored descriptors into driver settings.
// Dependencies: query-gate-core, thiserror, tiberius
// ============================================================================

//! ## Overview
//! Maps a [`ConnectionDescriptor`] onto a [`tiberius::Config`]. Two
//! authentication modes are supported: `default` (SQL login with user name
//! and password) and `azure-active-directory-access-token`. Any other mode
//! fails the connection attempt.

// ============================================================================
// SECTION: Imports
// ============================================================================

use query_gate_core::ConnectionDescriptor;
use tiberius::AuthMethod;
use tiberius::Config;
use tiberius::EncryptionLevel;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Authentication mode for SQL logins.
pub const SQL_LOGIN_MODE: &str = "default";
/// Authentication mode for pre-acquired Entra ID access tokens.
pub const ACCESS_TOKEN_MODE: &str = "azure-active-directory-access-token";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Descriptor settings the driver cannot use.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    /// The descriptor has no server address.
    #[error("descriptor has no server")]
    MissingServer,
    /// The authentication mode is not supported by this backend.
    #[error("unsupported authentication mode: {0}")]
    UnsupportedAuthMode(String),
    /// A credential required by the mode is absent.
    #[error("authentication mode {mode} requires {field}")]
    MissingCredential {
        /// Authentication mode.
        mode: &'static str,
        /// Missing credential field.
        field: &'static str,
    },
}

// ============================================================================
// SECTION: Mapping
// ============================================================================

/// Builds the driver configuration for `descriptor`.
///
/// # Errors
///
/// Returns [`MappingError`] when the server is empty, the mode is not
/// supported, or the mode's credentials are incomplete.
pub fn tds_config(descriptor: &ConnectionDescriptor) -> Result<Config, MappingError> {
    if descriptor.server.is_empty() {
        return Err(MappingError::MissingServer);
    }
    let mut config = Config::new();
    config.host(&descriptor.server);
    config.authentication(auth_method(descriptor)?);

    let options = &descriptor.options;
    if let Some(port) = options.port {
        config.port(port);
    }
    if let Some(database) = &options.database {
        config.database(database);
    }
    if let Some(instance) = &options.instance_name {
        config.instance_name(instance);
    }
    if let Some(app_name) = &options.app_name {
        config.application_name(app_name);
    }
    match options.encrypt {
        Some(true) => config.encryption(EncryptionLevel::Required),
        Some(false) => config.encryption(EncryptionLevel::Off),
        None => {}
    }
    if options.trust_server_certificate == Some(true) {
        config.trust_cert();
    }
    Ok(config)
}

/// Selects the authentication method for the descriptor's mode.
fn auth_method(descriptor: &ConnectionDescriptor) -> Result<AuthMethod, MappingError> {
    let credentials = descriptor.credentials();
    match descriptor.auth_mode() {
        Some(SQL_LOGIN_MODE) => {
            let user = credentials.user_name.ok_or(MappingError::MissingCredential {
                mode: SQL_LOGIN_MODE,
                field: "userName",
            })?;
            let password = credentials.password.ok_or(MappingError::MissingCredential {
                mode: SQL_LOGIN_MODE,
                field: "password",
            })?;
            Ok(AuthMethod::sql_server(user, password))
        }
        Some(ACCESS_TOKEN_MODE) => {
            let token = credentials.token.ok_or(MappingError::MissingCredential {
                mode: ACCESS_TOKEN_MODE,
                field: "token",
            })?;
            Ok(AuthMethod::aad_token(token))
        }
        Some(other) => Err(MappingError::UnsupportedAuthMode(other.to_string())),
        None => Err(MappingError::UnsupportedAuthMode(String::new())),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
