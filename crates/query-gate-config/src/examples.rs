// crates/query-gate-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and the CLI.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example `query-gate.toml`. The example loads and validates
//! cleanly and spells out every default.

/// Returns a canonical example `query-gate.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[server]
bind = "127.0.0.1:7071"
identity_header = "x-ms-client-principal-name"

[connections]
env_prefix = "SQLAZURECONNSTR"
default_key = "AdventureWorks"
max_entry_bytes = 65536

[audit]
enabled = true
# path = "query-gate-audit.jsonl"
log_statements = false
"#,
    )
}
