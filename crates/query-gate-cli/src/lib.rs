// crates/query-gate-cli/src/lib.rs
// ============================================================================
// Module: Query Gate CLI Library
// Description: Shared helpers for the query gateway command-line interface.
// Purpose: Provide bind policy checks for the CLI binary and tests.
// Dependencies: query-gate-config
// ============================================================================

//! ## Overview
//! This library houses the serve policy used by `src/main.rs` before it
//! binds the HTTP listener.
//!
//! Security posture: CLI inputs and environment values are untrusted and
//! must be validated.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Network exposure policy for the server launcher.
pub mod serve_policy;
