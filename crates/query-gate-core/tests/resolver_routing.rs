// crates/query-gate-core/tests/resolver_routing.rs
// ============================================================================
// Module: Resolver Routing Tests
// Description: Tenant routing, fallback, and entry guards.
// Purpose: Ensure resolution is deterministic and fails soft.
// ============================================================================

//! Connection resolver tests over static lookups.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use common::descriptor_json;
use query_gate_core::ConnectionResolver;
use query_gate_core::ResolutionSource;
use query_gate_core::ResolverConfig;
use query_gate_core::StaticLookup;

fn resolver(lookup: StaticLookup) -> ConnectionResolver<StaticLookup> {
    ConnectionResolver::new(lookup, ResolverConfig::default())
}

#[test]
fn tenant_entry_beats_default() {
    let resolver = resolver(
        StaticLookup::new()
            .with_entry("SQLAZURECONNSTR_AdventureWorks", descriptor_json("default.db"))
            .with_entry("SQLAZURECONNSTR_tenant_example_com", descriptor_json("tenant.db")),
    );
    let resolved = resolver.resolve("alice@tenant.example.com").unwrap();
    assert_eq!(resolved.source, ResolutionSource::Tenant);
    assert_eq!(resolved.descriptor.server, "tenant.db");
}

#[test]
fn resolution_is_deterministic() {
    let resolver = resolver(
        StaticLookup::new().with_entry("SQLAZURECONNSTR_AdventureWorks", descriptor_json("d")),
    );
    let first = resolver.resolve("carol@nowhere.net");
    let second = resolver.resolve("carol@nowhere.net");
    assert_eq!(first, second);
    assert_eq!(first.unwrap().entry_name, "SQLAZURECONNSTR_AdventureWorks");
}

#[test]
fn identity_starting_with_separator_skips_tenant() {
    let resolver = resolver(
        StaticLookup::new()
            .with_entry("SQLAZURECONNSTR_AdventureWorks", descriptor_json("default.db"))
            .with_entry("SQLAZURECONNSTR_tenant_com", descriptor_json("tenant.db")),
    );
    let resolved = resolver.resolve("@tenant.com").unwrap();
    assert_eq!(resolved.source, ResolutionSource::Default);
}

#[test]
fn oversized_and_malformed_entries_are_absent() {
    let config = ResolverConfig {
        max_entry_bytes: 64,
        ..ResolverConfig::default()
    };
    let lookup = StaticLookup::new()
        .with_entry("SQLAZURECONNSTR_big_com", descriptor_json(&"x".repeat(100)))
        .with_entry("SQLAZURECONNSTR_AdventureWorks", "not json");
    let resolver = ConnectionResolver::new(lookup, config);
    assert_eq!(resolver.resolve("a@big.com"), None);
}

#[test]
fn custom_prefix_and_default_key() {
    let config = ResolverConfig {
        entry_prefix: "QG".to_string(),
        default_key: "Main".to_string(),
        ..ResolverConfig::default()
    };
    let lookup = StaticLookup::from_iter([("QG_Main".to_string(), descriptor_json("main.db"))]);
    let resolver = ConnectionResolver::new(lookup, config);
    let resolved = resolver.resolve("Anonymous user").unwrap();
    assert_eq!(resolved.entry_name, "QG_Main");
    assert_eq!(resolved.descriptor.server, "main.db");
}
