// crates/query-gate-core/src/resolver.rs
// ============================================================================
// Module: Connection Resolver
// Description: Caller identity to connection descriptor routing.
// Purpose: Pick a tenant-specific backend with a well-known fallback.
// Dependencies: crate::descriptor
// ============================================================================

//! ## Overview
//! Connection entries live in process configuration under
//! `<prefix>_<key>`. A caller identity of the form `user@tenant.example.com`
//! is routed to `<prefix>_tenant_example_com`; when that entry is missing or
//! unusable the resolver falls back to `<prefix>_<default_key>`.
//! Invariants:
//! - Resolution is a pure function of the identity and the lookup contents.
//! - Malformed, oversized, or partial entries are treated as absent and never
//!   escalate; resolution degrades to the next fallback.
//!
//! The configuration source is injected through [`ConfigLookup`] so tests and
//! tooling can substitute a static map for the process environment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::descriptor::ConnectionDescriptor;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default prefix for connection entry names.
pub const DEFAULT_ENTRY_PREFIX: &str = "SQLAZURECONNSTR";
/// Default fallback tenant key (the demo database).
pub const DEFAULT_TENANT_KEY: &str = "AdventureWorks";
/// Default maximum size of a single connection entry.
pub const DEFAULT_MAX_ENTRY_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Configuration Lookup
// ============================================================================

/// Read-only key/value configuration source.
pub trait ConfigLookup: Send + Sync {
    /// Returns the raw value stored under `key`, if any.
    fn lookup(&self, key: &str) -> Option<String>;
}

impl<T: ConfigLookup + ?Sized> ConfigLookup for Box<T> {
    fn lookup(&self, key: &str) -> Option<String> {
        (**self).lookup(key)
    }
}

impl<T: ConfigLookup + ?Sized> ConfigLookup for Arc<T> {
    fn lookup(&self, key: &str) -> Option<String> {
        (**self).lookup(key)
    }
}

/// Lookup backed by the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvLookup;

impl ConfigLookup for ProcessEnvLookup {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Lookup backed by a fixed in-memory map.
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    /// Entries keyed by full entry name.
    entries: BTreeMap<String, String>,
}

impl StaticLookup {
    /// Creates an empty lookup.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Adds or replaces an entry.
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }
}

impl FromIterator<(String, String)> for StaticLookup {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl ConfigLookup for StaticLookup {
    fn lookup(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Naming and size policy for connection entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Prefix joined to tenant keys with `_`.
    pub entry_prefix: String,
    /// Tenant key used when no tenant entry applies.
    pub default_key: String,
    /// Entries larger than this are treated as absent.
    pub max_entry_bytes: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            entry_prefix: DEFAULT_ENTRY_PREFIX.to_string(),
            default_key: DEFAULT_TENANT_KEY.to_string(),
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
        }
    }
}

impl ResolverConfig {
    /// Returns the full entry name for a tenant key.
    #[must_use]
    pub fn entry_name(&self, key: &str) -> String {
        format!("{}_{key}", self.entry_prefix)
    }
}

/// Which rule selected the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Tenant-specific entry derived from the caller identity.
    Tenant,
    /// Fallback default entry.
    Default,
}

/// A descriptor together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConnection {
    /// Entry name the descriptor was read from.
    pub entry_name: String,
    /// Rule that selected the entry.
    pub source: ResolutionSource,
    /// Parsed descriptor.
    pub descriptor: ConnectionDescriptor,
}

/// Maps caller identities to connection descriptors.
#[derive(Debug, Clone)]
pub struct ConnectionResolver<L> {
    /// Configuration source.
    lookup: L,
    /// Entry naming policy.
    config: ResolverConfig,
}

impl<L: ConfigLookup> ConnectionResolver<L> {
    /// Creates a resolver over `lookup`.
    #[must_use]
    pub const fn new(lookup: L, config: ResolverConfig) -> Self {
        Self {
            lookup,
            config,
        }
    }

    /// Returns the entry naming policy.
    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves the descriptor for `caller_identity`, or `None` when neither
    /// the tenant entry nor the default entry yields a valid descriptor.
    #[must_use]
    pub fn resolve(&self, caller_identity: &str) -> Option<ResolvedConnection> {
        if let Some(key) = tenant_key(caller_identity) {
            let entry_name = self.config.entry_name(&key);
            if let Some(descriptor) = self.read_entry(&entry_name) {
                return Some(ResolvedConnection {
                    entry_name,
                    source: ResolutionSource::Tenant,
                    descriptor,
                });
            }
        }
        let entry_name = self.config.entry_name(&self.config.default_key);
        self.read_entry(&entry_name).map(|descriptor| ResolvedConnection {
            entry_name,
            source: ResolutionSource::Default,
            descriptor,
        })
    }

    /// Reads and parses one entry; every failure collapses to `None`.
    fn read_entry(&self, entry_name: &str) -> Option<ConnectionDescriptor> {
        let raw = self.lookup.lookup(entry_name)?;
        if raw.is_empty() || raw.len() > self.config.max_entry_bytes {
            return None;
        }
        ConnectionDescriptor::parse(&raw).ok()
    }
}

/// Derives the tenant key from a caller identity.
///
/// The domain is the text between the first `@` and the next `@` (or the
/// end). Returns `None` when the identity has no `@`, starts with `@`, or
/// the domain is empty.
#[must_use]
pub fn tenant_key(caller_identity: &str) -> Option<String> {
    let (user, rest) = caller_identity.split_once('@')?;
    let domain = rest.split('@').next().unwrap_or_default();
    if user.is_empty() || domain.is_empty() {
        return None;
    }
    Some(domain.replace('.', "_").to_lowercase())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
