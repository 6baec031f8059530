// crates/query-gate-core/src/validator.rs
// ============================================================================
// Module: Parameter Validator
// Description: Denylist predicate over raw query parameter strings.
// Purpose: Reject obviously dangerous fragments before statement assembly.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! The validator is a blunt, case-insensitive substring denylist. It is a
//! cheap heuristic and not a SQL grammar: it does not make inlined fragments
//! equivalent to bound parameters. Fragments that pass are wrapped in
//! [`SafeFragment`], the only input type the statement builder accepts.
//!
//! Security posture: every select column, the source identifier, and the
//! filter clause are untrusted and must pass [`is_safe`] individually.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

// ============================================================================
// SECTION: Denylist
// ============================================================================

/// Substrings whose presence (after lower-casing) rejects a fragment.
///
/// Entries with a trailing space only match whole keywords followed by a
/// space, which keeps identifiers such as `LastUpdated` usable.
pub const DENYLIST: &[&str] = &[
    // structural
    "[",
    "]",
    "\n",
    // comments
    "--",
    "/*",
    "#",
    // conditions
    "then ",
    "else ",
    "case ",
    "when ",
    "where ",
    // time delay
    "waitfor ",
    "delay ",
    " sleep(",
    // commands
    "select ",
    "from ",
    "update ",
    "insert ",
    "drop ",
    "orderby ",
    "limit ",
    "top ",
    "offset ",
];

// ============================================================================
// SECTION: Predicate
// ============================================================================

/// Returns true when `value` contains no denylisted substring.
#[must_use]
pub fn is_safe(value: &str) -> bool {
    first_violation(value).is_none()
}

/// Returns the first denylist entry found in `value`, if any.
#[must_use]
pub fn first_violation(value: &str) -> Option<&'static str> {
    let lowered = value.to_lowercase();
    DENYLIST.iter().copied().find(|entry| lowered.contains(entry))
}

// ============================================================================
// SECTION: Safe Fragments
// ============================================================================

/// A raw fragment that has passed [`is_safe`].
///
/// # Invariants
/// - Only constructible through [`SafeFragment::new`], so holding one proves
///   the denylist check ran.
/// - The wrapped text is the caller's original text, unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeFragment(String);

impl SafeFragment {
    /// Validates `value` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`UnsafeFragment`] naming the matched denylist entry.
    pub fn new(value: impl Into<String>) -> Result<Self, UnsafeFragment> {
        let value = value.into();
        match first_violation(&value) {
            Some(pattern) => Err(UnsafeFragment {
                pattern,
            }),
            None => Ok(Self(value)),
        }
    }

    /// Returns the validated text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SafeFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rejection produced when a fragment matches the denylist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("fragment matched denylist entry {pattern:?}")]
pub struct UnsafeFragment {
    /// The denylist entry that matched.
    pub pattern: &'static str,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
