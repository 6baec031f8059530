// crates/query-gate-core/src/builder.rs
// ============================================================================
// Module: Query Builder
// Description: Textual assembly of a single SELECT statement.
// Purpose: Compose validated fragments into SQL Server statement text.
// Dependencies: crate::validator
// ============================================================================

//! ## Overview
//! The builder performs no safety checks of its own; it only accepts
//! [`SafeFragment`]s, so every fragment it inlines has already passed the
//! validator. Identifiers are bracket-quoted segment by segment; the filter
//! is appended verbatim.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use crate::validator::SafeFragment;

// ============================================================================
// SECTION: Row Limit
// ============================================================================

/// A positive row limit for the `TOP` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RowLimit(u64);

impl RowLimit {
    /// Wraps `value` when it is positive.
    #[must_use]
    pub const fn new(value: u64) -> Option<Self> {
        if value == 0 { None } else { Some(Self(value)) }
    }

    /// Parses the raw `top` parameter.
    ///
    /// Leading whitespace and an optional sign are skipped, then the leading
    /// run of decimal digits is read; trailing text is ignored. Missing
    /// digits, zero, negative values, and values beyond `u64` yield `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim_start();
        let (negative, unsigned) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let digits_len = unsigned.bytes().take_while(u8::is_ascii_digit).count();
        if digits_len == 0 {
            return None;
        }
        let value = unsigned[..digits_len].parse::<u64>().ok()?;
        if negative {
            return None;
        }
        Self::new(value)
    }

    /// Returns the limit value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

// ============================================================================
// SECTION: Statement
// ============================================================================

/// A complete SELECT statement with every fragment inlined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltStatement {
    /// Statement text.
    sql: String,
}

impl BuiltStatement {
    /// Returns the statement text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl fmt::Display for BuiltStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Assembles `SELECT [TOP (n)] <projection> FROM <source> [WHERE <filter>]`.
///
/// An empty column list projects `*`; otherwise each column is bracket-quoted
/// and the list is comma-joined in input order. The source is split on `.`
/// and each segment bracket-quoted.
#[must_use]
pub fn build_statement(
    limit: Option<RowLimit>,
    columns: &[SafeFragment],
    source: &SafeFragment,
    filter: Option<&SafeFragment>,
) -> BuiltStatement {
    let mut sql = String::from("SELECT");
    if let Some(limit) = limit {
        sql.push_str(&format!(" TOP ({}) ", limit.get()));
    }
    sql.push(' ');
    if columns.is_empty() {
        sql.push('*');
    } else {
        let projection = columns.iter().map(|column| bracket(column.as_str())).collect::<Vec<_>>();
        sql.push_str(&projection.join(","));
    }
    sql.push_str(" FROM ");
    let segments = source.as_str().split('.').map(bracket).collect::<Vec<_>>();
    sql.push_str(&segments.join("."));
    if let Some(filter) = filter {
        sql.push_str(" WHERE ");
        sql.push_str(filter.as_str());
    }
    BuiltStatement {
        sql,
    }
}

/// Splits the raw `select` parameter into column tokens.
///
/// Absent or empty input means all columns. Tokens are kept verbatim,
/// including empty ones between consecutive commas.
#[must_use]
pub fn split_select(raw: Option<&str>) -> Vec<String> {
    match raw {
        None | Some("") => Vec::new(),
        Some(raw) => raw.split(',').map(str::to_string).collect(),
    }
}

/// Wraps an identifier segment in brackets.
fn bracket(segment: &str) -> String {
    format!("[{segment}]")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::RowLimit;
    use super::split_select;

    #[test]
    fn row_limit_reads_integer_prefix() {
        assert_eq!(RowLimit::parse("20").map(RowLimit::get), Some(20));
        assert_eq!(RowLimit::parse("  7rows").map(RowLimit::get), Some(7));
        assert_eq!(RowLimit::parse("+3").map(RowLimit::get), Some(3));
    }

    #[test]
    fn row_limit_rejects_non_positive_and_garbage() {
        for raw in ["", "0", "-5", "abc", "-", "99999999999999999999999"] {
            assert_eq!(RowLimit::parse(raw), None, "{raw}");
        }
    }

    #[test]
    fn split_select_keeps_empty_tokens() {
        assert!(split_select(None).is_empty());
        assert!(split_select(Some("")).is_empty());
        assert_eq!(split_select(Some("a,,b")), vec!["a", "", "b"]);
    }
}
