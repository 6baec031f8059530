// crates/query-gate-core/src/gateway.rs
// ============================================================================
// Module: Query Gateway
// Description: End-to-end request pipeline from raw parameters to outcome.
// Purpose: Sequence validation, resolution, build, and execution.
// Dependencies: crate::{builder, executor, outcome, resolver, validator}
// ============================================================================

//! ## Overview
//! [`QueryGateway::run`] takes one [`RawQueryRequest`] through
//! `validate -> resolve -> build -> connect -> execute -> collect -> settle`.
//! The first failing stage settles the request; later stages never run.
//! Invariants:
//! - Validation happens before any configuration read or connection attempt.
//! - Every failure is returned as [`OperationOutcome::Failure`]; nothing
//!   escapes as a Rust error or panic.
//!
//! Security posture: every request parameter is untrusted. The denylist is a
//! coarse filter, not a parser; identifiers are bracket-quoted and the filter
//! is inlined verbatim after validation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::builder::BuiltStatement;
use crate::builder::RowLimit;
use crate::builder::build_statement;
use crate::builder::split_select;
use crate::executor::QueryBackend;
use crate::executor::QueryExecutor;
use crate::executor::UNEXPECTED_FAILURE_MESSAGE;
use crate::executor::panic_detail;
use crate::outcome::ErrorKind;
use crate::outcome::Failure;
use crate::outcome::FailureReason;
use crate::outcome::OperationOutcome;
use crate::resolver::ConfigLookup;
use crate::resolver::ConnectionResolver;
use crate::resolver::ResolutionSource;
use crate::resolver::tenant_key;
use crate::validator::SafeFragment;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Identity used when the request carries none.
pub const ANONYMOUS_CALLER: &str = "Anonymous user";

/// Caller-facing message for a rejected select column.
pub const UNSAFE_COLUMNS_MESSAGE: &str = "Select columns contains a potentially dangerous value";
/// Caller-facing message for a missing source.
pub const MISSING_SOURCE_MESSAGE: &str = "Missing from parameter for query";
/// Caller-facing message for a rejected source.
pub const UNSAFE_SOURCE_MESSAGE: &str = "From contains a potentially dangerous value";
/// Caller-facing message for a rejected filter.
pub const UNSAFE_FILTER_MESSAGE: &str = "Where contains a potentially dangerous value";
/// Caller-facing message when no descriptor resolves.
pub const MISSING_CONNECTION_MESSAGE: &str = "Could not find a connection configuration";

// ============================================================================
// SECTION: Request
// ============================================================================

/// One inbound query request with unvalidated parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawQueryRequest {
    /// Caller identity.
    pub caller: String,
    /// Projection columns in order; empty means all columns.
    pub columns: Vec<String>,
    /// Dotted source identifier.
    pub source: Option<String>,
    /// Raw predicate text.
    pub filter: Option<String>,
    /// Row limit.
    pub limit: Option<RowLimit>,
}

impl RawQueryRequest {
    /// Builds a request from raw adapter parameters.
    ///
    /// An absent or empty caller becomes [`ANONYMOUS_CALLER`]. `select` is
    /// split on commas, `top` is read as a leading integer, and empty `from`
    /// or `where` values count as absent.
    #[must_use]
    pub fn from_params(
        caller: Option<&str>,
        select: Option<&str>,
        top: Option<&str>,
        from: Option<&str>,
        filter: Option<&str>,
    ) -> Self {
        let caller = caller.filter(|value| !value.is_empty()).unwrap_or(ANONYMOUS_CALLER);
        Self {
            caller: caller.to_string(),
            columns: split_select(select),
            source: non_empty(from),
            filter: non_empty(filter),
            limit: top.and_then(RowLimit::parse),
        }
    }
}

/// Copies a value unless it is absent or empty.
fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|value| !value.is_empty()).map(str::to_string)
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Settled outcome plus routing details for audit and telemetry.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayReport {
    /// Settled outcome.
    pub outcome: OperationOutcome,
    /// Caller identity the request ran as.
    pub caller: String,
    /// Tenant key derived from the caller, if any.
    pub tenant_key: Option<String>,
    /// Connection entry used, once resolved.
    pub entry_name: Option<String>,
    /// Rule that selected the entry, once resolved.
    pub resolution: Option<ResolutionSource>,
    /// Statement that was executed, once built.
    pub statement: Option<BuiltStatement>,
}

impl GatewayReport {
    /// Creates a report with no routing details.
    #[must_use]
    pub fn new(caller: String, outcome: OperationOutcome) -> Self {
        let tenant_key = tenant_key(&caller);
        Self {
            outcome,
            caller,
            tenant_key,
            entry_name: None,
            resolution: None,
            statement: None,
        }
    }
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Request pipeline over a resolver and a backend.
pub struct QueryGateway<L> {
    /// Descriptor routing.
    resolver: ConnectionResolver<L>,
    /// Database driver.
    backend: Arc<dyn QueryBackend>,
}

impl<L: ConfigLookup> QueryGateway<L> {
    /// Creates a gateway.
    #[must_use]
    pub fn new(resolver: ConnectionResolver<L>, backend: Arc<dyn QueryBackend>) -> Self {
        Self {
            resolver,
            backend,
        }
    }

    /// Returns the resolver.
    #[must_use]
    pub const fn resolver(&self) -> &ConnectionResolver<L> {
        &self.resolver
    }

    /// Runs `request` to a settled outcome.
    ///
    /// A panic in any stage settles `Failure(Unknown)`.
    pub async fn run(&self, request: RawQueryRequest) -> GatewayReport {
        let caller = request.caller.clone();
        match AssertUnwindSafe(self.run_stages(request)).catch_unwind().await {
            Ok(report) => report,
            Err(payload) => {
                let failure = Failure::new(
                    ErrorKind::Unknown,
                    FailureReason::Panic,
                    UNEXPECTED_FAILURE_MESSAGE,
                )
                .with_detail(panic_detail(payload.as_ref()));
                GatewayReport::new(caller, OperationOutcome::Failure(failure))
            }
        }
    }

    /// Runs the stages in order; the first failure settles the request.
    async fn run_stages(&self, request: RawQueryRequest) -> GatewayReport {
        let RawQueryRequest {
            caller,
            columns,
            source,
            filter,
            limit,
        } = request;
        let validated = match validate(columns, source, filter) {
            Ok(validated) => validated,
            Err(failure) => return GatewayReport::new(caller, OperationOutcome::Failure(failure)),
        };
        let Some(resolved) = self.resolver.resolve(&caller) else {
            let failure = Failure::new(
                ErrorKind::MissingConnection,
                FailureReason::NoDescriptor,
                MISSING_CONNECTION_MESSAGE,
            );
            return GatewayReport::new(caller, OperationOutcome::Failure(failure));
        };
        let statement = build_statement(
            limit,
            &validated.columns,
            &validated.source,
            validated.filter.as_ref(),
        );
        let executor = QueryExecutor::new(self.backend.as_ref());
        let outcome = executor.execute(&resolved.descriptor, &statement).await;
        let mut report = GatewayReport::new(caller, outcome);
        report.entry_name = Some(resolved.entry_name);
        report.resolution = Some(resolved.source);
        report.statement = Some(statement);
        report
    }
}

/// Validates `request` and assembles its statement without resolving a
/// connection. Used for offline previews; [`QueryGateway::run`] applies the
/// same checks.
///
/// # Errors
///
/// Returns the validation [`Failure`] the gateway would settle.
pub fn prepare_statement(request: &RawQueryRequest) -> Result<BuiltStatement, Failure> {
    let validated = validate(request.columns.clone(), request.source.clone(), request.filter.clone())?;
    Ok(build_statement(
        request.limit,
        &validated.columns,
        &validated.source,
        validated.filter.as_ref(),
    ))
}

/// Fragments that passed every check.
struct ValidatedFragments {
    /// Projection columns.
    columns: Vec<SafeFragment>,
    /// Source identifier.
    source: SafeFragment,
    /// Filter clause.
    filter: Option<SafeFragment>,
}

/// Applies the checks in order: columns, source presence, source, filter.
fn validate(
    columns: Vec<String>,
    source: Option<String>,
    filter: Option<String>,
) -> Result<ValidatedFragments, Failure> {
    let mut safe_columns = Vec::with_capacity(columns.len());
    for column in columns {
        let safe = SafeFragment::new(column).map_err(|err| {
            Failure::new(
                ErrorKind::InvalidSelectColumns,
                FailureReason::UnsafeColumn,
                UNSAFE_COLUMNS_MESSAGE,
            )
            .with_detail(err.to_string())
        })?;
        safe_columns.push(safe);
    }
    let Some(source) = source else {
        return Err(Failure::new(
            ErrorKind::MissingFromParameter,
            FailureReason::MissingSource,
            MISSING_SOURCE_MESSAGE,
        ));
    };
    let source = SafeFragment::new(source).map_err(|err| {
        Failure::new(ErrorKind::InvalidFrom, FailureReason::UnsafeSource, UNSAFE_SOURCE_MESSAGE)
            .with_detail(err.to_string())
    })?;
    let filter = filter
        .map(|filter| {
            SafeFragment::new(filter).map_err(|err| {
                Failure::new(
                    ErrorKind::InvalidFrom,
                    FailureReason::UnsafeFilter,
                    UNSAFE_FILTER_MESSAGE,
                )
                .with_detail(err.to_string())
            })
        })
        .transpose()?;
    Ok(ValidatedFragments {
        columns: safe_columns,
        source,
        filter,
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
