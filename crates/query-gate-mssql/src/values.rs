// crates/query-gate-mssql/src/values.rs
// ============================================================================
// Module: TDS Value Mapping
// Description: Column metadata and cell values from tiberius to the gateway.
// Purpose: Normalize driver values into backend-neutral native values.
// Dependencies: chrono, query-gate-core, tiberius
// ============================================================================

//! ## Overview
//! Temporal values render as UTC instants in `YYYY-MM-DDTHH:MM:SS.sssZ` form
//! (dates at midnight, times on 1970-01-01). GUIDs render upper-case.
//! Decimal and numeric values become floats. Binary cells stay raw bytes;
//! the executor decides their JSON shape from the declared column type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use chrono::Utc;
use query_gate_core::BackendError;
use query_gate_core::ColumnMeta;
use query_gate_core::DeclaredType;
use query_gate_core::NativeValue;
use tiberius::Column;
use tiberius::ColumnData;
use tiberius::ColumnType;
use tiberius::FromSql;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Render format for temporal values.
const INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

// ============================================================================
// SECTION: Metadata
// ============================================================================

/// Classifies a driver column type.
#[must_use]
pub const fn declared_type(column_type: ColumnType) -> DeclaredType {
    match column_type {
        ColumnType::BigVarBin => DeclaredType::VarBinary,
        ColumnType::BigBinary | ColumnType::Image => DeclaredType::Binary,
        _ => DeclaredType::Other,
    }
}

/// Converts result-set metadata.
#[must_use]
pub fn column_meta(columns: &[Column]) -> Vec<ColumnMeta> {
    columns
        .iter()
        .map(|column| ColumnMeta::new(column.name(), declared_type(column.column_type())))
        .collect()
}

// ============================================================================
// SECTION: Values
// ============================================================================

/// Converts one cell.
///
/// # Errors
///
/// Returns [`BackendError::Execute`] when a temporal value cannot be decoded.
pub fn native_value(data: ColumnData<'static>) -> Result<NativeValue, BackendError> {
    let value = match data {
        ColumnData::U8(value) => value.map(|value| NativeValue::Int(i64::from(value))),
        ColumnData::I16(value) => value.map(|value| NativeValue::Int(i64::from(value))),
        ColumnData::I32(value) => value.map(|value| NativeValue::Int(i64::from(value))),
        ColumnData::I64(value) => value.map(NativeValue::Int),
        ColumnData::F32(value) => value.map(|value| NativeValue::Float(f64::from(value))),
        ColumnData::F64(value) => value.map(NativeValue::Float),
        ColumnData::Bit(value) => value.map(NativeValue::Bool),
        ColumnData::String(value) => value.map(|value| NativeValue::Text(value.into_owned())),
        ColumnData::Guid(value) => {
            value.map(|value| NativeValue::Text(value.to_string().to_uppercase()))
        }
        ColumnData::Binary(value) => value.map(|value| NativeValue::Bytes(value.into_owned())),
        ColumnData::Numeric(value) => value.map(|value| {
            let text = value.to_string();
            text.parse::<f64>().map_or(NativeValue::Text(text), NativeValue::Float)
        }),
        ColumnData::Xml(value) => {
            value.map(|value| NativeValue::Text(value.into_owned().into_string()))
        }
        ref data @ (ColumnData::DateTime(_)
        | ColumnData::SmallDateTime(_)
        | ColumnData::DateTime2(_)) => {
            decode::<NaiveDateTime>(data)?.map(|value| render_instant(&value))
        }
        ref data @ ColumnData::Date(_) => decode::<NaiveDate>(data)?
            .map(|value| render_instant(&value.and_time(NaiveTime::MIN))),
        ref data @ ColumnData::Time(_) => decode::<NaiveTime>(data)?
            .map(|value| render_instant(&NaiveDate::default().and_time(value))),
        ref data @ ColumnData::DateTimeOffset(_) => {
            decode::<DateTime<Utc>>(data)?.map(|value| render_instant(&value.naive_utc()))
        }
    };
    Ok(value.unwrap_or(NativeValue::Null))
}

/// Converts a whole row in column order.
///
/// # Errors
///
/// Returns [`BackendError::Execute`] when any cell fails to decode.
pub fn row_values(row: tiberius::Row) -> Result<Vec<NativeValue>, BackendError> {
    row.into_iter().map(native_value).collect()
}

/// Decodes a temporal cell through the driver's chrono conversions.
fn decode<'a, T: FromSql<'a>>(data: &'a ColumnData<'static>) -> Result<Option<T>, BackendError> {
    T::from_sql(data).map_err(|err| BackendError::Execute(err.to_string()))
}

/// Renders a UTC instant.
fn render_instant(value: &NaiveDateTime) -> NativeValue {
    NativeValue::Text(value.format(INSTANT_FORMAT).to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
