//! Value mapping between Rust and PostgreSQL.
//!
//! `SqlValue` is the single currency of the builder and the executor: builder
//! inputs are `SqlValue`s, bound parameters are `SqlValue`s, and decoded result
//! columns are `SqlValue`s.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArgumentBuffer, PgArguments, PgRow, PgTypeInfo};
use sqlx::{Arguments, Column, Encode, Postgres, Row as SqlxRow, Type, TypeInfo};
use uuid::Uuid;

use crate::{Result, RolebaseError};

/// A single parameter or column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value
    Null,
    /// Boolean (BOOLEAN)
    Bool(bool),
    /// Small integer (SMALLINT)
    SmallInt(i16),
    /// Integer (INTEGER, SERIAL)
    Int(i32),
    /// Big integer (BIGINT)
    BigInt(i64),
    /// Single-precision float (REAL)
    Float(f32),
    /// Double-precision float (DOUBLE PRECISION)
    Double(f64),
    /// Variable-length string (VARCHAR, TEXT)
    String(String),
    /// Binary data (BYTEA)
    Bytes(Vec<u8>),
    /// UUID (UUID)
    Uuid(Uuid),
    /// Date (DATE)
    Date(NaiveDate),
    /// Time (TIME)
    Time(NaiveTime),
    /// Timestamp without timezone (TIMESTAMP)
    Timestamp(NaiveDateTime),
    /// Timestamp with timezone (TIMESTAMPTZ)
    TimestampTz(DateTime<Utc>),
    /// JSON/JSONB (JSON, JSONB)
    Json(JsonValue),
    /// Decimal/Numeric (NUMERIC, DECIMAL)
    Decimal(Decimal),
}

impl SqlValue {
    /// Returns the PostgreSQL type name for this value.
    pub fn pg_type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "NULL",
            SqlValue::Bool(_) => "BOOLEAN",
            SqlValue::SmallInt(_) => "SMALLINT",
            SqlValue::Int(_) => "INTEGER",
            SqlValue::BigInt(_) => "BIGINT",
            SqlValue::Float(_) => "REAL",
            SqlValue::Double(_) => "DOUBLE PRECISION",
            SqlValue::String(_) => "TEXT",
            SqlValue::Bytes(_) => "BYTEA",
            SqlValue::Uuid(_) => "UUID",
            SqlValue::Date(_) => "DATE",
            SqlValue::Time(_) => "TIME",
            SqlValue::Timestamp(_) => "TIMESTAMP",
            SqlValue::TimestampTz(_) => "TIMESTAMPTZ",
            SqlValue::Json(_) => "JSONB",
            SqlValue::Decimal(_) => "NUMERIC",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// True for values the INSERT accumulator treats as absent: NULL, `false`,
    /// numeric zero, empty strings, empty byte strings and empty or falsy JSON.
    ///
    /// Dates, times and UUIDs are never falsy.
    pub fn is_falsy(&self) -> bool {
        match self {
            SqlValue::Null => true,
            SqlValue::Bool(v) => !v,
            SqlValue::SmallInt(v) => *v == 0,
            SqlValue::Int(v) => *v == 0,
            SqlValue::BigInt(v) => *v == 0,
            SqlValue::Float(v) => *v == 0.0,
            SqlValue::Double(v) => *v == 0.0,
            SqlValue::String(v) => v.is_empty(),
            SqlValue::Bytes(v) => v.is_empty(),
            SqlValue::Decimal(v) => v.is_zero(),
            SqlValue::Json(v) => match v {
                JsonValue::Null => true,
                JsonValue::Bool(b) => !b,
                JsonValue::Number(n) => n.as_f64() == Some(0.0),
                JsonValue::String(s) => s.is_empty(),
                JsonValue::Array(a) => a.is_empty(),
                JsonValue::Object(o) => o.is_empty(),
            },
            SqlValue::Uuid(_)
            | SqlValue::Date(_)
            | SqlValue::Time(_)
            | SqlValue::Timestamp(_)
            | SqlValue::TimestampTz(_) => false,
        }
    }

    /// Bind this value as the next positional parameter.
    ///
    /// # Errors
    ///
    /// Returns error if the driver rejects the encoded value.
    pub fn bind_to_arguments(&self, arguments: &mut PgArguments) -> Result<()> {
        let bound = match self {
            SqlValue::Null => arguments.add(UntypedNull),
            SqlValue::Bool(v) => arguments.add(*v),
            SqlValue::SmallInt(v) => arguments.add(*v),
            SqlValue::Int(v) => arguments.add(*v),
            SqlValue::BigInt(v) => arguments.add(*v),
            SqlValue::Float(v) => arguments.add(*v),
            SqlValue::Double(v) => arguments.add(*v),
            SqlValue::String(v) => arguments.add(v.clone()),
            SqlValue::Bytes(v) => arguments.add(v.clone()),
            SqlValue::Uuid(v) => arguments.add(*v),
            SqlValue::Date(v) => arguments.add(*v),
            SqlValue::Time(v) => arguments.add(*v),
            SqlValue::Timestamp(v) => arguments.add(*v),
            SqlValue::TimestampTz(v) => arguments.add(*v),
            SqlValue::Json(v) => arguments.add(v.clone()),
            SqlValue::Decimal(v) => arguments.add(*v),
        };

        bound.map_err(|e| {
            RolebaseError::Query(format!("Failed to bind {}: {}", self.pg_type_name(), e))
        })
    }

    /// Converts to JSON for envelope rendering.
    ///
    /// Dates and timestamps become ISO-8601 strings, decimals become strings to
    /// keep precision, bytes become lowercase hex.
    pub fn to_json(&self) -> JsonValue {
        match self {
            SqlValue::Null => JsonValue::Null,
            SqlValue::Bool(v) => JsonValue::Bool(*v),
            SqlValue::SmallInt(v) => JsonValue::Number((*v).into()),
            SqlValue::Int(v) => JsonValue::Number((*v).into()),
            SqlValue::BigInt(v) => JsonValue::Number((*v).into()),
            SqlValue::Float(v) => serde_json::Number::from_f64(*v as f64)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            SqlValue::Double(v) => serde_json::Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            SqlValue::String(v) => JsonValue::String(v.clone()),
            SqlValue::Bytes(v) => {
                JsonValue::String(v.iter().map(|b| format!("{:02x}", b)).collect())
            }
            SqlValue::Uuid(v) => JsonValue::String(v.to_string()),
            SqlValue::Date(v) => JsonValue::String(v.format("%Y-%m-%d").to_string()),
            SqlValue::Time(v) => JsonValue::String(v.format("%H:%M:%S%.f").to_string()),
            SqlValue::Timestamp(v) => {
                JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }
            SqlValue::TimestampTz(v) => {
                JsonValue::String(v.to_rfc3339_opts(SecondsFormat::AutoSi, false))
            }
            SqlValue::Json(v) => v.clone(),
            SqlValue::Decimal(v) => JsonValue::String(v.to_string()),
        }
    }
}

/// NULL parameter declared with OID 0, so the backend infers its type from
/// the placeholder's context (column, operator, cast) instead of TEXT.
#[derive(Debug, Clone, Copy)]
struct UntypedNull;

impl Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(0))
    }

    fn compatible(_ty: &PgTypeInfo) -> bool {
        true
    }
}

impl Encode<'_, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> std::result::Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

impl Serialize for SqlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

macro_rules! impl_from_for_sql_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(v: $ty) -> Self {
                    SqlValue::$variant(v)
                }
            }
        )*
    };
}

impl_from_for_sql_value! {
    bool => Bool,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    f32 => Float,
    f64 => Double,
    String => String,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    JsonValue => Json,
    Decimal => Decimal,
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::String(v.to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Decode a PgRow into `(column name, value)` pairs in result-set order.
///
/// # Errors
///
/// Returns error if a column cannot be decoded into its declared type.
pub fn row_to_columns(row: &PgRow) -> Result<Vec<(String, SqlValue)>> {
    let mut columns = Vec::with_capacity(row.columns().len());

    for (idx, column) in row.columns().iter().enumerate() {
        let name = column.name();
        let value = match column.type_info().name() {
            "BOOL" | "BOOLEAN" => decode(row, idx, name, SqlValue::Bool)?,
            "INT2" | "SMALLINT" => decode(row, idx, name, SqlValue::SmallInt)?,
            "INT4" | "INTEGER" | "INT" => decode(row, idx, name, SqlValue::Int)?,
            "INT8" | "BIGINT" => decode(row, idx, name, SqlValue::BigInt)?,
            "FLOAT4" | "REAL" => decode(row, idx, name, SqlValue::Float)?,
            "FLOAT8" | "DOUBLE PRECISION" => decode(row, idx, name, SqlValue::Double)?,
            "VARCHAR" | "TEXT" | "CHAR" | "BPCHAR" | "NAME" | "CITEXT" => {
                decode(row, idx, name, SqlValue::String)?
            }
            "BYTEA" => decode(row, idx, name, SqlValue::Bytes)?,
            "UUID" => decode(row, idx, name, SqlValue::Uuid)?,
            "DATE" => decode(row, idx, name, SqlValue::Date)?,
            "TIME" => decode(row, idx, name, SqlValue::Time)?,
            "TIMESTAMP" => decode(row, idx, name, SqlValue::Timestamp)?,
            "TIMESTAMPTZ" => decode(row, idx, name, SqlValue::TimestampTz)?,
            "JSON" | "JSONB" => decode(row, idx, name, SqlValue::Json)?,
            "NUMERIC" => decode(row, idx, name, SqlValue::Decimal)?,
            "VOID" => SqlValue::Null,
            unknown => {
                tracing::warn!(
                    column = name,
                    pg_type = unknown,
                    "Unknown PostgreSQL type, attempting string extraction"
                );
                decode(row, idx, name, SqlValue::String)?
            }
        };

        columns.push((name.to_string(), value));
    }

    Ok(columns)
}

fn decode<T>(
    row: &PgRow,
    idx: usize,
    column_name: &str,
    convert: impl Fn(T) -> SqlValue,
) -> Result<SqlValue>
where
    T: for<'r> sqlx::Decode<'r, Postgres> + Type<Postgres>,
{
    match row.try_get::<Option<T>, _>(idx) {
        Ok(Some(v)) => Ok(convert(v)),
        Ok(None) => Ok(SqlValue::Null),
        Err(e) => Err(RolebaseError::Deserialization(format!(
            "Failed to decode column '{}': {}",
            column_name, e
        ))),
    }
}
