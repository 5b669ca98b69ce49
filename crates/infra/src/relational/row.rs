use super::AccessError;
use chrono::{DateTime, Utc};

/// A typed, possibly null, value bound to a statement or read from a row.
///
/// Nulls keep their type so that they can be bound as typed parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(Option<i32>),
    BigInt(Option<i64>),
    Text(Option<String>),
    Timestamp(Option<DateTime<Utc>>),
    BigIntArray(Vec<i64>),
    Json(Option<serde_json::Value>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        match self {
            Self::Int(v) => v.is_none(),
            Self::BigInt(v) => v.is_none(),
            Self::Text(v) => v.is_none(),
            Self::Timestamp(v) => v.is_none(),
            Self::BigIntArray(_) => false,
            Self::Json(v) => v.is_none(),
        }
    }
}

macro_rules! impl_into_sql_value {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for SqlValue {
            fn from(v: $ty) -> Self {
                SqlValue::$variant(Some(v.into()))
            }
        }

        impl From<Option<$ty>> for SqlValue {
            fn from(v: Option<$ty>) -> Self {
                SqlValue::$variant(v.map(Into::into))
            }
        }
    };
}

impl_into_sql_value!(i32, Int);
impl_into_sql_value!(i64, BigInt);
impl_into_sql_value!(String, Text);
impl_into_sql_value!(&str, Text);
impl_into_sql_value!(DateTime<Utc>, Timestamp);
impl_into_sql_value!(serde_json::Value, Json);

impl From<Vec<i64>> for SqlValue {
    fn from(v: Vec<i64>) -> Self {
        SqlValue::BigIntArray(v)
    }
}

impl From<&[i64]> for SqlValue {
    fn from(v: &[i64]) -> Self {
        SqlValue::BigIntArray(v.to_vec())
    }
}

/// Conversion from a column value into a Rust value
pub trait FromSqlValue: Sized {
    fn from_sql_value(column: &str, value: &SqlValue) -> Result<Self, AccessError>;
}

fn mismatch(column: &str, expected: &str, value: &SqlValue) -> AccessError {
    AccessError::Decode {
        column: column.to_string(),
        reason: format!("expected {}, found {:?}", expected, value),
    }
}

impl FromSqlValue for i32 {
    fn from_sql_value(column: &str, value: &SqlValue) -> Result<Self, AccessError> {
        match value {
            SqlValue::Int(Some(v)) => Ok(*v),
            _ => Err(mismatch(column, "int", value)),
        }
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(column: &str, value: &SqlValue) -> Result<Self, AccessError> {
        match value {
            SqlValue::BigInt(Some(v)) => Ok(*v),
            SqlValue::Int(Some(v)) => Ok(i64::from(*v)),
            _ => Err(mismatch(column, "bigint", value)),
        }
    }
}

impl FromSqlValue for String {
    fn from_sql_value(column: &str, value: &SqlValue) -> Result<Self, AccessError> {
        match value {
            SqlValue::Text(Some(v)) => Ok(v.clone()),
            _ => Err(mismatch(column, "text", value)),
        }
    }
}

impl FromSqlValue for DateTime<Utc> {
    fn from_sql_value(column: &str, value: &SqlValue) -> Result<Self, AccessError> {
        match value {
            SqlValue::Timestamp(Some(v)) => Ok(*v),
            _ => Err(mismatch(column, "timestamptz", value)),
        }
    }
}

impl FromSqlValue for Vec<i64> {
    fn from_sql_value(column: &str, value: &SqlValue) -> Result<Self, AccessError> {
        match value {
            SqlValue::BigIntArray(v) => Ok(v.clone()),
            _ => Err(mismatch(column, "bigint[]", value)),
        }
    }
}

impl FromSqlValue for serde_json::Value {
    fn from_sql_value(column: &str, value: &SqlValue) -> Result<Self, AccessError> {
        match value {
            SqlValue::Json(Some(v)) => Ok(v.clone()),
            _ => Err(mismatch(column, "json", value)),
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(column: &str, value: &SqlValue) -> Result<Self, AccessError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_sql_value(column, value).map(Some)
        }
    }
}

/// An owned result row, columns are looked up by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        self.columns.push((column.into(), value.into()));
    }

    pub fn get<T: FromSqlValue>(&self, column: &str) -> Result<T, AccessError> {
        match self.columns.iter().find(|(name, _)| name == column) {
            Some((_, value)) => T::from_sql_value(column, value),
            None => Err(AccessError::Decode {
                column: column.to_string(),
                reason: "column is missing from the row".into(),
            }),
        }
    }
}
