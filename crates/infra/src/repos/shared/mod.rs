pub mod query_filter;

use crate::relational::{AccessError, Row};

/// Mapping from an owned result row into a domain value
pub trait DecodeRow: Sized {
    fn decode(row: &Row) -> Result<Self, AccessError>;
}

pub fn decode_all<T: DecodeRow>(rows: &[Row]) -> Result<Vec<T>, AccessError> {
    rows.iter().map(T::decode).collect()
}
