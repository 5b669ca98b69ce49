mod fake;
mod postgres;
mod row;
mod scope;

pub use fake::FakeRelationalAccess;
pub use postgres::PostgresAccess;
pub use row::{FromSqlValue, Row, SqlValue};
pub use scope::RequestScope;
use thiserror::Error;

/// Failure reported by a `RelationalAccess` implementation.
///
/// Driver specific "no rows" sentinels are translated into `NoRows` by the
/// implementation and never leave this layer in any other shape.
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("The query matched no rows")]
    NoRows,
    #[error("The query was cancelled by the caller")]
    Cancelled,
    #[error("The query did not finish before the deadline")]
    DeadlineExceeded,
    #[error("Database error: {0}")]
    Database(sqlx::Error),
    #[error("Unable to decode column `{column}`: {reason}")]
    Decode { column: String, reason: String },
}

/// A parameterized statement. Values are only ever sent as binds.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Static name of the statement, used in logs
    pub label: &'static str,
    pub sql: String,
    pub binds: Vec<SqlValue>,
}

impl Statement {
    pub fn new(label: &'static str, sql: impl Into<String>) -> Self {
        Self {
            label,
            sql: sql.into(),
            binds: Vec::new(),
        }
    }

    pub fn with_binds(label: &'static str, sql: impl Into<String>, binds: Vec<SqlValue>) -> Self {
        Self {
            label,
            sql: sql.into(),
            binds,
        }
    }

    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.binds.push(value.into());
        self
    }
}

/// Capability to run parameterized statements against the backing store.
///
/// Every call must honor the given `RequestScope` and abort with
/// `AccessError::Cancelled` or `AccessError::DeadlineExceeded`.
#[async_trait::async_trait]
pub trait RelationalAccess: Send + Sync {
    /// Exactly one row is expected, zero rows is `AccessError::NoRows`
    async fn fetch_one(&self, scope: &RequestScope, stmt: Statement) -> Result<Row, AccessError>;
    async fn fetch_all(
        &self,
        scope: &RequestScope,
        stmt: Statement,
    ) -> Result<Vec<Row>, AccessError>;
    /// Returns the number of affected rows
    async fn execute(&self, scope: &RequestScope, stmt: Statement) -> Result<u64, AccessError>;
}
