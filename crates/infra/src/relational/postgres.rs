use super::{AccessError, RelationalAccess, RequestScope, Row, SqlValue, Statement};
use sqlx::{
    postgres::{PgArguments, PgRow},
    query::Query,
    Column, PgPool, Postgres, Row as _, TypeInfo,
};
use tracing::{debug, error};

pub struct PostgresAccess {
    pool: PgPool,
}

impl PostgresAccess {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn bind_values<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    binds: &'q [SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for value in binds {
        query = match value {
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::BigInt(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_deref()),
            SqlValue::Timestamp(v) => query.bind(*v),
            SqlValue::BigIntArray(v) => query.bind(v.as_slice()),
            SqlValue::Json(v) => query.bind(v.clone()),
        };
    }
    query
}

/// `RowNotFound` is the driver's "no rows" sentinel and stops here
fn classify(label: &str, err: sqlx::Error) -> AccessError {
    match err {
        sqlx::Error::RowNotFound => AccessError::NoRows,
        e => {
            error!("Statement `{}` failed. Error message: {:?}", label, e);
            AccessError::Database(e)
        }
    }
}

fn decode_err(column: &str) -> impl FnOnce(sqlx::Error) -> AccessError {
    let column = column.to_string();
    move |e| AccessError::Decode {
        column,
        reason: e.to_string(),
    }
}

fn decode_row(row: &PgRow) -> Result<Row, AccessError> {
    let mut decoded = Row::new();
    for column in row.columns() {
        let name = column.name();
        let idx = column.ordinal();
        let value = match column.type_info().name() {
            "INT2" => SqlValue::Int(
                row.try_get::<Option<i16>, _>(idx)
                    .map_err(decode_err(name))?
                    .map(i32::from),
            ),
            "INT4" => SqlValue::Int(row.try_get(idx).map_err(decode_err(name))?),
            "INT8" => SqlValue::BigInt(row.try_get(idx).map_err(decode_err(name))?),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
                SqlValue::Text(row.try_get(idx).map_err(decode_err(name))?)
            }
            "TIMESTAMPTZ" => SqlValue::Timestamp(row.try_get(idx).map_err(decode_err(name))?),
            "INT8[]" => SqlValue::BigIntArray(
                row.try_get::<Option<Vec<i64>>, _>(idx)
                    .map_err(decode_err(name))?
                    .unwrap_or_default(),
            ),
            "JSON" | "JSONB" => SqlValue::Json(row.try_get(idx).map_err(decode_err(name))?),
            other => {
                return Err(AccessError::Decode {
                    column: name.to_string(),
                    reason: format!("unsupported column type {}", other),
                })
            }
        };
        decoded.push(name, value);
    }
    Ok(decoded)
}

#[async_trait::async_trait]
impl RelationalAccess for PostgresAccess {
    #[tracing::instrument(name = "Postgres fetch one", skip(self, scope, stmt), fields(statement = stmt.label))]
    async fn fetch_one(&self, scope: &RequestScope, stmt: Statement) -> Result<Row, AccessError> {
        debug!("Binding {} values", stmt.binds.len());
        let row = scope
            .run(async {
                bind_values(sqlx::query(&stmt.sql), &stmt.binds)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| classify(stmt.label, e))
            })
            .await?;
        decode_row(&row)
    }

    #[tracing::instrument(name = "Postgres fetch all", skip(self, scope, stmt), fields(statement = stmt.label))]
    async fn fetch_all(
        &self,
        scope: &RequestScope,
        stmt: Statement,
    ) -> Result<Vec<Row>, AccessError> {
        debug!("Binding {} values", stmt.binds.len());
        let rows = scope
            .run(async {
                bind_values(sqlx::query(&stmt.sql), &stmt.binds)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| classify(stmt.label, e))
            })
            .await?;
        debug!("Fetched {} rows", rows.len());
        rows.iter().map(decode_row).collect()
    }

    #[tracing::instrument(name = "Postgres execute", skip(self, scope, stmt), fields(statement = stmt.label))]
    async fn execute(&self, scope: &RequestScope, stmt: Statement) -> Result<u64, AccessError> {
        debug!("Binding {} values", stmt.binds.len());
        let affected = scope
            .run(async {
                bind_values(sqlx::query(&stmt.sql), &stmt.binds)
                    .execute(&self.pool)
                    .await
                    .map(|res| res.rows_affected())
                    .map_err(|e| classify(stmt.label, e))
            })
            .await?;
        debug!("{} rows affected", affected);
        Ok(affected)
    }
}
