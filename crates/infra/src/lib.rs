mod config;
mod error;
pub mod relational;
mod repos;

pub use config::Config;
pub use error::{StoreError, StoreResult};
pub use relational::{AccessError, RelationalAccess, RequestScope, Statement};
pub use repos::*;

use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

#[derive(Clone)]
pub struct StoreContext {
    pub stores: Stores,
    pub config: Config,
}

impl StoreContext {
    pub fn new(stores: Stores, config: Config) -> Self {
        Self { stores, config }
    }

    /// A fresh scope bounded by the configured query timeout
    pub fn request_scope(&self) -> RequestScope {
        RequestScope::new().with_timeout(self.config.query_timeout)
    }
}

/// Will setup the infrastructure context given the environment
pub async fn setup_context() -> anyhow::Result<StoreContext> {
    let config = Config::new();
    let pool = connect(&get_psql_connection_string()?, &config).await?;
    Ok(StoreContext::new(Stores::create_postgres(pool), config))
}

pub async fn connect(connection_string: &str, config: &Config) -> anyhow::Result<PgPool> {
    info!("DB CHECKING CONNECTION ...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(connection_string)
        .await?;
    info!("DB CHECKING CONNECTION ... [done]");
    Ok(pool)
}

pub fn get_psql_connection_string() -> anyhow::Result<String> {
    const PSQL_CONNECTION_STRING: &str = "DATABASE_URL";

    std::env::var(PSQL_CONNECTION_STRING)
        .map_err(|_| anyhow::anyhow!("{} env var to be present.", PSQL_CONNECTION_STRING))
}

pub async fn run_migration(pool: &PgPool) -> Result<(), MigrateError> {
    sqlx::migrate!().run(pool).await
}
