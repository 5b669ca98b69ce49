use dispatch_store::infra::{connect, get_psql_connection_string, run_migration};
use dispatch_store::telemetry::{get_subscriber, init_subscriber};
use dispatch_store::{Config, RequestScope, StoreContext, Stores};
use std::sync::Once;

static TRACING: Once = Once::new();

pub struct TestContext {
    pub ctx: StoreContext,
}

impl TestContext {
    pub fn scope(&self) -> RequestScope {
        self.ctx.request_scope()
    }
}

/// Logs are only printed when `TEST_LOG` is set
fn init_tracing() {
    TRACING.call_once(|| {
        if std::env::var("TEST_LOG").is_ok() {
            let subscriber = get_subscriber("dispatch_store_test".into(), "debug".into());
            let _ = init_subscriber(subscriber);
        }
    });
}

/// Connects to the database in `DATABASE_URL`, applies the migrations and
/// empties every table.
pub async fn setup() -> TestContext {
    init_tracing();
    let connection_string =
        get_psql_connection_string().expect("DATABASE_URL env var to be present");
    let config = Config::new();
    let pool = connect(&connection_string, &config)
        .await
        .expect("Failed to connect to Postgres");
    run_migration(&pool)
        .await
        .expect("Failed to run migrations");
    sqlx::query(
        "TRUNCATE assignment_logs, assignment_assignees, assignments, scheduler_assignees, schedulers RESTART IDENTITY",
    )
    .execute(&pool)
    .await
    .expect("Failed to clean tables");

    TestContext {
        ctx: StoreContext::new(Stores::create_postgres(pool), config),
    }
}
