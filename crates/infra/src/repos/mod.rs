mod assignment;
mod scheduler;
pub(crate) mod shared;

pub use assignment::{IAssignmentStore, SqlAssignmentStore};
pub use scheduler::{ISchedulerStore, SqlSchedulerStore};
pub use shared::query_filter::{Pagination, QueryFilter, DEFAULT_PER_PAGE, MAX_PER_PAGE};

use crate::relational::{PostgresAccess, RelationalAccess};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct Stores {
    pub assignments: Arc<dyn IAssignmentStore>,
    pub schedulers: Arc<dyn ISchedulerStore>,
}

impl Stores {
    pub fn create_postgres(pool: PgPool) -> Self {
        Self::create_with(Arc::new(PostgresAccess::new(pool)))
    }

    /// Builds every store over the same relational access
    pub fn create_with(db: Arc<dyn RelationalAccess>) -> Self {
        Self {
            assignments: Arc::new(SqlAssignmentStore::new(db.clone())),
            schedulers: Arc::new(SqlSchedulerStore::new(db)),
        }
    }
}
