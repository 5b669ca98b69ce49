use super::ISchedulerStore;
use crate::error::{StoreError, StoreResult};
use crate::relational::{AccessError, RelationalAccess, RequestScope, Row, Statement};
use crate::repos::shared::query_filter::{is_inverted_range, Pagination, QueryFilter};
use crate::repos::shared::{decode_all, DecodeRow};
use dispatch_store_domain::{
    Scheduler, SchedulerAssignee, SchedulerDTO, SearchSchedulerQuery, SearchSchedulerQueryResult,
};
use std::sync::Arc;
use tracing::debug;

const ENTITY: &str = "scheduler";

const SELECT_SCHEDULER: &str = "\
    SELECT s.id, s.name, s.currency, s.priority, s.status, s.created_at, s.updated_at \
    FROM schedulers AS s";

const SELECT_SCHEDULER_DTO: &str = "\
    SELECT s.id, s.name, s.currency, s.priority, s.status, s.created_at, s.updated_at, \
    COALESCE(array_agg(sa.user_id ORDER BY sa.user_id) \
        FILTER (WHERE sa.user_id IS NOT NULL), '{}'::BIGINT[]) AS assignee_user_ids, \
    COUNT(sa.id) AS assignee_count \
    FROM schedulers AS s \
    LEFT JOIN scheduler_assignees AS sa ON sa.scheduler_id = s.id";

const ROSTER_EXISTS: &str = "\
    SELECT 1 FROM scheduler_assignees AS f \
    WHERE f.scheduler_id = s.id AND f.user_id = ANY({ids})";

pub struct SqlSchedulerStore {
    db: Arc<dyn RelationalAccess>,
}

impl SqlSchedulerStore {
    pub fn new(db: Arc<dyn RelationalAccess>) -> Self {
        Self { db }
    }
}

impl DecodeRow for Scheduler {
    fn decode(row: &Row) -> Result<Self, AccessError> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            currency: row.get("currency")?,
            priority: row.get("priority")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

impl DecodeRow for SchedulerDTO {
    fn decode(row: &Row) -> Result<Self, AccessError> {
        Ok(Self {
            scheduler: Scheduler::decode(row)?,
            assignee_user_ids: row.get("assignee_user_ids")?,
            assignee_count: row.get("assignee_count")?,
        })
    }
}

impl DecodeRow for SchedulerAssignee {
    fn decode(row: &Row) -> Result<Self, AccessError> {
        Ok(Self {
            id: row.get("id")?,
            scheduler_id: row.get("scheduler_id")?,
            user_id: row.get("user_id")?,
            assigned_at: row.get("assigned_at")?,
        })
    }
}

fn search_filter(query: &SearchSchedulerQuery) -> QueryFilter {
    let mut filter = QueryFilter::new();
    if let Some(name) = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        filter.contains_ci("s.name", name);
    }
    // Exact match, the code is bound untouched
    if let Some(currency) = query.currency.as_deref().filter(|c| !c.trim().is_empty()) {
        filter.eq("s.currency", currency);
    }
    if let Some(priority) = query.priority {
        filter.eq("s.priority", priority);
    }
    if let Some(status) = query.status {
        filter.eq("s.status", status);
    }
    filter
        .any_of(ROSTER_EXISTS, &query.assignees)
        .date_range("s.created_at", query.date_from, query.date_to);
    filter
}

#[async_trait::async_trait]
impl ISchedulerStore for SqlSchedulerStore {
    #[tracing::instrument(name = "Create scheduler", skip(self, scope, scheduler))]
    async fn create(&self, scope: &RequestScope, scheduler: &Scheduler) -> StoreResult<i64> {
        let stmt = Statement::new(
            "scheduler.create",
            r#"
            INSERT INTO schedulers (name, currency, priority, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(scheduler.name.as_str())
        .bind(scheduler.currency.as_str())
        .bind(scheduler.priority)
        .bind(scheduler.status)
        .bind(scheduler.created_at)
        .bind(scheduler.updated_at);

        let row = self
            .db
            .fetch_one(scope, stmt)
            .await
            .map_err(StoreError::persist("create"))?;
        let id = row.get::<i64>("id").map_err(StoreError::persist("create"))?;
        debug!("Created scheduler {}", id);
        Ok(id)
    }

    #[tracing::instrument(name = "Create scheduler assignee", skip(self, scope, assignee), fields(scheduler_id = assignee.scheduler_id))]
    async fn create_assignee(
        &self,
        scope: &RequestScope,
        assignee: &SchedulerAssignee,
    ) -> StoreResult<()> {
        let stmt = Statement::new(
            "scheduler.create_assignee",
            r#"
            INSERT INTO scheduler_assignees (scheduler_id, user_id, assigned_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(assignee.scheduler_id)
        .bind(assignee.user_id)
        .bind(assignee.assigned_at);

        self.db
            .execute(scope, stmt)
            .await
            .map_err(StoreError::persist("create_assignee"))?;
        Ok(())
    }

    #[tracing::instrument(name = "Update scheduler", skip(self, scope, scheduler), fields(scheduler_id = scheduler.id))]
    async fn update_scheduler(&self, scope: &RequestScope, scheduler: &Scheduler) -> StoreResult<()> {
        let stmt = Statement::new(
            "scheduler.update",
            r#"
            UPDATE schedulers
            SET name = $2, currency = $3, priority = $4, status = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(scheduler.id)
        .bind(scheduler.name.as_str())
        .bind(scheduler.currency.as_str())
        .bind(scheduler.priority)
        .bind(scheduler.status)
        .bind(scheduler.updated_at);

        let affected = self
            .db
            .execute(scope, stmt)
            .await
            .map_err(StoreError::persist("update_scheduler"))?;
        if affected == 0 {
            return Err(StoreError::NotFound { entity: ENTITY });
        }
        Ok(())
    }

    #[tracing::instrument(name = "Update scheduler status", skip(self, scope, scheduler), fields(scheduler_id = scheduler.id))]
    async fn update_schedule_status(
        &self,
        scope: &RequestScope,
        scheduler: &Scheduler,
    ) -> StoreResult<()> {
        let stmt = Statement::new(
            "scheduler.update_status",
            "UPDATE schedulers SET status = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(scheduler.id)
        .bind(scheduler.status)
        .bind(scheduler.updated_at);

        let affected = self
            .db
            .execute(scope, stmt)
            .await
            .map_err(StoreError::persist("update_schedule_status"))?;
        if affected == 0 {
            return Err(StoreError::NotFound { entity: ENTITY });
        }
        Ok(())
    }

    #[tracing::instrument(name = "Get scheduler by id", skip(self, scope))]
    async fn get_scheduler_by_id(
        &self,
        scope: &RequestScope,
        scheduler_id: i64,
    ) -> StoreResult<SchedulerDTO> {
        let stmt = Statement::new(
            "scheduler.get_by_id",
            format!("{} WHERE s.id = $1 GROUP BY s.id", SELECT_SCHEDULER_DTO),
        )
        .bind(scheduler_id);

        let row = self
            .db
            .fetch_one(scope, stmt)
            .await
            .map_err(StoreError::lookup("get_scheduler_by_id", ENTITY))?;
        SchedulerDTO::decode(&row).map_err(StoreError::persist("get_scheduler_by_id"))
    }

    #[tracing::instrument(name = "Get scheduler roster", skip(self, scope))]
    async fn get_scheduler_assign_by_id(
        &self,
        scope: &RequestScope,
        scheduler_id: i64,
    ) -> StoreResult<Vec<SchedulerAssignee>> {
        let stmt = Statement::new(
            "scheduler.get_assignees",
            r#"
            SELECT id, scheduler_id, user_id, assigned_at
            FROM scheduler_assignees
            WHERE scheduler_id = $1
            ORDER BY id
            "#,
        )
        .bind(scheduler_id);

        let rows = self
            .db
            .fetch_all(scope, stmt)
            .await
            .map_err(StoreError::persist("get_scheduler_assign_by_id"))?;
        decode_all(&rows).map_err(StoreError::persist("get_scheduler_assign_by_id"))
    }

    #[tracing::instrument(name = "Get scheduler roster user ids", skip(self, scope))]
    async fn get_scheduler_user_ids_by_id(
        &self,
        scope: &RequestScope,
        scheduler_id: i64,
    ) -> StoreResult<Vec<Option<i64>>> {
        let stmt = Statement::new(
            "scheduler.get_user_ids",
            "SELECT user_id FROM scheduler_assignees WHERE scheduler_id = $1 ORDER BY id",
        )
        .bind(scheduler_id);

        let rows = self
            .db
            .fetch_all(scope, stmt)
            .await
            .map_err(StoreError::persist("get_scheduler_user_ids_by_id"))?;
        rows.iter()
            .map(|row| row.get::<Option<i64>>("user_id"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::persist("get_scheduler_user_ids_by_id"))
    }

    #[tracing::instrument(name = "Search schedulers", skip(self, scope, query))]
    async fn search(
        &self,
        scope: &RequestScope,
        query: &SearchSchedulerQuery,
    ) -> StoreResult<SearchSchedulerQueryResult> {
        let pagination = Pagination::new(query.page, query.per_page);
        let mut result = SearchSchedulerQueryResult {
            schedulers: Vec::new(),
            total_count: 0,
            page: pagination.page,
            per_page: pagination.per_page,
        };
        if is_inverted_range(query.date_from, query.date_to) {
            debug!("Inverted date range, nothing can match");
            return Ok(result);
        }

        let filter = search_filter(query);
        let count = self
            .db
            .fetch_one(scope, filter.count_statement("scheduler.search_count", "schedulers AS s"))
            .await
            .map_err(StoreError::persist("search"))?;
        result.total_count = count.get("total").map_err(StoreError::persist("search"))?;
        if result.total_count == 0 {
            return Ok(result);
        }

        let rows = self
            .db
            .fetch_all(
                scope,
                filter.page_statement(
                    "scheduler.search_page",
                    SELECT_SCHEDULER,
                    "ORDER BY s.id ASC",
                    pagination,
                ),
            )
            .await
            .map_err(StoreError::persist("search"))?;
        result.schedulers = decode_all(&rows).map_err(StoreError::persist("search"))?;
        Ok(result)
    }

    #[tracing::instrument(name = "Unassign scheduler assignee", skip(self, scope))]
    async fn unassign_assignee(
        &self,
        scope: &RequestScope,
        scheduler_assignee_id: i64,
    ) -> StoreResult<()> {
        let stmt = Statement::new(
            "scheduler.unassign",
            "DELETE FROM scheduler_assignees WHERE id = $1",
        )
        .bind(scheduler_assignee_id);

        let affected = self
            .db
            .execute(scope, stmt)
            .await
            .map_err(StoreError::persist("unassign_assignee"))?;
        debug!("Removed {} roster rows", affected);
        Ok(())
    }

    #[tracing::instrument(name = "Remove user from scheduler", skip(self, scope))]
    async fn delete_by_scheduler_id_and_user_id(
        &self,
        scope: &RequestScope,
        scheduler_id: i64,
        user_id: i64,
    ) -> StoreResult<()> {
        let stmt = Statement::new(
            "scheduler.delete_assignee",
            "DELETE FROM scheduler_assignees WHERE scheduler_id = $1 AND user_id = $2",
        )
        .bind(scheduler_id)
        .bind(user_id);

        let affected = self
            .db
            .execute(scope, stmt)
            .await
            .map_err(StoreError::persist("delete_by_scheduler_id_and_user_id"))?;
        debug!("Removed {} roster rows", affected);
        Ok(())
    }

    #[tracing::instrument(name = "List schedulers", skip(self, scope))]
    async fn get_scheduler_list(&self, scope: &RequestScope) -> StoreResult<Vec<SchedulerDTO>> {
        let stmt = Statement::new(
            "scheduler.list",
            format!("{} GROUP BY s.id ORDER BY s.id ASC", SELECT_SCHEDULER_DTO),
        );

        let rows = self
            .db
            .fetch_all(scope, stmt)
            .await
            .map_err(StoreError::persist("get_scheduler_list"))?;
        decode_all(&rows).map_err(StoreError::persist("get_scheduler_list"))
    }
}
