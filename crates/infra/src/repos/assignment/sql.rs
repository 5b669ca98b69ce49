use super::IAssignmentStore;
use crate::error::{StoreError, StoreResult};
use crate::relational::{AccessError, RelationalAccess, RequestScope, Row, Statement};
use crate::repos::shared::query_filter::{is_inverted_range, Pagination, QueryFilter};
use crate::repos::shared::{decode_all, DecodeRow};
use dispatch_store_domain::{
    Assignment, AssignmentDTO, AssignmentLog, SearchAssignmentQuery, SearchAssignmentQueryResult,
};
use std::{collections::BTreeSet, sync::Arc};
use tracing::debug;

const ENTITY: &str = "assignment";

const SELECT_ASSIGNMENT: &str = "\
    SELECT a.id, a.member_id, a.status, a.priority, a.note, a.created_at, a.updated_at, \
    COALESCE(array_agg(aa.assignee_id ORDER BY aa.assignee_id) \
        FILTER (WHERE aa.assignee_id IS NOT NULL), '{}'::BIGINT[]) AS assignees \
    FROM assignments AS a \
    LEFT JOIN assignment_assignees AS aa ON aa.assignment_id = a.id";

const SELECT_ASSIGNMENT_DTO: &str = "\
    SELECT a.id, a.member_id, a.status, a.priority, a.note, a.created_at, a.updated_at, \
    COALESCE(array_agg(aa.assignee_id ORDER BY aa.assignee_id) \
        FILTER (WHERE aa.assignee_id IS NOT NULL), '{}'::BIGINT[]) AS assignees, \
    (SELECT COUNT(*) FROM assignment_logs AS l WHERE l.assignment_id = a.id) AS log_count, \
    (SELECT MAX(l.created_at) FROM assignment_logs AS l WHERE l.assignment_id = a.id) AS last_activity_at \
    FROM assignments AS a \
    LEFT JOIN assignment_assignees AS aa ON aa.assignment_id = a.id";

const ASSIGNEE_EXISTS: &str = "\
    SELECT 1 FROM assignment_assignees AS f \
    WHERE f.assignment_id = a.id AND f.assignee_id = ANY({ids})";

pub struct SqlAssignmentStore {
    db: Arc<dyn RelationalAccess>,
}

impl SqlAssignmentStore {
    pub fn new(db: Arc<dyn RelationalAccess>) -> Self {
        Self { db }
    }
}

impl DecodeRow for Assignment {
    fn decode(row: &Row) -> Result<Self, AccessError> {
        Ok(Self {
            id: row.get("id")?,
            member_id: row.get("member_id")?,
            status: row.get("status")?,
            priority: row.get("priority")?,
            note: row.get("note")?,
            assignees: row.get("assignees")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

impl DecodeRow for AssignmentDTO {
    fn decode(row: &Row) -> Result<Self, AccessError> {
        Ok(Self {
            assignment: Assignment::decode(row)?,
            log_count: row.get("log_count")?,
            last_activity_at: row.get("last_activity_at")?,
        })
    }
}

impl DecodeRow for AssignmentLog {
    fn decode(row: &Row) -> Result<Self, AccessError> {
        Ok(Self {
            id: row.get("id")?,
            assignment_id: row.get("assignment_id")?,
            actor_id: row.get("actor_id")?,
            action: row.get("action")?,
            payload: row.get("payload")?,
            created_at: row.get("created_at")?,
        })
    }
}

fn search_filter(query: &SearchAssignmentQuery) -> QueryFilter {
    let mut filter = QueryFilter::new();
    if let Some(member_id) = query.member_id.filter(|id| *id != 0) {
        filter.eq("a.member_id", member_id);
    }
    filter
        .any_of(ASSIGNEE_EXISTS, &query.assignees)
        .date_range("a.created_at", query.date_from, query.date_to);
    filter
}

#[async_trait::async_trait]
impl IAssignmentStore for SqlAssignmentStore {
    #[tracing::instrument(name = "Create assignment", skip(self, scope, assignment), fields(member_id = assignment.member_id))]
    async fn create(&self, scope: &RequestScope, assignment: &Assignment) -> StoreResult<i64> {
        let stmt = Statement::new(
            "assignment.create",
            r#"
            WITH inserted AS (
                INSERT INTO assignments (member_id, status, priority, note, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id
            ), linked AS (
                INSERT INTO assignment_assignees (assignment_id, assignee_id)
                SELECT DISTINCT inserted.id, assignee.id
                FROM inserted, unnest($7::BIGINT[]) AS assignee(id)
            )
            SELECT id FROM inserted
            "#,
        )
        .bind(assignment.member_id)
        .bind(assignment.status)
        .bind(assignment.priority)
        .bind(assignment.note.as_deref())
        .bind(assignment.created_at)
        .bind(assignment.updated_at)
        .bind(assignment.assignees.as_slice());

        let row = self
            .db
            .fetch_one(scope, stmt)
            .await
            .map_err(StoreError::persist("create"))?;
        let id = row.get::<i64>("id").map_err(StoreError::persist("create"))?;
        debug!("Created assignment {}", id);
        Ok(id)
    }

    #[tracing::instrument(name = "Create assignment log", skip(self, scope, log), fields(assignment_id = log.assignment_id))]
    async fn create_assignment_log(
        &self,
        scope: &RequestScope,
        log: &AssignmentLog,
    ) -> StoreResult<()> {
        let stmt = Statement::new(
            "assignment.create_log",
            r#"
            INSERT INTO assignment_logs (assignment_id, actor_id, action, payload, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(log.assignment_id)
        .bind(log.actor_id)
        .bind(log.action.as_str())
        .bind(log.payload.clone())
        .bind(log.created_at);

        self.db
            .execute(scope, stmt)
            .await
            .map_err(StoreError::persist("create_assignment_log"))?;
        Ok(())
    }

    #[tracing::instrument(name = "Get assignment by id", skip(self, scope))]
    async fn get_by_id(&self, scope: &RequestScope, assignment_id: i64) -> StoreResult<AssignmentDTO> {
        let stmt = Statement::new(
            "assignment.get_by_id",
            format!("{} WHERE a.id = $1 GROUP BY a.id", SELECT_ASSIGNMENT_DTO),
        )
        .bind(assignment_id);

        let row = self
            .db
            .fetch_one(scope, stmt)
            .await
            .map_err(StoreError::lookup("get_by_id", ENTITY))?;
        AssignmentDTO::decode(&row).map_err(StoreError::persist("get_by_id"))
    }

    #[tracing::instrument(name = "Get latest assignment of member", skip(self, scope))]
    async fn get_by_member_id(&self, scope: &RequestScope, member_id: i64) -> StoreResult<AssignmentDTO> {
        let stmt = Statement::new(
            "assignment.get_by_member_id",
            format!(
                "{} WHERE a.member_id = $1 GROUP BY a.id ORDER BY a.created_at DESC, a.id DESC LIMIT 1",
                SELECT_ASSIGNMENT_DTO
            ),
        )
        .bind(member_id);

        let row = self
            .db
            .fetch_one(scope, stmt)
            .await
            .map_err(StoreError::lookup("get_by_member_id", ENTITY))?;
        AssignmentDTO::decode(&row).map_err(StoreError::persist("get_by_member_id"))
    }

    #[tracing::instrument(name = "Search assignments", skip(self, scope, query))]
    async fn search(
        &self,
        scope: &RequestScope,
        query: &SearchAssignmentQuery,
    ) -> StoreResult<SearchAssignmentQueryResult> {
        let pagination = Pagination::new(query.page, query.per_page);
        let mut result = SearchAssignmentQueryResult {
            assignments: Vec::new(),
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
            .fetch_one(scope, filter.count_statement("assignment.search_count", "assignments AS a"))
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
                    "assignment.search_page",
                    SELECT_ASSIGNMENT,
                    "GROUP BY a.id ORDER BY a.id ASC",
                    pagination,
                ),
            )
            .await
            .map_err(StoreError::persist("search"))?;
        result.assignments = decode_all(&rows).map_err(StoreError::persist("search"))?;
        Ok(result)
    }

    #[tracing::instrument(name = "Get assignees of assignments", skip(self, scope))]
    async fn get_by_assignees_id(
        &self,
        scope: &RequestScope,
        assignment_ids: &[i64],
    ) -> StoreResult<Vec<i64>> {
        if assignment_ids.is_empty() {
            return Err(StoreError::NotFound { entity: "assignee" });
        }
        let stmt = Statement::new(
            "assignment.get_by_assignees_id",
            r#"
            SELECT DISTINCT assignee_id FROM assignment_assignees
            WHERE assignment_id = ANY($1)
            ORDER BY assignee_id
            "#,
        )
        .bind(assignment_ids);

        let rows = self
            .db
            .fetch_all(scope, stmt)
            .await
            .map_err(StoreError::persist("get_by_assignees_id"))?;
        let assignees = rows
            .iter()
            .map(|row| row.get::<i64>("assignee_id"))
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(StoreError::persist("get_by_assignees_id"))?;
        if assignees.is_empty() {
            return Err(StoreError::NotFound { entity: "assignee" });
        }
        Ok(assignees.into_iter().collect())
    }

    #[tracing::instrument(name = "Update assignment", skip(self, scope, assignment), fields(assignment_id = assignment.id))]
    async fn update(&self, scope: &RequestScope, assignment: &Assignment) -> StoreResult<()> {
        let stmt = Statement::new(
            "assignment.update",
            r#"
            UPDATE assignments
            SET member_id = $2, status = $3, priority = $4, note = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(assignment.id)
        .bind(assignment.member_id)
        .bind(assignment.status)
        .bind(assignment.priority)
        .bind(assignment.note.as_deref())
        .bind(assignment.updated_at);

        let affected = self
            .db
            .execute(scope, stmt)
            .await
            .map_err(StoreError::persist("update"))?;
        if affected == 0 {
            return Err(StoreError::NotFound { entity: ENTITY });
        }
        Ok(())
    }

    #[tracing::instrument(name = "Get assignment log", skip(self, scope))]
    async fn get_assignment_log(
        &self,
        scope: &RequestScope,
        assignment_id: i64,
    ) -> StoreResult<Vec<AssignmentLog>> {
        let stmt = Statement::new(
            "assignment.get_log",
            r#"
            SELECT id, assignment_id, actor_id, action, payload, created_at
            FROM assignment_logs
            WHERE assignment_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(assignment_id);

        let rows = self
            .db
            .fetch_all(scope, stmt)
            .await
            .map_err(StoreError::persist("get_assignment_log"))?;
        decode_all(&rows).map_err(StoreError::persist("get_assignment_log"))
    }
}
