mod sql;

use crate::error::StoreResult;
use crate::relational::RequestScope;
use dispatch_store_domain::{
    Assignment, AssignmentDTO, AssignmentLog, SearchAssignmentQuery, SearchAssignmentQueryResult,
};
pub use sql::SqlAssignmentStore;

#[async_trait::async_trait]
pub trait IAssignmentStore: Send + Sync {
    /// Persists the assignment together with its assignees and returns the generated id
    async fn create(&self, scope: &RequestScope, assignment: &Assignment) -> StoreResult<i64>;
    async fn create_assignment_log(
        &self,
        scope: &RequestScope,
        log: &AssignmentLog,
    ) -> StoreResult<()>;
    async fn get_by_id(&self, scope: &RequestScope, assignment_id: i64) -> StoreResult<AssignmentDTO>;
    /// The most recently created assignment of the member
    async fn get_by_member_id(&self, scope: &RequestScope, member_id: i64) -> StoreResult<AssignmentDTO>;
    async fn search(
        &self,
        scope: &RequestScope,
        query: &SearchAssignmentQuery,
    ) -> StoreResult<SearchAssignmentQueryResult>;
    /// Distinct ids of the users any of the given assignments are handed out to, ascending
    async fn get_by_assignees_id(
        &self,
        scope: &RequestScope,
        assignment_ids: &[i64],
    ) -> StoreResult<Vec<i64>>;
    /// Persists `member_id`, `status`, `priority`, `note` and `updated_at`
    async fn update(&self, scope: &RequestScope, assignment: &Assignment) -> StoreResult<()>;
    async fn get_assignment_log(
        &self,
        scope: &RequestScope,
        assignment_id: i64,
    ) -> StoreResult<Vec<AssignmentLog>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::relational::{AccessError, FakeRelationalAccess, Row, SqlValue};
    use chrono::{DateTime, Duration, Utc};
    use std::sync::Arc;

    fn setup() -> (Arc<FakeRelationalAccess>, SqlAssignmentStore) {
        let db = Arc::new(FakeRelationalAccess::new());
        let store = SqlAssignmentStore::new(db.clone());
        (db, store)
    }

    fn db_error() -> AccessError {
        AccessError::Database(sqlx::Error::Protocol("connection reset".into()))
    }

    fn assignment_row(id: i64, member_id: i64, assignees: Vec<i64>, created_at: DateTime<Utc>) -> Row {
        Row::new()
            .with("id", id)
            .with("member_id", member_id)
            .with("status", 1i32)
            .with("priority", 2i32)
            .with("note", Some("call back"))
            .with("assignees", assignees)
            .with("created_at", created_at)
            .with("updated_at", created_at)
    }

    fn dto_row(id: i64, member_id: i64, log_count: i64, last_activity_at: Option<DateTime<Utc>>) -> Row {
        assignment_row(id, member_id, vec![3, 4], Utc::now())
            .with("log_count", log_count)
            .with("last_activity_at", last_activity_at)
    }

    #[tokio::test]
    async fn create_returns_generated_id() {
        let (db, store) = setup();
        db.push_row(Row::new().with("id", 42i64));

        let assignment = Assignment::new(9, vec![3, 4, 3]);
        let id = store.create(&RequestScope::new(), &assignment).await.unwrap();
        assert_eq!(id, 42);

        let stmt = db.last_statement().unwrap();
        assert!(stmt.sql.contains("INSERT INTO assignments"));
        assert!(stmt.sql.contains("INSERT INTO assignment_assignees"));
        assert_eq!(stmt.binds[0], SqlValue::BigInt(Some(9)));
        assert_eq!(stmt.binds[3], SqlValue::Text(None));
        assert_eq!(stmt.binds[6], SqlValue::BigIntArray(vec![3, 4, 3]));
    }

    #[tokio::test]
    async fn create_failure_is_persistence_error() {
        let (db, store) = setup();
        db.push_error(db_error());

        let res = store
            .create(&RequestScope::new(), &Assignment::new(9, vec![]))
            .await;
        assert!(matches!(
            res,
            Err(StoreError::Persistence { operation: "create", .. })
        ));
    }

    #[tokio::test]
    async fn create_assignment_log_binds_payload() {
        let (db, store) = setup();
        db.push_affected(1);

        let log = AssignmentLog::new(42, 7, "status_changed", serde_json::json!({ "to": 2 }));
        store
            .create_assignment_log(&RequestScope::new(), &log)
            .await
            .unwrap();

        let stmt = db.last_statement().unwrap();
        assert_eq!(
            stmt.binds[..4],
            [
                SqlValue::BigInt(Some(42)),
                SqlValue::BigInt(Some(7)),
                SqlValue::Text(Some("status_changed".into())),
                SqlValue::Json(Some(serde_json::json!({ "to": 2 }))),
            ]
        );
    }

    #[tokio::test]
    async fn create_assignment_log_for_unknown_assignment_fails() {
        let (db, store) = setup();
        db.push_error(db_error());

        let log = AssignmentLog::new(404, 7, "created", serde_json::Value::Null);
        let res = store.create_assignment_log(&RequestScope::new(), &log).await;
        assert!(matches!(res, Err(StoreError::Persistence { .. })));
    }

    #[tokio::test]
    async fn get_by_id_maps_row_to_dto() {
        let (db, store) = setup();
        let last_activity = Utc::now();
        db.push_row(dto_row(42, 9, 3, Some(last_activity)));

        let dto = store.get_by_id(&RequestScope::new(), 42).await.unwrap();
        assert_eq!(dto.assignment.id, 42);
        assert_eq!(dto.assignment.member_id, 9);
        assert_eq!(dto.assignment.assignees, vec![3, 4]);
        assert_eq!(dto.assignment.note.as_deref(), Some("call back"));
        assert_eq!(dto.log_count, 3);
        assert_eq!(dto.last_activity_at, Some(last_activity));
        assert_eq!(db.last_statement().unwrap().binds, vec![SqlValue::BigInt(Some(42))]);
    }

    #[tokio::test]
    async fn get_by_id_without_rows_is_not_found() {
        let (db, store) = setup();
        db.push_rows(vec![]);

        let res = store.get_by_id(&RequestScope::new(), 42).await;
        assert!(res.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn get_by_id_failure_is_not_not_found() {
        let (db, store) = setup();
        db.push_error(db_error());

        let err = store.get_by_id(&RequestScope::new(), 42).await.unwrap_err();
        assert!(!err.is_not_found());
        assert!(matches!(err, StoreError::Persistence { .. }));
    }

    #[tokio::test]
    async fn get_by_member_id_picks_latest() {
        let (db, store) = setup();
        db.push_row(dto_row(50, 9, 0, None));

        let dto = store.get_by_member_id(&RequestScope::new(), 9).await.unwrap();
        assert_eq!(dto.assignment.id, 50);
        assert_eq!(dto.log_count, 0);
        assert_eq!(dto.last_activity_at, None);

        let stmt = db.last_statement().unwrap();
        assert!(stmt.sql.contains("ORDER BY a.created_at DESC, a.id DESC LIMIT 1"));
    }

    #[tokio::test]
    async fn get_by_member_id_without_rows_is_not_found() {
        let (db, store) = setup();
        db.push_rows(vec![]);
        let res = store.get_by_member_id(&RequestScope::new(), 9).await;
        assert!(res.unwrap_err().is_not_found());

        db.push_error(db_error());
        let res = store.get_by_member_id(&RequestScope::new(), 9).await;
        assert!(matches!(res, Err(StoreError::Persistence { .. })));
    }

    #[tokio::test]
    async fn search_applies_filters_and_pagination() {
        let (db, store) = setup();
        let now = Utc::now();
        db.push_row(Row::new().with("total", 11i64))
            .push_rows(vec![assignment_row(5, 9, vec![3], now)]);

        let query = SearchAssignmentQuery {
            member_id: Some(9),
            assignees: vec![3, 8],
            date_from: Some(now - Duration::days(1)),
            date_to: Some(now),
            page: 2,
            per_page: 10,
        };
        let res = store.search(&RequestScope::new(), &query).await.unwrap();
        assert_eq!(res.total_count, 11);
        assert_eq!(res.page, 2);
        assert_eq!(res.per_page, 10);
        assert_eq!(res.assignments.len(), 1);
        assert_eq!(res.assignments[0].assignees, vec![3]);

        let statements = db.statements();
        assert_eq!(statements.len(), 2);
        let page = &statements[1];
        assert!(page.sql.contains("a.member_id = $1"));
        assert!(page.sql.contains("f.assignee_id = ANY($2)"));
        assert!(page.sql.contains("a.created_at >= $3 AND a.created_at <= $4"));
        assert!(page.sql.contains("ORDER BY a.id ASC LIMIT $5 OFFSET $6"));
        assert_eq!(page.binds[4..], [SqlValue::BigInt(Some(10)), SqlValue::BigInt(Some(10))]);
        assert_eq!(statements[0].binds, page.binds[..4]);
    }

    #[tokio::test]
    async fn search_without_filters_is_ordered_by_id() {
        let (db, store) = setup();
        db.push_row(Row::new().with("total", 0i64));

        let query = SearchAssignmentQuery {
            member_id: Some(0),
            ..Default::default()
        };
        let res = store.search(&RequestScope::new(), &query).await.unwrap();
        assert!(res.assignments.is_empty());
        assert_eq!(res.total_count, 0);
        assert_eq!(res.per_page, 20);
        assert_eq!(res.page, 1);

        let count = db.last_statement().unwrap();
        assert!(!count.sql.contains("WHERE"));
        assert!(count.binds.is_empty());
    }

    #[tokio::test]
    async fn search_with_inverted_range_skips_database() {
        let (db, store) = setup();
        let now = Utc::now();
        let query = SearchAssignmentQuery {
            date_from: Some(now),
            date_to: Some(now - Duration::hours(1)),
            ..Default::default()
        };

        let res = store.search(&RequestScope::new(), &query).await.unwrap();
        assert!(res.assignments.is_empty());
        assert_eq!(res.total_count, 0);
        assert!(db.statements().is_empty());
    }

    #[tokio::test]
    async fn search_failure_is_persistence_error() {
        let (db, store) = setup();
        db.push_error(db_error());
        let res = store
            .search(&RequestScope::new(), &SearchAssignmentQuery::default())
            .await;
        assert!(matches!(
            res,
            Err(StoreError::Persistence { operation: "search", .. })
        ));
    }

    #[tokio::test]
    async fn get_by_assignees_id_returns_distinct_ids() {
        let (db, store) = setup();
        db.push_rows(vec![
            Row::new().with("assignee_id", 8i64),
            Row::new().with("assignee_id", 3i64),
            Row::new().with("assignee_id", 8i64),
        ]);

        let ids = store
            .get_by_assignees_id(&RequestScope::new(), &[1, 2])
            .await
            .unwrap();
        assert_eq!(ids, vec![3, 8]);
        assert_eq!(
            db.last_statement().unwrap().binds,
            vec![SqlValue::BigIntArray(vec![1, 2])]
        );
    }

    #[tokio::test]
    async fn get_by_assignees_id_without_rows_is_not_found() {
        let (db, store) = setup();
        db.push_rows(vec![]);
        let res = store.get_by_assignees_id(&RequestScope::new(), &[1]).await;
        assert!(res.unwrap_err().is_not_found());

        let res = store.get_by_assignees_id(&RequestScope::new(), &[]).await;
        assert!(res.unwrap_err().is_not_found());
        assert_eq!(db.statements().len(), 1);
    }

    #[tokio::test]
    async fn get_by_assignees_id_failure_is_persistence_error() {
        let (db, store) = setup();
        db.push_error(db_error());
        let res = store.get_by_assignees_id(&RequestScope::new(), &[1]).await;
        assert!(matches!(res, Err(StoreError::Persistence { .. })));
    }

    #[tokio::test]
    async fn update_checks_affected_rows() {
        let (db, store) = setup();
        db.push_affected(1).push_affected(0);

        let mut assignment = Assignment::new(9, vec![]);
        assignment.id = 42;
        assignment.set_status(3);
        store.update(&RequestScope::new(), &assignment).await.unwrap();

        let stmt = db.last_statement().unwrap();
        assert_eq!(stmt.binds[0], SqlValue::BigInt(Some(42)));
        assert_eq!(stmt.binds[2], SqlValue::Int(Some(3)));

        let res = store.update(&RequestScope::new(), &assignment).await;
        assert!(res.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn update_failure_is_persistence_error() {
        let (db, store) = setup();
        db.push_error(db_error());
        let res = store
            .update(&RequestScope::new(), &Assignment::new(9, vec![]))
            .await;
        assert!(matches!(res, Err(StoreError::Persistence { .. })));
    }

    #[tokio::test]
    async fn get_assignment_log_in_creation_order() {
        let (db, store) = setup();
        let now = Utc::now();
        let log_row = |id: i64, action: &str| {
            Row::new()
                .with("id", id)
                .with("assignment_id", 42i64)
                .with("actor_id", 7i64)
                .with("action", action)
                .with("payload", serde_json::json!({}))
                .with("created_at", now)
        };
        db.push_rows(vec![log_row(1, "created"), log_row(2, "status_changed")])
            .push_rows(vec![]);

        let logs = store
            .get_assignment_log(&RequestScope::new(), 42)
            .await
            .unwrap();
        let actions: Vec<_> = logs.iter().map(|l| l.action.as_str()).collect();
        assert_eq!(actions, vec!["created", "status_changed"]);
        assert!(db
            .last_statement()
            .unwrap()
            .sql
            .contains("ORDER BY created_at ASC, id ASC"));

        let logs = store
            .get_assignment_log(&RequestScope::new(), 43)
            .await
            .unwrap();
        assert!(logs.is_empty());
    }

    #[tokio::test]
    async fn cancelled_scope_is_reported_as_cancelled() {
        let (db, store) = setup();
        db.push_rows(vec![]);
        let scope = RequestScope::new();
        scope.cancel();

        let res = store.get_by_id(&scope, 42).await;
        assert!(matches!(
            res,
            Err(StoreError::Cancelled { operation: "get_by_id" })
        ));
    }
}
