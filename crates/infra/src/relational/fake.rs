use super::{AccessError, RelationalAccess, RequestScope, Row, Statement};
use std::{collections::VecDeque, sync::Mutex};

/// Useful for testing stores without a database.
///
/// Responses are scripted up front and handed out in order, one per
/// statement. Every statement is recorded so tests can inspect the
/// generated SQL and binds.
pub struct FakeRelationalAccess {
    responses: Mutex<VecDeque<Scripted>>,
    statements: Mutex<Vec<Statement>>,
}

#[derive(Debug)]
enum Scripted {
    Rows(Vec<Row>),
    Affected(u64),
    Error(AccessError),
}

impl FakeRelationalAccess {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            statements: Mutex::new(Vec::new()),
        }
    }

    fn script(&self, response: Scripted) -> &Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn push_row(&self, row: Row) -> &Self {
        self.script(Scripted::Rows(vec![row]))
    }

    /// An empty `rows` makes the next `fetch_one` fail with `AccessError::NoRows`
    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.script(Scripted::Rows(rows))
    }

    pub fn push_affected(&self, count: u64) -> &Self {
        self.script(Scripted::Affected(count))
    }

    pub fn push_error(&self, err: AccessError) -> &Self {
        self.script(Scripted::Error(err))
    }

    /// All statements received so far, in order
    pub fn statements(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }

    pub fn last_statement(&self) -> Option<Statement> {
        self.statements.lock().unwrap().last().cloned()
    }

    fn next(&self, stmt: Statement) -> Result<Scripted, AccessError> {
        let label = stmt.label;
        self.statements.lock().unwrap().push(stmt);
        self.responses.lock().unwrap().pop_front().ok_or_else(|| {
            AccessError::Database(sqlx::Error::Protocol(format!(
                "No scripted response for statement `{}`",
                label
            )))
        })
    }
}

impl Default for FakeRelationalAccess {
    fn default() -> Self {
        Self::new()
    }
}

fn unexpected(label: &str, got: &Scripted) -> AccessError {
    AccessError::Database(sqlx::Error::Protocol(format!(
        "Statement `{}` received unexpected scripted response: {:?}",
        label, got
    )))
}

#[async_trait::async_trait]
impl RelationalAccess for FakeRelationalAccess {
    async fn fetch_one(&self, scope: &RequestScope, stmt: Statement) -> Result<Row, AccessError> {
        let label = stmt.label;
        let scripted = self.next(stmt)?;
        scope
            .run(async move {
                match scripted {
                    Scripted::Rows(rows) => rows.into_iter().next().ok_or(AccessError::NoRows),
                    Scripted::Error(e) => Err(e),
                    other => Err(unexpected(label, &other)),
                }
            })
            .await
    }

    async fn fetch_all(
        &self,
        scope: &RequestScope,
        stmt: Statement,
    ) -> Result<Vec<Row>, AccessError> {
        let label = stmt.label;
        let scripted = self.next(stmt)?;
        scope
            .run(async move {
                match scripted {
                    Scripted::Rows(rows) => Ok(rows),
                    Scripted::Error(e) => Err(e),
                    other => Err(unexpected(label, &other)),
                }
            })
            .await
    }

    async fn execute(&self, scope: &RequestScope, stmt: Statement) -> Result<u64, AccessError> {
        let label = stmt.label;
        let scripted = self.next(stmt)?;
        scope
            .run(async move {
                match scripted {
                    Scripted::Affected(count) => Ok(count),
                    Scripted::Error(e) => Err(e),
                    other => Err(unexpected(label, &other)),
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hands_out_responses_in_order() {
        let db = FakeRelationalAccess::new();
        db.push_row(Row::new().with("id", 1i64)).push_affected(3);
        let scope = RequestScope::new();

        let row = db
            .fetch_one(&scope, Statement::new("first", "SELECT 1"))
            .await
            .unwrap();
        assert_eq!(row.get::<i64>("id").unwrap(), 1);
        let affected = db
            .execute(&scope, Statement::new("second", "UPDATE x"))
            .await
            .unwrap();
        assert_eq!(affected, 3);

        let labels: Vec<_> = db.statements().iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn empty_rows_is_no_rows_for_fetch_one() {
        let db = FakeRelationalAccess::new();
        db.push_rows(vec![]);
        let res = db
            .fetch_one(&RequestScope::new(), Statement::new("find", "SELECT 1"))
            .await;
        assert!(matches!(res, Err(AccessError::NoRows)));
    }

    #[tokio::test]
    async fn unscripted_statement_fails() {
        let db = FakeRelationalAccess::new();
        let res = db
            .fetch_all(&RequestScope::new(), Statement::new("find", "SELECT 1"))
            .await;
        assert!(matches!(res, Err(AccessError::Database(_))));
    }

    #[tokio::test]
    async fn honors_cancelled_scope() {
        let db = FakeRelationalAccess::new();
        db.push_affected(1);
        let scope = RequestScope::new();
        scope.cancel();
        let res = db.execute(&scope, Statement::new("update", "UPDATE x")).await;
        assert!(matches!(res, Err(AccessError::Cancelled)));
    }
}
