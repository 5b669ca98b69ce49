mod sql;

use crate::error::StoreResult;
use crate::relational::RequestScope;
use dispatch_store_domain::{
    Scheduler, SchedulerAssignee, SchedulerDTO, SearchSchedulerQuery, SearchSchedulerQueryResult,
};
pub use sql::SqlSchedulerStore;

#[async_trait::async_trait]
pub trait ISchedulerStore: Send + Sync {
    async fn create(&self, scope: &RequestScope, scheduler: &Scheduler) -> StoreResult<i64>;
    /// Adds a user to the roster of a scheduler. A user can only be on a roster once.
    async fn create_assignee(
        &self,
        scope: &RequestScope,
        assignee: &SchedulerAssignee,
    ) -> StoreResult<()>;
    async fn update_scheduler(&self, scope: &RequestScope, scheduler: &Scheduler) -> StoreResult<()>;
    /// Only persists `status` and `updated_at`
    async fn update_schedule_status(
        &self,
        scope: &RequestScope,
        scheduler: &Scheduler,
    ) -> StoreResult<()>;
    async fn get_scheduler_by_id(
        &self,
        scope: &RequestScope,
        scheduler_id: i64,
    ) -> StoreResult<SchedulerDTO>;
    async fn get_scheduler_assign_by_id(
        &self,
        scope: &RequestScope,
        scheduler_id: i64,
    ) -> StoreResult<Vec<SchedulerAssignee>>;
    /// One entry per roster row, `None` where the row has no user
    async fn get_scheduler_user_ids_by_id(
        &self,
        scope: &RequestScope,
        scheduler_id: i64,
    ) -> StoreResult<Vec<Option<i64>>>;
    async fn search(
        &self,
        scope: &RequestScope,
        query: &SearchSchedulerQuery,
    ) -> StoreResult<SearchSchedulerQueryResult>;
    /// Removes one roster row. Removing a row that does not exist succeeds.
    async fn unassign_assignee(
        &self,
        scope: &RequestScope,
        scheduler_assignee_id: i64,
    ) -> StoreResult<()>;
    async fn delete_by_scheduler_id_and_user_id(
        &self,
        scope: &RequestScope,
        scheduler_id: i64,
        user_id: i64,
    ) -> StoreResult<()>;
    async fn get_scheduler_list(&self, scope: &RequestScope) -> StoreResult<Vec<SchedulerDTO>>;
}
