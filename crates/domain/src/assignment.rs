use crate::clock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A work item owned by a member and handed out to a set of assignees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    /// Generated by the store on `create`, zero until then
    pub id: i64,
    /// Id of the member this `Assignment` belongs to
    pub member_id: i64,
    pub status: i32,
    pub priority: i32,
    pub note: Option<String>,
    /// Ids of the users this `Assignment` is handed out to. Order is not
    /// significant and duplicates are dropped when persisted.
    pub assignees: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    pub fn new(member_id: i64, assignees: Vec<i64>) -> Self {
        let now = clock::now();
        Self {
            id: 0,
            member_id,
            status: 0,
            priority: 0,
            note: None,
            assignees,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, status: i32) {
        self.status = status;
        self.updated_at = clock::now();
    }
}

/// Immutable audit record of a change made to an `Assignment`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentLog {
    pub id: i64,
    /// The `Assignment` this entry belongs to. Must reference an existing row.
    pub assignment_id: i64,
    /// Id of the user that made the change
    pub actor_id: i64,
    /// Short machine readable name of the change, e.g. `status_changed`
    pub action: String,
    /// Arbitrary details of the change
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AssignmentLog {
    pub fn new(
        assignment_id: i64,
        actor_id: i64,
        action: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: 0,
            assignment_id,
            actor_id,
            action: action.into(),
            payload,
            created_at: clock::now(),
        }
    }
}

/// Read projection of an `Assignment` together with values derived from
/// its audit trail. Only built by read paths.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDTO {
    #[serde(flatten)]
    pub assignment: Assignment,
    /// Number of `AssignmentLog` entries recorded for this assignment
    pub log_count: i64,
    /// Creation time of the most recent `AssignmentLog` entry, if any
    pub last_activity_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchAssignmentQuery {
    /// Only assignments owned by this member. `Some(0)` is treated as no filter.
    pub member_id: Option<i64>,
    /// Only assignments handed out to at least one of these users
    pub assignees: Vec<i64>,
    /// Inclusive lower bound on the creation time
    pub date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the creation time
    pub date_to: Option<DateTime<Utc>>,
    /// 1-based page number, `0` is read as the first page
    pub page: u32,
    /// Page size, `0` selects the default page size
    pub per_page: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAssignmentQueryResult {
    pub assignments: Vec<Assignment>,
    /// Number of assignments matching the filters across all pages
    pub total_count: i64,
    pub page: u32,
    pub per_page: u32,
}
