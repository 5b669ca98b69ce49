use crate::clock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recurring dispatch definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scheduler {
    pub id: i64,
    pub name: String,
    /// ISO 4217 code of the currency this `Scheduler` dispatches in
    pub currency: String,
    pub priority: i32,
    pub status: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Scheduler {
    pub fn new(name: impl Into<String>, currency: impl Into<String>) -> Self {
        let now = clock::now();
        Self {
            id: 0,
            name: name.into(),
            currency: currency.into(),
            priority: 0,
            status: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, status: i32) {
        self.status = status;
        self.updated_at = clock::now();
    }
}

/// A user on the roster of a `Scheduler`.
///
/// The user is only referenced by id, the user itself is owned elsewhere.
/// A `(scheduler_id, user_id)` pair occurs at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerAssignee {
    pub id: i64,
    pub scheduler_id: i64,
    /// `None` when the row has lost its user reference
    pub user_id: Option<i64>,
    pub assigned_at: DateTime<Utc>,
}

impl SchedulerAssignee {
    pub fn new(scheduler_id: i64, user_id: i64) -> Self {
        Self {
            id: 0,
            scheduler_id,
            user_id: Some(user_id),
            assigned_at: clock::now(),
        }
    }
}

/// Read projection of a `Scheduler` together with a summary of its roster
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerDTO {
    #[serde(flatten)]
    pub scheduler: Scheduler,
    /// Ids of the users on the roster, ascending. Rows without a user are left out.
    pub assignee_user_ids: Vec<i64>,
    /// Number of roster rows, including rows without a user
    pub assignee_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchSchedulerQuery {
    /// Case-insensitive substring of the name. Blank is treated as no filter.
    pub name: Option<String>,
    /// Exact currency code. Blank is treated as no filter.
    pub currency: Option<String>,
    pub priority: Option<i32>,
    pub status: Option<i32>,
    /// Only schedulers with at least one of these users on the roster
    pub assignees: Vec<i64>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSchedulerQueryResult {
    pub schedulers: Vec<Scheduler>,
    pub total_count: i64,
    pub page: u32,
    pub per_page: u32,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn search_query_accepts_partial_input() {
        let query: SearchSchedulerQuery =
            serde_json::from_str(r#"{ "name": "night", "assignees": [7] }"#).unwrap();
        assert_eq!(query.name.as_deref(), Some("night"));
        assert_eq!(query.assignees, vec![7]);
        assert_eq!(query.page, 0);
        assert!(query.currency.is_none());
    }
}
