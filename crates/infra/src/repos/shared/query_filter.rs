//! Composes parameterized `WHERE` clauses and pagination from optional
//! search filters.
//!
//! Column names and subqueries are compile-time constants of the stores.
//! Every caller supplied value is bound as a positional parameter.

use crate::relational::{SqlValue, Statement};
use chrono::{DateTime, Utc};

/// Page size used when the caller asks for a page size of zero
pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub fn new(page: u32, per_page: u32) -> Self {
        let per_page = match per_page {
            0 => DEFAULT_PER_PAGE,
            n => n.min(MAX_PER_PAGE),
        };
        Self {
            page: page.max(1),
            per_page,
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }
}

/// A range whose lower bound lies after its upper bound can match nothing
pub fn is_inverted_range(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
    matches!((from, to), (Some(from), Some(to)) if from > to)
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    conditions: Vec<String>,
    binds: Vec<SqlValue>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` and returns its placeholder
    fn placeholder(&mut self, value: SqlValue) -> String {
        self.binds.push(value);
        format!("${}", self.binds.len())
    }

    pub fn eq(&mut self, column: &'static str, value: impl Into<SqlValue>) -> &mut Self {
        let p = self.placeholder(value.into());
        self.conditions.push(format!("{} = {}", column, p));
        self
    }

    /// Case-insensitive substring match
    pub fn contains_ci(&mut self, column: &'static str, needle: &str) -> &mut Self {
        let p = self.placeholder(format!("%{}%", escape_like(needle)).into());
        self.conditions.push(format!("{} ILIKE {}", column, p));
        self
    }

    /// Inclusive bounds, a missing bound leaves that side open
    pub fn date_range(
        &mut self,
        column: &'static str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> &mut Self {
        if let Some(from) = from {
            let p = self.placeholder(from.into());
            self.conditions.push(format!("{} >= {}", column, p));
        }
        if let Some(to) = to {
            let p = self.placeholder(to.into());
            self.conditions.push(format!("{} <= {}", column, p));
        }
        self
    }

    /// Semi-join: keeps rows for which `exists_subquery` finds at least one of
    /// `ids`. The subquery refers to the bound id array as `{ids}`.
    /// An empty `ids` adds no predicate.
    pub fn any_of(&mut self, exists_subquery: &'static str, ids: &[i64]) -> &mut Self {
        if ids.is_empty() {
            return self;
        }
        let p = self.placeholder(ids.into());
        self.conditions
            .push(format!("EXISTS ({})", exists_subquery.replace("{ids}", &p)));
        self
    }

    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    /// `SELECT COUNT(*) AS total` over `from` with the filter applied
    pub fn count_statement(&self, label: &'static str, from: &str) -> Statement {
        let sql = format!(
            "SELECT COUNT(*) AS total FROM {} {}",
            from,
            self.where_clause()
        );
        Statement::with_binds(label, sql, self.binds.clone())
    }

    /// `select` is everything up to the `WHERE`, `tail` carries `GROUP BY`
    /// and `ORDER BY`. The order must be total for stable pages.
    pub fn page_statement(
        &self,
        label: &'static str,
        select: &str,
        tail: &str,
        pagination: Pagination,
    ) -> Statement {
        let mut binds = self.binds.clone();
        let limit_idx = binds.len() + 1;
        binds.push(pagination.limit().into());
        binds.push(pagination.offset().into());
        let sql = format!(
            "{} {} {} LIMIT ${} OFFSET ${}",
            select,
            self.where_clause(),
            tail,
            limit_idx,
            limit_idx + 1
        );
        Statement::with_binds(label, sql, binds)
    }
}
