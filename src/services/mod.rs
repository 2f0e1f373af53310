pub mod application;
pub mod health;
pub mod log;
pub mod monitoring;
pub mod review;
pub mod system;
pub mod task;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite};

use crate::db::{Conditions, Db};
use crate::errors::{ApiError, Result};
use crate::models::application::is_valid_app_id;
use crate::response::Pagination;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const DEFAULT_DAYS: u32 = 7;

/// Requested listing page; bounds are enforced by the controllers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }

    pub fn pagination(&self, total: i64) -> Pagination {
        Pagination::new(total, self.page, self.limit)
    }
}

/// One page of records plus the facet counters computed next to it
#[derive(Debug, Clone, Serialize)]
pub struct Listing<T: Serialize, C: Serialize> {
    pub items: Vec<T>,
    pub pagination: Pagination,
    pub counts: C,
}

/// Closed time window `[end - days, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub days: u32,
}

impl Window {
    pub fn last_days(days: u32) -> Self {
        Self::ending_at(Utc::now(), days)
    }

    pub fn ending_at(end: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: end - Duration::days(i64::from(days)),
            end,
            days,
        }
    }
}

/// `SELECT COUNT(*) FROM <from>` narrowed by `conditions`
pub(crate) async fn count_rows(db: &Db, from: &str, conditions: Conditions) -> Result<i64> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {}", from));
    conditions.push_where(&mut qb);
    let count = qb.build_query_scalar::<i64>().fetch_one(db.pool()).await?;
    Ok(count)
}

/// Records are only stored under an AppId the listing filters can match
pub(crate) fn ensure_app_id(app_id: &str) -> Result<()> {
    if !is_valid_app_id(app_id) {
        return Err(ApiError::Validation(
            "appId must be 6 uppercase letters or digits".to_string(),
        ));
    }
    Ok(())
}

/// Two-decimal rounding used by every published average
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
