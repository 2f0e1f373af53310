use futures::future::try_join_all;
use futures::try_join;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite};
use tracing::{info, instrument};

use super::{Listing, PageRequest, count_rows, ensure_app_id};
use crate::db::{Conditions, Db};
use crate::errors::{ApiError, Result};
use crate::models::Timestamp;
use crate::models::task::{NewTask, Task, TaskStatus};

const FROM_TASKS: &str = "tasks t";
const SELECT_WITH_APPLICATION: &str =
    "SELECT t.*, a.name AS application_name FROM tasks t LEFT JOIN applications a ON a.app_id = t.app_id";

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub app_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub search: Option<String>,
}

impl TaskFilter {
    fn conditions(&self) -> Conditions {
        Conditions::new("t")
            .eq_opt("app_id", self.app_id.clone())
            .eq_opt("status", self.status.map(|s| s.as_str()))
            .search(&["description"], self.search.as_deref())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStatusCounts {
    pub pending: i64,
    pub inprogress: i64,
    pub done: i64,
    pub total: i64,
}

impl TaskStatusCounts {
    fn from_buckets(buckets: &[i64]) -> Self {
        let bucket = |i: usize| buckets.get(i).copied().unwrap_or(0);
        let (pending, inprogress, done) = (bucket(0), bucket(1), bucket(2));
        Self {
            pending,
            inprogress,
            done,
            total: pending + inprogress + done,
        }
    }
}

#[instrument(skip(db, new), fields(app_id = %new.app_id))]
pub async fn add(db: &Db, new: NewTask) -> Result<Task> {
    ensure_app_id(&new.app_id)?;
    let now = Timestamp::now().to_db();

    let result = sqlx::query(
        "INSERT INTO tasks (app_id, description, status, date_to_finish, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&new.app_id)
    .bind(&new.description)
    .bind(new.status)
    .bind(new.date_to_finish.to_db())
    .bind(&now)
    .bind(&now)
    .execute(db.pool())
    .await?;

    let id = result.last_insert_rowid();
    info!("Stored task {}", id);
    get(db, id).await
}

pub async fn get(db: &Db, id: i64) -> Result<Task> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_WITH_APPLICATION);
    Conditions::new("t").eq("id", id).push_where(&mut qb);

    qb.build_query_as::<Task>()
        .fetch_optional(db.pool())
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))
}

/// Filtered page with status counts that ignore the active `status` filter
#[instrument(skip(db))]
pub async fn list(
    db: &Db,
    filter: &TaskFilter,
    page: PageRequest,
) -> Result<Listing<Task, TaskStatusCounts>> {
    let conditions = filter.conditions();
    let base = conditions.without("status");

    let buckets = try_join_all(
        TaskStatus::ALL
            .iter()
            .map(|s| count_rows(db, FROM_TASKS, base.clone().eq("status", s.as_str()))),
    );

    let (items, total, buckets) = try_join!(
        fetch_page(db, &conditions, page),
        count_rows(db, FROM_TASKS, conditions.clone()),
        buckets
    )?;

    Ok(Listing {
        items,
        pagination: page.pagination(total),
        counts: TaskStatusCounts::from_buckets(&buckets),
    })
}

async fn fetch_page(db: &Db, conditions: &Conditions, page: PageRequest) -> Result<Vec<Task>> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_WITH_APPLICATION);
    conditions.push_where(&mut qb);
    qb.push(" ORDER BY t.created_at DESC, t.id DESC LIMIT ")
        .push_bind(i64::from(page.limit))
        .push(" OFFSET ")
        .push_bind(page.offset());

    Ok(qb.build_query_as::<Task>().fetch_all(db.pool()).await?)
}

pub async fn get_by_app_id(db: &Db, app_id: &str, limit: Option<u32>) -> Result<Vec<Task>> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_WITH_APPLICATION);
    Conditions::new("t").eq("app_id", app_id).push_where(&mut qb);
    qb.push(" ORDER BY t.created_at DESC, t.id DESC");
    if let Some(limit) = limit {
        qb.push(" LIMIT ").push_bind(i64::from(limit));
    }

    Ok(qb.build_query_as::<Task>().fetch_all(db.pool()).await?)
}

pub async fn count_by_app_id(db: &Db, app_id: &str) -> Result<i64> {
    count_rows(db, FROM_TASKS, Conditions::new("t").eq("app_id", app_id)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_follow_status_order() {
        let counts = TaskStatusCounts::from_buckets(&[4, 2, 1]);
        assert_eq!(
            counts,
            TaskStatusCounts {
                pending: 4,
                inprogress: 2,
                done: 1,
                total: 7
            }
        );
    }

    #[test]
    fn test_status_filter_is_stripped_from_counts() {
        let filter = TaskFilter {
            app_id: Some("A1B2C3".into()),
            status: Some(TaskStatus::Done),
            search: None,
        };
        let base = filter.conditions().without("status");
        assert_eq!(base, Conditions::new("t").eq("app_id", "A1B2C3"));
    }
}
