//! Cross-collection counts, dashboard statistics, export and bulk deletion

use chrono::{DateTime, Duration, Utc};
use futures::try_join;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;
use tracing::{error, info, instrument, warn};

use super::count_rows;
use crate::db::{Conditions, Db};
use crate::errors::{ApiError, Result};
use crate::models::application::Application;
use crate::models::log::LogEntry;
use crate::models::review::Review;
use crate::models::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    Applications,
    Logs,
    Tasks,
    Reviews,
}

impl Model {
    pub const ALL: [Model; 4] = [Model::Applications, Model::Logs, Model::Tasks, Model::Reviews];

    pub fn table(&self) -> &'static str {
        match self {
            Model::Applications => "applications",
            Model::Logs => "logs",
            Model::Tasks => "tasks",
            Model::Reviews => "reviews",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Accepts singular or plural names, case-insensitively
impl FromStr for Model {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "applications" | "application" => Ok(Model::Applications),
            "logs" | "log" => Ok(Model::Logs),
            "tasks" | "task" => Ok(Model::Tasks),
            "reviews" | "review" => Ok(Model::Reviews),
            _ => Err(ApiError::BadRequest("Invalid model specified".to_string())),
        }
    }
}

/// What a delete-all call wipes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    All,
    One(Model),
}

impl FromStr for DeleteTarget {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(DeleteTarget::All);
        }
        s.parse().map(DeleteTarget::One)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub applications: i64,
    pub logs: i64,
    pub tasks: i64,
    pub reviews: i64,
    pub total: i64,
}

impl EntityCounts {
    fn new(applications: i64, logs: i64, tasks: i64, reviews: i64) -> Self {
        Self {
            applications,
            logs,
            tasks,
            reviews,
            total: applications + logs + tasks + reviews,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecentActivity {
    pub logs: i64,
    pub tasks: i64,
    pub reviews: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationOverview {
    pub total: i64,
    pub status_distribution: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemInfo {
    pub timestamp: DateTime<Utc>,
    /// Seconds since the process started
    pub uptime: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub overview: EntityCounts,
    pub recent_activity: RecentActivity,
    pub applications: ApplicationOverview,
    pub system_info: SystemInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    #[serde(flatten)]
    pub counts: EntityCounts,
    pub overdue_tasks: i64,
    pub stopped_apps: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemHealth {
    pub status: &'static str,
    pub database: &'static str,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<HealthMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deletion {
    pub message: String,
    /// Deleted rows per table, plus `totalDeleted` when everything went
    pub data: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedCounts {
    pub applications: u64,
    pub logs: u64,
    pub tasks: u64,
    pub reviews: u64,
    pub total_deleted: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetReport {
    pub before_reset: EntityCounts,
    pub after_reset: DeletedCounts,
    pub reset_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applications: Option<Vec<Application>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<LogEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<Review>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub export_timestamp: DateTime<Utc>,
    pub models: Vec<Model>,
    pub data: ExportData,
}

async fn count_table(db: &Db, model: Model) -> Result<i64> {
    count_rows(db, model.table(), Conditions::new(model.table())).await
}

pub async fn counts(db: &Db) -> Result<EntityCounts> {
    let (applications, logs, tasks, reviews) = try_join!(
        count_table(db, Model::Applications),
        count_table(db, Model::Logs),
        count_table(db, Model::Tasks),
        count_table(db, Model::Reviews)
    )?;
    Ok(EntityCounts::new(applications, logs, tasks, reviews))
}

async fn status_distribution(db: &Db) -> Result<BTreeMap<String, i64>> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM applications GROUP BY status")
            .fetch_all(db.pool())
            .await?;
    Ok(rows.into_iter().collect())
}

#[instrument(skip(db))]
pub async fn stats(db: &Db, uptime: StdDuration) -> Result<SystemStats> {
    let since = Utc::now() - Duration::hours(24);
    let recent = |table: &'static str| count_rows(db, table, Conditions::new(table).since("created_at", since));

    let (overview, logs, tasks, reviews, distribution) = try_join!(
        counts(db),
        recent("logs"),
        recent("tasks"),
        recent("reviews"),
        status_distribution(db)
    )?;

    Ok(SystemStats {
        overview,
        recent_activity: RecentActivity {
            logs,
            tasks,
            reviews,
        },
        applications: ApplicationOverview {
            total: overview.applications,
            status_distribution: distribution,
        },
        system_info: SystemInfo {
            timestamp: Utc::now(),
            uptime: uptime.as_secs_f64(),
        },
    })
}

async fn health_metrics(db: &Db) -> Result<HealthMetrics> {
    db.ping().await?;

    let overdue = Conditions::new("tasks")
        .before("date_to_finish", Utc::now())
        .not_eq("status", "done");
    let stopped = Conditions::new("applications").eq("status", "stopped");

    let (counts, overdue_tasks, stopped_apps) = try_join!(
        counts(db),
        count_rows(db, "tasks", overdue),
        count_rows(db, "applications", stopped)
    )?;

    Ok(HealthMetrics {
        counts,
        overdue_tasks,
        stopped_apps,
    })
}

/// Store-backed health view. A failing store is reported, not raised.
pub async fn health(db: &Db) -> SystemHealth {
    match health_metrics(db).await {
        Ok(metrics) => SystemHealth {
            status: "healthy",
            database: "connected",
            timestamp: Utc::now(),
            metrics: Some(metrics),
            error: None,
        },
        Err(e) => {
            error!("System health check failed: {}", e);
            SystemHealth {
                status: "unhealthy",
                database: "error",
                timestamp: Utc::now(),
                metrics: None,
                error: Some(e.to_string()),
            }
        }
    }
}

#[instrument(skip(db))]
pub async fn delete_all(db: &Db, target: DeleteTarget) -> Result<Deletion> {
    let models: &[Model] = match &target {
        DeleteTarget::All => &Model::ALL,
        DeleteTarget::One(model) => std::slice::from_ref(model),
    };

    let mut tx = db.pool().begin().await?;
    let mut data = BTreeMap::new();
    for model in models {
        let result = sqlx::query(&format!("DELETE FROM {}", model.table()))
            .execute(&mut *tx)
            .await?;
        data.insert(model.table().to_string(), result.rows_affected());
    }
    tx.commit().await?;

    let message = match target {
        DeleteTarget::All => {
            let total: u64 = data.values().sum();
            data.insert("totalDeleted".to_string(), total);
            "All data has been permanently deleted".to_string()
        }
        DeleteTarget::One(model) => format!("All {} have been permanently deleted", model),
    };

    warn!("{}", message);
    Ok(Deletion { message, data })
}

#[instrument(skip(db))]
pub async fn reset(db: &Db) -> Result<ResetReport> {
    let before_reset = counts(db).await?;
    let deletion = delete_all(db, DeleteTarget::All).await?;
    let deleted = |model: Model| deletion.data.get(model.table()).copied().unwrap_or(0);

    let after_reset = DeletedCounts {
        applications: deleted(Model::Applications),
        logs: deleted(Model::Logs),
        tasks: deleted(Model::Tasks),
        reviews: deleted(Model::Reviews),
        total_deleted: deletion.data.get("totalDeleted").copied().unwrap_or(0),
    };

    info!("System reset removed {} rows", after_reset.total_deleted);
    Ok(ResetReport {
        before_reset,
        after_reset,
        reset_timestamp: Utc::now(),
    })
}

/// Parse a comma separated model list; empty means every model
pub fn parse_models(raw: Option<&str>) -> Result<Vec<Model>> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Ok(Model::ALL.to_vec());
    };

    let mut models = Vec::new();
    for name in raw.split(',').filter(|n| !n.trim().is_empty()) {
        let model: Model = name.parse()?;
        if !models.contains(&model) {
            models.push(model);
        }
    }
    Ok(models)
}

#[instrument(skip(db))]
pub async fn export(db: &Db, models: Vec<Model>) -> Result<ExportBundle> {
    let mut data = ExportData::default();

    for model in &models {
        match model {
            Model::Applications => {
                data.applications = Some(
                    sqlx::query_as("SELECT * FROM applications ORDER BY id")
                        .fetch_all(db.pool())
                        .await?,
                );
            }
            Model::Logs => {
                data.logs = Some(
                    sqlx::query_as("SELECT * FROM logs ORDER BY id")
                        .fetch_all(db.pool())
                        .await?,
                );
            }
            Model::Tasks => {
                data.tasks = Some(
                    sqlx::query_as("SELECT * FROM tasks ORDER BY id")
                        .fetch_all(db.pool())
                        .await?,
                );
            }
            Model::Reviews => {
                data.reviews = Some(
                    sqlx::query_as("SELECT * FROM reviews ORDER BY id")
                        .fetch_all(db.pool())
                        .await?,
                );
            }
        }
    }

    Ok(ExportBundle {
        export_timestamp: Utc::now(),
        models,
        data,
    })
}
