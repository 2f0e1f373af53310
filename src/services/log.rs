//! Log storage, facet listing, trend series and analytics

use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use futures::try_join;
use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite};
use std::collections::BTreeMap;
use tracing::{info, instrument};

use super::{Listing, PageRequest, Window, count_rows, ensure_app_id};
use crate::db::{Conditions, Db};
use crate::errors::{ApiError, Result};
use crate::models::Timestamp;
use crate::models::log::{LogEntry, LogType, NewLog};

const FROM_LOGS: &str = "logs l";
const SELECT_WITH_APPLICATION: &str =
    "SELECT l.*, a.name AS application_name FROM logs l LEFT JOIN applications a ON a.app_id = l.app_id";
const SEARCH_COLUMNS: [&str; 3] = ["message", "endpoint", "app_name"];
const TOP_APPLICATIONS: i64 = 5;

#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub app_id: Option<String>,
    pub log_type: Option<LogType>,
    pub search: Option<String>,
}

impl LogFilter {
    fn conditions(&self) -> Conditions {
        Conditions::new("l")
            .eq_opt("app_id", self.app_id.clone())
            .eq_opt("log_type", self.log_type.map(|t| t.as_str()))
            .search(&SEARCH_COLUMNS, self.search.as_deref())
    }
}

/// Per-type counters over the base set without the `logType` filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogTypeCounts {
    pub success: i64,
    pub error: i64,
    pub warning: i64,
    pub info: i64,
    pub total: i64,
}

/// Zero-filled per-type tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogTypeTally {
    pub success: i64,
    pub error: i64,
    pub info: i64,
    pub warning: i64,
}

impl LogTypeTally {
    pub fn set(&mut self, log_type: LogType, count: i64) {
        match log_type {
            LogType::Success => self.success = count,
            LogType::Error => self.error = count,
            LogType::Info => self.info = count,
            LogType::Warning => self.warning = count,
        }
    }
}

/// Keys stay snake_case, matching the grouped SQL row
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct DailyTrend {
    pub date: String,
    pub log_type: LogType,
    pub count: i64,
    pub avg_response_time: f64,
    pub max_response_time: i64,
    pub min_response_time: i64,
}

/// Keys stay snake_case, matching the grouped SQL row
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct HourlyTrend {
    pub hour: i64,
    pub log_type: LogType,
    pub count: i64,
}

/// Keys stay snake_case, matching the grouped SQL row
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct ErrorRatePoint {
    pub date: String,
    pub error_count: i64,
    pub total_count: i64,
    pub error_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TypeStat {
    pub count: i64,
    pub avg_response_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendDateRange {
    pub start_date: String,
    pub end_date: String,
    pub days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSummary {
    pub total_logs: i64,
    pub date_range: TrendDateRange,
    pub log_type_distribution: BTreeMap<LogType, TypeStat>,
    pub average_logs_per_day: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogTrends {
    pub summary: TrendSummary,
    pub daily_trends: Vec<DailyTrend>,
    pub error_rate_trend: Vec<ErrorRatePoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly_trends: Option<Vec<HourlyTrend>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopApplication {
    pub app_id: String,
    pub count: i64,
    pub app_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsDateRange {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogAnalytics {
    pub period: String,
    pub total_logs: i64,
    pub log_types: LogTypeTally,
    pub error_rate: String,
    pub top_applications: Vec<TopApplication>,
    pub daily_breakdown: BTreeMap<String, LogTypeTally>,
    pub date_range: AnalyticsDateRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeletion {
    pub deleted_count: u64,
    pub deleted_ids: Vec<i64>,
}

/// `error / total` as a percentage with two decimals, `"0.00%"` for an empty window
pub fn format_error_rate(errors: i64, total: i64) -> String {
    if total <= 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", errors as f64 / total as f64 * 100.0)
}

/// `round(total / days)`
pub fn average_per_day(total: i64, days: u32) -> i64 {
    if days == 0 {
        return total;
    }
    (total as f64 / f64::from(days)).round() as i64
}

#[instrument(skip(db, new), fields(app_id = %new.app_id))]
pub async fn add(db: &Db, new: NewLog) -> Result<LogEntry> {
    ensure_app_id(&new.app_id)?;
    let now = Timestamp::now().to_db();
    let additional = new.additional_data.as_ref().map(serde_json::to_string).transpose()?;

    let result = sqlx::query(
        "INSERT INTO logs (app_id, app_name, log_type, message, status_code, response_time, \
         endpoint, user_agent, ip, method, additional_data, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&new.app_id)
    .bind(&new.app_name)
    .bind(new.log_type)
    .bind(&new.message)
    .bind(new.status_code)
    .bind(new.response_time)
    .bind(&new.endpoint)
    .bind(&new.user_agent)
    .bind(&new.ip)
    .bind(new.method)
    .bind(additional)
    .bind(&now)
    .bind(&now)
    .execute(db.pool())
    .await?;

    let id = result.last_insert_rowid();
    info!("Stored {} log {}", new.log_type, id);
    get(db, id).await
}

pub async fn get(db: &Db, id: i64) -> Result<LogEntry> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_WITH_APPLICATION);
    Conditions::new("l").eq("id", id).push_where(&mut qb);

    qb.build_query_as::<LogEntry>()
        .fetch_optional(db.pool())
        .await?
        .ok_or_else(|| ApiError::not_found("Log"))
}

/// Filtered page ordered newest first, with per-type facet counts that
/// ignore the active `logType` filter
#[instrument(skip(db))]
pub async fn list(
    db: &Db,
    filter: &LogFilter,
    page: PageRequest,
) -> Result<Listing<LogEntry, LogTypeCounts>> {
    let conditions = filter.conditions();
    let base = conditions.without("log_type");

    let facets = try_join_all(
        LogType::ALL
            .iter()
            .map(|t| count_rows(db, FROM_LOGS, base.clone().eq("log_type", t.as_str()))),
    );

    let (items, total, facets) = try_join!(
        fetch_page(db, &conditions, page),
        count_rows(db, FROM_LOGS, conditions.clone()),
        facets
    )?;

    let mut tally = LogTypeTally::default();
    for (log_type, count) in LogType::ALL.iter().zip(facets) {
        tally.set(*log_type, count);
    }

    Ok(Listing {
        items,
        pagination: page.pagination(total),
        counts: LogTypeCounts {
            success: tally.success,
            error: tally.error,
            warning: tally.warning,
            info: tally.info,
            total: tally.success + tally.error + tally.warning + tally.info,
        },
    })
}

async fn fetch_page(db: &Db, conditions: &Conditions, page: PageRequest) -> Result<Vec<LogEntry>> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_WITH_APPLICATION);
    conditions.push_where(&mut qb);
    qb.push(" ORDER BY l.created_at DESC, l.id DESC LIMIT ")
        .push_bind(i64::from(page.limit))
        .push(" OFFSET ")
        .push_bind(page.offset());

    Ok(qb.build_query_as::<LogEntry>().fetch_all(db.pool()).await?)
}

/// Most recent logs of one application
pub async fn get_by_app_id(db: &Db, app_id: &str, limit: Option<u32>) -> Result<Vec<LogEntry>> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_WITH_APPLICATION);
    Conditions::new("l").eq("app_id", app_id).push_where(&mut qb);
    qb.push(" ORDER BY l.created_at DESC, l.id DESC");
    if let Some(limit) = limit {
        qb.push(" LIMIT ").push_bind(i64::from(limit));
    }

    Ok(qb.build_query_as::<LogEntry>().fetch_all(db.pool()).await?)
}

pub async fn count_by_app_id(db: &Db, app_id: &str) -> Result<i64> {
    count_rows(db, FROM_LOGS, Conditions::new("l").eq("app_id", app_id)).await
}

/// Daily, hourly and error-rate series over the last `days` days
#[instrument(skip(db))]
pub async fn trends(
    db: &Db,
    app_id: Option<&str>,
    log_type: Option<LogType>,
    days: u32,
) -> Result<LogTrends> {
    let window = Window::last_days(days);
    trends_in(db, app_id, log_type, window).await
}

pub async fn trends_in(
    db: &Db,
    app_id: Option<&str>,
    log_type: Option<LogType>,
    window: Window,
) -> Result<LogTrends> {
    let scoped = Conditions::new("l")
        .between("created_at", window.start, window.end)
        .eq_opt("app_id", app_id);
    let filtered = scoped.clone().eq_opt("log_type", log_type.map(|t| t.as_str()));

    let hourly = async {
        if window.days > 1 {
            return Ok(None);
        }
        let last_day = Conditions::new("l")
            .between("created_at", window.end - Duration::hours(24), window.end)
            .eq_opt("app_id", app_id)
            .eq_opt("log_type", log_type.map(|t| t.as_str()));
        hourly_series(db, &last_day).await.map(Some)
    };

    let (daily_trends, total_logs, distribution, error_rate_trend, hourly_trends) = try_join!(
        daily_series(db, &filtered),
        count_rows(db, FROM_LOGS, filtered.clone()),
        type_distribution(db, &filtered),
        error_rate_series(db, &scoped),
        hourly
    )?;

    let summary = TrendSummary {
        total_logs,
        date_range: TrendDateRange {
            start_date: window.start.format("%Y-%m-%d").to_string(),
            end_date: window.end.format("%Y-%m-%d").to_string(),
            days: window.days,
        },
        log_type_distribution: distribution,
        average_logs_per_day: average_per_day(total_logs, window.days),
    };

    Ok(LogTrends {
        summary,
        daily_trends,
        error_rate_trend,
        hourly_trends,
    })
}

async fn daily_series(db: &Db, conditions: &Conditions) -> Result<Vec<DailyTrend>> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT DATE(l.created_at) AS date, l.log_type AS log_type, COUNT(*) AS count, \
         CAST(AVG(l.response_time) AS REAL) AS avg_response_time, \
         MAX(l.response_time) AS max_response_time, MIN(l.response_time) AS min_response_time \
         FROM logs l",
    );
    conditions.push_where(&mut qb);
    qb.push(" GROUP BY DATE(l.created_at), l.log_type ORDER BY date ASC, l.log_type ASC");

    Ok(qb.build_query_as::<DailyTrend>().fetch_all(db.pool()).await?)
}

async fn hourly_series(db: &Db, conditions: &Conditions) -> Result<Vec<HourlyTrend>> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT CAST(strftime('%H', l.created_at) AS INTEGER) AS hour, l.log_type AS log_type, \
         COUNT(*) AS count FROM logs l",
    );
    conditions.push_where(&mut qb);
    qb.push(" GROUP BY hour, l.log_type ORDER BY hour ASC, l.log_type ASC");

    Ok(qb.build_query_as::<HourlyTrend>().fetch_all(db.pool()).await?)
}

async fn error_rate_series(db: &Db, conditions: &Conditions) -> Result<Vec<ErrorRatePoint>> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT DATE(l.created_at) AS date, \
         SUM(CASE WHEN l.log_type = 'error' THEN 1 ELSE 0 END) AS error_count, \
         COUNT(*) AS total_count, \
         CAST(SUM(CASE WHEN l.log_type = 'error' THEN 1 ELSE 0 END) AS REAL) * 100.0 / COUNT(*) AS error_rate \
         FROM logs l",
    );
    conditions.push_where(&mut qb);
    qb.push(" GROUP BY DATE(l.created_at) ORDER BY date ASC");

    Ok(qb.build_query_as::<ErrorRatePoint>().fetch_all(db.pool()).await?)
}

async fn type_distribution(db: &Db, conditions: &Conditions) -> Result<BTreeMap<LogType, TypeStat>> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT l.log_type, COUNT(*), CAST(AVG(l.response_time) AS REAL) FROM logs l",
    );
    conditions.push_where(&mut qb);
    qb.push(" GROUP BY l.log_type");

    let rows = qb
        .build_query_as::<(LogType, i64, f64)>()
        .fetch_all(db.pool())
        .await?;

    Ok(rows
        .into_iter()
        .map(|(log_type, count, avg_response_time)| {
            (
                log_type,
                TypeStat {
                    count,
                    avg_response_time,
                },
            )
        })
        .collect())
}

async fn type_tally(db: &Db, conditions: &Conditions) -> Result<LogTypeTally> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT l.log_type, COUNT(*) FROM logs l");
    conditions.push_where(&mut qb);
    qb.push(" GROUP BY l.log_type");

    let rows = qb.build_query_as::<(LogType, i64)>().fetch_all(db.pool()).await?;

    let mut tally = LogTypeTally::default();
    for (log_type, count) in rows {
        tally.set(log_type, count);
    }
    Ok(tally)
}

async fn top_applications(db: &Db, conditions: &Conditions) -> Result<Vec<TopApplication>> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT l.app_id AS app_id, COUNT(*) AS count, l.app_name AS app_name FROM logs l",
    );
    conditions.push_where(&mut qb);
    qb.push(" GROUP BY l.app_id, l.app_name ORDER BY count DESC, l.app_id ASC LIMIT ")
        .push_bind(TOP_APPLICATIONS);

    Ok(qb.build_query_as::<TopApplication>().fetch_all(db.pool()).await?)
}

async fn daily_breakdown(db: &Db, conditions: &Conditions) -> Result<BTreeMap<String, LogTypeTally>> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT DATE(l.created_at) AS date, l.log_type, COUNT(*) FROM logs l",
    );
    conditions.push_where(&mut qb);
    qb.push(" GROUP BY DATE(l.created_at), l.log_type ORDER BY date ASC");

    let rows = qb
        .build_query_as::<(String, LogType, i64)>()
        .fetch_all(db.pool())
        .await?;

    let mut days: BTreeMap<String, LogTypeTally> = BTreeMap::new();
    for (date, log_type, count) in rows {
        days.entry(date).or_default().set(log_type, count);
    }
    Ok(days)
}

/// Totals, type tally, error rate, top applications and per-day breakdown
#[instrument(skip(db))]
pub async fn analytics(db: &Db, app_id: Option<&str>, days: u32) -> Result<LogAnalytics> {
    analytics_in(db, app_id, Window::last_days(days)).await
}

pub async fn analytics_in(db: &Db, app_id: Option<&str>, window: Window) -> Result<LogAnalytics> {
    let conditions = Conditions::new("l")
        .between("created_at", window.start, window.end)
        .eq_opt("app_id", app_id);

    let (total_logs, log_types, top_applications, daily_breakdown) = try_join!(
        count_rows(db, FROM_LOGS, conditions.clone()),
        type_tally(db, &conditions),
        top_applications(db, &conditions),
        daily_breakdown(db, &conditions)
    )?;

    Ok(LogAnalytics {
        period: format!("Last {} days", window.days),
        total_logs,
        log_types,
        error_rate: format_error_rate(log_types.error, total_logs),
        top_applications,
        daily_breakdown,
        date_range: AnalyticsDateRange {
            start_date: window.start,
            end_date: window.end,
        },
    })
}

pub async fn delete_by_id(db: &Db, id: i64) -> Result<i64> {
    let result = sqlx::query("DELETE FROM logs WHERE id = ?")
        .bind(id)
        .execute(db.pool())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Log"));
    }
    Ok(id)
}

pub async fn delete_bulk(db: &Db, ids: &[i64]) -> Result<BulkDeletion> {
    if ids.is_empty() {
        return Err(ApiError::BadRequest("No log IDs provided".to_string()));
    }

    let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM logs WHERE id IN (");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let result = qb.build().execute(db.pool()).await?;
    info!("Bulk deleted {} logs", result.rows_affected());

    Ok(BulkDeletion {
        deleted_count: result.rows_affected(),
        deleted_ids: ids.to_vec(),
    })
}

/// Delete every log, or every log of one application
pub async fn delete_all(db: &Db, app_id: Option<&str>) -> Result<u64> {
    let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM logs");
    Conditions::new("logs").eq_opt("app_id", app_id).push_where(&mut qb);

    let result = qb.build().execute(db.pool()).await?;
    Ok(result.rows_affected())
}
