use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{app_id_filter, page_request, search_filter, window_days};
use crate::errors::Result;
use crate::models::log::{LogType, NewLog};
use crate::response;
use crate::services::log::{self as log_service, LogFilter};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogListQuery {
    pub app_id: Option<String>,
    pub log_type: Option<LogType>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendsQuery {
    pub app_id: Option<String>,
    pub days: Option<u32>,
    pub log_type: Option<LogType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub app_id: Option<String>,
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppScopeQuery {
    pub app_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteRequest {
    #[serde(default)]
    pub log_ids: Vec<i64>,
}

pub async fn create(data: web::Data<AppState>, body: web::Json<NewLog>) -> Result<HttpResponse> {
    let log = log_service::add(&data.db, body.into_inner()).await?;
    Ok(response::created(log, "Log added successfully"))
}

pub async fn get(data: web::Data<AppState>, id: web::Path<i64>) -> Result<HttpResponse> {
    let log = log_service::get(&data.db, id.into_inner()).await?;
    Ok(response::success(log, "Log retrieved successfully"))
}

pub async fn list(data: web::Data<AppState>, query: web::Query<LogListQuery>) -> Result<HttpResponse> {
    let query = query.into_inner();
    let page = page_request(query.page, query.limit)?;
    let filter = LogFilter {
        app_id: app_id_filter(query.app_id)?,
        log_type: query.log_type,
        search: search_filter(query.search),
    };

    let listing = log_service::list(&data.db, &filter, page).await?;
    info!("Returning {} of {} logs", listing.items.len(), listing.pagination.total);
    Ok(response::success(listing, "All logs retrieved successfully"))
}

pub async fn trends(data: web::Data<AppState>, query: web::Query<TrendsQuery>) -> Result<HttpResponse> {
    let query = query.into_inner();
    let days = window_days(query.days)?;
    let app_id = app_id_filter(query.app_id)?;

    let trends = log_service::trends(&data.db, app_id.as_deref(), query.log_type, days).await?;
    Ok(response::success(trends, "Log trends retrieved successfully"))
}

pub async fn analytics(
    data: web::Data<AppState>,
    query: web::Query<AnalyticsQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let days = window_days(query.days)?;
    let app_id = app_id_filter(query.app_id)?;

    let analytics = log_service::analytics(&data.db, app_id.as_deref(), days).await?;
    Ok(response::success(analytics, "Analytics fetched successfully"))
}

// Accepted for compatibility; stored logs are immutable
pub async fn update(data: web::Data<AppState>, id: web::Path<i64>) -> Result<HttpResponse> {
    let log = log_service::get(&data.db, id.into_inner()).await?;
    Ok(response::success(log, "Log updated successfully"))
}

pub async fn delete(data: web::Data<AppState>, id: web::Path<i64>) -> Result<HttpResponse> {
    let deleted_id = log_service::delete_by_id(&data.db, id.into_inner()).await?;
    Ok(response::success(
        json!({ "deletedId": deleted_id }),
        "Log deleted successfully",
    ))
}

pub async fn delete_bulk(
    data: web::Data<AppState>,
    body: web::Json<BulkDeleteRequest>,
) -> Result<HttpResponse> {
    let deletion = log_service::delete_bulk(&data.db, &body.log_ids).await?;
    let message = format!("{} logs deleted successfully", deletion.deleted_count);
    Ok(response::success(deletion, &message))
}

pub async fn delete_all(
    data: web::Data<AppState>,
    query: web::Query<AppScopeQuery>,
) -> Result<HttpResponse> {
    let app_id = app_id_filter(query.into_inner().app_id)?;
    let deleted_count = log_service::delete_all(&data.db, app_id.as_deref()).await?;

    let message = match &app_id {
        Some(app_id) => format!("All logs for application {} deleted successfully", app_id),
        None => "All logs deleted successfully".to_string(),
    };
    Ok(response::success(json!({ "deletedCount": deleted_count }), &message))
}
