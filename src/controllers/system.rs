use actix_web::{HttpResponse, web};
use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::Result;
use crate::response;
use crate::services::monitoring;
use crate::services::system::{self as system_service, DeleteTarget};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DeleteAllQuery {
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub models: Option<String>,
}

pub async fn counts(data: web::Data<AppState>) -> Result<HttpResponse> {
    let counts = system_service::counts(&data.db).await?;
    Ok(response::success(counts, "System counts retrieved successfully"))
}

pub async fn stats(data: web::Data<AppState>) -> Result<HttpResponse> {
    let stats = system_service::stats(&data.db, data.uptime()).await?;
    Ok(response::success(stats, "System statistics retrieved successfully"))
}

pub async fn health(data: web::Data<AppState>) -> HttpResponse {
    let health = system_service::health(&data.db).await;
    response::success(health, "System health check completed")
}

pub async fn metrics(data: web::Data<AppState>) -> HttpResponse {
    info!("Request for system metrics");
    let metrics = monitoring::collect(&data.db, data.uptime()).await;
    info!(
        "Health score {} ({:?})",
        metrics.health.score, metrics.health.status
    );
    response::success(metrics, "System metrics retrieved successfully")
}

pub async fn export(data: web::Data<AppState>, query: web::Query<ExportQuery>) -> Result<HttpResponse> {
    let models = system_service::parse_models(query.models.as_deref())?;
    let bundle = system_service::export(&data.db, models).await?;
    Ok(response::success(bundle, "Data exported successfully"))
}

/// Without `model` every collection is wiped
pub async fn delete_all(
    data: web::Data<AppState>,
    query: web::Query<DeleteAllQuery>,
) -> Result<HttpResponse> {
    let target = match query.model.as_deref().filter(|m| !m.trim().is_empty()) {
        Some(model) => model.parse::<DeleteTarget>()?,
        None => DeleteTarget::All,
    };
    warn!("Request to delete {:?}", target);

    let deletion = system_service::delete_all(&data.db, target).await?;
    Ok(response::success(deletion.data, &deletion.message))
}

pub async fn reset(data: web::Data<AppState>) -> Result<HttpResponse> {
    warn!("Request to reset the whole system");
    let report = system_service::reset(&data.db).await?;
    Ok(response::success(report, "System has been completely reset"))
}

