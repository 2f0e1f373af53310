use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::errors::{ApiError, Result};
use crate::models::application::{AppStatus, NewApplication, is_valid_app_id};
use crate::response;
use crate::services::application as application_service;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: AppStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthUpdate {
    pub app_id: String,
    pub healthy: bool,
}

fn checked_app_id(app_id: String) -> Result<String> {
    if !is_valid_app_id(&app_id) {
        return Err(ApiError::BadRequest(
            "appId must be 6 uppercase letters or digits".to_string(),
        ));
    }
    Ok(app_id)
}

// Register a new application
pub async fn create(
    data: web::Data<AppState>,
    body: web::Json<NewApplication>,
) -> Result<HttpResponse> {
    let application = application_service::register(&data.db, body.into_inner()).await?;
    Ok(response::created(application, "Application created successfully"))
}

// List all registered applications
pub async fn list(data: web::Data<AppState>) -> Result<HttpResponse> {
    let applications = application_service::list(&data.db).await?;
    info!("Returning list of {} applications", applications.len());
    Ok(response::success(applications, "All applications retrieved successfully"))
}

pub async fn get(data: web::Data<AppState>, app_id: web::Path<String>) -> Result<HttpResponse> {
    let app_id = checked_app_id(app_id.into_inner())?;
    let detail = application_service::detail(&data.db, &app_id).await?;
    Ok(response::success(detail, "Application retrieved successfully"))
}

pub async fn update_status(
    data: web::Data<AppState>,
    app_id: web::Path<String>,
    body: web::Json<StatusUpdate>,
) -> Result<HttpResponse> {
    let app_id = checked_app_id(app_id.into_inner())?;
    let application = application_service::update_status(&data.db, &app_id, body.status).await?;
    Ok(response::success(application, "Application status updated successfully"))
}

/// Record one health check result for a registered application
pub async fn health_update(
    data: web::Data<AppState>,
    body: web::Json<HealthUpdate>,
) -> Result<HttpResponse> {
    let HealthUpdate { app_id, healthy } = body.into_inner();
    let app_id = checked_app_id(app_id)?;

    let application = application_service::update_health(&data.db, &app_id, healthy).await?;
    Ok(response::success(application, "Application health updated successfully"))
}

pub async fn generate_app_id(data: web::Data<AppState>) -> Result<HttpResponse> {
    let app_id = application_service::generate_app_id(&data.db).await?;
    Ok(response::success(json!({ "appId": app_id }), "AppId generated successfully"))
}

pub async fn sample_data(
    data: web::Data<AppState>,
    app_id: web::Path<String>,
) -> Result<HttpResponse> {
    let app_id = checked_app_id(app_id.into_inner())?;
    let sample = application_service::create_sample_data(&data.db, &app_id).await?;
    Ok(response::created(sample, "Sample data created successfully"))
}

pub async fn delete(data: web::Data<AppState>, app_id: web::Path<String>) -> Result<HttpResponse> {
    let app_id = checked_app_id(app_id.into_inner())?;
    let application = application_service::delete(&data.db, &app_id).await?;
    Ok(response::success(application, "Application deleted successfully"))
}
