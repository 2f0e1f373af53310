use actix_web::{HttpResponse, web};
use serde::Deserialize;

use super::{app_id_filter, page_request, search_filter};
use crate::errors::Result;
use crate::models::task::{NewTask, TaskStatus};
use crate::response;
use crate::services::task::{self as task_service, TaskFilter};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub app_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn create(data: web::Data<AppState>, body: web::Json<NewTask>) -> Result<HttpResponse> {
    let task = task_service::add(&data.db, body.into_inner()).await?;
    Ok(response::created(task, "Task added successfully"))
}

pub async fn get(data: web::Data<AppState>, id: web::Path<i64>) -> Result<HttpResponse> {
    let task = task_service::get(&data.db, id.into_inner()).await?;
    Ok(response::success(task, "Task retrieved successfully"))
}

pub async fn list(data: web::Data<AppState>, query: web::Query<TaskListQuery>) -> Result<HttpResponse> {
    let query = query.into_inner();
    let page = page_request(query.page, query.limit)?;
    let filter = TaskFilter {
        app_id: app_id_filter(query.app_id)?,
        status: query.status,
        search: search_filter(query.search),
    };

    let listing = task_service::list(&data.db, &filter, page).await?;
    Ok(response::success(listing, "All tasks retrieved successfully"))
}
