use actix_web::{HttpResponse, web};
use serde::Deserialize;

use super::{app_id_filter, page_request, search_filter};
use crate::errors::{ApiError, Result};
use crate::models::review::{MAX_RATING, MIN_RATING, NewReview, is_valid_rating};
use crate::response;
use crate::services::review::{self as review_service, ReviewFilter};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListQuery {
    pub app_id: Option<String>,
    pub rating: Option<i64>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn create(data: web::Data<AppState>, body: web::Json<NewReview>) -> Result<HttpResponse> {
    let review = review_service::add(&data.db, body.into_inner()).await?;
    Ok(response::created(review, "Review added successfully"))
}

pub async fn get(data: web::Data<AppState>, id: web::Path<i64>) -> Result<HttpResponse> {
    let review = review_service::get(&data.db, id.into_inner()).await?;
    Ok(response::success(review, "Review retrieved successfully"))
}

pub async fn list(
    data: web::Data<AppState>,
    query: web::Query<ReviewListQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let page = page_request(query.page, query.limit)?;

    if let Some(rating) = query.rating {
        if !is_valid_rating(rating) {
            return Err(ApiError::BadRequest(format!(
                "rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }
    }

    let filter = ReviewFilter {
        app_id: app_id_filter(query.app_id)?,
        rating: query.rating,
        search: search_filter(query.search),
    };

    let listing = review_service::list(&data.db, &filter, page).await?;
    Ok(response::success(listing, "All reviews retrieved successfully"))
}
