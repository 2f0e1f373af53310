pub mod application;
pub mod control;
pub mod log;
pub mod review;
pub mod system;
pub mod task;

use crate::errors::{ApiError, Result};
use crate::models::application::is_valid_app_id;
use crate::services::{DEFAULT_DAYS, DEFAULT_LIMIT, DEFAULT_PAGE, PageRequest};

pub const MAX_LIMIT: u32 = 100;
pub const MAX_DAYS: u32 = 365;

/// Bounds-checked page request: `page >= 1`, `1 <= limit <= 100`
pub fn page_request(page: Option<u32>, limit: Option<u32>) -> Result<PageRequest> {
    let page = page.unwrap_or(DEFAULT_PAGE);
    let limit = limit.unwrap_or(DEFAULT_LIMIT);

    if page < 1 {
        return Err(ApiError::BadRequest("page must be at least 1".to_string()));
    }
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }

    Ok(PageRequest { page, limit })
}

/// Bounds-checked window length: `1 <= days <= 365`
pub fn window_days(days: Option<u32>) -> Result<u32> {
    let days = days.unwrap_or(DEFAULT_DAYS);
    if !(1..=MAX_DAYS).contains(&days) {
        return Err(ApiError::BadRequest(format!(
            "days must be between 1 and {}",
            MAX_DAYS
        )));
    }
    Ok(days)
}

/// Optional AppId filter; empty strings mean "no filter"
pub fn app_id_filter(app_id: Option<String>) -> Result<Option<String>> {
    match app_id.filter(|id| !id.is_empty()) {
        Some(id) if !is_valid_app_id(&id) => Err(ApiError::BadRequest(
            "appId must be 6 uppercase letters or digits".to_string(),
        )),
        other => Ok(other),
    }
}

/// Optional free-text search; blank strings mean "no filter"
pub fn search_filter(search: Option<String>) -> Option<String> {
    search.filter(|s| !s.trim().is_empty())
}
