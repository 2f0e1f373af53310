use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{Timestamp, deserialize_iso_timestamp};

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub app_id: String,
    pub app_name: Option<String>,
    pub rating: i64,
    pub comment: String,
    pub reviewer: String,
    #[sqlx(try_from = "String")]
    pub date: Timestamp,
    #[sqlx(try_from = "String")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "String")]
    pub updated_at: Timestamp,
    #[sqlx(default)]
    pub application_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub app_id: String,
    #[serde(default)]
    pub app_name: Option<String>,
    pub rating: i64,
    pub comment: String,
    pub reviewer: String,
    #[serde(default = "Timestamp::now", deserialize_with = "deserialize_iso_timestamp")]
    pub date: Timestamp,
}

pub fn is_valid_rating(rating: i64) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&rating)
}
