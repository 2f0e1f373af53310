use futures::future::try_join_all;
use futures::try_join;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite};
use std::collections::BTreeMap;
use tracing::{info, instrument};

use super::{PageRequest, count_rows, ensure_app_id, round2};
use crate::db::{Conditions, Db};
use crate::errors::{ApiError, Result};
use crate::models::Timestamp;
use crate::models::review::{MAX_RATING, MIN_RATING, NewReview, Review, is_valid_rating};
use crate::response::Pagination;

const FROM_REVIEWS: &str = "reviews r";
const SELECT_WITH_APPLICATION: &str = "SELECT r.*, a.name AS application_name FROM reviews r \
     LEFT JOIN applications a ON a.app_id = r.app_id";

#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub app_id: Option<String>,
    pub rating: Option<i64>,
    pub search: Option<String>,
}

impl ReviewFilter {
    fn conditions(&self) -> Conditions {
        Conditions::new("r")
            .eq_opt("app_id", self.app_id.clone())
            .eq_opt("rating", self.rating)
            .search(&["comment", "reviewer"], self.search.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub total_reviews: i64,
    pub average_rating: f64,
    pub five_star_reviews: i64,
    pub low_ratings: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingStats {
    /// Star value to count, every star present
    pub distribution: BTreeMap<i64, i64>,
    pub summary: RatingSummary,
}

impl RatingStats {
    /// Build from per-star counts, index 0 holding one-star reviews
    pub fn from_buckets(buckets: &[i64]) -> Self {
        let distribution: BTreeMap<i64, i64> = (MIN_RATING..=MAX_RATING)
            .zip(buckets.iter().copied().chain(std::iter::repeat(0)))
            .collect();

        let total_reviews: i64 = distribution.values().sum();
        let weighted: i64 = distribution.iter().map(|(star, count)| star * count).sum();
        let average_rating = if total_reviews > 0 {
            round2(weighted as f64 / total_reviews as f64)
        } else {
            0.0
        };

        let count_of = |star: i64| distribution.get(&star).copied().unwrap_or(0);
        let summary = RatingSummary {
            total_reviews,
            average_rating,
            five_star_reviews: count_of(5),
            low_ratings: count_of(1) + count_of(2),
        };

        Self {
            distribution,
            summary,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListing {
    pub items: Vec<Review>,
    pub pagination: Pagination,
    pub rating_stats: RatingStats,
}

#[instrument(skip(db, new), fields(app_id = %new.app_id))]
pub async fn add(db: &Db, new: NewReview) -> Result<Review> {
    ensure_app_id(&new.app_id)?;
    if !is_valid_rating(new.rating) {
        return Err(ApiError::Validation(format!(
            "rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )));
    }

    let now = Timestamp::now().to_db();
    let result = sqlx::query(
        "INSERT INTO reviews (app_id, app_name, rating, comment, reviewer, date, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&new.app_id)
    .bind(&new.app_name)
    .bind(new.rating)
    .bind(&new.comment)
    .bind(&new.reviewer)
    .bind(new.date.to_db())
    .bind(&now)
    .bind(&now)
    .execute(db.pool())
    .await?;

    let id = result.last_insert_rowid();
    info!("Stored {}-star review {}", new.rating, id);
    get(db, id).await
}

pub async fn get(db: &Db, id: i64) -> Result<Review> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_WITH_APPLICATION);
    Conditions::new("r").eq("id", id).push_where(&mut qb);

    qb.build_query_as::<Review>()
        .fetch_optional(db.pool())
        .await?
        .ok_or_else(|| ApiError::not_found("Review"))
}

/// Filtered page with rating statistics over the base set without the
/// `rating` filter
#[instrument(skip(db))]
pub async fn list(db: &Db, filter: &ReviewFilter, page: PageRequest) -> Result<ReviewListing> {
    let conditions = filter.conditions();
    let base = conditions.without("rating");

    let buckets = try_join_all(
        (MIN_RATING..=MAX_RATING).map(|star| count_rows(db, FROM_REVIEWS, base.clone().eq("rating", star))),
    );

    let (items, total, buckets) = try_join!(
        fetch_page(db, &conditions, page),
        count_rows(db, FROM_REVIEWS, conditions.clone()),
        buckets
    )?;

    Ok(ReviewListing {
        items,
        pagination: page.pagination(total),
        rating_stats: RatingStats::from_buckets(&buckets),
    })
}

async fn fetch_page(db: &Db, conditions: &Conditions, page: PageRequest) -> Result<Vec<Review>> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_WITH_APPLICATION);
    conditions.push_where(&mut qb);
    qb.push(" ORDER BY r.created_at DESC, r.id DESC LIMIT ")
        .push_bind(i64::from(page.limit))
        .push(" OFFSET ")
        .push_bind(page.offset());

    Ok(qb.build_query_as::<Review>().fetch_all(db.pool()).await?)
}

pub async fn get_by_app_id(db: &Db, app_id: &str, limit: Option<u32>) -> Result<Vec<Review>> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_WITH_APPLICATION);
    Conditions::new("r").eq("app_id", app_id).push_where(&mut qb);
    qb.push(" ORDER BY r.created_at DESC, r.id DESC");
    if let Some(limit) = limit {
        qb.push(" LIMIT ").push_bind(i64::from(limit));
    }

    Ok(qb.build_query_as::<Review>().fetch_all(db.pool()).await?)
}

pub async fn count_by_app_id(db: &Db, app_id: &str) -> Result<i64> {
    count_rows(db, FROM_REVIEWS, Conditions::new("r").eq("app_id", app_id)).await
}
