//! Application registry, status/health bookkeeping and sample data

use chrono::{Duration, Utc};
use futures::try_join;
use rand::Rng;
use serde::Serialize;
use sqlx::types::Json;
use tracing::{info, instrument, warn};

use super::{log, review, task};
use crate::db::Db;
use crate::errors::{ApiError, Result};
use crate::models::Timestamp;
use crate::models::application::{
    APP_ID_CHARSET, APP_ID_LENGTH, AppStatus, Application, ApplicationDetail, NewApplication,
    Recent, is_valid_app_id,
};
use crate::models::log::{HttpMethod, LogEntry, LogType, NewLog};
use crate::models::review::{NewReview, Review};
use crate::models::task::{NewTask, Task, TaskStatus};

const MAX_GENERATION_ATTEMPTS: usize = 100;
const RECENT_ITEMS: u32 = 5;
const DEFAULT_BG: &str = "#3B82F6";

#[derive(Debug, Clone, Serialize)]
pub struct SampleDetails {
    pub logs: Vec<LogEntry>,
    pub tasks: Vec<Task>,
    pub reviews: Vec<Review>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleData {
    pub logs: usize,
    pub tasks: usize,
    pub reviews: usize,
    pub details: SampleDetails,
}

fn random_app_id() -> String {
    let mut rng = rand::rng();
    (0..APP_ID_LENGTH)
        .map(|_| APP_ID_CHARSET[rng.random_range(0..APP_ID_CHARSET.len())] as char)
        .collect()
}

async fn app_id_exists(db: &Db, app_id: &str) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM applications WHERE app_id = ?")
        .bind(app_id)
        .fetch_optional(db.pool())
        .await?;
    Ok(found.is_some())
}

/// Fresh AppId not used by any registered application
pub async fn generate_app_id(db: &Db) -> Result<String> {
    for _ in 0..MAX_GENERATION_ATTEMPTS {
        let candidate = random_app_id();
        if !app_id_exists(db, &candidate).await? {
            return Ok(candidate);
        }
    }

    Err(ApiError::Internal(
        "Unable to generate unique appId after maximum attempts".to_string(),
    ))
}

#[instrument(skip(db, new), fields(name = %new.name))]
pub async fn register(db: &Db, new: NewApplication) -> Result<Application> {
    if new.name.trim().is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }

    let app_id = match new.app_id.as_deref().filter(|id| !id.is_empty()) {
        Some(app_id) => {
            if !is_valid_app_id(app_id) {
                return Err(ApiError::Validation(
                    "appId must be 6 uppercase letters or digits".to_string(),
                ));
            }
            if app_id_exists(db, app_id).await? {
                return Err(ApiError::Validation(
                    "Application with this appId already exists".to_string(),
                ));
            }
            app_id.to_string()
        }
        None => generate_app_id(db).await?,
    };

    let now = Timestamp::now().to_db();
    sqlx::query(
        "INSERT INTO applications (app_id, name, description, bg, link, stacks, on_going, status, \
         uptime, downtime, last_checked, backend_url, frontend_url, github_url, images, \
         created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&app_id)
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.bg.as_deref().unwrap_or(DEFAULT_BG))
    .bind(&new.link)
    .bind(&new.stacks)
    .bind(new.on_going.unwrap_or(true))
    .bind(new.status.unwrap_or(AppStatus::Running))
    .bind(new.uptime)
    .bind(new.downtime)
    .bind(&now)
    .bind(&new.backend_url)
    .bind(&new.frontend_url)
    .bind(&new.github_url)
    .bind(Json(&new.images))
    .bind(&now)
    .bind(&now)
    .execute(db.pool())
    .await?;

    info!("Registered application {}", app_id);
    find(db, &app_id).await
}

pub async fn find(db: &Db, app_id: &str) -> Result<Application> {
    sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE app_id = ?")
        .bind(app_id)
        .fetch_optional(db.pool())
        .await?
        .ok_or_else(|| ApiError::not_found("Application"))
}

pub async fn list(db: &Db) -> Result<Vec<Application>> {
    let applications = sqlx::query_as::<_, Application>(
        "SELECT * FROM applications ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(db.pool())
    .await?;
    Ok(applications)
}

/// Application with its five most recent logs, tasks and reviews
#[instrument(skip(db))]
pub async fn detail(db: &Db, app_id: &str) -> Result<ApplicationDetail> {
    let application = find(db, app_id).await?;

    let (logs, tasks, reviews, logs_total, tasks_total, reviews_total) = try_join!(
        log::get_by_app_id(db, app_id, Some(RECENT_ITEMS)),
        task::get_by_app_id(db, app_id, Some(RECENT_ITEMS)),
        review::get_by_app_id(db, app_id, Some(RECENT_ITEMS)),
        log::count_by_app_id(db, app_id),
        task::count_by_app_id(db, app_id),
        review::count_by_app_id(db, app_id)
    )?;

    Ok(ApplicationDetail {
        application,
        logs: Recent {
            items: logs,
            total: logs_total,
        },
        tasks: Recent {
            items: tasks,
            total: tasks_total,
        },
        reviews: Recent {
            items: reviews,
            total: reviews_total,
        },
    })
}

pub async fn update_status(db: &Db, app_id: &str, status: AppStatus) -> Result<Application> {
    let result = sqlx::query("UPDATE applications SET status = ?, updated_at = ? WHERE app_id = ?")
        .bind(status)
        .bind(Timestamp::now().to_db())
        .bind(app_id)
        .execute(db.pool())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Application"));
    }

    info!("Application {} is now {}", app_id, status.as_str());
    find(db, app_id).await
}

/// Record one health check result: healthy means running with one more uptime
/// tick, unhealthy means stopped with one more downtime tick
#[instrument(skip(db))]
pub async fn update_health(db: &Db, app_id: &str, healthy: bool) -> Result<Application> {
    let now = Timestamp::now().to_db();
    let query = if healthy {
        "UPDATE applications SET status = 'running', uptime = uptime + 1, last_checked = ?, \
         updated_at = ? WHERE app_id = ?"
    } else {
        "UPDATE applications SET status = 'stopped', downtime = downtime + 1, last_checked = ?, \
         updated_at = ? WHERE app_id = ?"
    };

    let result = sqlx::query(query)
        .bind(&now)
        .bind(&now)
        .bind(app_id)
        .execute(db.pool())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Application"));
    }

    if !healthy {
        warn!("Application {} reported unhealthy", app_id);
    }
    find(db, app_id).await
}

/// Remove the application row. Its logs, tasks and reviews stay as orphans.
pub async fn delete(db: &Db, app_id: &str) -> Result<Application> {
    let application = find(db, app_id).await?;

    sqlx::query("DELETE FROM applications WHERE app_id = ?")
        .bind(app_id)
        .execute(db.pool())
        .await?;

    info!("Deleted application {}", app_id);
    Ok(application)
}

fn sample_logs(application: &Application) -> Vec<NewLog> {
    [
        (
            LogType::Success,
            "User authentication successful",
            200,
            145,
            "/api/auth/login",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
            "192.168.1.100",
            HttpMethod::Post,
        ),
        (
            LogType::Error,
            "Database connection failed",
            500,
            5000,
            "/api/users",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36",
            "192.168.1.101",
            HttpMethod::Get,
        ),
        (
            LogType::Info,
            "New user registered successfully",
            201,
            230,
            "/api/users/register",
            "Mozilla/5.0 (iPhone; CPU iPhone OS 14_0 like Mac OS X) AppleWebKit/605.1.15",
            "192.168.1.102",
            HttpMethod::Post,
        ),
    ]
    .into_iter()
    .map(
        |(log_type, message, status_code, response_time, endpoint, user_agent, ip, method)| NewLog {
            app_id: application.app_id.clone(),
            app_name: application.name.clone(),
            log_type,
            message: message.to_string(),
            status_code,
            response_time,
            endpoint: endpoint.to_string(),
            user_agent: user_agent.to_string(),
            ip: ip.to_string(),
            method,
            additional_data: None,
        },
    )
    .collect()
}

fn sample_tasks(app_id: &str) -> Vec<NewTask> {
    let now = Utc::now();
    [
        ("Update API documentation for authentication endpoints", TaskStatus::Pending, 14),
        ("Fix database connection timeout issues", TaskStatus::Inprogress, 7),
        ("Implement user profile image upload feature", TaskStatus::Done, -7),
    ]
    .into_iter()
    .map(|(description, status, days)| NewTask {
        app_id: app_id.to_string(),
        description: description.to_string(),
        status,
        date_to_finish: Timestamp(now + Duration::days(days)),
    })
    .collect()
}

fn sample_reviews(app_id: &str) -> Vec<NewReview> {
    let now = Utc::now();
    [
        (5, "Excellent application! Very user-friendly and fast performance.", "John Doe", 1),
        (4, "Great app overall, but could use some UI improvements.", "Jane Smith", 3),
        (5, "Love the new features! The authentication system is robust.", "Mike Johnson", 6),
    ]
    .into_iter()
    .map(|(rating, comment, reviewer, days_ago)| NewReview {
        app_id: app_id.to_string(),
        app_name: None,
        rating,
        comment: comment.to_string(),
        reviewer: reviewer.to_string(),
        date: Timestamp(now - Duration::days(days_ago)),
    })
    .collect()
}

/// Seed three logs, three tasks and three reviews for an application
#[instrument(skip(db))]
pub async fn create_sample_data(db: &Db, app_id: &str) -> Result<SampleData> {
    let application = find(db, app_id).await?;

    let mut logs = Vec::new();
    for new in sample_logs(&application) {
        logs.push(log::add(db, new).await?);
    }

    let mut tasks = Vec::new();
    for new in sample_tasks(app_id) {
        tasks.push(task::add(db, new).await?);
    }

    let mut reviews = Vec::new();
    for new in sample_reviews(app_id) {
        reviews.push(review::add(db, new).await?);
    }

    info!(
        "Seeded {} logs, {} tasks, {} reviews for {}",
        logs.len(),
        tasks.len(),
        reviews.len(),
        app_id
    );

    Ok(SampleData {
        logs: logs.len(),
        tasks: tasks.len(),
        reviews: reviews.len(),
        details: SampleDetails {
            logs,
            tasks,
            reviews,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_well_formed() {
        for _ in 0..50 {
            assert!(is_valid_app_id(&random_app_id()));
        }
    }

    #[tokio::test]
    async fn test_register_defaults_and_health_ticks() {
        let db = Db::in_memory().await.unwrap();
        let app = register(
            &db,
            NewApplication {
                name: "Shop".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(is_valid_app_id(&app.app_id));
        assert_eq!(app.status, AppStatus::Running);
        assert_eq!(app.bg, DEFAULT_BG);
        assert!(app.on_going);

        let app = update_health(&db, &app.app_id, false).await.unwrap();
        assert_eq!(app.status, AppStatus::Stopped);
        assert_eq!(app.downtime, 1);

        let app = update_health(&db, &app.app_id, true).await.unwrap();
        assert_eq!(app.status, AppStatus::Running);
        assert_eq!(app.uptime, 1);
    }

    #[tokio::test]
    async fn test_duplicate_app_id_is_rejected() {
        let db = Db::in_memory().await.unwrap();
        let new = NewApplication {
            app_id: Some("A1B2C3".into()),
            name: "Shop".into(),
            ..Default::default()
        };
        register(&db, new.clone()).await.unwrap();
        assert!(matches!(register(&db, new).await, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_missing_application_is_not_found() {
        let db = Db::in_memory().await.unwrap();
        assert!(matches!(
            update_status(&db, "ZZZZZZ", AppStatus::Maintenance).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(create_sample_data(&db, "ZZZZZZ").await, Err(ApiError::NotFound(_))));
    }
}
