use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

use super::Timestamp;
use super::log::LogEntry;
use super::review::Review;
use super::task::Task;

pub const APP_ID_LENGTH: usize = 6;
pub const APP_ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AppStatus {
    Running,
    Stopped,
    Maintenance,
}

impl AppStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppStatus::Running => "running",
            AppStatus::Stopped => "stopped",
            AppStatus::Maintenance => "maintenance",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationImages {
    #[serde(default)]
    pub small: Vec<String>,
    #[serde(default)]
    pub large: Vec<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: i64,
    pub app_id: String,
    pub name: String,
    pub description: String,
    pub bg: String,
    pub link: String,
    pub stacks: String,
    pub on_going: bool,
    pub status: AppStatus,
    pub uptime: i64,
    pub downtime: i64,
    #[sqlx(try_from = "String")]
    pub last_checked: Timestamp,
    pub backend_url: String,
    pub frontend_url: String,
    pub github_url: String,
    pub images: Json<ApplicationImages>,
    #[sqlx(try_from = "String")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "String")]
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplication {
    #[serde(default)]
    pub app_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub bg: Option<String>,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub stacks: String,
    #[serde(default)]
    pub on_going: Option<bool>,
    #[serde(default)]
    pub status: Option<AppStatus>,
    #[serde(default)]
    pub uptime: i64,
    #[serde(default)]
    pub downtime: i64,
    #[serde(default)]
    pub backend_url: String,
    #[serde(default)]
    pub frontend_url: String,
    #[serde(default)]
    pub github_url: String,
    #[serde(default)]
    pub images: ApplicationImages,
}

/// A slice of related records plus the full count
#[derive(Debug, Clone, Serialize)]
pub struct Recent<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationDetail {
    #[serde(flatten)]
    pub application: Application,
    pub logs: Recent<LogEntry>,
    pub tasks: Recent<Task>,
    pub reviews: Recent<Review>,
}

/// An AppId is exactly six characters from `[A-Z0-9]`
pub fn is_valid_app_id(app_id: &str) -> bool {
    app_id.len() == APP_ID_LENGTH && app_id.bytes().all(|b| APP_ID_CHARSET.contains(&b))
}
