use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{Timestamp, deserialize_iso_timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Inprogress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Pending, TaskStatus::Inprogress, TaskStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Inprogress => "inprogress",
            TaskStatus::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub app_id: String,
    pub description: String,
    pub status: TaskStatus,
    #[sqlx(try_from = "String")]
    pub date_to_finish: Timestamp,
    #[sqlx(try_from = "String")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "String")]
    pub updated_at: Timestamp,
    #[sqlx(default)]
    pub application_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub app_id: String,
    pub description: String,
    #[serde(default = "default_status")]
    pub status: TaskStatus,
    #[serde(deserialize_with = "deserialize_iso_timestamp")]
    pub date_to_finish: Timestamp,
}

fn default_status() -> TaskStatus {
    TaskStatus::Pending
}
