use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use sqlx::types::Json;
use std::fmt;

use super::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum LogType {
    Success,
    Error,
    Info,
    Warning,
}

impl LogType {
    pub const ALL: [LogType; 4] = [LogType::Success, LogType::Error, LogType::Info, LogType::Warning];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::Success => "success",
            LogType::Error => "error",
            LogType::Info => "info",
            LogType::Warning => "warning",
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
        };
        f.write_str(s)
    }
}

/// Stored log record. `application_name` is filled by the lookup join and
/// stays `None` for orphaned records.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: i64,
    pub app_id: String,
    pub app_name: String,
    pub log_type: LogType,
    pub message: String,
    pub status_code: i64,
    pub response_time: i64,
    pub endpoint: String,
    pub user_agent: String,
    pub ip: String,
    pub method: HttpMethod,
    pub additional_data: Option<Json<Value>>,
    #[sqlx(try_from = "String")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "String")]
    pub updated_at: Timestamp,
    #[sqlx(default)]
    pub application_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLog {
    pub app_id: String,
    pub app_name: String,
    pub log_type: LogType,
    pub message: String,
    pub status_code: i64,
    #[serde(default)]
    pub response_time: i64,
    pub endpoint: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_ip")]
    pub ip: String,
    #[serde(default = "default_method")]
    pub method: HttpMethod,
    #[serde(default, deserialize_with = "deserialize_additional_data")]
    pub additional_data: Option<Value>,
}

pub fn default_user_agent() -> String {
    "System-Internal/1.0".to_string()
}

pub fn default_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_method() -> HttpMethod {
    HttpMethod::Get
}

/// Accepts either a JSON value or a string holding JSON text. Strings that
/// do not parse are rejected.
fn deserialize_additional_data<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("additionalData is not valid JSON: {}", e))),
        Some(other) => Ok(Some(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(additional: Value) -> Value {
        json!({
            "appId": "A1B2C3",
            "appName": "Shop",
            "logType": "error",
            "message": "boom",
            "statusCode": 500,
            "endpoint": "/api/orders",
            "additionalData": additional,
        })
    }

    #[test]
    fn test_new_log_defaults() {
        let log: NewLog = serde_json::from_value(payload(Value::Null)).unwrap();
        assert_eq!(log.log_type, LogType::Error);
        assert_eq!(log.method, HttpMethod::Get);
        assert_eq!(log.user_agent, "System-Internal/1.0");
        assert!(log.additional_data.is_none());
    }

    #[test]
    fn test_additional_data_accepts_json_text() {
        let log: NewLog = serde_json::from_value(payload(json!("{\"retries\":3}"))).unwrap();
        assert_eq!(log.additional_data, Some(json!({"retries": 3})));

        let log: NewLog = serde_json::from_value(payload(json!([1, 2]))).unwrap();
        assert_eq!(log.additional_data, Some(json!([1, 2])));
    }

    #[test]
    fn test_additional_data_rejects_broken_text() {
        let result = serde_json::from_value::<NewLog>(payload(json!("{not json")));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_log_type_is_rejected() {
        let mut body = payload(Value::Null);
        body["logType"] = json!("fatal");
        assert!(serde_json::from_value::<NewLog>(body).is_err());
    }
}
