//! Best-effort outbound calls reporting lifecycle events to the sibling
//! log service
//!
//! Nothing in here may influence a response that is already prepared:
//! `dispatch` hands the call to a background task and failures end up in
//! the log only.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::log::{HttpMethod, LogType, default_ip, default_user_agent};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("notifier responded {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("notifier request timed out")]
    Timeout,
}

/// Payload of the sibling "create log" endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub app_id: String,
    pub app_name: String,
    pub log_type: LogType,
    pub message: String,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    pub endpoint: String,
    pub method: HttpMethod,
    pub user_agent: String,
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_data: Option<Value>,
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            NotifyError::Timeout
        } else {
            NotifyError::Http(e)
        }
    }
}

impl LogEvent {
    pub fn new(
        config: &Config,
        log_type: LogType,
        message: impl Into<String>,
        status_code: u16,
        endpoint: &str,
        method: HttpMethod,
    ) -> Self {
        Self {
            app_id: config.app_id.clone(),
            app_name: config.app_name.clone(),
            log_type,
            message: message.into(),
            status_code,
            response_time: None,
            endpoint: endpoint.to_string(),
            method,
            user_agent: default_user_agent(),
            ip: default_ip(),
            additional_data: None,
        }
    }

    pub fn with_response_time(mut self, elapsed: Duration) -> Self {
        self.response_time = Some(elapsed.as_millis() as u64);
        self
    }

    pub fn with_additional_data(mut self, data: Value) -> Self {
        self.additional_data = Some(data);
        self
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn create_log(&self, event: LogEvent) -> Result<(), NotifyError>;

    async fn update_app_health(&self, app_id: &str, healthy: bool) -> Result<(), NotifyError>;
}

/// reqwest-backed notifier
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: Client,
    base_url: String,
}

impl HttpNotifier {
    pub fn new(base_url: impl Into<String>, http_timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(http_timeout)
            .user_agent(format!("apphub-api/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<(), NotifyError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Notifying {}", url);

        let response = self.client.post(&url).json(body).send().await?;

        Self::handle_response(response).await
    }

    async fn handle_response(response: Response) -> Result<(), NotifyError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn create_log(&self, event: LogEvent) -> Result<(), NotifyError> {
        self.post("/api/v1/log", &event).await
    }

    async fn update_app_health(&self, app_id: &str, healthy: bool) -> Result<(), NotifyError> {
        let body = json!({ "appId": app_id, "healthy": healthy });
        self.post("/api/v1/application/health-update", &body).await
    }
}

/// Used when no sibling endpoint is configured
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn create_log(&self, event: LogEvent) -> Result<(), NotifyError> {
        debug!("Notifier disabled, dropping event: {}", event.message);
        Ok(())
    }

    async fn update_app_health(&self, _app_id: &str, _healthy: bool) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Pick the notifier for this configuration
pub fn from_config(config: &Config) -> Result<Arc<dyn Notifier>, NotifyError> {
    match config.notifier_base_url() {
        Some(url) => Ok(Arc::new(HttpNotifier::new(url, config.notifier_timeout)?)),
        None => {
            warn!("No notifier URL configured, lifecycle events will not be forwarded");
            Ok(Arc::new(NoopNotifier))
        }
    }
}

/// Fire-and-forget `create_log`
pub fn dispatch(notifier: Arc<dyn Notifier>, event: LogEvent) -> JoinHandle<()> {
    tokio::spawn(async move {
        let endpoint = event.endpoint.clone();
        if let Err(e) = notifier.create_log(event).await {
            warn!("Failed to forward log event for {}: {}", endpoint, e);
        }
    })
}

/// Fire-and-forget `update_app_health`
pub fn dispatch_health(notifier: Arc<dyn Notifier>, app_id: String, healthy: bool) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = notifier.update_app_health(&app_id, healthy).await {
            warn!("Failed to forward health update for {}: {}", app_id, e);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn event() -> LogEvent {
        LogEvent::new(
            &Config::default(),
            LogType::Success,
            "Health check passed",
            200,
            "/health",
            HttpMethod::Get,
        )
        .with_response_time(Duration::from_millis(12))
    }

    #[test]
    fn test_event_payload_shape() {
        let body = serde_json::to_value(event()).unwrap();
        assert_eq!(body["appId"], "SYSTEM");
        assert_eq!(body["logType"], "success");
        assert_eq!(body["method"], "GET");
        assert_eq!(body["responseTime"], 12);
        assert_eq!(body["userAgent"], "System-Internal/1.0");
        assert_eq!(body["ip"], "127.0.0.1");
        assert!(body.get("additionalData").is_none());
    }

    #[tokio::test]
    async fn test_create_log_posts_to_sibling() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/log"))
            .and(body_partial_json(json!({"endpoint": "/health", "statusCode": 200})))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = HttpNotifier::new(server.uri(), Duration::from_secs(2)).unwrap();
        notifier.create_log(event()).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejection_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/application/health-update"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Application not found"))
            .mount(&server)
            .await;

        let notifier = HttpNotifier::new(server.uri(), Duration::from_secs(2)).unwrap();
        let err = notifier.update_app_health("A1B2C3", true).await.unwrap_err();
        match err {
            NotifyError::Rejected { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "Application not found");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier: Arc<dyn Notifier> =
            Arc::new(HttpNotifier::new(server.uri(), Duration::from_secs(2)).unwrap());

        assert!(dispatch(notifier.clone(), event()).await.is_ok());
        assert!(dispatch_health(notifier, "A1B2C3".into(), false).await.is_ok());
    }

    #[tokio::test]
    async fn test_slow_sibling_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let notifier = HttpNotifier::new(server.uri(), Duration::from_millis(100)).unwrap();
        let err = notifier.create_log(event()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Timeout), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_unreachable_sibling_is_swallowed() {
        let notifier: Arc<dyn Notifier> =
            Arc::new(HttpNotifier::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap());
        assert!(dispatch(notifier, event()).await.is_ok());
    }
}
