#![allow(dead_code)]

use actix_web::web;
use apphub_api::db::Db;
use apphub_api::notifier::{LogEvent, Notifier, NotifyError};
use apphub_api::{AppState, Config};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Captures outbound notifications instead of sending them
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<LogEvent>>,
    pub health: Mutex<Vec<(String, bool)>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Polls until at least `count` events arrived or a second passed
    pub async fn wait_for_events(&self, count: usize) -> Vec<LogEvent> {
        for _ in 0..50 {
            let events = self.events();
            if events.len() >= count {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.events()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn create_log(&self, event: LogEvent) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }

    async fn update_app_health(&self, app_id: &str, healthy: bool) -> Result<(), NotifyError> {
        self.health.lock().unwrap().push((app_id.to_string(), healthy));
        Ok(())
    }
}

pub async fn state() -> (web::Data<AppState>, Arc<RecordingNotifier>) {
    let db = Db::in_memory().await.unwrap();
    let recorder = Arc::new(RecordingNotifier::default());
    let config = Config {
        app_id: "APPHUB".to_string(),
        app_name: "AppHub".to_string(),
        ..Config::default()
    };
    let state = web::Data::new(AppState::new(db, recorder.clone(), config));
    (state, recorder)
}

/// Full application: routes behind the admission gate
#[macro_export]
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($state.clone())
                .configure(apphub_api::routes::configure)
                .wrap(actix_web::middleware::from_fn(apphub_api::gate::admission)),
        )
        .await
    };
}

pub fn log_body(app_id: &str, log_type: &str, response_time: i64) -> Value {
    json!({
        "appId": app_id,
        "appName": "Portal",
        "logType": log_type,
        "message": format!("{} event", log_type),
        "statusCode": if log_type == "error" { 500 } else { 200 },
        "responseTime": response_time,
        "endpoint": "/api/items",
        "method": "GET",
    })
}

pub fn review_body(app_id: &str, rating: i64) -> Value {
    json!({
        "appId": app_id,
        "rating": rating,
        "comment": "Solid release",
        "reviewer": "Sam",
    })
}
