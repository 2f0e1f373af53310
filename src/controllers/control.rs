//! Root-level control endpoints: health, start, stop, maintenance

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::gate::{HEALTH_PATH, MAINTENANCE_PATH, START_PATH, STOP_PATH, StartOutcome};
use crate::models::log::{HttpMethod, LogType};
use crate::notifier::{self, LogEvent};
use crate::response;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct MaintenanceRequest {
    pub enable: Option<bool>,
}

fn notify(
    state: &AppState,
    log_type: LogType,
    message: &str,
    status: StatusCode,
    endpoint: &str,
    started: Instant,
) {
    let mut event = LogEvent::new(
        &state.config,
        log_type,
        message,
        status.as_u16(),
        endpoint,
        if endpoint == HEALTH_PATH {
            HttpMethod::Get
        } else {
            HttpMethod::Post
        },
    )
    .with_response_time(started.elapsed());

    // Transitions carry the gate flags they produced
    if endpoint != HEALTH_PATH {
        match serde_json::to_value(state.gate.snapshot()) {
            Ok(gate) => event = event.with_additional_data(gate),
            Err(e) => warn!("Gate state not attached to {} event: {}", endpoint, e),
        }
    }

    notifier::dispatch(state.notifier.clone(), event);
}

/// Report this service's own health check result to the sibling registry
fn notify_health(state: &AppState, healthy: bool) {
    notifier::dispatch_health(state.notifier.clone(), state.config.app_id.clone(), healthy);
}

// Service banner
pub async fn index(data: web::Data<AppState>) -> HttpResponse {
    response::success(
        json!({
            "name": data.config.app_name,
            "timestamp": Utc::now().to_rfc3339(),
            "environment": data.config.environment,
        }),
        "AppHub API is running",
    )
}

// Liveness plus database connectivity
pub async fn health(data: web::Data<AppState>) -> HttpResponse {
    let started = Instant::now();

    match data.db.ping().await {
        Ok(()) => {
            notify(
                &data,
                LogType::Success,
                "Health check passed",
                StatusCode::OK,
                HEALTH_PATH,
                started,
            );
            notify_health(&data, true);
            response::success(
                json!({
                    "status": "healthy",
                    "database": "connected",
                    "timestamp": Utc::now().to_rfc3339(),
                    "uptime": data.uptime().as_secs_f64(),
                }),
                "Service is healthy",
            )
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            notify(
                &data,
                LogType::Error,
                "Health check failed",
                StatusCode::INTERNAL_SERVER_ERROR,
                HEALTH_PATH,
                started,
            );
            notify_health(&data, false);
            response::failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Health check failed",
                Some(json!({ "database": "disconnected", "error": e.to_string() })),
            )
        }
    }
}

pub async fn start(data: web::Data<AppState>) -> HttpResponse {
    let started = Instant::now();
    let message = match data.gate.start() {
        StartOutcome::Started => {
            info!("Service started");
            notify(
                &data,
                LogType::Info,
                "Service started",
                StatusCode::OK,
                START_PATH,
                started,
            );
            "Service started successfully"
        }
        StartOutcome::AlreadyRunning => "Service is already running",
    };

    response::success(
        json!({ "status": "running", "timestamp": Utc::now().to_rfc3339() }),
        message,
    )
}

pub async fn stop(data: web::Data<AppState>) -> HttpResponse {
    let started = Instant::now();
    data.gate.stop();
    info!("Service stopped");
    notify(
        &data,
        LogType::Warning,
        "Service stopped",
        StatusCode::OK,
        STOP_PATH,
        started,
    );

    response::success(
        json!({ "status": "stopped", "timestamp": Utc::now().to_rfc3339() }),
        "Service stopped successfully",
    )
}

/// Missing or unreadable bodies enable maintenance; only an explicit
/// `{"enable": false}` disables it
pub async fn maintenance(
    data: web::Data<AppState>,
    body: Option<web::Json<MaintenanceRequest>>,
) -> HttpResponse {
    let started = Instant::now();
    let enable = body.and_then(|b| b.enable) != Some(false);
    let enabled = data.gate.set_maintenance(enable);

    let message = if enabled {
        "Maintenance mode enabled"
    } else {
        "Maintenance mode disabled"
    };
    info!("{}", message);
    notify(
        &data,
        LogType::Info,
        message,
        StatusCode::OK,
        MAINTENANCE_PATH,
        started,
    );

    response::success(
        json!({ "maintenanceMode": enabled, "timestamp": Utc::now().to_rfc3339() }),
        message,
    )
}
