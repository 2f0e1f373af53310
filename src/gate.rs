//! Process-wide admission control (stopped / maintenance)
//!
//! The gate is evaluated before routing on every request. State lives in
//! memory only and resets to "running" on restart.

use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::middleware::Next;
use actix_web::{Error, HttpResponse, web};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::state::AppState;

pub const HEALTH_PATH: &str = "/health";
pub const START_PATH: &str = "/start";
pub const STOP_PATH: &str = "/stop";
pub const MAINTENANCE_PATH: &str = "/maintenance";

/// Paths that stay reachable while maintenance mode is on
pub const MAINTENANCE_ALLOW_LIST: [&str; 4] = [HEALTH_PATH, START_PATH, STOP_PATH, MAINTENANCE_PATH];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateState {
    pub stopped: bool,
    pub maintenance_mode: bool,
}

/// Outcome of evaluating one request path against a gate snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allow,
    Stopped,
    Maintenance,
}

impl GateState {
    pub fn admit(&self, path: &str) -> Admission {
        if self.stopped && path != START_PATH {
            return Admission::Stopped;
        }

        if self.maintenance_mode && !MAINTENANCE_ALLOW_LIST.contains(&path) {
            return Admission::Maintenance;
        }

        Admission::Allow
    }
}

/// What a `start` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// Shared handle to the gate flags
#[derive(Debug, Clone, Default)]
pub struct ServiceGate {
    inner: Arc<Mutex<GateState>>,
}

impl ServiceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent copy of both flags
    pub fn snapshot(&self) -> GateState {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear both flags. A no-op when the service is not stopped.
    pub fn start(&self) -> StartOutcome {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.stopped {
            return StartOutcome::AlreadyRunning;
        }
        state.stopped = false;
        state.maintenance_mode = false;
        StartOutcome::Started
    }

    pub fn stop(&self) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.stopped = true;
    }

    /// Returns the new maintenance flag
    pub fn set_maintenance(&self, enable: bool) -> bool {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.maintenance_mode = enable;
        state.maintenance_mode
    }
}

/// Middleware rejecting traffic with 503 according to the gate state
pub async fn admission<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<BoxBody>, Error>
where
    B: MessageBody + 'static,
{
    let verdict = req
        .app_data::<web::Data<AppState>>()
        .map(|state| state.gate.snapshot().admit(req.path()))
        .unwrap_or(Admission::Allow);

    let message = match verdict {
        Admission::Allow => {
            return next.call(req).await.map(ServiceResponse::map_into_boxed_body);
        }
        Admission::Stopped => "Service is currently stopped. Use POST /start to resume service.",
        Admission::Maintenance => "Service is under maintenance",
    };

    debug!("Gate rejected {} {}: {:?}", req.method(), req.path(), verdict);

    let status = StatusCode::SERVICE_UNAVAILABLE;
    let response = HttpResponse::build(status).json(json!({
        "success": false,
        "message": message,
        "statusCode": status.as_u16(),
        "timestamp": Utc::now().to_rfc3339(),
    }));

    Ok(req.into_response(response))
}
