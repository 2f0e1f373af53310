//! Route table and extractor configuration

use actix_web::{HttpResponse, web};
use actix_web::http::StatusCode;

use crate::controllers::{application, control, log, review, system, task};
use crate::errors::ApiError;
use crate::gate::{HEALTH_PATH, MAINTENANCE_PATH, START_PATH, STOP_PATH};
use crate::response;

pub const API_PREFIX: &str = "/api/v1";

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(10 * 1024 * 1024)
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

async fn not_found() -> HttpResponse {
    response::failure(StatusCode::NOT_FOUND, "Route not found", None)
}

fn application_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(application::create))
        .route("", web::get().to(application::list))
        .route("/generateAppId", web::post().to(application::generate_app_id))
        .route("/health-update", web::post().to(application::health_update))
        .route("/{app_id}", web::get().to(application::get))
        .route("/{app_id}", web::delete().to(application::delete))
        .route("/{app_id}/status", web::patch().to(application::update_status))
        .route("/{app_id}/sample-data", web::post().to(application::sample_data));
}

fn log_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(log::create))
        .route("", web::get().to(log::list))
        .route("/trends", web::get().to(log::trends))
        .route("/analytics", web::get().to(log::analytics))
        .route("/bulk", web::delete().to(log::delete_bulk))
        .route("/all", web::delete().to(log::delete_all))
        .route("/{id}", web::get().to(log::get))
        .route("/{id}", web::put().to(log::update))
        .route("/{id}", web::delete().to(log::delete));
}

fn task_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(task::create))
        .route("", web::get().to(task::list))
        .route("/{id}", web::get().to(task::get));
}

fn review_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(review::create))
        .route("", web::get().to(review::list))
        .route("/{id}", web::get().to(review::get));
}

fn system_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/counts", web::get().to(system::counts))
        .route("/stats", web::get().to(system::stats))
        .route("/health", web::get().to(system::health))
        .route("/metrics", web::get().to(system::metrics))
        .route("/export", web::get().to(system::export))
        .route("/delete-all", web::delete().to(system::delete_all))
        .route("/reset", web::post().to(system::reset));
}

/// Control endpoints at the root, resources under `/api/v1`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(query_config())
        .app_data(json_config())
        .app_data(path_config())
        .route("/", web::get().to(control::index))
        .route(HEALTH_PATH, web::get().to(control::health))
        .route(START_PATH, web::post().to(control::start))
        .route(STOP_PATH, web::post().to(control::stop))
        .route(MAINTENANCE_PATH, web::post().to(control::maintenance))
        .service(
            web::scope(API_PREFIX)
                .service(web::scope("/application").configure(application_routes))
                .service(web::scope("/log").configure(log_routes))
                .service(web::scope("/task").configure(task_routes))
                .service(web::scope("/review").configure(review_routes))
                .service(web::scope("/system").configure(system_routes)),
        )
        .default_service(web::to(not_found));
}
