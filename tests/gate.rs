#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use apphub_api::models::log::LogType;
use serde_json::{Value, json};

#[actix_web::test]
async fn test_stopped_service_rejects_everything_but_start() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post().uri("/stop").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    for (method, uri) in [("GET", "/api/v1/log"), ("GET", "/health"), ("POST", "/stop")] {
        let req = match method {
            "GET" => test::TestRequest::get(),
            _ => test::TestRequest::post(),
        }
        .uri(uri)
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE, "{} {}", method, uri);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(
            body["message"],
            json!("Service is currently stopped. Use POST /start to resume service.")
        );
    }

    let req = test::TestRequest::post().uri("/start").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], json!("Service started successfully"));
    assert_eq!(body["data"]["status"], json!("running"));

    let req = test::TestRequest::get().uri("/api/v1/log").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_start_when_running_is_a_noop() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post().uri("/start").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], json!("Service is already running"));
    assert_eq!(body["data"]["status"], json!("running"));
}

#[actix_web::test]
async fn test_maintenance_without_body_enables_it() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post().uri("/maintenance").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["maintenanceMode"], json!(true));

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/api/v1/log").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], json!("Service is under maintenance"));

    let req = test::TestRequest::post()
        .uri("/maintenance")
        .set_json(json!({ "enable": false }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["maintenanceMode"], json!(false));

    let req = test::TestRequest::get().uri("/api/v1/log").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_start_clears_maintenance_after_stop() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    for uri in ["/maintenance", "/stop", "/start"] {
        let req = test::TestRequest::post().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
    }

    let snapshot = state.gate.snapshot();
    assert!(!snapshot.stopped);
    assert!(!snapshot.maintenance_mode);
}

#[actix_web::test]
async fn test_lifecycle_events_reach_the_notifier() {
    let (state, recorder) = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post().uri("/stop").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let events = recorder.wait_for_events(1).await;
    let stop = events
        .iter()
        .find(|event| event.endpoint == "/stop")
        .expect("stop event recorded");
    assert_eq!(stop.app_id, "APPHUB");
    assert_eq!(stop.log_type, LogType::Warning);
    assert_eq!(stop.status_code, 200);
    assert_eq!(
        stop.additional_data,
        Some(json!({ "stopped": true, "maintenanceMode": false }))
    );
}

#[actix_web::test]
async fn test_health_reports_database_and_own_status() {
    let (state, recorder) = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], json!("Service is healthy"));
    assert_eq!(body["data"]["database"], json!("connected"));

    for _ in 0..50 {
        if !recorder.health.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    let health = recorder.health.lock().unwrap().clone();
    assert_eq!(health, vec![("APPHUB".to_string(), true)]);
}
