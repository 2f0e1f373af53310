#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::{Value, json};

use common::{log_body, review_body};

const APP_ID: &str = "A1B2C3";

macro_rules! post_json {
    ($app:expr, $uri:expr, $body:expr $(,)?) => {{
        let req = test::TestRequest::post().uri($uri).set_json($body).to_request();
        test::call_service(&$app, req).await.status()
    }};
}

#[actix_web::test]
async fn test_log_facets_ignore_type_filter() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    for log_type in ["error", "error", "success", "warning"] {
        let status = post_json!(app, "/api/v1/log", log_body(APP_ID, log_type, 100));
        assert_eq!(status, StatusCode::CREATED);
    }
    post_json!(app, "/api/v1/log", log_body("Z9Z9Z9", "info", 10));

    let expected = json!({ "success": 1, "error": 2, "warning": 1, "info": 0, "total": 4 });

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/log?appId={}", APP_ID))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["counts"], expected);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 4);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/log?appId={}&logType=error", APP_ID))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["counts"], expected);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["pagination"]["total"], json!(2));
}

#[actix_web::test]
async fn test_listing_bounds_are_rejected() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    for uri in [
        "/api/v1/log?limit=0",
        "/api/v1/log?limit=101",
        "/api/v1/log?page=0",
        "/api/v1/log?appId=abc",
        "/api/v1/log/trends?days=0",
        "/api/v1/log/analytics?days=366",
        "/api/v1/review?rating=6",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[actix_web::test]
async fn test_analytics_for_one_application() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    let status = post_json!(
        app,
        "/api/v1/application",
        json!({ "appId": APP_ID, "name": "Portal" })
    );
    assert_eq!(status, StatusCode::CREATED);

    for log_type in ["error", "error", "success"] {
        post_json!(app, "/api/v1/log", log_body(APP_ID, log_type, 120));
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/log/analytics?appId={}&days=7", APP_ID))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let analytics = &body["data"];

    assert_eq!(body["message"], json!("Analytics fetched successfully"));
    assert_eq!(analytics["totalLogs"], json!(3));
    assert_eq!(
        analytics["logTypes"],
        json!({ "success": 1, "error": 2, "info": 0, "warning": 0 })
    );
    assert_eq!(analytics["errorRate"], json!("66.67%"));
    assert_eq!(analytics["period"], json!("Last 7 days"));
    assert_eq!(analytics["topApplications"][0]["appId"], json!(APP_ID));
    assert_eq!(analytics["topApplications"][0]["count"], json!(3));
}

#[actix_web::test]
async fn test_error_rate_formatting() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::get().uri("/api/v1/log/analytics").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["totalLogs"], json!(0));
    assert_eq!(body["data"]["errorRate"], json!("0.00%"));

    for log_type in ["error", "success", "success", "info"] {
        post_json!(app, "/api/v1/log", log_body(APP_ID, log_type, 50));
    }

    let req = test::TestRequest::get().uri("/api/v1/log/analytics").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["errorRate"], json!("25.00%"));
}

#[actix_web::test]
async fn test_hourly_trends_only_for_single_day_windows() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    for log_type in ["success", "error"] {
        post_json!(app, "/api/v1/log", log_body(APP_ID, log_type, 200));
    }

    let req = test::TestRequest::get().uri("/api/v1/log/trends?days=1").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let trends = &body["data"];
    assert!(trends["hourlyTrends"].is_array());
    let hourly_total: i64 = trends["hourlyTrends"]
        .as_array()
        .unwrap()
        .iter()
        .map(|bucket| bucket["count"].as_i64().unwrap())
        .sum();
    assert_eq!(hourly_total, 2);
    assert_eq!(trends["summary"]["totalLogs"], json!(2));
    assert_eq!(trends["summary"]["dateRange"]["days"], json!(1));

    let req = test::TestRequest::get().uri("/api/v1/log/trends?days=7").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["data"].get("hourlyTrends").is_none());
    assert_eq!(body["data"]["summary"]["averageLogsPerDay"], json!(0));
}

#[actix_web::test]
async fn test_rating_stats_are_consistent() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    for rating in [5, 5, 4, 1] {
        let status = post_json!(app, "/api/v1/review", review_body(APP_ID, rating));
        assert_eq!(status, StatusCode::CREATED);
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/review?appId={}", APP_ID))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let stats = &body["data"]["ratingStats"];

    assert_eq!(
        stats["distribution"],
        json!({ "1": 1, "2": 0, "3": 0, "4": 1, "5": 2 })
    );
    assert_eq!(stats["summary"]["totalReviews"], json!(4));
    assert_eq!(stats["summary"]["averageRating"], json!(3.75));
    assert_eq!(stats["summary"]["fiveStarReviews"], json!(2));
    assert_eq!(stats["summary"]["lowRatings"], json!(1));
}

#[actix_web::test]
async fn test_out_of_range_rating_fails_validation() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    let status = post_json!(app, "/api/v1/review", review_body(APP_ID, 6));
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn test_missing_records_and_routes_are_not_found() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    for uri in ["/api/v1/log/999", "/api/v1/task/999", "/api/v1/nowhere"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[actix_web::test]
async fn test_bulk_delete_reports_removed_ids() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    for log_type in ["info", "info"] {
        post_json!(app, "/api/v1/log", log_body(APP_ID, log_type, 10));
    }

    let req = test::TestRequest::delete()
        .uri("/api/v1/log/bulk")
        .set_json(json!({ "logIds": [1, 2, 42] }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["deletedCount"], json!(2));

    let req = test::TestRequest::delete()
        .uri("/api/v1/log/bulk")
        .set_json(json!({ "logIds": [] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_system_delete_all() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    post_json!(app, "/api/v1/log", log_body(APP_ID, "info", 10));
    post_json!(app, "/api/v1/review", review_body(APP_ID, 3));

    let req = test::TestRequest::delete()
        .uri("/api/v1/system/delete-all?model=widgets")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::delete()
        .uri("/api/v1/system/delete-all?model=log")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["logs"], json!(1));

    let req = test::TestRequest::get().uri("/api/v1/system/counts").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["logs"], json!(0));
    assert_eq!(body["data"]["reviews"], json!(1));
}

#[actix_web::test]
async fn test_application_registration_and_detail() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    let status = post_json!(
        app,
        "/api/v1/application",
        json!({ "appId": APP_ID, "name": "Portal" }),
    );
    assert_eq!(status, StatusCode::CREATED);

    let status = post_json!(
        app,
        "/api/v1/application",
        json!({ "appId": APP_ID, "name": "Duplicate" }),
    );
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let status = post_json!(app, &format!("/api/v1/application/{}/sample-data", APP_ID), json!({}));
    assert_eq!(status, StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/application/{}", APP_ID))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["name"], json!("Portal"));
}

#[actix_web::test]
async fn test_metrics_publish_a_bounded_score() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::get().uri("/api/v1/system/metrics").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let health = &body["data"]["health"];

    let score = health["score"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&score));
    assert!(["healthy", "warning", "critical"].contains(&health["status"].as_str().unwrap()));
    assert_eq!(body["data"]["services"]["items"][0]["name"], json!("database"));
}

#[actix_web::test]
async fn test_malformed_app_ids_are_not_stored() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    let status = post_json!(app, "/api/v1/log", log_body("web-01", "info", 10));
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let status = post_json!(
        app,
        "/api/v1/task",
        json!({ "appId": "", "description": "Ship it", "dateToFinish": "2025-12-31" }),
    );
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let status = post_json!(app, "/api/v1/review", review_body("a1b2c3", 4));
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let req = test::TestRequest::get().uri("/api/v1/system/counts").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["total"], json!(0));
}

#[actix_web::test]
async fn test_date_only_due_date_is_accepted() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/task")
        .set_json(json!({ "appId": APP_ID, "description": "Ship it", "dateToFinish": "2025-12-31" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["dateToFinish"], json!("2025-12-31T00:00:00Z"));
    assert_eq!(body["data"]["status"], json!("pending"));

    let status = post_json!(
        app,
        "/api/v1/task",
        json!({ "appId": APP_ID, "description": "Ship it", "dateToFinish": "next friday" }),
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_task_facets_ignore_status_filter() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    for status in ["pending", "pending", "inprogress", "done"] {
        let created = post_json!(
            app,
            "/api/v1/task",
            json!({
                "appId": APP_ID,
                "description": format!("{} work", status),
                "status": status,
                "dateToFinish": "2030-01-01T00:00:00Z",
            }),
        );
        assert_eq!(created, StatusCode::CREATED);
    }

    let expected = json!({ "pending": 2, "inprogress": 1, "done": 1, "total": 4 });

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/task?appId={}", APP_ID))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["counts"], expected);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 4);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/task?appId={}&status=done", APP_ID))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["counts"], expected);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["items"][0]["status"], json!("done"));
}

#[actix_web::test]
async fn test_rating_stats_ignore_rating_filter() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    for rating in [5, 5, 4, 1] {
        post_json!(app, "/api/v1/review", review_body(APP_ID, rating));
    }

    let mut stats = Vec::new();
    for (rating, listed) in [(1, 1), (5, 2)] {
        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/review?appId={}&rating={}", APP_ID, rating))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), listed, "rating={}", rating);
        stats.push(body["data"]["ratingStats"].clone());
    }

    assert_eq!(stats[0], stats[1]);
    assert_eq!(stats[0]["summary"]["totalReviews"], json!(4));
}

#[actix_web::test]
async fn test_reset_empties_every_collection() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    post_json!(app, "/api/v1/application", json!({ "appId": APP_ID, "name": "Portal" }));
    post_json!(app, "/api/v1/log", log_body(APP_ID, "error", 10));
    post_json!(app, "/api/v1/review", review_body(APP_ID, 2));
    post_json!(
        app,
        "/api/v1/task",
        json!({ "appId": APP_ID, "description": "Fix", "dateToFinish": "2030-01-01" }),
    );

    let req = test::TestRequest::post().uri("/api/v1/system/reset").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["beforeReset"]["total"], json!(4));
    assert_eq!(body["data"]["afterReset"]["totalDeleted"], json!(4));

    let req = test::TestRequest::get().uri("/api/v1/system/stats").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let stats = &body["data"];
    assert_eq!(
        stats["overview"],
        json!({ "applications": 0, "logs": 0, "tasks": 0, "reviews": 0, "total": 0 })
    );
    assert_eq!(stats["recentActivity"], json!({ "logs": 0, "tasks": 0, "reviews": 0 }));
    assert_eq!(stats["applications"]["total"], json!(0));
}

#[actix_web::test]
async fn test_system_health_counts_overdue_tasks_and_stopped_apps() {
    let (state, _recorder) = common::state().await;
    let app = test_app!(state);

    post_json!(app, "/api/v1/application", json!({ "appId": APP_ID, "name": "Portal" }));
    post_json!(app, "/api/v1/application", json!({ "appId": "Z9Z9Z9", "name": "Admin" }));

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/application/{}/status", APP_ID))
        .set_json(json!({ "status": "stopped" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    for (status, due) in [("pending", "2020-01-01"), ("done", "2020-01-01"), ("pending", "2999-01-01")] {
        post_json!(
            app,
            "/api/v1/task",
            json!({ "appId": APP_ID, "description": "Rotate keys", "status": status, "dateToFinish": due }),
        );
    }

    let req = test::TestRequest::get().uri("/api/v1/system/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let health = &body["data"];
    assert_eq!(health["database"], json!("connected"));
    assert_eq!(health["metrics"]["overdueTasks"], json!(1));
    assert_eq!(health["metrics"]["stoppedApps"], json!(1));
    assert_eq!(health["metrics"]["tasks"], json!(3));
}
