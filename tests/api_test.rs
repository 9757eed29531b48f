//! HTTP-level behavior: the admin allow-list gate, validation responses,
//! and the public booking/tracking round trip.

mod common;

use autoworx_api as api;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use common::{book_test_appointment, spawn_app, TestApp};
use serde_json::{json, Value};
use tower::ServiceExt;

fn router(app: &TestApp) -> axum::Router {
    axum::Router::new()
        .nest("/api/v1", api::api_v1_routes())
        .with_state(app.state.clone())
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body read");
    serde_json::from_slice(&bytes).expect("body is JSON")
}

#[tokio::test]
async fn admin_endpoints_reject_missing_sessions() {
    let app = spawn_app().await;

    let response = router(&app)
        .oneshot(
            Request::builder()
                .uri("/api/v1/appointments")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_endpoints_reject_non_allowlisted_emails() {
    let app = spawn_app().await;
    let token = app
        .auth
        .issue_session("stranger@example.com", None)
        .expect("token issued");

    let response = router(&app)
        .oneshot(
            Request::builder()
                .uri("/api/v1/appointments")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn allowlisted_sessions_reach_admin_endpoints() {
    let app = spawn_app().await;
    book_test_appointment(&app, "Visible To Admin").await;

    let token = app
        .auth
        .issue_session("shop@autoworx.ph", Some("Shop Admin"))
        .expect("token issued");

    let response = router(&app)
        .oneshot(
            Request::builder()
                .uri("/api/v1/appointments")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["total"], json!(1));
}

#[tokio::test]
async fn booking_validates_required_fields() {
    let app = spawn_app().await;

    let response = router(&app)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/appointments")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "name": "",
                        "email": "not-an-email",
                        "phone": "123"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn booking_rejects_invalid_phone_numbers() {
    let app = spawn_app().await;

    let response = router(&app)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/appointments")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "name": "Short Phone",
                        "email": "short@example.com",
                        "phone": "123"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap_or_default()
        .to_lowercase()
        .contains("phone"));
}

#[tokio::test]
async fn booking_and_tracking_round_trip() {
    let app = spawn_app().await;

    let response = router(&app)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/appointments")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "name": "Tracked Customer",
                        "email": "tracked@example.com",
                        "phone": "+639171234567",
                        "vehicleMake": "Honda",
                        "vehicleModel": "Civic",
                        "service": "AC & Electrical"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let tracking_code = body["data"]["tracking_code"]
        .as_str()
        .expect("tracking code present")
        .to_string();
    // The phone arrives normalized
    assert_eq!(body["data"]["phone"], json!("0917-123-4567"));

    let response = router(&app)
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/appointments/track/{tracking_code}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["name"], json!("Tracked Customer"));
    assert_eq!(body["data"]["status"], json!("pending"));
}

#[tokio::test]
async fn tracking_an_unknown_code_is_not_found() {
    let app = spawn_app().await;

    let response = router(&app)
        .oneshot(
            Request::builder()
                .uri("/api/v1/appointments/track/NO-SUCH-CODE")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn estimate_endpoint_returns_the_assigned_number() {
    let app = spawn_app().await;
    let booked = book_test_appointment(&app, "Estimate Via Http").await;

    let token = app
        .auth
        .issue_session("shop@autoworx.ph", None)
        .expect("token issued");

    let response = router(&app)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/appointments/{}/estimate", booked.id))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let number = body["data"]["estimateNumber"]
        .as_str()
        .expect("estimate number present");
    assert!(regex::Regex::new(r"^\d{6}-\d{4,}$").unwrap().is_match(number));
}

#[tokio::test]
async fn archive_endpoint_reports_success_and_not_found() {
    let app = spawn_app().await;
    let booked = book_test_appointment(&app, "Archive Via Http").await;

    let token = app
        .auth
        .issue_session("shop@autoworx.ph", None)
        .expect("token issued");

    let response = router(&app)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/history")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "appointmentId": booked.id, "reason": "Done" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["archived_reason"], json!("Done"));

    // Archiving the same appointment again: it is no longer active
    let response = router(&app)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/history")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "appointmentId": booked.id }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
