//! 经完整中间件栈的端到端请求测试

use axum::body::{to_bytes, Body};
use axum::response::Response;
use http::{Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::domain::ClinicRole;
use crate::infrastructure::memory::RateLimitConfig;
use crate::test_support::{json_request, TestApp, TEST_PASSWORD};

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

#[tokio::test]
async fn test_ping() {
    let app = TestApp::new().await;
    let (status, body) = send(&app, json_request(Method::GET, "/api/ping", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "vetclinic");
}

#[tokio::test]
async fn test_register_then_login() {
    let app = TestApp::new().await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "Vet@Example.com",
                "password": TEST_PASSWORD,
                "first_name": "Jane",
                "last_name": "Doe"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user"]["email"], "vet@example.com");
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert!(body["data"]["user"].get("password_hash").is_none());

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "vet@example.com", "password": TEST_PASSWORD })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        json_request(Method::GET, "/api/auth/me", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["first_name"], "Jane");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new().await;
    let (status, body) = send(&app, json_request(Method::GET, "/api/clinics", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errno"], 401);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = TestApp::new().await;
    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "vet@example.com",
                "password": TEST_PASSWORD,
                "first_name": "Jane",
                "last_name": "Doe"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        json_request(Method::GET, "/api/auth/me", Some(&refresh), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_member_is_forbidden() {
    let app = TestApp::new().await;
    let owner = app.user("owner@example.com").await;
    let clinic_id = app.clinic(owner.id).await;
    let (_, outsider_token) = app.access_token("outsider@example.com").await;

    let (status, body) = send(
        &app,
        json_request(
            Method::GET,
            &format!("/api/clinics/{}/patients", clinic_id),
            Some(&outsider_token),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errno"], 403);
}

#[tokio::test]
async fn test_malformed_path_is_bad_request() {
    let app = TestApp::new().await;
    let (_, token) = app.access_token("owner@example.com").await;

    let (status, body) = send(
        &app,
        json_request(Method::GET, "/api/clinics/not-a-uuid", Some(&token), None),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errno"], 400);
}

#[tokio::test]
async fn test_patient_lifecycle() {
    let app = TestApp::new().await;
    let (owner, token) = app.access_token("owner@example.com").await;
    let clinic_id = app.clinic(owner.id).await;
    let base = format!("/api/clinics/{}/patients", clinic_id);

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            &base,
            Some(&token),
            Some(json!({
                "name": "Rex",
                "species": "DOG",
                "owner_name": "Ann Smith"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["sex"], "UNKNOWN");
    let patient_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        json_request(
            Method::PATCH,
            &format!("{}/{}", base, patient_id),
            Some(&token),
            Some(json!({ "weight_kg": 14.2 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["weight_kg"], 14.2);
    assert_eq!(body["data"]["name"], "Rex");

    let (status, body) = send(
        &app,
        json_request(Method::GET, &format!("{}?search=re", base), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);

    let (status, _) = send(
        &app,
        json_request(
            Method::DELETE,
            &format!("{}/{}", base, patient_id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        json_request(
            Method::GET,
            &format!("{}/{}", base, patient_id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, json_request(Method::GET, &base, Some(&token), None)).await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn test_overlapping_appointment_is_conflict() {
    let app = TestApp::new().await;
    let (owner, token) = app.access_token("owner@example.com").await;
    let clinic_id = app.clinic(owner.id).await;
    let patient = app
        .patient(crate::application::Actor::new(owner.id, clinic_id), "Rex")
        .await;
    let base = format!("/api/clinics/{}/appointments", clinic_id);

    let booking = |start: &str, minutes: u32| {
        json!({
            "patient_id": patient.id,
            "veterinarian_id": owner.id,
            "date": "2030-03-04",
            "start_time": start,
            "duration_minutes": minutes
        })
    };

    let (status, body) = send(
        &app,
        json_request(Method::POST, &base, Some(&token), Some(booking("10:00", 30))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["end_time"], "10:30");
    assert_eq!(body["data"]["status"], "SCHEDULED");

    let (status, body) = send(
        &app,
        json_request(Method::POST, &base, Some(&token), Some(booking("10:15", 30))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errno"], 409);

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            &format!("{}/availability", base),
            Some(&token),
            Some(json!({
                "veterinarian_id": owner.id,
                "date": "2030-03-04",
                "start_time": "10:30",
                "duration_minutes": 30
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["available"], true);
}

#[tokio::test]
async fn test_low_stock_route_is_not_a_product_id() {
    let app = TestApp::new().await;
    let (owner, token) = app.access_token("owner@example.com").await;
    let clinic_id = app.clinic(owner.id).await;
    let base = format!("/api/clinics/{}/products", clinic_id);

    for (name, stock) in [("Bandage", 2), ("Syringe", 50)] {
        let (status, _) = send(
            &app,
            json_request(
                Method::POST,
                &base,
                Some(&token),
                Some(json!({
                    "name": name,
                    "category": "SUPPLY",
                    "price_cents": 250,
                    "stock_quantity": stock,
                    "min_stock": 5
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(
        &app,
        json_request(Method::GET, &format!("{}/low-stock", base), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "Bandage");
    assert_eq!(items[0]["is_low_stock"], true);
}

#[tokio::test]
async fn test_staff_cannot_manage_members() {
    let app = TestApp::new().await;
    let owner = app.user("owner@example.com").await;
    let clinic_id = app.clinic(owner.id).await;
    let (_, staff_token) = app.access_token("staff@example.com").await;
    app.member(clinic_id, owner.id, "staff@example.com", ClinicRole::Staff)
        .await;
    app.user("new@example.com").await;

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            &format!("/api/clinics/{}/members", clinic_id),
            Some(&staff_token),
            Some(json!({ "email": "new@example.com", "role": "STAFF" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        json_request(
            Method::GET,
            &format!("/api/clinics/{}/members", clinic_id),
            Some(&staff_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_websocket_requires_token() {
    let app = TestApp::new().await;
    let owner = app.user("owner@example.com").await;
    let clinic_id = app.clinic(owner.id).await;

    let (status, body) = send(
        &app,
        json_request(Method::GET, &format!("/ws/clinics/{}", clinic_id), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errno"], 401);
}

#[tokio::test]
async fn test_websocket_rejects_non_member() {
    let app = TestApp::new().await;
    let owner = app.user("owner@example.com").await;
    let clinic_id = app.clinic(owner.id).await;
    let (_, token) = app.access_token("outsider@example.com").await;

    let (status, _) = send(
        &app,
        json_request(
            Method::GET,
            &format!("/ws/clinics/{}?token={}", clinic_id, token),
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_websocket_member_without_upgrade_is_bad_request() {
    let app = TestApp::new().await;
    let (owner, token) = app.access_token("owner@example.com").await;
    let clinic_id = app.clinic(owner.id).await;

    let (status, _) = send(
        &app,
        json_request(
            Method::GET,
            &format!("/ws/clinics/{}?token={}", clinic_id, token),
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_auth_routes_are_rate_limited() {
    let app = TestApp::with_rate_limit(RateLimitConfig {
        auth_max_requests: 2,
        ..RateLimitConfig::default()
    })
    .await;

    let login = || {
        json_request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "wrongpass" })),
        )
    };

    for _ in 0..2 {
        let (status, _) = send(&app, login()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let response = app.router().oneshot(login()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));
}
