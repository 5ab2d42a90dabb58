use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Timelike, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use carwash::config::AppConfig;
use carwash::db;
use carwash::routes::build_router;
use carwash::services::accounts;
use carwash::state::AppState;

// ── Helpers ──

const ADMIN_EMAIL: &str = "admin@carwash.test";
const ADMIN_PASSWORD: &str = "admin-password";

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        jwt_secret: "test-secret".to_string(),
        jwt_ttl_hours: 1,
        bcrypt_cost: 4,
        cors_origin: "http://localhost:3000".to_string(),
        admin_email: None,
        admin_password: None,
    }
}

fn test_state() -> Arc<AppState> {
    let config = test_config();
    let conn = db::init_db(":memory:").unwrap();
    accounts::ensure_admin(&conn, ADMIN_EMAIL, ADMIN_PASSWORD, config.bcrypt_cost).unwrap();
    Arc::new(AppState::new(conn, config))
}

async fn send(
    state: &Arc<AppState>,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let res = build_router(Arc::clone(state))
        .oneshot(request)
        .await
        .unwrap();

    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn login(state: &Arc<AppState>, email: &str, password: &str) -> String {
    let (status, json) = send(
        state,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {json}");
    json["token"].as_str().unwrap().to_string()
}

async fn register(state: &Arc<AppState>, email: &str) -> String {
    let (status, json) = send(
        state,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": email,
            "password": "password123",
            "fullName": "Test Customer",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {json}");
    assert_eq!(json["role"], "CUSTOMER");
    json["token"].as_str().unwrap().to_string()
}

async fn admin_token(state: &Arc<AppState>) -> String {
    login(state, ADMIN_EMAIL, ADMIN_PASSWORD).await
}

async fn staff_token(state: &Arc<AppState>, admin: &str) -> (String, String) {
    let (status, json) = send(
        state,
        "POST",
        "/api/admin/users",
        Some(admin),
        Some(json!({
            "email": "staff@carwash.test",
            "password": "staff-password",
            "fullName": "Sam Staff",
            "role": "STAFF",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "staff creation failed: {json}");
    let staff_id = json["id"].as_str().unwrap().to_string();
    (login(state, "staff@carwash.test", "staff-password").await, staff_id)
}

async fn add_vehicle(state: &Arc<AppState>, token: &str, plate: &str) -> String {
    let (status, json) = send(
        state,
        "POST",
        "/api/vehicles",
        Some(token),
        Some(json!({
            "make": "Toyota",
            "model": "Corolla",
            "licensePlate": plate,
            "color": "Blue",
            "type": "SEDAN",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "vehicle creation failed: {json}");
    json["id"].as_str().unwrap().to_string()
}

async fn create_service(state: &Arc<AppState>, admin: &str) -> String {
    let (status, json) = send(
        state,
        "POST",
        "/api/services",
        Some(admin),
        Some(json!({
            "name": "Basic Wash",
            "description": "Exterior wash",
            "price": 10,
            "durationMinutes": 30,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "service creation failed: {json}");
    assert_eq!(json["active"], true);
    json["id"].as_str().unwrap().to_string()
}

/// A whole hour two days out, in the wire format.
fn future_slot(offset_minutes: i64) -> String {
    let base = (Utc::now().naive_utc() + Duration::days(2))
        .with_minute(0)
        .unwrap()
        .with_second(0)
        .unwrap()
        .with_nanosecond(0)
        .unwrap();
    (base + Duration::minutes(offset_minutes))
        .format("%Y-%m-%dT%H:%M")
        .to_string()
}

async fn book(
    state: &Arc<AppState>,
    token: &str,
    service_id: &str,
    vehicle_id: &str,
    when: &str,
) -> (StatusCode, Value) {
    send(
        state,
        "POST",
        "/api/bookings",
        Some(token),
        Some(json!({
            "serviceId": service_id,
            "vehicleId": vehicle_id,
            "bookingDateTime": when,
            "notes": "please use the hand wash",
        })),
    )
    .await
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let state = test_state();
    let (status, json) = send(&state, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

// ── Auth ──

#[tokio::test]
async fn test_protected_routes_require_token() {
    let state = test_state();

    let (status, json) = send(&state, "GET", "/api/vehicles", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["error"].is_string());

    let (status, _) = send(&state, "GET", "/api/bookings/my-bookings", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let state = test_state();
    register(&state, "dup@example.com").await;

    let (status, json) = send(
        &state,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": "DUP@example.com",
            "password": "password123",
            "fullName": "Someone Else",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "email already registered");
}

#[tokio::test]
async fn test_register_rejects_invalid_payload() {
    let state = test_state();
    let (status, json) = send(
        &state,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "email": "not-an-email", "password": "short", "fullName": "X" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("email"), "unexpected message: {message}");
}

#[tokio::test]
async fn test_login_wrong_password() {
    let state = test_state();
    register(&state, "carol@example.com").await;

    let (status, _) = send(
        &state,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "carol@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_update_and_password_change() {
    let state = test_state();
    let token = register(&state, "dave@example.com").await;

    let (status, json) = send(
        &state,
        "PUT",
        "/api/users/profile",
        Some(&token),
        Some(json!({ "fullName": "Dave Renamed", "phoneNumber": "+15550001111" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["fullName"], "Dave Renamed");
    assert!(json.get("passwordHash").is_none());

    let (status, _) = send(
        &state,
        "POST",
        "/api/users/change-password",
        Some(&token),
        Some(json!({ "oldPassword": "password123", "newPassword": "new-password-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    login(&state, "dave@example.com", "new-password-1").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_database_stays_available_while_passwords_hash() {
    let mut config = test_config();
    config.bcrypt_cost = 12;
    let state = Arc::new(AppState::new(db::init_db(":memory:").unwrap(), config));

    let pending = tokio::spawn({
        let state = Arc::clone(&state);
        async move {
            send(
                &state,
                "POST",
                "/api/auth/register",
                None,
                Some(json!({
                    "email": "slow@example.com",
                    "password": "password123",
                    "fullName": "Slow Hasher",
                })),
            )
            .await
        }
    });

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(
        state.db.try_lock().is_ok(),
        "database lock held while hashing"
    );

    let (status, _) = pending.await.unwrap();
    assert_eq!(status, StatusCode::OK);

    let pending = tokio::spawn({
        let state = Arc::clone(&state);
        async move { login(&state, "slow@example.com", "password123").await }
    });

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(
        state.db.try_lock().is_ok(),
        "database lock held while verifying"
    );
    pending.await.unwrap();
}

// ── Roles ──

#[tokio::test]
async fn test_customer_cannot_use_back_office_routes() {
    let state = test_state();
    let token = register(&state, "eve@example.com").await;

    let (status, _) = send(&state, "GET", "/api/bookings", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&state, "GET", "/api/admin/staff", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &state,
        "POST",
        "/api/services",
        Some(&token),
        Some(json!({ "name": "Sneaky", "price": 1, "durationMinutes": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = send(
        &state,
        "PUT",
        "/api/bookings/any-id/status",
        Some(&token),
        Some(json!({ "status": "COMPLETED" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "only staff can update booking status");
}

#[tokio::test]
async fn test_admin_lists_staff() {
    let state = test_state();
    let admin = admin_token(&state).await;
    let (_, staff_id) = staff_token(&state, &admin).await;

    let (status, json) = send(&state, "GET", "/api/admin/staff", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let staff = json.as_array().unwrap();
    assert_eq!(staff.len(), 1);
    assert_eq!(staff[0]["id"], staff_id.as_str());
    assert_eq!(staff[0]["role"], "STAFF");
}

// ── Vehicles ──

#[tokio::test]
async fn test_vehicle_ownership() {
    let state = test_state();
    let alice = register(&state, "alice@example.com").await;
    let bob = register(&state, "bob@example.com").await;
    let vehicle_id = add_vehicle(&state, &alice, "abc-123").await;

    let (status, json) = send(&state, "GET", "/api/vehicles", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["licensePlate"], "ABC-123");
    assert_eq!(json[0]["type"], "SEDAN");

    let (status, same) = send(&state, "GET", "/api/users/vehicles", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(same, json);

    let uri = format!("/api/vehicles/{vehicle_id}");
    let (status, _) = send(&state, "GET", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&state, "DELETE", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&state, "DELETE", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&state, "GET", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Services ──

#[tokio::test]
async fn test_service_catalog_hides_inactive() {
    let state = test_state();
    let admin = admin_token(&state).await;
    let service_id = create_service(&state, &admin).await;

    let (status, json) = send(&state, "GET", "/api/services/search?q=wash", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["price"], 10.0);

    let uri = format!("/api/services/{service_id}");
    let (status, json) = send(
        &state,
        "PUT",
        &uri,
        Some(&admin),
        Some(json!({ "price": 12.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["price"], 12.5);
    assert_eq!(json["name"], "Basic Wash");

    let (status, _) = send(&state, "DELETE", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&state, "GET", "/api/services", None, None).await;
    assert!(json.as_array().unwrap().is_empty());

    let (status, _) = send(&state, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_service_rejects_bad_price() {
    let state = test_state();
    let admin = admin_token(&state).await;

    let (status, _) = send(
        &state,
        "POST",
        "/api/services",
        Some(&admin),
        Some(json!({ "name": "Free Wash", "price": 0, "durationMinutes": 30 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_service_rejects_overlong_duration() {
    let state = test_state();
    let admin = admin_token(&state).await;

    let (status, json) = send(
        &state,
        "POST",
        "/api/services",
        Some(&admin),
        Some(json!({ "name": "Forever Wash", "price": 10, "durationMinutes": 2147483647 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["error"],
        "service duration must be between 1 and 1440 minutes"
    );
}

// ── Bookings ──

#[tokio::test]
async fn test_booking_lifecycle() {
    let state = test_state();
    let admin = admin_token(&state).await;
    let (staff, staff_id) = staff_token(&state, &admin).await;
    let customer = register(&state, "alice@example.com").await;

    let vehicle_id = add_vehicle(&state, &customer, "XYZ-789").await;
    let service_id = create_service(&state, &admin).await;

    let slot = future_slot(0);
    let (status, json) = book(&state, &customer, &service_id, &vehicle_id, &slot).await;
    assert_eq!(status, StatusCode::OK, "booking failed: {json}");
    assert_eq!(json["status"], "PENDING");
    assert_eq!(json["service"]["name"], "Basic Wash");
    assert_eq!(json["vehicle"]["licensePlate"], "XYZ-789");
    assert_eq!(json["bookingDateTime"], format!("{slot}:00"));
    let booking_id = json["id"].as_str().unwrap().to_string();

    // 10 minutes later falls inside the 30 + 30 minute window
    let (status, json) = book(&state, &customer, &service_id, &vehicle_id, &future_slot(10)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "time slot not available");

    // rating before completion
    let rate_uri = format!("/api/bookings/{booking_id}/rate");
    let (status, _) = send(&state, "POST", &rate_uri, Some(&customer), Some(json!({ "rating": 5 }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, json) = send(
        &state,
        "PUT",
        &format!("/api/bookings/{booking_id}/assign"),
        Some(&admin),
        Some(json!({ "staffId": staff_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["assignedStaffName"], "Sam Staff");

    let (status, json) = send(
        &state,
        "PUT",
        &format!("/api/bookings/{booking_id}/status"),
        Some(&staff),
        Some(json!({ "status": "COMPLETED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "COMPLETED");

    let (status, json) = send(
        &state,
        "POST",
        &rate_uri,
        Some(&customer),
        Some(json!({ "rating": 5, "review": "Spotless" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rating"], 5);
    assert_eq!(json["review"], "Spotless");

    let (status, _) = send(&state, "POST", &rate_uri, Some(&customer), Some(json!({ "rating": 6 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(&state, "GET", "/api/bookings?status=COMPLETED", Some(&staff), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (status, _) = send(&state, "GET", "/api/bookings?status=DONE", Some(&staff), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_outside_window_succeeds() {
    let state = test_state();
    let admin = admin_token(&state).await;
    let customer = register(&state, "alice@example.com").await;
    let vehicle_id = add_vehicle(&state, &customer, "XYZ-789").await;
    let service_id = create_service(&state, &admin).await;

    let (status, _) = book(&state, &customer, &service_id, &vehicle_id, &future_slot(0)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = book(&state, &customer, &service_id, &vehicle_id, &future_slot(61)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&state, "GET", "/api/bookings/my-bookings", Some(&customer), None).await;
    assert_eq!(json.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_booking_in_past_rejected() {
    let state = test_state();
    let admin = admin_token(&state).await;
    let customer = register(&state, "alice@example.com").await;
    let vehicle_id = add_vehicle(&state, &customer, "XYZ-789").await;
    let service_id = create_service(&state, &admin).await;

    let (status, _) = book(&state, &customer, &service_id, &vehicle_id, "2020-01-01T10:00").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_at_end_of_calendar_rejected() {
    let state = test_state();
    let admin = admin_token(&state).await;
    let customer = register(&state, "alice@example.com").await;
    let vehicle_id = add_vehicle(&state, &customer, "XYZ-789").await;
    let service_id = create_service(&state, &admin).await;

    for _ in 0..2 {
        let (status, _) = book(&state, &customer, &service_id, &vehicle_id, "9999-12-31T23:30").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (_, json) = send(&state, "GET", "/api/bookings/my-bookings", Some(&customer), None).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_booking_with_foreign_vehicle_forbidden() {
    let state = test_state();
    let admin = admin_token(&state).await;
    let alice = register(&state, "alice@example.com").await;
    let bob = register(&state, "bob@example.com").await;
    let vehicle_id = add_vehicle(&state, &alice, "XYZ-789").await;
    let service_id = create_service(&state, &admin).await;

    let (status, json) = book(&state, &bob, &service_id, &vehicle_id, &future_slot(0)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "vehicle does not belong to you");
}

#[tokio::test]
async fn test_booking_survives_service_deactivation() {
    let state = test_state();
    let admin = admin_token(&state).await;
    let customer = register(&state, "alice@example.com").await;
    let vehicle_id = add_vehicle(&state, &customer, "XYZ-789").await;
    let service_id = create_service(&state, &admin).await;

    let (_, json) = book(&state, &customer, &service_id, &vehicle_id, &future_slot(0)).await;
    let booking_id = json["id"].as_str().unwrap().to_string();

    let (status, _) = send(&state, "DELETE", &format!("/api/services/{service_id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&state, "GET", &format!("/api/bookings/{booking_id}"), Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["service"]["name"], "Basic Wash");

    let (status, _) = send(&state, "DELETE", &format!("/api/vehicles/{vehicle_id}"), Some(&customer), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_other_customer_cannot_read_booking() {
    let state = test_state();
    let admin = admin_token(&state).await;
    let alice = register(&state, "alice@example.com").await;
    let bob = register(&state, "bob@example.com").await;
    let vehicle_id = add_vehicle(&state, &alice, "XYZ-789").await;
    let service_id = create_service(&state, &admin).await;

    let (_, json) = book(&state, &alice, &service_id, &vehicle_id, &future_slot(0)).await;
    let uri = format!("/api/bookings/{}", json["id"].as_str().unwrap());

    let (status, _) = send(&state, "GET", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&state, "GET", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
}
