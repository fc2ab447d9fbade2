use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

use rota_api::{app, AppState};
use rota_booking::BookingEngine;
use rota_core::model::{Trip, TripStatus};
use rota_store::MemoryStore;
use rota_tasks::{AutoCancellationSweeper, SweepConfig};

fn test_app() -> (Arc<MemoryStore>, Router) {
    let store = Arc::new(MemoryStore::new());
    let engine = Arc::new(BookingEngine::new(
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    let sweeper = Arc::new(AutoCancellationSweeper::new(
        engine.clone(),
        store.clone(),
        store.clone(),
        SweepConfig::default(),
    ));
    let state = AppState {
        engine,
        sweeper,
        reservations: store.clone(),
        settings: store.clone(),
    };
    (store, app(state))
}

fn seed_trip(store: &MemoryStore, seats: i32) -> Uuid {
    let trip = Trip {
        id: Uuid::new_v4(),
        origin: "IST".into(),
        destination: "ANK".into(),
        departure_at: Utc::now() + Duration::hours(6),
        status: TripStatus::Active,
        base_price_cents: 10_000,
        price_cents: 10_000,
        seat_count: seats,
    };
    let id = trip.id;
    store.add_trip(trip);
    id
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn reserve_body(trip_id: Uuid, seat: i32, user_id: Uuid) -> Value {
    json!({
        "trip_id": trip_id,
        "seat_number": seat,
        "user_id": user_id,
        "price_cents": 10_000,
        "mode": "HOLD",
    })
}

#[tokio::test]
async fn hold_conflict_pay_and_sweep_flow() {
    let (store, app) = test_app();
    let trip_id = seed_trip(&store, 40);
    let user = Uuid::new_v4();

    // Hold seat 5.
    let (status, body) = send(
        &app,
        "POST",
        "/v1/reservations",
        Some(reserve_body(trip_id, 5, user)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "RESERVED");
    assert_eq!(body["payment_status"], "PENDING");
    let reservation_id = body["id"].as_str().unwrap().to_string();

    // Second user loses the same seat.
    let (status, body) = send(
        &app,
        "POST",
        "/v1/reservations",
        Some(reserve_body(trip_id, 5, Uuid::new_v4())),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already held"));

    // Pay for the hold.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/reservations/{}/payment", reservation_id),
        Some(json!({ "amount_cents": 10_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment_status"], "PAID");

    // An immediate sweep must not touch the paid reservation.
    let (status, body) = send(
        &app,
        "POST",
        "/v1/admin/sweep",
        Some(json!({ "timeout_minutes": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], 0);

    store.verify_no_orphan_holds().unwrap();
}

#[tokio::test]
async fn expired_hold_is_swept_and_audited() {
    let (store, app) = test_app();
    let trip_id = seed_trip(&store, 40);
    let user = Uuid::new_v4();

    let (status, body) = send(
        &app,
        "POST",
        "/v1/reservations",
        Some(reserve_body(trip_id, 12, user)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let reservation_id = body["id"].as_str().unwrap().to_string();

    store.backdate_reservation(
        Uuid::parse_str(&reservation_id).unwrap(),
        Duration::seconds(1),
    );

    let (status, body) = send(
        &app,
        "POST",
        "/v1/admin/sweep",
        Some(json!({ "timeout_minutes": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], 1);
    assert_eq!(body["timeout_minutes"], 0);

    assert!(!store.seat(trip_id, 12).unwrap().is_reserved);

    // Audit log is queryable, overall and per user.
    let (status, body) = send(&app, "GET", "/v1/admin/cancellation-logs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["reservation_id"], reservation_id.as_str());

    let (_, body) = send(
        &app,
        "GET",
        &format!("/v1/admin/cancellation-logs?user_id={}", user),
        None,
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = send(
        &app,
        "GET",
        &format!("/v1/admin/cancellation-logs?user_id={}", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 0);

    store.verify_no_orphan_holds().unwrap();
}

#[tokio::test]
async fn settings_roundtrip_and_validation() {
    let (_store, app) = test_app();

    let (status, body) = send(&app, "GET", "/v1/admin/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timeout_minutes"], 15);

    let (status, body) = send(
        &app,
        "PUT",
        "/v1/admin/settings",
        Some(json!({ "timeout_minutes": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timeout_minutes"], 5);

    let (_, body) = send(&app, "GET", "/v1/admin/settings", None).await;
    assert_eq!(body["timeout_minutes"], 5);

    let (status, _) = send(
        &app,
        "PUT",
        "/v1/admin/settings",
        Some(json!({ "timeout_minutes": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Negative per-run overrides are rejected like negative settings.
    let (status, _) = send(
        &app,
        "POST",
        "/v1/admin/sweep",
        Some(json!({ "timeout_minutes": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn booking_errors_map_to_http_statuses() {
    let (store, app) = test_app();
    let trip_id = seed_trip(&store, 10);
    let user = Uuid::new_v4();

    // Unknown trip: 404.
    let (status, _) = send(
        &app,
        "POST",
        "/v1/reservations",
        Some(reserve_body(Uuid::new_v4(), 1, user)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Non-positive price: 400.
    let mut bad_price = reserve_body(trip_id, 1, user);
    bad_price["price_cents"] = json!(0);
    let (status, _) = send(&app, "POST", "/v1/reservations", Some(bad_price)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Out-of-range seat: 400.
    let (status, _) = send(
        &app,
        "POST",
        "/v1/reservations",
        Some(reserve_body(trip_id, 99, user)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Cancel twice: second is a 409 conflict.
    let (_, body) = send(
        &app,
        "POST",
        "/v1/reservations",
        Some(reserve_body(trip_id, 1, user)),
    )
    .await;
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/reservations/{}/cancel", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELLED");
    assert_eq!(body["cancel_reason"], "USER_REQUEST");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/reservations/{}/cancel", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Unknown reservation payment: 404.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/reservations/{}/payment", Uuid::new_v4()),
        Some(json!({ "amount_cents": 100 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
