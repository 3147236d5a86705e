// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API input validation tests: time windows, slot overlap, booking shapes.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;

async fn json_request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ─── Availability slots ──────────────────────────────────────

#[tokio::test]
async fn test_inverted_slot_rejected() {
    let (app, _state) = common::create_test_app();
    let (token, _) = common::sign_up_test_user(&app, "tutor@example.com", "T", "U").await;

    let response = json_request(
        &app,
        "POST",
        "/api/availability",
        &token,
        serde_json::json!({"day_of_week": 1, "start_time": "11:00", "end_time": "10:00"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_slot_time_rejected() {
    let (app, _state) = common::create_test_app();
    let (token, _) = common::sign_up_test_user(&app, "tutor@example.com", "T", "U").await;

    let response = json_request(
        &app,
        "POST",
        "/api/availability",
        &token,
        serde_json::json!({"day_of_week": 1, "start_time": "25:99", "end_time": "26:00"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_overlapping_slot_rejected() {
    let (app, _state) = common::create_test_app();
    let (token, _) = common::sign_up_test_user(&app, "tutor@example.com", "T", "U").await;

    let ok = json_request(
        &app,
        "POST",
        "/api/availability",
        &token,
        serde_json::json!({"day_of_week": 2, "start_time": "09:00", "end_time": "11:00"}),
    )
    .await;
    assert_eq!(ok.status(), StatusCode::OK);

    // Partially inside the existing window
    let overlap = json_request(
        &app,
        "POST",
        "/api/availability",
        &token,
        serde_json::json!({"day_of_week": 2, "start_time": "10:00", "end_time": "12:00"}),
    )
    .await;
    assert_eq!(overlap.status(), StatusCode::BAD_REQUEST);

    // Same window on another day is fine
    let other_day = json_request(
        &app,
        "POST",
        "/api/availability",
        &token,
        serde_json::json!({"day_of_week": 3, "start_time": "10:00", "end_time": "12:00"}),
    )
    .await;
    assert_eq!(other_day.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_back_to_back_slots_allowed() {
    let (app, _state) = common::create_test_app();
    let (token, _) = common::sign_up_test_user(&app, "tutor@example.com", "T", "U").await;

    let first = json_request(
        &app,
        "POST",
        "/api/availability",
        &token,
        serde_json::json!({"day_of_week": 4, "start_time": "09:00", "end_time": "10:00"}),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);

    // Shares only the boundary instant
    let second = json_request(
        &app,
        "POST",
        "/api/availability",
        &token,
        serde_json::json!({"day_of_week": 4, "start_time": "10:00", "end_time": "11:00"}),
    )
    .await;
    assert_eq!(second.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_slot_update_excludes_itself() {
    let (app, _state) = common::create_test_app();
    let (token, _) = common::sign_up_test_user(&app, "tutor@example.com", "T", "U").await;

    let created = json_request(
        &app,
        "POST",
        "/api/availability",
        &token,
        serde_json::json!({"day_of_week": 5, "start_time": "09:00", "end_time": "10:00"}),
    )
    .await;
    assert_eq!(created.status(), StatusCode::OK);
    let slot = body_json(created).await;
    let slot_id = slot["id"].as_str().unwrap();

    // Widening the same slot overlaps only its own old window
    let updated = json_request(
        &app,
        "PUT",
        &format!("/api/availability/{}", slot_id),
        &token,
        serde_json::json!({"day_of_week": 5, "start_time": "09:00", "end_time": "10:30"}),
    )
    .await;
    assert_eq!(updated.status(), StatusCode::OK);
}

// ─── Bookings ────────────────────────────────────────────────

#[tokio::test]
async fn test_booking_with_inverted_window_rejected() {
    let (app, _state) = common::create_test_app();
    let (token, _) = common::sign_up_test_user(&app, "student@example.com", "S", "T").await;

    let response = json_request(
        &app,
        "POST",
        "/api/bookings",
        &token,
        serde_json::json!({
            "kind": "trial",
            "tutor_id": "tutor_1",
            "booking_date": "2026-09-10",
            "start_time": "11:00",
            "end_time": "10:00",
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_subscription_booking_requires_subscription_id() {
    let (app, _state) = common::create_test_app();
    let (token, _) = common::sign_up_test_user(&app, "student@example.com", "S", "T").await;

    let response = json_request(
        &app,
        "POST",
        "/api/bookings",
        &token,
        serde_json::json!({
            "kind": "subscription",
            "tutor_id": "tutor_1",
            "booking_date": "2026-09-10",
            "start_time": "10:00",
            "end_time": "11:00",
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_trial_booking_create_and_cancel() {
    let (app, _state) = common::create_test_app();
    let (token, _) = common::sign_up_test_user(&app, "student@example.com", "S", "T").await;

    let created = json_request(
        &app,
        "POST",
        "/api/bookings",
        &token,
        serde_json::json!({
            "kind": "trial",
            "tutor_id": "tutor_1",
            "booking_date": "2099-01-15",
            "start_time": "10:00",
            "end_time": "10:45",
        }),
    )
    .await;
    assert_eq!(created.status(), StatusCode::OK);

    let booking = body_json(created).await;
    assert_eq!(booking["kind"], "trial");
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["duration_minutes"], 45);
    // Far-future booking must have a live countdown
    assert!(booking["countdown"].as_str().unwrap().starts_with("in "));
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let cancelled = json_request(
        &app,
        "POST",
        &format!("/api/bookings/{}/cancel", booking_id),
        &token,
        serde_json::json!({"kind": "trial"}),
    )
    .await;
    assert_eq!(cancelled.status(), StatusCode::OK);

    // Cancelled bookings stay listed, with no countdown
    let listed = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/bookings")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(listed.status(), StatusCode::OK);

    let bookings = body_json(listed).await;
    let row = bookings
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["id"] == booking_id.as_str())
        .expect("cancelled booking still listed");
    assert_eq!(row["status"], "cancelled");
    assert_eq!(row["countdown"], "");
}

#[tokio::test]
async fn test_cannot_cancel_someone_elses_booking() {
    let (app, _state) = common::create_test_app();
    let (owner_token, _) = common::sign_up_test_user(&app, "owner@example.com", "O", "W").await;
    let (other_token, _) = common::sign_up_test_user(&app, "other@example.com", "O", "T").await;

    let created = json_request(
        &app,
        "POST",
        "/api/bookings",
        &owner_token,
        serde_json::json!({
            "kind": "trial",
            "tutor_id": "tutor_1",
            "booking_date": "2099-01-15",
            "start_time": "10:00",
            "end_time": "11:00",
        }),
    )
    .await;
    assert_eq!(created.status(), StatusCode::OK);
    let booking_id = body_json(created).await["id"].as_str().unwrap().to_string();

    let response = json_request(
        &app,
        "POST",
        &format!("/api/bookings/{}/cancel", booking_id),
        &other_token,
        serde_json::json!({"kind": "trial"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ─── Subscriptions ───────────────────────────────────────────

#[tokio::test]
async fn test_subscription_listing_carries_progress_and_phase() {
    use tutorlink::models::{StudentSubscription, SubscriptionStatus};

    let (app, state) = common::create_test_app();
    let (token, user_id) = common::sign_up_test_user(&app, "student@example.com", "S", "T").await;

    let end_date = (chrono::Utc::now() + chrono::Duration::days(3)).date_naive();
    state
        .store
        .insert_subscription(&StudentSubscription {
            id: "sub_1".to_string(),
            student_id: user_id.clone(),
            tutor_id: "tutor_1".to_string(),
            plan_id: "plan_basic".to_string(),
            start_date: end_date - chrono::Duration::days(30),
            end_date,
            total_sessions: 10,
            remaining_sessions: 4,
            status: SubscriptionStatus::Active,
        })
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/subscriptions")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let subs = body_json(response).await;
    let row = &subs.as_array().unwrap()[0];
    assert_eq!(row["progress"], 60.0);
    assert_eq!(row["phase"], "expiring");
}

// ─── Profile ─────────────────────────────────────────────────

#[tokio::test]
async fn test_profile_update_rejects_bad_currency() {
    let (app, _state) = common::create_test_app();
    let (token, _) = common::sign_up_test_user(&app, "student@example.com", "S", "T").await;

    let response = json_request(
        &app,
        "PUT",
        "/api/me",
        &token,
        serde_json::json!({"currency": "DOLLARS"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_profile_update_roundtrip() {
    let (app, _state) = common::create_test_app();
    let (token, user_id) = common::sign_up_test_user(&app, "student@example.com", "S", "T").await;

    let updated = json_request(
        &app,
        "PUT",
        "/api/me",
        &token,
        serde_json::json!({"profile_type": "tutor", "biography": "PhD in mathematics"}),
    )
    .await;
    assert_eq!(updated.status(), StatusCode::OK);

    let me = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(me.status(), StatusCode::OK);

    let profile = body_json(me).await;
    assert_eq!(profile["user_id"], user_id.as_str());
    assert_eq!(profile["profile_type"], "tutor");
    assert_eq!(profile["biography"], "PhD in mathematics");
}
