// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::sync::Arc;
use tutorlink::config::Config;
use tutorlink::routes::create_router;
use tutorlink::services::{IdentityClient, ProvisioningService};
use tutorlink::store::RowStore;
use tutorlink::AppState;

/// Create a test app with in-memory identity and store backends.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::default();
    let store = RowStore::new_memory();
    let identity = IdentityClient::new_memory(false);
    let provisioning = ProvisioningService::new(identity, store.clone());

    let state = Arc::new(AppState {
        config,
        store,
        provisioning,
    });

    (create_router(state.clone()), state)
}

/// Sign a user up through the router and return (token, user_id).
#[allow(dead_code)]
pub async fn sign_up_test_user(
    app: &axum::Router,
    email: &str,
    first_name: &str,
    last_name: &str,
) -> (String, String) {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    let body = serde_json::json!({
        "email": email,
        "password": "password123",
        "first_name": first_name,
        "last_name": last_name,
    });

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/signup")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    let token = json["token"].as_str().expect("signup returns a token").to_string();
    let user_id = json["profile"]["user_id"]
        .as_str()
        .expect("signup provisions a profile")
        .to_string();
    (token, user_id)
}

/// Create a session JWT the way the auth routes do.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    tutorlink::middleware::auth::create_jwt(user_id, signing_key)
        .expect("Failed to create test JWT")
}
